//! CFI Generator
//!
//! Generates CFI components from positions in a document tree: single
//! elements, character positions, and ranges between two positions. Package
//! components are generated from the spine of a package document.

use tracing::{debug, trace};

use crate::config::{ElisionRules, NO_ELISION};
use crate::error::{CfiError, Result};
use crate::indexing::{contributed_len, gap_len, offset_before, ChildSlots};
use crate::tree::DocumentTree;
use crate::types::*;

/// Where an upward element walk stops (exclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopAt<'s, N> {
    /// Walk up to and including the document element's own step
    Root,
    /// Stop below this ancestor
    Node(N),
    /// Stop below the first ancestor-or-self with this local name
    Tag(&'s str),
}

/// Which side of a range an endpoint is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

/// A range endpoint normalized onto the slot layout
#[derive(Debug, Clone, Copy, PartialEq)]
enum Boundary<N> {
    /// A whole addressable element
    Element(N),
    /// A coalesced character position in a parent's gap
    Char { parent: N, index: u32, offset: usize },
}

impl<N: Copy> Boundary<N> {
    /// Element under which the endpoint's steps end
    fn container(&self) -> N {
        match *self {
            Boundary::Element(node) => node,
            Boundary::Char { parent, .. } => parent,
        }
    }
}

/// Generates CFI components over a borrowed document tree
pub struct CfiGenerator<'t, T: DocumentTree> {
    tree: &'t T,
    elision: &'t ElisionRules,
}

impl<'t, T: DocumentTree> CfiGenerator<'t, T> {
    /// Generator that addresses every element
    pub fn new(tree: &'t T) -> Self {
        Self {
            tree,
            elision: &NO_ELISION,
        }
    }

    /// Generator skipping elements matched by `elision`
    pub fn with_elision(tree: &'t T, elision: &'t ElisionRules) -> Self {
        Self { tree, elision }
    }

    /// Steps from `stop` (exclusive) down to `target`
    pub fn element_steps(&self, target: T::Node, stop: StopAt<'_, T::Node>) -> Result<CfiPath> {
        validate_start_element(self.tree, Some(target))?;

        let mut steps = Vec::new();
        let mut current = target;
        loop {
            match stop {
                StopAt::Node(node) if node == current => break,
                StopAt::Tag(name) if self.tree.local_name(current) == Some(name) => break,
                _ => {}
            }

            let Some(parent) = self.tree.parent(current) else {
                if let StopAt::Node(node) = stop {
                    return Err(CfiError::Validation(format!(
                        "{:?} is not an ancestor of the target element",
                        node
                    )));
                }
                break;
            };

            steps.push(self.step_for(parent, current)?);
            current = parent;
        }

        steps.reverse();
        trace!(depth = steps.len(), "Generated element steps");
        Ok(CfiPath::with_steps(steps))
    }

    /// Path to an element from the document element
    ///
    /// The document element itself is the empty path, so a CFI for the whole
    /// document reads `epubcfi(/6/2!)` rather than ending in `/2`, and a range
    /// whose common ancestor is the document element starts with `,`. This
    /// keeps every generated path resolvable by [`CfiInterpreter`], which
    /// starts walking at the document element.
    ///
    /// [`CfiInterpreter`]: crate::CfiInterpreter
    pub fn element_component(&self, element: T::Node) -> Result<CfiPath> {
        let path = self.element_steps(element, StopAt::Root)?;
        debug!(cfi = %path, "Generated element component");
        Ok(path)
    }

    /// Path to character `offset` of a text, comment or processing instruction node
    pub fn character_offset_component(&self, node: T::Node, offset: i64) -> Result<CfiPath> {
        let path = self.boundary_path(self.char_boundary(node, offset)?)?;
        debug!(cfi = %path, "Generated character offset component");
        Ok(path)
    }

    /// Range between two DOM-style boundary points
    ///
    /// A character-bearing endpoint is an offset into its characters. For an
    /// element endpoint the offset counts children: the child after it starts
    /// a range and the child before it ends one. Identical endpoints collapse
    /// to a single path.
    pub fn range_component(
        &self,
        start: T::Node,
        start_offset: i64,
        end: T::Node,
        end_offset: i64,
    ) -> Result<ContentComponent> {
        let start_boundary = self.boundary(start, start_offset, Side::Start)?;
        // A collapsed range normalizes both points the same way
        let end_boundary = if start == end && start_offset == end_offset {
            start_boundary
        } else {
            self.boundary(end, end_offset, Side::End)?
        };
        let component = self.range_between(start_boundary, end_boundary)?;
        debug!(cfi = %component, "Generated range component");
        Ok(component)
    }

    /// Range spanning two whole elements
    pub fn element_range_component(&self, start: T::Node, end: T::Node) -> Result<ContentComponent> {
        let start = self.whole_element(start)?;
        let end = self.whole_element(end)?;
        let component = self.range_between(start, end)?;
        debug!(cfi = %component, "Generated element range component");
        Ok(component)
    }

    /// Range between two character positions
    pub fn char_offset_range_component(
        &self,
        start: T::Node,
        start_offset: i64,
        end: T::Node,
        end_offset: i64,
    ) -> Result<ContentComponent> {
        let start = self.char_boundary(start, start_offset)?;
        let end = self.char_boundary(end, end_offset)?;
        let component = self.range_between(start, end)?;
        debug!(cfi = %component, "Generated character offset range component");
        Ok(component)
    }

    fn step_for(&self, parent: T::Node, child: T::Node) -> Result<CfiStep> {
        let slots = ChildSlots::build(self.tree, parent, self.elision);
        let index = slots
            .index_of(child)
            .ok_or_else(|| CfiError::Validation(format!("{:?} is not a child of {:?}", child, parent)))?;

        if index % 2 != 0 {
            return Err(CfiError::NodeType(
                "An elided element cannot be addressed".to_string(),
            ));
        }

        Ok(match self.tree.attribute(child, "id") {
            Some(id) if !id.is_empty() => CfiStep::with_id(index, id),
            _ => CfiStep::new(index),
        })
    }

    fn whole_element(&self, node: T::Node) -> Result<Boundary<T::Node>> {
        let node = validate_start_element(self.tree, Some(node))?;
        if self.elision.is_elided(self.tree, node) {
            return Err(CfiError::NodeType(
                "An elided element cannot be addressed".to_string(),
            ));
        }
        Ok(Boundary::Element(node))
    }

    fn char_boundary(&self, node: T::Node, offset: i64) -> Result<Boundary<T::Node>> {
        if !self.tree.kind(node).is_character_data() {
            return Err(CfiError::NodeType(
                "Cannot generate a character offset from a node that is not character data"
                    .to_string(),
            ));
        }

        let len = self.tree.text_len(node);
        if offset < 0 {
            return Err(CfiError::out_of_range(
                offset,
                0,
                len as i64,
                "Character offset cannot be less than 0",
            ));
        }
        let local = offset as usize;
        if local > len {
            return Err(CfiError::out_of_range(
                offset,
                0,
                len as i64,
                "Character offset cannot be greater than the length of the node",
            ));
        }

        let parent = self
            .tree
            .parent(node)
            .ok_or_else(|| CfiError::Validation("Character data has no parent element".to_string()))?;
        if self.elision.is_elided(self.tree, parent) {
            return Err(CfiError::NodeType(
                "Character data inside an elided element cannot be addressed".to_string(),
            ));
        }

        let slots = ChildSlots::build(self.tree, parent, self.elision);
        let (index, members) = slots
            .index_of(node)
            .and_then(|index| Some((index, slots.gap(index)?)))
            .ok_or_else(|| CfiError::Validation(format!("{:?} is not a child of {:?}", node, parent)))?;

        Ok(Boundary::Char {
            parent,
            index,
            offset: offset_before(self.tree, members, node, self.elision) + local,
        })
    }

    fn boundary(&self, node: T::Node, offset: i64, side: Side) -> Result<Boundary<T::Node>> {
        if self.tree.kind(node).is_character_data() {
            return self.char_boundary(node, offset);
        }

        let node = self.whole_element(node)?.container();
        let children = self.tree.children(node);
        if offset < 0 {
            return Err(CfiError::out_of_range(
                offset,
                0,
                children.len() as i64,
                "Element offset cannot be less than 0",
            ));
        }
        let k = offset as usize;
        if k > children.len() {
            return Err(CfiError::out_of_range(
                offset,
                0,
                children.len() as i64,
                "Element offset cannot be greater than the number of children",
            ));
        }
        if children.is_empty() {
            return Ok(Boundary::Element(node));
        }

        let selected = match side {
            Side::Start => children.get(k),
            Side::End => k.checked_sub(1).and_then(|i| children.get(i)),
        };
        let slots = ChildSlots::build(self.tree, node, self.elision);

        let Some(&child) = selected else {
            // Past the last child for a start, before the first for an end
            return Ok(match side {
                Side::Start => {
                    let index = slots.max_index();
                    let members = slots.gap(index).unwrap_or_default();
                    Boundary::Char {
                        parent: node,
                        index,
                        offset: gap_len(self.tree, members, self.elision),
                    }
                }
                Side::End => Boundary::Char {
                    parent: node,
                    index: 1,
                    offset: 0,
                },
            });
        };

        if self.tree.is_element(child) && !self.elision.is_elided(self.tree, child) {
            return Ok(Boundary::Element(child));
        }

        let (index, members) = slots
            .index_of(child)
            .and_then(|index| Some((index, slots.gap(index)?)))
            .ok_or_else(|| CfiError::Validation(format!("{:?} is not a child of {:?}", child, node)))?;
        let before = offset_before(self.tree, members, child, self.elision);
        let offset = match side {
            Side::Start => before,
            Side::End => before + contributed_len(self.tree, child, self.elision),
        };

        Ok(Boundary::Char {
            parent: node,
            index,
            offset,
        })
    }

    fn boundary_path(&self, boundary: Boundary<T::Node>) -> Result<CfiPath> {
        self.relative_path(boundary, StopAt::Root)
    }

    fn relative_path(&self, boundary: Boundary<T::Node>, stop: StopAt<'_, T::Node>) -> Result<CfiPath> {
        match boundary {
            Boundary::Element(node) => self.element_steps(node, stop),
            Boundary::Char {
                parent,
                index,
                offset,
            } => {
                let mut path = self.element_steps(parent, stop)?;
                path.push(CfiStep::new(index));
                path.set_character_offset(offset);
                Ok(path)
            }
        }
    }

    fn range_between(
        &self,
        start: Boundary<T::Node>,
        end: Boundary<T::Node>,
    ) -> Result<ContentComponent> {
        if start == end {
            return Ok(ContentComponent::Path(self.boundary_path(start)?));
        }

        let ancestor = self.common_ancestor(start.container(), end.container())?;
        Ok(ContentComponent::Range(RangeComponent {
            common_ancestor: self.element_steps(ancestor, StopAt::Root)?,
            start: self.relative_path(start, StopAt::Node(ancestor))?,
            end: self.relative_path(end, StopAt::Node(ancestor))?,
        }))
    }

    /// Deepest element that is an ancestor-or-self of both nodes
    fn common_ancestor(&self, a: T::Node, b: T::Node) -> Result<T::Node> {
        let mut chain = vec![a];
        let mut current = a;
        while let Some(parent) = self.tree.parent(current) {
            chain.push(parent);
            current = parent;
        }

        let mut current = Some(b);
        while let Some(node) = current {
            if chain.contains(&node) {
                return Ok(node);
            }
            current = self.tree.parent(node);
        }

        Err(CfiError::Validation(
            "Range endpoints do not share a common ancestor".to_string(),
        ))
    }
}

/// Require a present element node
pub fn validate_start_element<T: DocumentTree>(tree: &T, node: Option<T::Node>) -> Result<T::Node> {
    let node = node.ok_or_else(|| CfiError::Validation("CFI target element is undefined".to_string()))?;
    if !tree.is_element(node) {
        return Err(CfiError::Validation(
            "CFI target element is not an element".to_string(),
        ));
    }
    Ok(node)
}

fn spine_itemrefs<T: DocumentTree>(package: &T) -> Result<Vec<T::Node>> {
    let spine = package
        .find_descendant(package.root(), "spine")
        .ok_or_else(|| CfiError::NotFound("The package document has no spine".to_string()))?;
    Ok(package.children_named(spine, "itemref"))
}

fn itemref_component<T: DocumentTree>(package: &T, itemref: T::Node) -> Result<PackageComponent> {
    let path = CfiGenerator::new(package).element_steps(itemref, StopAt::Root)?;
    let component = PackageComponent::new(path);
    debug!(cfi = %component, "Generated package component");
    Ok(component)
}

/// Package component for the itemref at a 0-based spine position
pub fn package_component_with_spine_index<T: DocumentTree>(
    package: Option<&T>,
    index: usize,
) -> Result<PackageComponent> {
    let package = package.ok_or_else(|| {
        CfiError::Validation("A package document must be supplied to generate a CFI".to_string())
    })?;

    let itemrefs = spine_itemrefs(package)?;
    if itemrefs.is_empty() {
        return Err(CfiError::NotFound("The spine has no itemref elements".to_string()));
    }
    let itemref = itemrefs.get(index).copied().ok_or_else(|| {
        CfiError::out_of_range(
            index as i64,
            0,
            itemrefs.len() as i64 - 1,
            "Spine index exceeds the number of itemref elements",
        )
    })?;

    itemref_component(package, itemref)
}

/// Package component for the itemref whose `idref` names a content document
pub fn package_component<T: DocumentTree>(
    package: Option<&T>,
    idref: Option<&str>,
) -> Result<PackageComponent> {
    let idref = idref.filter(|idref| !idref.is_empty()).ok_or_else(|| {
        CfiError::Validation(
            "The idref for the content document, as found in the spine, must be supplied"
                .to_string(),
        )
    })?;
    let package = package.ok_or_else(|| {
        CfiError::Validation("A package document must be supplied to generate a CFI".to_string())
    })?;

    let itemref = spine_itemrefs(package)?
        .into_iter()
        .find(|itemref| package.attribute(*itemref, "idref") == Some(idref))
        .ok_or_else(|| {
            CfiError::NotFound(format!(
                "The idref of the content document could not be found in the spine: {}",
                idref
            ))
        })?;

    itemref_component(package, itemref)
}

/// Join a package component and a content component into a full CFI
pub fn complete_cfi(package: PackageComponent, content: impl Into<ContentComponent>) -> Cfi {
    Cfi::new(package, content.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tree::XmlTree;

    type Node<'a, 'input> = roxmltree::Node<'a, 'input>;

    fn by_id<'a, 'input: 'a>(tree: &XmlTree<'a, 'input>, id: &str) -> Node<'a, 'input> {
        tree.element_by_id(id).unwrap()
    }

    fn contents<'a, 'input: 'a>(tree: &XmlTree<'a, 'input>, id: &str) -> Vec<Node<'a, 'input>> {
        tree.children(by_id(tree, id))
    }

    const NESTED: &str = "<html><div></div><div><div id='startParent'><div></div>textnode1<div></div>textNode2<div></div></div></div><div></div></html>";

    #[test]
    fn test_element_steps_to_tag() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let target = contents(&tree, "startParent")[0];

        let path = generator.element_steps(target, StopAt::Tag("html")).unwrap();
        assert_eq!(path.to_string(), "/4/2[startParent]/2");
        assert_eq!(generator.element_steps(target, StopAt::Root).unwrap(), path);
    }

    #[test]
    fn test_element_steps_to_node() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let parent = by_id(&tree, "startParent");
        let target = tree.children(parent)[2];

        assert_eq!(
            generator.element_steps(target, StopAt::Node(parent)).unwrap().to_string(),
            "/4"
        );
        assert!(generator.element_steps(parent, StopAt::Node(parent)).unwrap().is_empty());

        let err = generator.element_steps(parent, StopAt::Node(target)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_element_steps_in_svg() {
        let doc = XmlTree::parse_document(
            r#"<html xmlns:svg="http://www.w3.org/2000/svg"><body><svg:svg><svg:g><svg:rect id="r"/></svg:g></svg:svg></body></html>"#,
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);

        assert_eq!(
            generator.element_component(by_id(&tree, "r")).unwrap().to_string(),
            "/2/2/2/2[r]"
        );
    }

    #[test]
    fn test_character_offset_component() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let text = contents(&tree, "startParent")[1];

        assert_eq!(
            generator.character_offset_component(text, 3).unwrap().to_string(),
            "/4/2[startParent]/3:3"
        );
        assert_eq!(
            generator.character_offset_component(text, 9).unwrap().to_string(),
            "/4/2[startParent]/3:9"
        );
    }

    #[test]
    fn test_character_offset_bounds() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");

        let err = generator.character_offset_component(items[1], -1).unwrap_err();
        assert_eq!(
            err,
            CfiError::out_of_range(-1, 0, 9, "Character offset cannot be less than 0")
        );

        let err = generator.character_offset_component(items[1], 10).unwrap_err();
        assert!(matches!(err, CfiError::OutOfRange { value: 10, max: 9, .. }));

        let err = generator.character_offset_component(items[0], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeType);
    }

    #[test]
    fn test_character_offset_across_markers() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'><div></div>textnode1.0<span class='cfi-marker'></span>textnode1.1<span class='cfi-marker'></span>textnode1.2<div></div>textNode2<div></div></div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let rules = ElisionRules::with_classes(["cfi-marker"]);
        let generator = CfiGenerator::with_elision(&tree, &rules);
        let items = contents(&tree, "startParent");

        assert_eq!(
            generator.character_offset_component(items[5], 3).unwrap().to_string(),
            "/4/2[startParent]/3:25"
        );

        let err = generator.element_component(items[2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeType);
    }

    #[test]
    fn test_elided_coalescing_scenario() {
        let doc = XmlTree::parse_document(
            "<html><body><p id='p'>012<span class='cfi-marker'/>34<span class='cfi-marker'/>56789</p></body></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let rules = ElisionRules::with_classes(["cfi-marker"]);
        let generator = CfiGenerator::with_elision(&tree, &rules);
        let last = contents(&tree, "p")[4];

        assert_eq!(
            generator.character_offset_component(last, 0).unwrap().to_string(),
            "/2/2[p]/1:5"
        );
        assert_eq!(
            generator.character_offset_component(last, 3).unwrap().to_string(),
            "/2/2[p]/1:8"
        );
    }

    #[test]
    fn test_range_collapses_onto_element() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='commonAncestor'>textnode1<div id='targetElement'></div>textNode2</div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let ancestor = by_id(&tree, "commonAncestor");

        let component = generator.range_component(ancestor, 1, ancestor, 2).unwrap();
        assert_eq!(component.to_string(), "/4/2[commonAncestor]/2[targetElement]");
        assert!(matches!(component, ContentComponent::Path(_)));
    }

    #[test]
    fn test_range_text_to_element() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'>textnode<div></div></div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");

        assert_eq!(
            generator.range_component(items[0], 1, items[1], 0).unwrap().to_string(),
            "/4/2[startParent],/1:1,/2"
        );
    }

    #[test]
    fn test_range_element_to_text() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");

        assert_eq!(
            generator.range_component(items[0], 0, items[1], 1).unwrap().to_string(),
            "/4/2[startParent],/2,/3:1"
        );
    }

    #[test]
    fn test_range_nested_text_to_text() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'><div id='startElement'>someText</div>textnode1<div></div>textNode2</div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let start = tree.children(by_id(&tree, "startElement"))[0];
        let end = contents(&tree, "startParent")[1];

        assert_eq!(
            generator.range_component(start, 4, end, 4).unwrap().to_string(),
            "/4/2[startParent],/2[startElement]/1:4,/3:4"
        );
    }

    #[test]
    fn test_range_under_document_element() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'>textnode1</div></div><div id='end'></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let start = contents(&tree, "startParent")[0];
        let end = by_id(&tree, "end");

        let component = generator.range_component(start, 1, end, 0).unwrap();
        assert_eq!(component.to_string(), ",/4/2[startParent]/1:1,/6[end]");
    }

    #[test]
    fn test_range_text_and_parent_boundaries() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'><p id='theParagraph'>some text</p></div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let paragraph = by_id(&tree, "theParagraph");
        let text = tree.children(paragraph)[0];

        let expected = "/4/2[startParent]/2[theParagraph],/1:0,/1:9";
        assert_eq!(
            generator.range_component(text, 0, paragraph, 1).unwrap().to_string(),
            expected
        );
        assert_eq!(
            generator.range_component(paragraph, 0, text, 9).unwrap().to_string(),
            expected
        );
    }

    #[test]
    fn test_range_element_offsets_at_edges() {
        let doc = XmlTree::parse_document("<html><body><p id='p'><b/>tail</p></body></html>").unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let paragraph = by_id(&tree, "p");

        // Start after the last child, end before the first
        assert_eq!(
            generator.range_component(paragraph, 2, paragraph, 2).unwrap().to_string(),
            "/2/2[p]/3:4"
        );
        assert_eq!(
            generator.range_component(paragraph, 0, paragraph, 0).unwrap().to_string(),
            "/2/2[p]/2"
        );
        assert_eq!(
            generator.range_component(paragraph, 0, paragraph, 1).unwrap().to_string(),
            "/2/2[p]/2"
        );
        assert_eq!(
            generator.range_component(paragraph, 1, paragraph, 2).unwrap().to_string(),
            "/2/2[p],/3:0,/3:4"
        );

        let err = generator.range_component(paragraph, 3, paragraph, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn test_range_childless_element() {
        let doc = XmlTree::parse_document("<html><body><img id='a'/><img id='b'/></body></html>").unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let a = by_id(&tree, "a");
        let b = by_id(&tree, "b");

        assert_eq!(
            generator.range_component(a, 0, b, 0).unwrap().to_string(),
            "/2,/2[a],/4[b]"
        );
        assert_eq!(
            generator.range_component(a, 1, b, 0).unwrap_err().kind(),
            ErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_element_range_component() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'><div id='period-.-in.id'></div>textnode<div></div>textnode<div></div></div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");

        assert_eq!(
            generator.element_range_component(items[0], items[4]).unwrap().to_string(),
            "/4/2[startParent],/2[period-.-in.id],/6"
        );
        assert_eq!(
            generator.element_range_component(items[2], items[2]).unwrap().to_string(),
            "/4/2[startParent]/4"
        );
    }

    #[test]
    fn test_element_range_between_ancestor_and_descendant() {
        use crate::interpreter::{CfiInterpreter, Location, Resolution, ResolvedRange};
        use crate::parser::parse_content;

        let doc = XmlTree::parse_document("<html><body><p id='p'><b id='x'>bold</b> tail</p></body></html>").unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let interpreter = CfiInterpreter::new(&tree);
        let p = by_id(&tree, "p");
        let x = by_id(&tree, "x");

        let forward = generator.element_range_component(p, x).unwrap();
        assert_eq!(forward.to_string(), "/2/2[p],,/2[x]");
        assert_eq!(parse_content(&forward.to_string()).unwrap(), forward);
        assert_eq!(
            interpreter.resolve_content(&forward).unwrap(),
            Resolution::Range(ResolvedRange {
                start: Location::Element(p),
                end: Location::Element(x),
            })
        );

        let backward = generator.element_range_component(x, p).unwrap();
        assert_eq!(backward.to_string(), "/2/2[p],/2[x],");
        assert_eq!(parse_content(&backward.to_string()).unwrap(), backward);
        assert_eq!(
            interpreter.resolve_content(&backward).unwrap(),
            Resolution::Range(ResolvedRange {
                start: Location::Element(x),
                end: Location::Element(p),
            })
        );

        let package_doc = XmlTree::parse_document(PACKAGE).unwrap();
        let package = XmlTree::new(&package_doc);
        let cfi = complete_cfi(package_component(Some(&package), Some("contentDocId")).unwrap(), forward);
        let reparsed = crate::parser::parse(&cfi.to_string()).unwrap();
        assert_eq!(reparsed, cfi);
        assert_eq!(
            interpreter.resolve(&reparsed).unwrap(),
            Resolution::Range(ResolvedRange {
                start: Location::Element(p),
                end: Location::Element(x),
            })
        );
    }

    #[test]
    fn test_element_range_without_ids() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");

        assert_eq!(
            generator.element_range_component(items[0], items[4]).unwrap().to_string(),
            "/4/2[startParent],/2,/6"
        );
        assert_eq!(
            generator.element_range_component(items[0], items[0]).unwrap().to_string(),
            "/4/2[startParent]/2"
        );
        assert_eq!(
            generator.element_range_component(items[1], items[0]).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_char_offset_ranges() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'><div>textnode1</div><div></div><div>textnode2</div></div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");
        let first = tree.children(items[0])[0];
        let last = tree.children(items[2])[0];

        assert_eq!(
            generator.char_offset_range_component(first, 6, last, 2).unwrap().to_string(),
            "/4/2[startParent],/2/1:6,/6/1:2"
        );
        assert_eq!(
            generator.char_offset_range_component(first, 2, first, 6).unwrap().to_string(),
            "/4/2[startParent]/2,/1:2,/1:6"
        );
        assert_eq!(
            generator.char_offset_range_component(first, 2, items[1], 0).unwrap_err().kind(),
            ErrorKind::NodeType
        );
    }

    #[test]
    fn test_char_offset_range_across_levels() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'>textnode1<div>textnode2</div></div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");
        let nested = tree.children(items[1])[0];

        assert_eq!(
            generator.char_offset_range_component(items[0], 2, nested, 6).unwrap().to_string(),
            "/4/2[startParent],/1:2,/2/1:6"
        );
    }

    #[test]
    fn test_char_offset_range_with_whitespace() {
        let doc = XmlTree::parse_document(
            "  <html>    <body>        <h1>Title</h1>        <p>Some <strong>very important</strong> text</p>    </body></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let paragraph = tree.element_by_name("p").unwrap();
        let strong = tree.element_by_name("strong").unwrap();
        let start = tree.children(strong)[0];
        let end = tree.children(paragraph)[2];

        assert_eq!(
            generator.char_offset_range_component(start, 5, end, 5).unwrap().to_string(),
            "/2/4,/2/1:5,/3:5"
        );
    }

    #[test]
    fn test_char_offset_range_over_several_text_nodes() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'><div>content</div>textnode1<div></div>textNode2<div>content</div>textNode3</div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");

        assert_eq!(
            generator.char_offset_range_component(items[1], 2, items[5], 6).unwrap().to_string(),
            "/4/2[startParent],/3:2,/7:6"
        );
    }

    #[test]
    fn test_char_offset_range_around_comments() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'>textnode<!-- comment -->textnode</div><div id='other'><!-- comment -->textnode</div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");
        let other = contents(&tree, "other");

        assert_eq!(
            generator.char_offset_range_component(items[0], 4, items[2], 4).unwrap().to_string(),
            "/4/2[startParent],/1:4,/1:28"
        );
        assert_eq!(
            generator.char_offset_range_component(other[1], 4, other[1], 8).unwrap().to_string(),
            "/4/4[other],/1:20,/1:24"
        );
    }

    #[test]
    fn test_char_offset_range_around_processing_instructions() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'>textnode<?xml-stylesheet type='text/css' href='style.css'?>textnode</div><div id='other'><?xml-stylesheet type='text/css' href='style.css'?>textnode</div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let items = contents(&tree, "startParent");
        let other = contents(&tree, "other");

        assert_eq!(
            generator.char_offset_range_component(items[0], 4, items[2], 4).unwrap().to_string(),
            "/4/2[startParent],/1:4,/1:63"
        );
        assert_eq!(
            generator.char_offset_range_component(other[1], 4, other[1], 8).unwrap().to_string(),
            "/4/4[other],/1:55,/1:59"
        );
    }

    #[test]
    fn test_char_offset_range_across_markers() {
        let doc = XmlTree::parse_document(
            "<html><div></div><div><div id='startParent'>012<span class='cfi-marker'/>34<span class='cfi-marker'/>56789</div><div id='other'>This is <span class='cfi-marker'>a</span> line <span class='cfi-marker'>of</span> text</div></div></html>",
        )
        .unwrap();
        let tree = XmlTree::new(&doc);
        let rules = ElisionRules::with_classes(["cfi-marker"]);
        let generator = CfiGenerator::with_elision(&tree, &rules);
        let items = contents(&tree, "startParent");
        let other = contents(&tree, "other");

        assert_eq!(
            generator.char_offset_range_component(items[4], 0, items[4], 3).unwrap().to_string(),
            "/4/2[startParent],/1:5,/1:8"
        );
        assert_eq!(
            generator.char_offset_range_component(items[4], 1, items[4], 3).unwrap().to_string(),
            "/4/2[startParent],/1:6,/1:8"
        );
        assert_eq!(
            generator.char_offset_range_component(other[4], 0, other[4], 4).unwrap().to_string(),
            "/4/4[other],/1:14,/1:18"
        );
    }

    #[test]
    fn test_collapse_law() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let generator = CfiGenerator::new(&tree);
        let text = contents(&tree, "startParent")[3];

        let single = generator.character_offset_component(text, 4).unwrap();
        let collapsed = generator.range_component(text, 4, text, 4).unwrap();
        assert_eq!(collapsed, ContentComponent::Path(single));
    }

    #[test]
    fn test_validate_start_element() {
        let doc = XmlTree::parse_document(NESTED).unwrap();
        let tree = XmlTree::new(&doc);
        let items = contents(&tree, "startParent");

        assert_eq!(validate_start_element(&tree, Some(items[0])).unwrap(), items[0]);
        assert_eq!(
            validate_start_element(&tree, None).unwrap_err(),
            CfiError::Validation("CFI target element is undefined".to_string())
        );
        assert_eq!(
            validate_start_element(&tree, Some(items[1])).unwrap_err(),
            CfiError::Validation("CFI target element is not an element".to_string())
        );
    }

    const PACKAGE: &str = "<package><div></div><div></div><div><spine><itemref></itemref><itemref></itemref><itemref idref='contentDocId'></itemref></spine></div></package>";

    const NAMESPACED_PACKAGE: &str = r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf"><opf:metadata></opf:metadata><opf:manifest></opf:manifest><opf:spine><opf:itemref></opf:itemref><opf:itemref></opf:itemref><opf:itemref opf:idref="contentDocId"></opf:itemref></opf:spine></opf:package>"#;

    #[test]
    fn test_package_component_by_spine_index() {
        let doc = XmlTree::parse_document(PACKAGE).unwrap();
        let tree = XmlTree::new(&doc);
        assert_eq!(
            package_component_with_spine_index(Some(&tree), 2).unwrap().to_string(),
            "/6/2/6!"
        );

        let doc = XmlTree::parse_document(NAMESPACED_PACKAGE).unwrap();
        let tree = XmlTree::new(&doc);
        assert_eq!(
            package_component_with_spine_index(Some(&tree), 2).unwrap().to_string(),
            "/6/6!"
        );

        let err = package_component_with_spine_index(Some(&tree), 3).unwrap_err();
        assert!(matches!(err, CfiError::OutOfRange { value: 3, max: 2, .. }));
    }

    #[test]
    fn test_package_component_by_idref() {
        let doc = XmlTree::parse_document(PACKAGE).unwrap();
        let tree = XmlTree::new(&doc);
        let by_idref = package_component(Some(&tree), Some("contentDocId")).unwrap();
        assert_eq!(by_idref.to_string(), "/6/2/6!");
        // The third spine entry is spine index 2
        assert_eq!(by_idref, package_component_with_spine_index(Some(&tree), 2).unwrap());
        assert_eq!(by_idref.spine_index(), Some(2));

        let doc = XmlTree::parse_document(NAMESPACED_PACKAGE).unwrap();
        let tree = XmlTree::new(&doc);
        assert_eq!(
            package_component(Some(&tree), Some("contentDocId")).unwrap().to_string(),
            "/6/6!"
        );
    }

    #[test]
    fn test_package_component_errors() {
        let doc = XmlTree::parse_document(PACKAGE).unwrap();
        let tree = XmlTree::new(&doc);

        assert_eq!(
            package_component(Some(&tree), None).unwrap_err(),
            CfiError::Validation(
                "The idref for the content document, as found in the spine, must be supplied"
                    .to_string()
            )
        );
        assert_eq!(
            package_component::<XmlTree>(None, Some("contentDocId")).unwrap_err(),
            CfiError::Validation("A package document must be supplied to generate a CFI".to_string())
        );
        assert_eq!(
            package_component(Some(&tree), Some("missing")).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let doc = XmlTree::parse_document("<package><manifest/></package>").unwrap();
        let tree = XmlTree::new(&doc);
        assert_eq!(
            package_component_with_spine_index(Some(&tree), 0).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_complete_cfi() {
        let package_doc = XmlTree::parse_document(PACKAGE).unwrap();
        let package = XmlTree::new(&package_doc);
        let content_doc = XmlTree::parse_document(NESTED).unwrap();
        let content = XmlTree::new(&content_doc);

        let package_path = package_component(Some(&package), Some("contentDocId")).unwrap();
        let text = contents(&content, "startParent")[1];
        let content_path = CfiGenerator::new(&content)
            .character_offset_component(text, 3)
            .unwrap();

        assert_eq!(
            complete_cfi(package_path, content_path).to_string(),
            "epubcfi(/6/2/6!/4/2[startParent]/3:3)"
        );
    }

    #[test]
    fn test_complete_cfi_for_document_element() {
        let doc = XmlTree::parse_document("<package><metadata/><manifest/><spine><itemref idref='c1'/></spine></package>").unwrap();
        let package = XmlTree::new(&doc);
        let content_doc = XmlTree::parse_document("<html><body/></html>").unwrap();
        let content = XmlTree::new(&content_doc);

        let path = CfiGenerator::new(&content).element_component(content.root()).unwrap();
        let cfi = complete_cfi(package_component(Some(&package), Some("c1")).unwrap(), path);
        assert_eq!(cfi.to_string(), "epubcfi(/6/2!)");
    }
}
