//! CFI Interpreter
//!
//! Resolves parsed CFIs back onto a document tree. Each step is matched
//! against the same slot layout the generator used, so a generated CFI
//! resolves to the position it was generated from.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{ElisionRules, NO_ELISION};
use crate::error::{CfiError, Result};
use crate::indexing::{gap_len, locate_offset, ChildSlots, Slot};
use crate::parser::parse;
use crate::tree::DocumentTree;
use crate::types::*;

/// A resolved position in a content document
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Location<N> {
    /// A whole element
    Element(N),
    /// A character position inside a text, comment or processing instruction node
    Character { node: N, offset: usize },
    /// An empty text position between elements
    Gap { parent: N, index: u32 },
}

/// Both ends of a resolved range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRange<N> {
    pub start: Location<N>,
    pub end: Location<N>,
}

/// Result of resolving a content component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<N> {
    Location(Location<N>),
    Range(ResolvedRange<N>),
}

/// The spine entry a package component points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpineReference {
    /// `idref` of the itemref
    pub idref: String,
    /// Manifest `href` of the content document
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Resolves CFI paths against a borrowed document tree
pub struct CfiInterpreter<'t, T: DocumentTree> {
    tree: &'t T,
    elision: &'t ElisionRules,
}

impl<'t, T: DocumentTree> CfiInterpreter<'t, T> {
    pub fn new(tree: &'t T) -> Self {
        Self {
            tree,
            elision: &NO_ELISION,
        }
    }

    /// Interpreter skipping elements matched by `elision`
    ///
    /// Must be given the rules the CFI was generated with.
    pub fn with_elision(tree: &'t T, elision: &'t ElisionRules) -> Self {
        Self { tree, elision }
    }

    /// Walk `path` down from `root`
    pub fn resolve_path(&self, root: T::Node, path: &CfiPath) -> Result<Location<T::Node>> {
        let mut current = root;

        for (position, step) in path.steps.iter().enumerate() {
            trace!(index = step.index, "Resolving step");
            let slots = ChildSlots::build(self.tree, current, self.elision);
            let slot = slots.get(step.index).ok_or_else(|| {
                CfiError::out_of_range(
                    step.index as i64,
                    1,
                    slots.max_index() as i64,
                    format!("No child position for step /{}", step.index),
                )
            })?;

            match slot {
                Slot::Element(element) => {
                    self.check_id_assertion(step, *element)?;
                    current = *element;
                }
                Slot::Gap(members) => {
                    if position + 1 != path.steps.len() {
                        return Err(CfiError::NodeType(format!(
                            "Step /{} addresses a text position and cannot be followed by further steps",
                            step.index
                        )));
                    }
                    return self.resolve_gap(current, step.index, members, path);
                }
            }
        }

        if path.character_offset.is_some() {
            return Err(CfiError::NodeType(
                "A character offset cannot be applied to an element".to_string(),
            ));
        }
        Ok(Location::Element(current))
    }

    /// Resolve a path or range component from the document element
    pub fn resolve_content(&self, content: &ContentComponent) -> Result<Resolution<T::Node>> {
        let root = self.tree.root();
        match content {
            ContentComponent::Path(path) => Ok(Resolution::Location(self.resolve_path(root, path)?)),
            ContentComponent::Range(range) => {
                let ancestor = match self.resolve_path(root, &range.common_ancestor)? {
                    Location::Element(element) => element,
                    _ => {
                        return Err(CfiError::NodeType(
                            "The common ancestor of a range must be an element".to_string(),
                        ))
                    }
                };
                Ok(Resolution::Range(ResolvedRange {
                    start: self.resolve_path(ancestor, &range.start)?,
                    end: self.resolve_path(ancestor, &range.end)?,
                }))
            }
        }
    }

    /// Resolve the content part of a full CFI
    pub fn resolve(&self, cfi: &Cfi) -> Result<Resolution<T::Node>> {
        let resolution = self.resolve_content(&cfi.content)?;
        debug!(cfi = %cfi, "Resolved CFI");
        Ok(resolution)
    }

    fn check_id_assertion(&self, step: &CfiStep, element: T::Node) -> Result<()> {
        let Some(expected) = &step.id_assertion else {
            return Ok(());
        };
        let found = self.tree.attribute(element, "id");
        if found != Some(expected.as_str()) {
            return Err(CfiError::IdAssertionMismatch {
                index: step.index,
                expected: expected.clone(),
                found: found.map(str::to_string),
            });
        }
        Ok(())
    }

    fn resolve_gap(
        &self,
        parent: T::Node,
        index: u32,
        members: &[T::Node],
        path: &CfiPath,
    ) -> Result<Location<T::Node>> {
        let offset = path
            .character_offset
            .as_ref()
            .map(|terminus| terminus.offset)
            .unwrap_or(0);

        match locate_offset(self.tree, members, offset, self.elision) {
            Some((node, offset)) => Ok(Location::Character { node, offset }),
            None if offset == 0 => Ok(Location::Gap { parent, index }),
            None => {
                let len = gap_len(self.tree, members, self.elision);
                Err(CfiError::out_of_range(
                    offset as i64,
                    0,
                    len as i64,
                    format!("Character offset exceeds the length of text position /{}", index),
                ))
            }
        }
    }
}

/// Find the content document a CFI's package component points at
///
/// Walks the package component to its `itemref` and looks up the manifest
/// `item` named by its `idref`.
pub fn resolve_package<P: DocumentTree>(package: &P, cfi: &Cfi) -> Result<SpineReference> {
    let itemref = match CfiInterpreter::new(package).resolve_path(package.root(), &cfi.package.path)? {
        Location::Element(element) if package.local_name(element) == Some("itemref") => element,
        _ => {
            return Err(CfiError::NodeType(
                "The package component must end at an itemref element".to_string(),
            ))
        }
    };

    let idref = package
        .attribute(itemref, "idref")
        .ok_or_else(|| CfiError::Validation("The itemref has no idref".to_string()))?;

    let item = package
        .find_descendant(package.root(), "manifest")
        .map(|manifest| package.children_named(manifest, "item"))
        .unwrap_or_default()
        .into_iter()
        .find(|item| package.attribute(*item, "id") == Some(idref))
        .ok_or_else(|| CfiError::NotFound(format!("No manifest item with id '{}'", idref)))?;

    let href = package
        .attribute(item, "href")
        .ok_or_else(|| CfiError::Validation(format!("Manifest item '{}' has no href", idref)))?;

    debug!(idref, href, "Resolved package component");
    Ok(SpineReference {
        idref: idref.to_string(),
        href: href.to_string(),
        media_type: package.attribute(item, "media-type").map(str::to_string),
    })
}

/// Parse `input` and resolve it against a content document
pub fn interpret<T: DocumentTree>(
    input: &str,
    tree: &T,
    elision: &ElisionRules,
) -> Result<Resolution<T::Node>> {
    let cfi = parse(input)?;
    CfiInterpreter::with_elision(tree, elision).resolve(&cfi)
}
