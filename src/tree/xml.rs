//! `roxmltree` adapter

use roxmltree::{Document, Node, NodeType, ParsingOptions};

use super::{DocumentTree, NodeKind};
use crate::error::Result;

/// [`DocumentTree`] over a parsed `roxmltree` document
///
/// Character lengths are counted in UTF-16 code units so offsets agree with
/// those produced by browser-based reading systems.
#[derive(Clone, Copy)]
pub struct XmlTree<'a, 'input> {
    doc: &'a Document<'input>,
}

impl<'a, 'input: 'a> XmlTree<'a, 'input> {
    pub fn new(doc: &'a Document<'input>) -> Self {
        Self { doc }
    }

    /// Parse markup into a document, allowing a DOCTYPE declaration
    pub fn parse_document(text: &str) -> Result<Document<'_>> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        Ok(Document::parse_with_options(text, options)?)
    }

    pub fn document(&self) -> &'a Document<'input> {
        self.doc
    }

    /// First element whose `id` attribute equals `id`, in document order
    pub fn element_by_id(&self, id: &str) -> Option<Node<'a, 'input>> {
        self.doc
            .descendants()
            .filter(|n| n.is_element())
            .find(|n| n.attributes().any(|a| a.name() == "id" && a.value() == id))
    }

    /// First element with the given local name, in document order
    pub fn element_by_name(&self, name: &str) -> Option<Node<'a, 'input>> {
        self.doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == name)
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

impl<'a, 'input: 'a> DocumentTree for XmlTree<'a, 'input> {
    type Node = Node<'a, 'input>;

    fn root(&self) -> Self::Node {
        self.doc.root_element()
    }

    fn kind(&self, node: Self::Node) -> NodeKind {
        match node.node_type() {
            NodeType::Text => NodeKind::Text,
            NodeType::Comment => NodeKind::Comment,
            NodeType::PI => NodeKind::ProcessingInstruction,
            NodeType::Element | NodeType::Root => NodeKind::Element,
        }
    }

    fn parent(&self, node: Self::Node) -> Option<Self::Node> {
        // The roxmltree document node sits above the document element
        node.parent().filter(|p| p.is_element())
    }

    fn children(&self, node: Self::Node) -> Vec<Self::Node> {
        node.children().collect()
    }

    fn text_len(&self, node: Self::Node) -> usize {
        match node.node_type() {
            NodeType::Text => node.text().map(utf16_len).unwrap_or(0),
            NodeType::Comment => "<!--".len() + node.text().map(utf16_len).unwrap_or(0) + "-->".len(),
            NodeType::PI => match node.pi() {
                Some(pi) => {
                    let value = pi.value.map(|v| 1 + utf16_len(v)).unwrap_or(0);
                    "<?".len() + utf16_len(pi.target) + value + "?>".len()
                }
                None => 0,
            },
            NodeType::Element | NodeType::Root => 0,
        }
    }

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str> {
        node.attributes()
            .find(|attr| attr.name() == name)
            .map(|attr| attr.value())
    }

    fn local_name(&self, node: Self::Node) -> Option<&str> {
        node.is_element().then(|| node.tag_name().name())
    }
}
