//! Document tree abstraction
//!
//! The CFI algorithms never touch a concrete DOM. They read the host tree
//! through [`DocumentTree`], which exposes just what addressing needs: node
//! kinds, parent/child structure, character lengths and a few attributes.
//! [`XmlTree`] implements it over `roxmltree`.

mod xml;

pub use xml::XmlTree;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a document node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    /// Text, comments and processing instructions carry character content
    pub fn is_character_data(self) -> bool {
        !matches!(self, NodeKind::Element)
    }
}

/// Read-only view of a parsed document
///
/// Implementations must be stable for the duration of a single generate or
/// interpret call: children are expected in document order and node equality
/// must be identity.
pub trait DocumentTree {
    /// Node handle; cheap to copy and compared by identity
    type Node: Copy + PartialEq + fmt::Debug;

    /// The document element
    fn root(&self) -> Self::Node;

    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Parent element; `None` for the document element
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// All children in document order, of every kind
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Character length of a node's own content
    ///
    /// Text nodes report their data length. Comments and processing
    /// instructions report the length of their full serialization
    /// (`<!--data-->`, `<?target data?>`). Elements report 0.
    fn text_len(&self, node: Self::Node) -> usize;

    /// Attribute value matched on local name, ignoring any namespace
    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Element local name without prefix
    fn local_name(&self, node: Self::Node) -> Option<&str>;

    /// Whitespace separated entries of the `class` attribute
    fn class_list(&self, node: Self::Node) -> Vec<&str> {
        self.attribute(node, "class")
            .map(|classes| classes.split_ascii_whitespace().collect())
            .unwrap_or_default()
    }

    fn is_element(&self, node: Self::Node) -> bool {
        self.kind(node) == NodeKind::Element
    }

    /// First descendant element of `node` with the given local name, depth first
    fn find_descendant(&self, node: Self::Node, name: &str) -> Option<Self::Node> {
        for child in self.children(node) {
            if !self.is_element(child) {
                continue;
            }
            if self.local_name(child) == Some(name) {
                return Some(child);
            }
            if let Some(found) = self.find_descendant(child, name) {
                return Some(found);
            }
        }
        None
    }

    /// Element children of `node` with the given local name
    fn children_named(&self, node: Self::Node, name: &str) -> Vec<Self::Node> {
        self.children(node)
            .into_iter()
            .filter(|child| self.local_name(*child) == Some(name))
            .collect()
    }
}
