//! Elision configuration
//!
//! Elements matched by these rules (typically highlight markers injected by a
//! reading system) are invisible to CFI addressing: they take no index and
//! contribute no characters. The same rules must be used when generating and
//! when interpreting a CFI.

use serde::{Deserialize, Serialize};
use std::env;

use crate::tree::{DocumentTree, NodeKind};

/// Environment variable holding comma-separated elided class names
pub const ENV_ELIDED_CLASSES: &str = "EPUBCFI_ELIDED_CLASSES";
/// Environment variable holding comma-separated elided element names
pub const ENV_ELIDED_ELEMENTS: &str = "EPUBCFI_ELIDED_ELEMENTS";
/// Environment variable holding comma-separated elided element ids
pub const ENV_ELIDED_IDS: &str = "EPUBCFI_ELIDED_IDS";

/// Rules that elide nothing, for callers that do not supply any
pub(crate) static NO_ELISION: ElisionRules = ElisionRules {
    classes: Vec::new(),
    elements: Vec::new(),
    ids: Vec::new(),
};

/// Rules selecting elements that are excluded from addressing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElisionRules {
    /// Class names; an element carrying any of them is elided
    pub classes: Vec<String>,
    /// Element local names
    pub elements: Vec<String>,
    /// Element ids
    pub ids: Vec<String>,
}

impl ElisionRules {
    /// Rules that elide nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Rules eliding elements carrying any of the given classes
    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rules = Self::default();
        for class in classes {
            rules.add_class(class);
        }
        rules
    }

    /// Add a class name, keeping insertion order and ignoring duplicates
    pub fn add_class(&mut self, class: impl Into<String>) {
        push_unique(&mut self.classes, class.into());
    }

    /// Add an element local name
    pub fn add_element(&mut self, name: impl Into<String>) {
        push_unique(&mut self.elements, name.into());
    }

    /// Add an element id
    pub fn add_id(&mut self, id: impl Into<String>) {
        push_unique(&mut self.ids, id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.elements.is_empty() && self.ids.is_empty()
    }

    /// Load rules from `EPUBCFI_ELIDED_*` variables; unset variables yield empty lists
    pub fn from_env() -> Self {
        let mut rules = Self::default();
        for class in split_list(env::var(ENV_ELIDED_CLASSES).ok()) {
            rules.add_class(class);
        }
        for name in split_list(env::var(ENV_ELIDED_ELEMENTS).ok()) {
            rules.add_element(name);
        }
        for id in split_list(env::var(ENV_ELIDED_IDS).ok()) {
            rules.add_id(id);
        }
        rules
    }

    /// Whether `node` is an element excluded from addressing
    pub fn is_elided<T: DocumentTree>(&self, tree: &T, node: T::Node) -> bool {
        if tree.kind(node) != NodeKind::Element || self.is_empty() {
            return false;
        }

        if !self.elements.is_empty() {
            if let Some(name) = tree.local_name(node) {
                if self.elements.iter().any(|e| e == name) {
                    return true;
                }
            }
        }

        if !self.ids.is_empty() {
            if let Some(id) = tree.attribute(node, "id") {
                if self.ids.iter().any(|i| i == id) {
                    return true;
                }
            }
        }

        !self.classes.is_empty()
            && tree
                .class_list(node)
                .iter()
                .any(|class| self.classes.iter().any(|c| c == class))
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !value.is_empty() && !list.contains(&value) {
        list.push(value);
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
