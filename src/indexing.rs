//! Child indexing and character coalescing
//!
//! Every parent's children are laid out as an alternating sequence of slots:
//!
//! ```text
//! index:   1        2        3        4        5
//! slot:  [gap] <element> [gap] <element> [gap]
//! ```
//!
//! Addressable elements take even indices. Every gap before, between and after
//! them takes an odd index, whether or not anything occupies it. Text,
//! comments, processing instructions and elided elements all fall into gaps
//! and are coalesced: a character offset into a gap is the running sum of the
//! lengths of its non-elided members.
//!
//! Generation and interpretation both go through [`ChildSlots`], so the two
//! directions cannot disagree about an index or an offset.

use crate::config::ElisionRules;
use crate::tree::{DocumentTree, NodeKind};

/// One indexed position among a parent's children
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot<N> {
    /// An addressable element (even index)
    Element(N),
    /// A virtual text position (odd index) and the nodes coalesced into it
    Gap(Vec<N>),
}

/// The slot layout of one parent's children
#[derive(Debug, Clone)]
pub(crate) struct ChildSlots<N> {
    slots: Vec<Slot<N>>,
}

impl<N: Copy + PartialEq> ChildSlots<N> {
    pub fn build<T>(tree: &T, parent: N, elision: &ElisionRules) -> Self
    where
        T: DocumentTree<Node = N>,
    {
        let mut slots = vec![Slot::Gap(Vec::new())];

        for child in tree.children(parent) {
            if tree.is_element(child) && !elision.is_elided(tree, child) {
                slots.push(Slot::Element(child));
                slots.push(Slot::Gap(Vec::new()));
            } else if let Some(Slot::Gap(members)) = slots.last_mut() {
                members.push(child);
            }
        }

        Self { slots }
    }

    /// Highest valid index; always odd
    pub fn max_index(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Index of the slot holding `node`, whether as element or gap member
    pub fn index_of(&self, node: N) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| match slot {
                Slot::Element(element) => *element == node,
                Slot::Gap(members) => members.contains(&node),
            })
            .map(|pos| pos as u32 + 1)
    }

    pub fn get(&self, index: u32) -> Option<&Slot<N>> {
        if index == 0 {
            return None;
        }
        self.slots.get(index as usize - 1)
    }

    /// Members of the gap with the given odd index
    pub fn gap(&self, index: u32) -> Option<&[N]> {
        match self.get(index)? {
            Slot::Gap(members) => Some(members),
            Slot::Element(_) => None,
        }
    }
}

/// Length a gap member contributes to the coalesced offset
pub(crate) fn contributed_len<T: DocumentTree>(
    tree: &T,
    node: T::Node,
    elision: &ElisionRules,
) -> usize {
    if tree.kind(node).is_character_data() && !elision.is_elided(tree, node) {
        tree.text_len(node)
    } else {
        0
    }
}

/// Characters contributed by the gap members preceding `target`
pub(crate) fn offset_before<T: DocumentTree>(
    tree: &T,
    members: &[T::Node],
    target: T::Node,
    elision: &ElisionRules,
) -> usize {
    members
        .iter()
        .take_while(|member| **member != target)
        .map(|member| contributed_len(tree, *member, elision))
        .sum()
}

/// Total characters of a gap
pub(crate) fn gap_len<T: DocumentTree>(tree: &T, members: &[T::Node], elision: &ElisionRules) -> usize {
    members
        .iter()
        .map(|member| contributed_len(tree, *member, elision))
        .sum()
}

/// Map a coalesced offset back onto the gap member holding it
///
/// Returns the member and the offset local to it. When the offset sits on the
/// boundary between two members, a text node is preferred, and otherwise the
/// earlier member wins. Returns `None` for an empty gap or an offset past its
/// end.
pub(crate) fn locate_offset<T: DocumentTree>(
    tree: &T,
    members: &[T::Node],
    offset: usize,
    elision: &ElisionRules,
) -> Option<(T::Node, usize)> {
    let mut start = 0;
    let mut fallback = None;

    for member in members {
        if !tree.kind(*member).is_character_data() {
            continue;
        }
        let len = contributed_len(tree, *member, elision);
        let end = start + len;

        if offset >= start && offset <= end {
            let candidate = (*member, offset - start);
            if tree.kind(*member) == NodeKind::Text {
                return Some(candidate);
            }
            if fallback.is_none() {
                fallback = Some(candidate);
            }
        }
        if offset < start {
            break;
        }
        start = end;
    }

    fallback
}
