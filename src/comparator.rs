//! CFI Comparison and Ordering
//!
//! Orders CFIs in reading order so annotations can be sorted and reading
//! progress compared. [`compare_reading_order`] looks only at positions: step
//! indices, offsets, and for ranges the start and then the end. The `Ord`
//! impl on [`Cfi`] refines it with the remaining fields (id and text
//! assertions) so it agrees with `==`.

use std::cmp::Ordering;

use crate::parser::parse;
use crate::types::*;

impl Ord for Cfi {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_reading_order(self, other)
            .then_with(|| self.package.cmp(&other.package))
            .then_with(|| self.content.cmp(&other.content))
    }
}

impl PartialOrd for Cfi {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TemporalOffset {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_f64(self.seconds, other.seconds)
    }
}

impl PartialOrd for TemporalOffset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpatialOffset {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_f64(self.y, other.y).then_with(|| compare_f64(self.x, other.x))
    }
}

impl PartialOrd for SpatialOffset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order on floats that treats `==` values as equal
fn compare_f64(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// Compare two sequences of CFI steps by index alone
fn compare_steps(a: &[CfiStep], b: &[CfiStep]) -> Ordering {
    // If all compared steps are equal, longer path is "greater"
    a.iter().map(|step| step.index).cmp(b.iter().map(|step| step.index))
}

/// Character offset a path points at; an odd final step without one means 0
fn effective_offset(path: &CfiPath) -> Option<usize> {
    match &path.character_offset {
        Some(offset) => Some(offset.offset),
        None => path
            .steps
            .last()
            .filter(|step| !step.is_element())
            .map(|_| 0),
    }
}

fn compare_positions(a: &CfiPath, b: &CfiPath) -> Ordering {
    compare_steps(&a.steps, &b.steps)
        .then_with(|| effective_offset(a).cmp(&effective_offset(b)))
        .then_with(|| a.temporal_offset.cmp(&b.temporal_offset))
        .then_with(|| a.spatial_offset.cmp(&b.spatial_offset))
}

/// Compare two CFIs by position in reading order, ignoring assertions
pub fn compare_reading_order(a: &Cfi, b: &Cfi) -> Ordering {
    compare_steps(&a.package.path.steps, &b.package.path.steps)
        .then_with(|| compare_positions(&a.start_path(), &b.start_path()))
        .then_with(|| compare_positions(&a.end_path(), &b.end_path()))
}

/// Determine if CFI `a` comes before CFI `b` in reading order
pub fn is_before(a: &Cfi, b: &Cfi) -> bool {
    compare_reading_order(a, b) == Ordering::Less
}

/// Determine if CFI `a` comes after CFI `b` in reading order
pub fn is_after(a: &Cfi, b: &Cfi) -> bool {
    compare_reading_order(a, b) == Ordering::Greater
}

/// Check if a CFI falls within a range
pub fn is_in_range(cfi: &Cfi, start: &Cfi, end: &Cfi) -> bool {
    compare_reading_order(cfi, start) != Ordering::Less
        && compare_reading_order(cfi, end) != Ordering::Greater
}

/// Compare two CFI strings in reading order
/// Returns None if either CFI is invalid
pub fn compare_cfi_strings(a: &str, b: &str) -> Option<Ordering> {
    let cfi_a = parse(a).ok()?;
    let cfi_b = parse(b).ok()?;
    Some(compare_reading_order(&cfi_a, &cfi_b))
}
