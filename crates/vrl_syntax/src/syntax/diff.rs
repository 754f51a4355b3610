//! # Tree Diffing
//!
//! Structural comparison of two green trees, reporting the byte ranges of the
//! new tree whose structure differs from the old one. Editors use the result to
//! re-highlight or re-analyze only what changed after a reparse.
//!
//! ## Algorithm
//!
//! Children of two matching nodes are aligned by their longest common prefix
//! and suffix of structurally equal elements (pointer equality is checked
//! first, so shared subtrees cost nothing). When the remaining middle sections
//! pair up one to one, same-kind node pairs are compared recursively;
//! otherwise the whole middle section of the new node is reported. A middle
//! section that is empty in the new tree (a pure deletion) is reported as an
//! empty range at the deletion point.

use crate::syntax::{GreenChild, GreenElement, GreenNode, TextRange, TextSize};

/// Ranges of `new` whose structure differs from `old`, sorted and coalesced.
///
/// Identical trees yield an empty list.
#[must_use]
pub fn changed_ranges(old: &GreenNode, new: &GreenNode) -> Vec<TextRange> {
    let mut ranges = Vec::new();
    if old.kind() == new.kind() {
        diff_nodes(old, new, TextSize::zero(), &mut ranges);
    } else {
        ranges.push(TextRange::at(TextSize::zero(), new.text_len()));
    }
    coalesce(ranges)
}

fn same(old: &GreenElement, new: &GreenElement) -> bool {
    old.ptr_eq(new) || old == new
}

fn diff_nodes(old: &GreenNode, new: &GreenNode, offset: TextSize, out: &mut Vec<TextRange>) {
    if std::ptr::eq(old, new) || old == new {
        return;
    }
    let old_children = old.children();
    let new_children = new.children();

    let prefix = old_children
        .iter()
        .zip(new_children)
        .take_while(|(o, n)| same(o.element(), n.element()))
        .count();
    let max_suffix = old_children.len().min(new_children.len()) - prefix;
    let suffix = old_children
        .iter()
        .rev()
        .zip(new_children.iter().rev())
        .take(max_suffix)
        .take_while(|(o, n)| same(o.element(), n.element()))
        .count();

    let old_middle = &old_children[prefix..old_children.len() - suffix];
    let new_middle = &new_children[prefix..new_children.len() - suffix];

    if old_middle.is_empty() && new_middle.is_empty() {
        // children agree; fields differ
        out.push(TextRange::at(offset, new.text_len()));
        return;
    }

    if old_middle.len() == new_middle.len() {
        for (o, n) in old_middle.iter().zip(new_middle) {
            diff_elements(o, n, offset, out);
        }
        return;
    }

    let start = new_middle
        .first()
        .map_or_else(|| boundary(new_children, prefix, new.text_len()), GreenChild::offset);
    let end = new_middle
        .last()
        .map_or(start, |child| child.offset() + child.element().text_len());
    out.push(TextRange::new(offset + start, offset + end));
}

fn diff_elements(old: &GreenChild, new: &GreenChild, parent_offset: TextSize, out: &mut Vec<TextRange>) {
    if same(old.element(), new.element()) {
        return;
    }
    let offset = parent_offset + new.offset();
    match (old.element(), new.element()) {
        (GreenElement::Node(o), GreenElement::Node(n)) if o.kind() == n.kind() => {
            diff_nodes(o, n, offset, out);
        }
        (_, element) => out.push(TextRange::at(offset, element.text_len())),
    }
}

/// Relative offset where the child at `index` starts, or the node end.
fn boundary(children: &[GreenChild], index: usize, len: TextSize) -> TextSize {
    children.get(index).map_or(len, GreenChild::offset)
}

fn coalesce(mut ranges: Vec<TextRange>) -> Vec<TextRange> {
    ranges.sort_unstable_by_key(|range| (range.start(), range.end()));
    let mut out: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match out.last_mut() {
            Some(last) if range.start() <= last.end() => *last = last.cover(range),
            _ => out.push(range),
        }
    }
    out
}
