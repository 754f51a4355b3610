//! # Checkpoints and reuse
//!
//! A checkpoint is taken after every shift that leaves exactly one stack
//! alive. It records where the lexer stands, how far lexing has looked
//! ahead so far, and the stack itself. Because stacks are persistent, a
//! checkpoint costs one `Arc` clone.
//!
//! A reparse uses the prior tree's checkpoints in three ways:
//!
//! - **Prefix**: the parse resumes from the last checkpoint whose cumulative
//!   horizon lies at or before the edit start. Nothing lexed up to that
//!   checkpoint could have observed the edited bytes.
//! - **Suffix**: past the edit, a checkpoint of the new parse whose offset
//!   maps onto an old checkpoint with the same state signature is in sync
//!   with the old parse. The old stacks recorded after that point are
//!   grafted on for as long as they only built on top of what the two
//!   parses share.
//! - **Nodes**: a reduction whose text lies wholly outside the edit adopts the
//!   structurally equal node of the prior tree at the same (shifted) place.

use super::stack::{Frame, ParseStack};
use crate::syntax::{GreenElement, GreenNode, Point, TextSize};
use std::sync::Arc;

/// Parser snapshot after a single-stack shift.
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    /// End of the last shifted token
    pub offset: usize,
    pub point: Point,
    /// Largest lexeme horizon seen up to this checkpoint
    pub horizon: usize,
    pub stack: ParseStack,
}

/// Index of the checkpoint a reparse of an edit at `start` resumes from.
pub(crate) fn resume_index(checkpoints: &[Checkpoint], start: usize) -> Option<usize> {
    checkpoints
        .partition_point(|checkpoint| checkpoint.horizon <= start)
        .checked_sub(1)
}

/// Byte ranges the edit replaced, in old and new coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EditSpan {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl EditSpan {
    /// Old offset for the new-text range `[start, start + len)`, when that
    /// range lies entirely before or entirely after the edit.
    fn old_position(&self, start: usize, len: usize) -> Option<usize> {
        if start + len <= self.start {
            Some(start)
        } else if start >= self.new_end {
            Some(start - self.new_end + self.old_end)
        } else {
            None
        }
    }

    fn to_old(&self, offset: usize) -> Option<usize> {
        (offset >= self.new_end).then(|| offset - self.new_end + self.old_end)
    }

    fn to_new(&self, offset: usize) -> usize {
        offset - self.old_end + self.new_end
    }
}

/// What a reparse reused, reported through the reparse statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ReuseStats {
    pub resume_offset: usize,
    pub suffix_bytes: usize,
    pub jumps: usize,
    pub adopted_nodes: usize,
}

/// Old checkpoints grafted onto the new parse in one jump, in order.
#[derive(Debug)]
pub(crate) struct Jump {
    pub checkpoints: Vec<Checkpoint>,
}

/// Prior-tree data consulted while a reparse runs.
#[derive(Debug)]
pub(crate) struct Reuse {
    old_root: Arc<GreenNode>,
    old: Arc<[Checkpoint]>,
    span: EditSpan,
    pub stats: ReuseStats,
}

impl Reuse {
    pub(crate) fn new(old_root: Arc<GreenNode>, old: Arc<[Checkpoint]>, span: EditSpan) -> Self {
        Self {
            old_root,
            old,
            span,
            stats: ReuseStats::default(),
        }
    }

    /// The prior tree's node equal to `node` at new offset `start`, or `node`.
    pub(crate) fn adopt(&mut self, node: Arc<GreenNode>, start: usize) -> Arc<GreenNode> {
        let len = node.text_len().to_usize();
        if len == 0 {
            return node;
        }
        let Some(old_start) = self.span.old_position(start, len) else {
            return node;
        };
        match find_node(&self.old_root, old_start, &node) {
            Some(old) => {
                self.stats.adopted_nodes += 1;
                old
            }
            None => node,
        }
    }

    /// Try to bring the parse back in sync with the prior one after a shift
    /// that ended at `offset` with `stack` as the only stack.
    ///
    /// Returns the old checkpoints translated onto the new parse, up to the
    /// farthest one that can be reused as is.
    pub(crate) fn sync(
        &mut self,
        stack: &ParseStack,
        offset: usize,
        point: Point,
        horizon: usize,
        text: &str,
    ) -> Option<Jump> {
        let old_offset = self.span.to_old(offset)?;
        let j = self
            .old
            .binary_search_by_key(&old_offset, |checkpoint| checkpoint.offset)
            .ok()?;
        let synced = &self.old[j].stack;
        if !synced.same_states(stack) {
            return None;
        }
        let divergence = divergence(stack, synced);

        let mut checkpoints = Vec::new();
        let mut point = point;
        let mut position = offset;
        let mut horizon = horizon;
        for later in self.old.iter().skip(j + 1) {
            let Some(grafted) = translate(stack, synced, &later.stack, divergence) else {
                break;
            };
            let next = self.span.to_new(later.offset);
            point = point.advance(text.get(position..next).unwrap_or_default());
            position = next;
            horizon = horizon.max(self.span.to_new(later.horizon));
            checkpoints.push(Checkpoint {
                offset: next,
                point,
                horizon,
                stack: grafted,
            });
        }
        if checkpoints.is_empty() {
            return None;
        }
        self.stats.jumps += 1;
        self.stats.suffix_bytes += position - offset;
        log::debug!(
            "in sync with prior parse at {offset}; reusing {} checkpoints up to {position}",
            checkpoints.len()
        );
        Some(Jump { checkpoints })
    }
}

/// Depth of the highest frame whose elements differ between `new` and
/// `old` (two stacks with the same states), or 0 when none differ.
fn divergence(new: &ParseStack, old: &ParseStack) -> usize {
    new.frames()
        .zip(old.frames())
        .find(|(n, o)| !same_elements(n.elements(), o.elements()))
        .map_or(0, |(n, _)| n.depth())
}

fn same_elements(a: &[GreenElement], b: &[GreenElement]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.ptr_eq(b) || a == b)
}

/// `later` (an old stack recorded after `synced`) rebuilt on top of `new`.
///
/// Frames of `later` that are shared with `synced` stand for the matching
/// frames of `new`. The frames above them were built from frames of `synced`
/// above the shared depth; they can be reused only if those frames agree
/// with `new`, that is if they all lie above `divergence`.
fn translate(
    new: &ParseStack,
    synced: &ParseStack,
    later: &ParseStack,
    divergence: usize,
) -> Option<ParseStack> {
    let (shared, extended) = junction(synced, later);
    let mut grafted = if shared >= divergence {
        if shared == 0 {
            later.clone()
        } else {
            new.truncate(shared)?.graft(later, shared)
        }
    } else if shared + 1 == divergence && extended {
        let base = synced.frame_at(divergence)?.elements().len();
        let extras = later.frame_at(divergence)?.elements().get(base..)?;
        new.truncate(divergence)?
            .attach(extras.iter().cloned())
            .graft(later, divergence)
    } else {
        return None;
    };
    grafted.errors = new.errors + later.errors.saturating_sub(synced.errors);
    grafted.reductions = new.reductions + later.reductions.saturating_sub(synced.reductions);
    Some(grafted)
}

/// Deepest depth at which `later` still holds the very frame of `synced`, and
/// whether the frame just above it only appended elements to the one of
/// `synced` at that depth.
fn junction(synced: &ParseStack, later: &ParseStack) -> (usize, bool) {
    let top = synced.depth().min(later.depth());
    let mut a = synced.frames().skip(synced.depth() - top);
    let mut b = later.frames().skip(later.depth() - top);
    let mut above: Option<(&Arc<Frame>, &Arc<Frame>)> = None;
    while let (Some(s), Some(l)) = (a.next(), b.next()) {
        if Arc::ptr_eq(s, l) {
            let extended = above.is_some_and(|(s, l)| appended(s, l));
            return (s.depth(), extended);
        }
        above = Some((s, l));
    }
    let extended = above.is_some_and(|(s, l)| appended(s, l));
    (0, extended)
}

fn appended(original: &Frame, extended: &Frame) -> bool {
    let same_prev = match (original.prev(), extended.prev()) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    };
    same_prev
        && original.state() == extended.state()
        && extended.elements().len() >= original.elements().len()
        && original
            .elements()
            .iter()
            .zip(extended.elements())
            .all(|(a, b)| a.ptr_eq(b))
}

/// Node of kind `like.kind()` starting at `offset` in `root` with the same
/// length and structure as `like`.
fn find_node(root: &Arc<GreenNode>, offset: usize, like: &GreenNode) -> Option<Arc<GreenNode>> {
    let target = TextSize::from_usize(offset);
    let mut node = root;
    let mut base = TextSize::zero();
    loop {
        let relative = target.checked_sub(base)?;
        let index = node.child_index_at(relative)?;
        let child = node.children().get(index)?;
        let GreenElement::Node(inner) = child.element() else {
            return None;
        };
        base += child.offset();
        if base == target
            && inner.kind() == like.kind()
            && inner.text_len() == like.text_len()
            && **inner == *like
        {
            return Some(inner.clone());
        }
        if base > target {
            return None;
        }
        node = inner;
    }
}
