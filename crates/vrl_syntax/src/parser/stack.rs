//! GLR parse stacks.
//!
//! Every stack is a persistent linked list of frames shared through `Arc`:
//! forking a stack is a pointer copy, and stacks that diverge only near the
//! top share all frames below. Each frame caches its depth, the text offset
//! its elements end at, and a hash of the state sequence beneath it, so stacks
//! can be bucketed by state signature without walking them.

use crate::language::StateId;
use crate::syntax::GreenElement;
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Elements pushed with one state: the shifted token or reduced node first,
/// then the trivia and error nodes attached after it.
pub(crate) type Elements = SmallVec<[GreenElement; 2]>;

#[derive(Debug)]
pub(crate) struct Frame {
    state: StateId,
    elements: Elements,
    prev: Option<Arc<Frame>>,
    depth: u32,
    end: u32,
    signature: u64,
}

const SIGNATURE_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

const fn mix(parent: u64, state: StateId) -> u64 {
    (parent.rotate_left(5) ^ state.0 as u64).wrapping_mul(0x517c_c1b7_2722_0a95)
}

impl Frame {
    fn new(state: StateId, elements: Elements, prev: Option<Arc<Self>>) -> Arc<Self> {
        let (depth, start, parent) = prev
            .as_ref()
            .map_or((1, 0, SIGNATURE_SEED), |p| (p.depth + 1, p.end, p.signature));
        let end = elements
            .iter()
            .fold(start, |end, element| end.saturating_add(element.text_len().get()));
        Arc::new(Self {
            state,
            elements,
            prev,
            depth,
            end,
            signature: mix(parent, state),
        })
    }

    pub(crate) const fn state(&self) -> StateId {
        self.state
    }

    pub(crate) fn elements(&self) -> &[GreenElement] {
        &self.elements
    }

    pub(crate) const fn prev(&self) -> Option<&Arc<Self>> {
        self.prev.as_ref()
    }

    pub(crate) const fn depth(&self) -> usize {
        self.depth as usize
    }

    /// Text offset where this frame's elements end.
    pub(crate) const fn end(&self) -> usize {
        self.end as usize
    }
}

/// One GLR stack with its bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct ParseStack {
    head: Arc<Frame>,
    /// Recoveries made on the way to this stack
    pub errors: u32,
    /// Reductions performed on the way to this stack
    pub reductions: u32,
}

impl ParseStack {
    pub(crate) fn new(state: StateId) -> Self {
        Self {
            head: Frame::new(state, Elements::new(), None),
            errors: 0,
            reductions: 0,
        }
    }

    pub(crate) fn state(&self) -> StateId {
        self.head.state
    }

    pub(crate) fn depth(&self) -> usize {
        self.head.depth()
    }

    /// Length of the text covered by all frames.
    pub(crate) fn offset(&self) -> usize {
        self.head.end()
    }

    #[cfg(test)]
    pub(crate) const fn head(&self) -> &Arc<Frame> {
        &self.head
    }

    fn with_head(&self, head: Arc<Frame>) -> Self {
        Self {
            head,
            errors: self.errors,
            reductions: self.reductions,
        }
    }

    #[must_use]
    pub(crate) fn push(&self, state: StateId, elements: Elements) -> Self {
        self.with_head(Frame::new(state, elements, Some(self.head.clone())))
    }

    /// Appends `extras` to the top frame's elements.
    #[must_use]
    pub(crate) fn attach<I>(&self, extras: I) -> Self
    where
        I: IntoIterator<Item = GreenElement>,
    {
        let mut extras = extras.into_iter().peekable();
        if extras.peek().is_none() {
            return self.clone();
        }
        let mut elements = self.head.elements.clone();
        elements.extend(extras);
        self.with_head(Frame::new(self.head.state, elements, self.head.prev.clone()))
    }

    /// Removes the top `count` frames, returning them bottom to top.
    ///
    /// The bottom frame is never popped; `None` if fewer frames are above it.
    pub(crate) fn pop(&self, count: usize) -> Option<(Self, SmallVec<[Arc<Frame>; 4]>)> {
        if count >= self.depth() {
            return None;
        }
        let mut popped = SmallVec::<[Arc<Frame>; 4]>::with_capacity(count);
        let mut head = &self.head;
        for _ in 0..count {
            popped.push(head.clone());
            head = head.prev.as_ref()?;
        }
        popped.reverse();
        Some((self.with_head(head.clone()), popped))
    }

    /// Stack cut down to its lowest `depth` frames.
    pub(crate) fn truncate(&self, depth: usize) -> Option<Self> {
        Some(self.with_head(self.frame_at(depth)?.clone()))
    }

    /// Frames from the top down.
    pub(crate) fn frames(&self) -> impl Iterator<Item = &Arc<Frame>> {
        std::iter::successors(Some(&self.head), |frame| frame.prev.as_ref())
    }

    /// Frame at `depth`, counting the bottom frame as depth 1.
    pub(crate) fn frame_at(&self, depth: usize) -> Option<&Arc<Frame>> {
        if depth == 0 || depth > self.depth() {
            return None;
        }
        self.frames().nth(self.depth() - depth)
    }

    /// States from the bottom up.
    pub(crate) fn states(&self) -> Vec<StateId> {
        let mut states: Vec<_> = self.frames().map(|frame| frame.state).collect();
        states.reverse();
        states
    }

    /// All elements of all frames in document order.
    pub(crate) fn elements(&self) -> Vec<GreenElement> {
        let frames: Vec<_> = self.frames().collect();
        frames
            .iter()
            .rev()
            .flat_map(|frame| frame.elements.iter().cloned())
            .collect()
    }

    /// True when both stacks hold the same state sequence.
    pub(crate) fn same_states(&self, other: &Self) -> bool {
        same_states(&self.head, &other.head)
    }

    /// Copies the frames of `source` above `depth` onto this stack.
    ///
    /// The copied frames keep their elements, so every subtree they hold is
    /// shared with `source`.
    #[must_use]
    pub(crate) fn graft(&self, source: &Self, depth: usize) -> Self {
        let upper: SmallVec<[&Arc<Frame>; 8]> = source
            .frames()
            .take(source.depth().saturating_sub(depth))
            .collect();
        let mut head = self.head.clone();
        for frame in upper.into_iter().rev() {
            head = Frame::new(frame.state, frame.elements.clone(), Some(head));
        }
        self.with_head(head)
    }
}

fn same_states(mut a: &Arc<Frame>, mut b: &Arc<Frame>) -> bool {
    if a.depth != b.depth || a.signature != b.signature {
        return false;
    }
    loop {
        if Arc::ptr_eq(a, b) {
            return true;
        }
        if a.state != b.state {
            return false;
        }
        match (&a.prev, &b.prev) {
            (Some(pa), Some(pb)) => {
                a = pa;
                b = pb;
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Hash-map key comparing stacks by state signature.
#[derive(Debug, Clone)]
pub(crate) struct StackKey(Arc<Frame>);

impl StackKey {
    pub(crate) fn of(stack: &ParseStack) -> Self {
        Self(stack.head.clone())
    }
}

impl PartialEq for StackKey {
    fn eq(&self, other: &Self) -> bool {
        same_states(&self.0, &other.0)
    }
}

impl Eq for StackKey {}

impl Hash for StackKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.signature);
        state.write_u32(self.0.depth);
    }
}
