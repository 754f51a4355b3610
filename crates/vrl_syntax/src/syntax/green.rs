use crate::syntax::{FieldId, SyntaxKind, TextSize};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::Arc;

/// Immutable, position-independent tree node.
///
/// Green nodes know their kind, their total text length and their children,
/// but not where they sit in a document. That makes them shareable between
/// tree versions: a reparse that leaves a subtree untouched hands out the very
/// same `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GreenNode {
    kind: SyntaxKind,
    text_len: TextSize,
    error_count: u32,
    children: GreenChildren,
    fields: SmallVec<[FieldEntry; 2]>,
}

/// Field assignment: child at `index` carries `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldEntry {
    pub index: u32,
    pub field: FieldId,
}

/// A child paired with its offset relative to the parent start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GreenChild {
    offset: TextSize,
    element: GreenElement,
}

impl GreenChild {
    #[must_use]
    pub const fn offset(&self) -> TextSize {
        self.offset
    }

    #[must_use]
    pub const fn element(&self) -> &GreenElement {
        &self.element
    }
}

/// Children storage specialized by size
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GreenChildren {
    Empty,
    One(GreenChild),
    Inline(SmallVec<[GreenChild; INLINE_CHILDREN_THRESHOLD]>),
    Many(Arc<[GreenChild]>),
}

const INLINE_CHILDREN_THRESHOLD: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GreenElement {
    Node(Arc<GreenNode>),
    Token(Arc<GreenToken>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GreenToken {
    kind: SyntaxKind,
    text: CompactString,
}

impl GreenNode {
    #[must_use]
    pub fn new(kind: SyntaxKind, children: Vec<GreenElement>) -> Arc<Self> {
        Self::with_fields(kind, children, SmallVec::new())
    }

    /// Create a node whose children carry field names.
    ///
    /// Field entries pointing past the last child are dropped.
    #[must_use]
    pub fn with_fields(
        kind: SyntaxKind,
        children: Vec<GreenElement>,
        mut fields: SmallVec<[FieldEntry; 2]>,
    ) -> Arc<Self> {
        let mut offset = TextSize::zero();
        let mut error_count = u32::from(kind.is_error());
        let mut positioned = Vec::with_capacity(children.len());
        for element in children {
            let len = element.text_len();
            error_count = error_count.saturating_add(element.error_count());
            positioned.push(GreenChild { offset, element });
            offset += len;
        }
        let count = positioned.len();
        fields.retain(|entry| (entry.index as usize) < count);
        fields.sort_by_key(|entry| (entry.index, entry.field));

        let children = match count {
            0 => GreenChildren::Empty,
            1 => positioned
                .pop()
                .map_or(GreenChildren::Empty, GreenChildren::One),
            2..=INLINE_CHILDREN_THRESHOLD => GreenChildren::Inline(positioned.into_iter().collect()),
            _ => GreenChildren::Many(Arc::from(positioned)),
        };

        Arc::new(Self {
            kind,
            text_len: offset,
            error_count,
            children,
            fields,
        })
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> SyntaxKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn text_len(&self) -> TextSize {
        self.text_len
    }

    /// Number of `ERROR` nodes in this subtree, including this node.
    #[inline]
    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    /// True when this subtree required error recovery.
    #[inline]
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error_count > 0
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[GreenChild] {
        match &self.children {
            GreenChildren::Empty => &[],
            GreenChildren::One(child) => std::slice::from_ref(child),
            GreenChildren::Inline(children) => children,
            GreenChildren::Many(children) => children,
        }
    }

    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &GreenElement> + ExactSizeIterator {
        self.children().iter().map(GreenChild::element)
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.children, GreenChildren::Empty)
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    /// Field carried by the child at `index`, if any.
    #[must_use]
    pub fn field_of(&self, index: usize) -> Option<FieldId> {
        self.fields
            .iter()
            .find(|entry| entry.index as usize == index)
            .map(|entry| entry.field)
    }

    /// Index of the child containing `offset` (relative to this node).
    ///
    /// Offsets on a boundary resolve to the child starting there. Zero-length
    /// children are skipped unless nothing else starts at `offset`.
    #[must_use]
    pub fn child_index_at(&self, offset: TextSize) -> Option<usize> {
        let children = self.children();
        if children.is_empty() || offset > self.text_len {
            return None;
        }
        let upper = children.partition_point(|child| child.offset <= offset);
        let mut index = upper.checked_sub(1)?;
        while index > 0 && children[index].element.text_len() == TextSize::zero() {
            if children[index - 1].offset < children[index].offset {
                break;
            }
            index -= 1;
        }
        Some(index)
    }

    /// Concatenated source text of the subtree.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.text_len.to_usize());
        self.write_text(&mut out);
        out
    }

    pub(crate) fn write_text(&self, out: &mut String) {
        for element in self.elements() {
            match element {
                GreenElement::Node(node) => node.write_text(out),
                GreenElement::Token(token) => out.push_str(token.text()),
            }
        }
    }

    /// Number of nodes and tokens in the subtree.
    #[must_use]
    pub fn element_count(&self) -> usize {
        1 + self
            .elements()
            .map(|element| match element {
                GreenElement::Node(node) => node.element_count(),
                GreenElement::Token(_) => 1,
            })
            .sum::<usize>()
    }
}

impl GreenToken {
    #[must_use]
    pub fn new(kind: SyntaxKind, text: impl Into<CompactString>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            text: text.into(),
        })
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> SyntaxKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn text_len(&self) -> TextSize {
        TextSize::of(&self.text)
    }
}

impl GreenElement {
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            Self::Node(n) => n.kind(),
            Self::Token(t) => t.kind(),
        }
    }

    #[must_use]
    pub fn text_len(&self) -> TextSize {
        match self {
            Self::Node(n) => n.text_len(),
            Self::Token(t) => t.text_len(),
        }
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        match self {
            Self::Node(n) => n.error_count(),
            Self::Token(_) => 0,
        }
    }

    #[must_use]
    pub const fn as_node(&self) -> Option<&Arc<GreenNode>> {
        match self {
            Self::Node(n) => Some(n),
            Self::Token(_) => None,
        }
    }

    #[must_use]
    pub const fn as_token(&self) -> Option<&Arc<GreenToken>> {
        match self {
            Self::Node(_) => None,
            Self::Token(t) => Some(t),
        }
    }

    /// Pointer identity, used to observe structural sharing.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => Arc::ptr_eq(a, b),
            (Self::Token(a), Self::Token(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Arc<GreenNode>> for GreenElement {
    fn from(node: Arc<GreenNode>) -> Self {
        Self::Node(node)
    }
}

impl From<Arc<GreenToken>> for GreenElement {
    fn from(token: Arc<GreenToken>) -> Self {
        Self::Token(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: SyntaxKind = SyntaxKind(10);
    const EXPR: SyntaxKind = SyntaxKind(11);
    const IDENT: SyntaxKind = SyntaxKind(2);
    const PLUS: SyntaxKind = SyntaxKind(3);
    const NUMBER: SyntaxKind = SyntaxKind(4);

    fn token(kind: SyntaxKind, text: &str) -> GreenElement {
        GreenToken::new(kind, text).into()
    }

    #[test]
    fn test_green_node_empty() {
        let node = GreenNode::new(ROOT, Vec::new());
        assert_eq!(node.kind(), ROOT);
        assert_eq!(node.text_len(), TextSize::zero());
        assert!(node.is_leaf());
        assert!(!node.has_error());
    }

    #[test]
    fn test_green_node_offsets() {
        let node = GreenNode::new(
            EXPR,
            vec![token(IDENT, "x"), token(PLUS, " + "), token(NUMBER, "42")],
        );
        let offsets: Vec<u32> = node.children().iter().map(|c| c.offset().get()).collect();
        assert_eq!(offsets, vec![0, 1, 4]);
        assert_eq!(node.text_len(), TextSize::new(6));
        assert_eq!(node.text(), "x + 42");
    }

    #[test]
    fn test_green_node_spills_to_shared_storage() {
        let children: Vec<_> = (0..20).map(|_| token(IDENT, "ab")).collect();
        let node = GreenNode::new(ROOT, children);
        assert_eq!(node.child_count(), 20);
        assert_eq!(node.children()[19].offset(), TextSize::new(38));
    }

    #[test]
    fn test_child_index_at() {
        let node = GreenNode::new(
            EXPR,
            vec![token(IDENT, "ab"), token(PLUS, "+"), token(NUMBER, "7")],
        );
        assert_eq!(node.child_index_at(TextSize::new(0)), Some(0));
        assert_eq!(node.child_index_at(TextSize::new(1)), Some(0));
        assert_eq!(node.child_index_at(TextSize::new(2)), Some(1));
        assert_eq!(node.child_index_at(TextSize::new(3)), Some(2));
        assert_eq!(node.child_index_at(TextSize::new(4)), Some(2));
        assert_eq!(node.child_index_at(TextSize::new(5)), None);
    }

    #[test]
    fn test_error_count_propagates() {
        let error = GreenNode::new(SyntaxKind::ERROR, vec![token(IDENT, "?")]);
        let expr = GreenNode::new(EXPR, vec![token(IDENT, "a"), error.into()]);
        let root = GreenNode::new(ROOT, vec![expr.clone().into(), expr.into()]);
        assert_eq!(root.error_count(), 2);
        assert!(root.has_error());
    }

    #[test]
    fn test_fields_are_sorted_and_bounded() {
        let fields = smallvec::smallvec![
            FieldEntry { index: 2, field: FieldId(1) },
            FieldEntry { index: 0, field: FieldId(0) },
            FieldEntry { index: 9, field: FieldId(2) },
        ];
        let node = GreenNode::with_fields(
            EXPR,
            vec![token(IDENT, "a"), token(PLUS, "+"), token(IDENT, "b")],
            fields,
        );
        assert_eq!(node.fields().len(), 2);
        assert_eq!(node.field_of(0), Some(FieldId(0)));
        assert_eq!(node.field_of(1), None);
        assert_eq!(node.field_of(2), Some(FieldId(1)));
    }

    #[test]
    fn test_structural_equality_ignores_identity() {
        let a = GreenNode::new(EXPR, vec![token(IDENT, "a")]);
        let b = GreenNode::new(EXPR, vec![token(IDENT, "a")]);
        assert_eq!(a, b);
        assert!(!GreenElement::Node(a.clone()).ptr_eq(&GreenElement::Node(b)));
        assert!(GreenElement::Node(a.clone()).ptr_eq(&GreenElement::Node(a)));
    }
}
