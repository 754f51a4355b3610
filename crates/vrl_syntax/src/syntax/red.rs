use crate::language::Language;
use crate::syntax::{FieldId, GreenElement, GreenNode, GreenToken, SyntaxKind, TextRange, TextSize};
use std::fmt;
use std::sync::Arc;

/// Positioned view over a [`GreenNode`] with a parent pointer.
///
/// Red nodes are created on demand while walking and are cheap to clone. A
/// node keeps its ancestors alive, so `parent()` is always available and the
/// absolute range is known without re-walking from the root.
#[derive(Clone)]
pub struct SyntaxNode {
    data: Arc<NodeData>,
}

struct NodeData {
    green: Arc<GreenNode>,
    parent: Option<SyntaxNode>,
    index: u32,
    offset: TextSize,
    language: Language,
}

#[derive(Clone)]
pub struct SyntaxToken {
    green: Arc<GreenToken>,
    parent: SyntaxNode,
    index: u32,
    offset: TextSize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyntaxElement {
    Node(SyntaxNode),
    Token(SyntaxToken),
}

impl SyntaxNode {
    #[must_use]
    pub fn new_root(green: Arc<GreenNode>, language: Language) -> Self {
        Self {
            data: Arc::new(NodeData {
                green,
                parent: None,
                index: 0,
                offset: TextSize::zero(),
                language,
            }),
        }
    }

    fn new_child(&self, green: Arc<GreenNode>, index: u32, offset: TextSize) -> Self {
        Self {
            data: Arc::new(NodeData {
                green,
                parent: Some(self.clone()),
                index,
                offset,
                language: self.data.language.clone(),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.data.green.kind()
    }

    #[must_use]
    pub fn kind_name(&self) -> &str {
        self.data.language.kind_name(self.kind())
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        self.data.language.is_named(self.kind())
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind().is_error()
    }

    #[must_use]
    pub fn has_error(&self) -> bool {
        self.data.green.has_error()
    }

    #[must_use]
    pub fn green(&self) -> &Arc<GreenNode> {
        &self.data.green
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.data.language
    }

    #[inline]
    #[must_use]
    pub fn range(&self) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.text_len())
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.data.green.text()
    }

    /// Position of this node among its parent's children.
    #[must_use]
    pub fn index(&self) -> usize {
        self.data.index as usize
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.data.parent.clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.data.green.child_count()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<SyntaxElement> {
        let child = self.data.green.children().get(index)?;
        Some(self.make_element(
            child.element(),
            index,
            self.data.offset + child.offset(),
        ))
    }

    fn make_element(&self, green: &GreenElement, index: usize, offset: TextSize) -> SyntaxElement {
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        match green {
            GreenElement::Node(node) => SyntaxElement::Node(self.new_child(node.clone(), index, offset)),
            GreenElement::Token(token) => SyntaxElement::Token(SyntaxToken {
                green: token.clone(),
                parent: self.clone(),
                index,
                offset,
            }),
        }
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = SyntaxElement> + '_ {
        (0..self.child_count()).filter_map(|index| self.child(index))
    }

    pub fn child_nodes(&self) -> impl DoubleEndedIterator<Item = Self> + '_ {
        self.children().filter_map(SyntaxElement::into_node)
    }

    /// Child nodes and tokens whose kinds are named in the language.
    pub fn named_children(&self) -> impl Iterator<Item = SyntaxElement> + '_ {
        self.children().filter(SyntaxElement::is_named)
    }

    #[must_use]
    pub fn first_child(&self) -> Option<SyntaxElement> {
        self.child(0)
    }

    #[must_use]
    pub fn last_child(&self) -> Option<SyntaxElement> {
        self.child(self.child_count().checked_sub(1)?)
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<SyntaxElement> {
        self.parent()?.child(self.index() + 1)
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<SyntaxElement> {
        self.parent()?.child(self.index().checked_sub(1)?)
    }

    /// First child labelled with the field `name`.
    #[must_use]
    pub fn child_by_field(&self, name: &str) -> Option<SyntaxElement> {
        let field = self.data.language.field_by_name(name)?;
        self.child_by_field_id(field)
    }

    #[must_use]
    pub fn child_by_field_id(&self, field: FieldId) -> Option<SyntaxElement> {
        let entry = self
            .data
            .green
            .fields()
            .iter()
            .find(|entry| entry.field == field)?;
        self.child(entry.index as usize)
    }

    /// Field name carried by the child at `index`.
    #[must_use]
    pub fn field_name_of(&self, index: usize) -> Option<&str> {
        let field = self.data.green.field_of(index)?;
        self.data.language.field_name(field)
    }

    /// This node followed by its ancestors up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = Self> {
        std::iter::successors(Some(self.clone()), Self::parent)
    }

    /// Pre-order walk over this node and every descendant node.
    pub fn descendants(&self) -> impl Iterator<Item = Self> {
        self.preorder().filter_map(SyntaxElement::into_node)
    }

    /// Pre-order walk over this node and every descendant node and token.
    #[must_use]
    pub fn preorder(&self) -> Preorder {
        Preorder {
            stack: vec![SyntaxElement::Node(self.clone())],
        }
    }

    /// Deepest element whose range contains `range`.
    #[must_use]
    pub fn covering_element(&self, range: TextRange) -> SyntaxElement {
        let mut node = self.clone();
        loop {
            let relative = range.start() - node.data.offset;
            let Some(index) = node.data.green.child_index_at(relative) else {
                return SyntaxElement::Node(node);
            };
            let Some(child) = node.child(index) else {
                return SyntaxElement::Node(node);
            };
            if !child.range().contains_range(range) {
                return SyntaxElement::Node(node);
            }
            match child {
                SyntaxElement::Node(next) => node = next,
                token @ SyntaxElement::Token(_) => return token,
            }
        }
    }

    /// Deepest node containing `offset`.
    #[must_use]
    pub fn node_at_offset(&self, offset: TextSize) -> Option<Self> {
        if !self.range().contains_inclusive(offset) {
            return None;
        }
        let mut node = self.clone();
        while let Some(index) = node.data.green.child_index_at(offset - node.data.offset) {
            match node.child(index) {
                Some(SyntaxElement::Node(child)) if child.range().contains_inclusive(offset) => {
                    node = child;
                }
                _ => break,
            }
        }
        Some(node)
    }

    /// Token containing `offset`; an offset on a boundary yields the token starting there.
    #[must_use]
    pub fn token_at_offset(&self, offset: TextSize) -> Option<SyntaxToken> {
        let mut node = self.node_at_offset(offset)?;
        loop {
            let index = node.data.green.child_index_at(offset - node.data.offset)?;
            match node.child(index)? {
                SyntaxElement::Node(child) => node = child,
                SyntaxElement::Token(token) => return Some(token),
            }
        }
    }

    /// Cursor positioned on this node.
    #[must_use]
    pub fn walk(&self) -> TreeCursor {
        TreeCursor {
            current: SyntaxElement::Node(self.clone()),
            depth: 0,
        }
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data.green, &other.data.green) && self.data.offset == other.data.offset
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind_name(), self.range())
    }
}

impl fmt::Display for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl SyntaxToken {
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        self.green.kind()
    }

    #[must_use]
    pub fn kind_name(&self) -> &str {
        self.parent.language().kind_name(self.kind())
    }

    #[must_use]
    pub fn text(&self) -> &str {
        self.green.text()
    }

    #[must_use]
    pub fn range(&self) -> TextRange {
        TextRange::at(self.offset, self.green.text_len())
    }

    #[must_use]
    pub fn green(&self) -> &Arc<GreenToken> {
        &self.green
    }

    #[must_use]
    pub fn parent(&self) -> SyntaxNode {
        self.parent.clone()
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[must_use]
    pub fn is_extra(&self) -> bool {
        self.parent.language().is_extra(self.kind())
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<SyntaxElement> {
        self.parent.child(self.index() + 1)
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<SyntaxElement> {
        self.parent.child(self.index().checked_sub(1)?)
    }
}

impl PartialEq for SyntaxToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.green, &other.green) && self.offset == other.offset
    }
}

impl Eq for SyntaxToken {}

impl fmt::Debug for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {:?}", self.kind_name(), self.range(), self.text())
    }
}

impl SyntaxElement {
    #[must_use]
    pub fn kind(&self) -> SyntaxKind {
        match self {
            Self::Node(node) => node.kind(),
            Self::Token(token) => token.kind(),
        }
    }

    #[must_use]
    pub fn range(&self) -> TextRange {
        match self {
            Self::Node(node) => node.range(),
            Self::Token(token) => token.range(),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            Self::Node(node) => node.kind_name(),
            Self::Token(token) => token.kind_name(),
        }
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        match self {
            Self::Node(node) => node.is_named(),
            Self::Token(token) => token.parent.language().is_named(token.kind()),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<SyntaxNode> {
        match self {
            Self::Node(node) => node.parent(),
            Self::Token(token) => Some(token.parent()),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::Node(node) => node.index(),
            Self::Token(token) => token.index(),
        }
    }

    #[must_use]
    pub fn next_sibling(&self) -> Option<Self> {
        match self {
            Self::Node(node) => node.next_sibling(),
            Self::Token(token) => token.next_sibling(),
        }
    }

    #[must_use]
    pub fn prev_sibling(&self) -> Option<Self> {
        match self {
            Self::Node(node) => node.prev_sibling(),
            Self::Token(token) => token.prev_sibling(),
        }
    }

    #[must_use]
    pub fn into_node(self) -> Option<SyntaxNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    #[must_use]
    pub fn into_token(self) -> Option<SyntaxToken> {
        match self {
            Self::Node(_) => None,
            Self::Token(token) => Some(token),
        }
    }

    #[must_use]
    pub const fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Token(_) => None,
        }
    }

    #[must_use]
    pub const fn as_token(&self) -> Option<&SyntaxToken> {
        match self {
            Self::Node(_) => None,
            Self::Token(token) => Some(token),
        }
    }
}

/// Pre-order iterator produced by [`SyntaxNode::preorder`].
pub struct Preorder {
    stack: Vec<SyntaxElement>,
}

impl Iterator for Preorder {
    type Item = SyntaxElement;

    fn next(&mut self) -> Option<SyntaxElement> {
        let element = self.stack.pop()?;
        if let SyntaxElement::Node(node) = &element {
            self.stack.extend(node.children().rev());
        }
        Some(element)
    }
}

/// Stateful walker in the style of an editor tree cursor.
#[derive(Debug, Clone)]
pub struct TreeCursor {
    current: SyntaxElement,
    depth: usize,
}

impl TreeCursor {
    #[must_use]
    pub const fn element(&self) -> &SyntaxElement {
        &self.current
    }

    /// Current node, or `None` when the cursor rests on a token.
    #[must_use]
    pub const fn node(&self) -> Option<&SyntaxNode> {
        self.current.as_node()
    }

    /// Depth relative to the node the cursor started on.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub fn goto_first_child(&mut self) -> bool {
        let Some(child) = self.current.as_node().and_then(SyntaxNode::first_child) else {
            return false;
        };
        self.current = child;
        self.depth += 1;
        true
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        match self.current.next_sibling() {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    pub fn goto_parent(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        match self.current.parent() {
            Some(parent) => {
                self.current = SyntaxElement::Node(parent);
                self.depth -= 1;
                true
            }
            None => false,
        }
    }
}
