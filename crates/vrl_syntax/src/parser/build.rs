use super::stack::Frame;
use crate::language::{Language, Production};
use crate::lexer::Token;
use crate::syntax::{FieldEntry, FieldId, GreenElement, GreenNode, GreenToken, SyntaxKind};
use smallvec::SmallVec;
use std::sync::Arc;

pub(crate) fn token_element(token: &Token, source: &str) -> GreenElement {
    GreenToken::new(token.kind, token.text(source)).into()
}

/// Collects the children of a visible node, splicing in the children of
/// hidden nodes.
///
/// Hidden nodes may nest arbitrarily deep (a left-recursive hidden list nests
/// once per item), so flattening uses an explicit work list.
pub(crate) struct NodeBuilder<'l> {
    language: &'l Language,
    children: Vec<GreenElement>,
    fields: SmallVec<[FieldEntry; 2]>,
    work: Vec<(GreenElement, Option<FieldId>)>,
}

impl<'l> NodeBuilder<'l> {
    pub(crate) fn new(language: &'l Language) -> Self {
        Self {
            language,
            children: Vec::new(),
            fields: SmallVec::new(),
            work: Vec::new(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    fn is_hidden(&self, element: &GreenElement) -> bool {
        element
            .as_node()
            .is_some_and(|node| !self.language.is_visible(node.kind()))
    }

    /// Extras and error nodes never inherit a field from a hidden parent.
    fn takes_field(&self, element: &GreenElement) -> bool {
        let kind = element.kind();
        !kind.is_error() && !self.language.is_extra(kind)
    }

    pub(crate) fn push(&mut self, element: GreenElement, field: Option<FieldId>) {
        self.work.push((element, field));
        while let Some((element, field)) = self.work.pop() {
            if self.is_hidden(&element) {
                let Some(hidden) = element.as_node() else {
                    continue;
                };
                for (index, child) in hidden.elements().enumerate().rev() {
                    let inherited = field.filter(|_| self.takes_field(child));
                    self.work
                        .push((child.clone(), hidden.field_of(index).or(inherited)));
                }
                continue;
            }
            if let Some(field) = field {
                self.fields.push(FieldEntry {
                    index: u32::try_from(self.children.len()).unwrap_or(u32::MAX),
                    field,
                });
            }
            self.children.push(element);
        }
    }

    pub(crate) fn extend<'a, I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = &'a GreenElement>,
    {
        for element in elements {
            self.push(element.clone(), None);
        }
    }

    /// Adds the children of a visible node in place of the node itself.
    pub(crate) fn splice(&mut self, node: &GreenNode) {
        for (index, child) in node.elements().enumerate() {
            self.push(child.clone(), node.field_of(index));
        }
    }

    pub(crate) fn finish(self, kind: SyntaxKind) -> Arc<GreenNode> {
        GreenNode::with_fields(kind, self.children, self.fields)
    }
}

/// Node for reducing `production` over `popped` frames (bottom to top).
///
/// The primary element of frame `i` receives the field the production
/// assigns to position `i`. A hidden left-hand side keeps its hidden
/// children nested; they are flattened once a visible ancestor is built.
pub(crate) fn reduce_node(
    language: &Language,
    production: &Production,
    popped: &[Arc<Frame>],
) -> Arc<GreenNode> {
    if language.is_visible(production.lhs) {
        let mut builder = NodeBuilder::new(language);
        for (position, frame) in popped.iter().enumerate() {
            let mut elements = frame.elements().iter();
            if let Some(primary) = elements.next() {
                builder.push(primary.clone(), production.field_at(position));
            }
            builder.extend(elements);
        }
        return builder.finish(production.lhs);
    }

    let mut children = Vec::new();
    let mut fields = SmallVec::new();
    for (position, frame) in popped.iter().enumerate() {
        if let Some(field) = production.field_at(position) {
            fields.push(FieldEntry {
                index: u32::try_from(children.len()).unwrap_or(u32::MAX),
                field,
            });
        }
        children.extend(frame.elements().iter().cloned());
    }
    GreenNode::with_fields(production.lhs, children, fields)
}

/// Root node for an accepted parse: the start symbol node on top of `stack`
/// with every other stack element (leading trivia, errors) spliced around it.
pub(crate) fn root_node<'f, I>(language: &Language, frames: I) -> Arc<GreenNode>
where
    I: IntoIterator<Item = &'f Arc<Frame>>,
    I::IntoIter: DoubleEndedIterator,
{
    let start = language.start_symbol();
    let mut frames = frames.into_iter();
    let top = frames.next_back();
    let mut builder = NodeBuilder::new(language);
    for frame in frames {
        builder.extend(frame.elements());
    }
    if let Some(top) = top {
        let mut elements = top.elements().iter();
        match elements.next() {
            Some(GreenElement::Node(node)) if node.kind() == start => builder.splice(node),
            Some(other) => builder.push(other.clone(), None),
            None => {}
        }
        builder.extend(elements);
    }
    builder.finish(start)
}

/// Root for input whose end could not be accepted: every remaining element
/// wrapped in one `ERROR` node under the start symbol. Without elements the
/// root is empty.
pub(crate) fn fallback_root(language: &Language, elements: &[GreenElement]) -> Arc<GreenNode> {
    let mut error = NodeBuilder::new(language);
    error.extend(elements);
    if error.is_empty() {
        return GreenNode::new(language.start_symbol(), Vec::new());
    }
    let error = error.finish(SyntaxKind::ERROR);
    GreenNode::new(language.start_symbol(), vec![error.into()])
}
