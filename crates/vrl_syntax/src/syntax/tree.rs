use crate::error::SyntaxError;
use crate::language::Language;
use crate::parser::{Checkpoint, ParseMetrics};
use crate::syntax::{changed_ranges, to_sexp, GreenNode, SyntaxNode, TextRange, TextSize};
use std::fmt;
use std::sync::Arc;

/// Result of a parse: the green root plus what a later reparse needs.
///
/// Trees are immutable and `Send + Sync`; a reparse returns a new tree that
/// shares unchanged subtrees with this one.
#[derive(Clone)]
pub struct SyntaxTree {
    root: Arc<GreenNode>,
    language: Language,
    checkpoints: Arc<[Checkpoint]>,
    metrics: ParseMetrics,
}

impl SyntaxTree {
    pub(crate) const fn new(
        root: Arc<GreenNode>,
        language: Language,
        checkpoints: Arc<[Checkpoint]>,
        metrics: ParseMetrics,
    ) -> Self {
        Self {
            root,
            language,
            checkpoints,
            metrics,
        }
    }

    /// Red root node; cheap, may be called repeatedly.
    #[must_use]
    pub fn root(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.root.clone(), self.language.clone())
    }

    #[must_use]
    pub const fn green(&self) -> &Arc<GreenNode> {
        &self.root
    }

    #[must_use]
    pub const fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub fn source_len(&self) -> TextSize {
        self.root.text_len()
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.root.error_count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.root.has_error()
    }

    /// The source text, reassembled from the tokens.
    #[must_use]
    pub fn text(&self) -> String {
        self.root.text()
    }

    /// Every `ERROR` node in document order, nested ones included.
    ///
    /// Only subtrees flagged with errors are visited.
    pub fn errors(&self) -> impl Iterator<Item = SyntaxNode> {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                stack.extend(node.child_nodes().rev().filter(SyntaxNode::has_error));
                if node.is_error() {
                    return Some(node);
                }
            }
            None
        })
    }

    /// One entry per outermost `ERROR` node.
    #[must_use]
    pub fn syntax_errors(&self) -> Vec<SyntaxError> {
        self.errors()
            .filter(|node| !node.ancestors().skip(1).any(|a| a.is_error()))
            .map(|node| {
                let unexpected = node
                    .preorder()
                    .filter_map(|element| element.into_token())
                    .find(|token| !token.is_extra());
                SyntaxError {
                    range: node.range(),
                    unexpected: unexpected.as_ref().map(|token| token.kind()),
                    unexpected_name: unexpected.map(|token| token.kind_name().to_string()),
                }
            })
            .collect()
    }

    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn to_sexp(&self) -> String {
        to_sexp(&self.root())
    }

    /// Ranges of `self` whose structure differs from `older`.
    #[must_use]
    pub fn changed_ranges(&self, older: &Self) -> Vec<TextRange> {
        changed_ranges(&older.root, &self.root)
    }

    pub(crate) const fn checkpoints(&self) -> &Arc<[Checkpoint]> {
        &self.checkpoints
    }
}

/// Trees are equal when their content is: same language, same green structure.
/// Parse metrics and reuse bookkeeping are ignored.
impl PartialEq for SyntaxTree {
    fn eq(&self, other: &Self) -> bool {
        self.language == other.language && (Arc::ptr_eq(&self.root, &other.root) || self.root == other.root)
    }
}

impl Eq for SyntaxTree {}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("language", &self.language.name())
            .field("source_len", &self.source_len())
            .field("errors", &self.error_count())
            .field("root", &self.to_sexp())
            .finish()
    }
}
