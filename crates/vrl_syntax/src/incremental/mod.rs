//! # Incremental Reparsing
//!
//! [`reparse`] turns the tree of an old text plus the [`Edit`] that produced
//! a new text into the tree of the new text. The result is always equal to a
//! fresh [`parse`](crate::parse) of the new text; what reuse buys is speed
//! and sharing:
//!
//! - Parsing resumes from the last checkpoint of the old parse that lexing
//!   never looked past the edit start from. The stack restored there holds
//!   the old tree's nodes.
//! - Once the new parse is back in step with the old one after the edit,
//!   old stacks are grafted on wholesale and the lexer jumps ahead.
//! - Nodes rebuilt outside the edited bytes are swapped for the equal old
//!   nodes, so unaffected subtrees are `Arc`-identical across versions.
//!
//! ```rust
//! use vrl_syntax::incremental::{reparse, Edit};
//! use vrl_syntax::testing::statements_language;
//!
//! let language = statements_language();
//! let old = vrl_syntax::parse("a; b;", &language).unwrap();
//! let (edit, text) = Edit::from_change("a; b;", 0..1, "total");
//! let new = reparse(&old, edit, &text).unwrap();
//! assert_eq!(new, vrl_syntax::parse(&text, &language).unwrap());
//! ```

use crate::error::ParseError;
use crate::language::Language;
use crate::parser::checkpoint::{resume_index, EditSpan, Reuse};
use crate::parser::{ParseRun, Parser, ParserConfig};
use crate::syntax::{GreenElement, GreenNode, SyntaxTree, TextRange, TextSize};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A text change: bytes `[start, old_end)` of the old text were replaced by
/// bytes `[start, new_end)` of the new text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Edit {
    pub start: TextSize,
    pub old_end: TextSize,
    pub new_end: TextSize,
}

impl Edit {
    #[must_use]
    pub fn new(start: usize, old_end: usize, new_end: usize) -> Self {
        Self {
            start: TextSize::from_usize(start),
            old_end: TextSize::from_usize(old_end),
            new_end: TextSize::from_usize(new_end),
        }
    }

    /// `len` bytes inserted at `at`.
    #[must_use]
    pub fn insert(at: usize, len: usize) -> Self {
        Self::new(at, at, at + len)
    }

    #[must_use]
    pub fn delete(range: Range<usize>) -> Self {
        Self::new(range.start, range.end, range.start)
    }

    /// `range` replaced by `len` bytes.
    #[must_use]
    pub fn replace(range: Range<usize>, len: usize) -> Self {
        Self::new(range.start, range.end, range.start + len)
    }

    /// Apply `replacement` to `range` of `old_text`, returning the edit and
    /// the new text. The range is clamped to the text and to char boundaries.
    #[must_use]
    pub fn from_change(old_text: &str, range: Range<usize>, replacement: &str) -> (Self, String) {
        let start = floor_char_boundary(old_text, range.start);
        let end = floor_char_boundary(old_text, range.end.max(start));
        let mut text = String::with_capacity(old_text.len() - (end - start) + replacement.len());
        text.push_str(&old_text[..start]);
        text.push_str(replacement);
        text.push_str(&old_text[end..]);
        (Self::replace(start..end, replacement.len()), text)
    }

    /// Change in text length.
    #[must_use]
    pub fn delta(&self) -> i64 {
        i64::from(self.new_end.get()) - i64::from(self.old_end.get())
    }

    /// Replaced range in the old text.
    #[must_use]
    pub fn old_range(&self) -> TextRange {
        TextRange::new(self.start, self.old_end)
    }

    /// Inserted range in the new text.
    #[must_use]
    pub fn new_range(&self) -> TextRange {
        TextRange::new(self.start, self.new_end)
    }

    /// Check the edit against the old tree and the new text.
    fn validate(&self, prior: &SyntaxTree, text: &str) -> Result<EditSpan, ParseError> {
        let source_len = prior.source_len();
        let out_of_range = || ParseError::EditOutOfRange {
            edit: *self,
            source_len: source_len.get(),
        };
        let start = self.start.to_usize();
        let old_end = self.old_end.to_usize();
        let new_end = self.new_end.to_usize();
        let old_len = source_len.to_usize();
        if start > old_end || old_end > old_len || start > new_end {
            return Err(out_of_range());
        }
        if old_len - (old_end - start) + (new_end - start) != text.len() {
            return Err(out_of_range());
        }
        if !text.is_char_boundary(start)
            || !text.is_char_boundary(new_end)
            || !old_char_boundary(prior.green(), start)
            || !old_char_boundary(prior.green(), old_end)
        {
            return Err(out_of_range());
        }
        Ok(EditSpan {
            start,
            old_end,
            new_end,
        })
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} -> {}..{}", self.start, self.old_end, self.start, self.new_end)
    }
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// True when `offset` falls on a char boundary of the text under `root`.
fn old_char_boundary(root: &GreenNode, offset: usize) -> bool {
    let mut node = root;
    let mut relative = offset;
    loop {
        let Some(index) = node.child_index_at(TextSize::from_usize(relative)) else {
            return true;
        };
        let Some(child) = node.children().get(index) else {
            return true;
        };
        relative -= child.offset().to_usize();
        match child.element() {
            GreenElement::Node(inner) => node = inner,
            GreenElement::Token(token) => return token.text().is_char_boundary(relative),
        }
    }
}

/// What a reparse reused and what it invalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ReparseStats {
    /// New-text offset the parser resumed lexing from
    pub resume_offset: usize,
    /// Bytes before the resume point taken over from the prior parse
    pub reused_prefix_bytes: usize,
    /// Bytes after the edit skipped by grafting prior stacks
    pub reused_suffix_bytes: usize,
    /// Lexemes produced by this reparse
    pub tokens_lexed: usize,
    /// Rebuilt nodes replaced by the equal prior node
    pub adopted_nodes: usize,
    /// Ranges (old coordinates) of the prior nodes touching the edit
    pub invalidated: Vec<TextRange>,
}

/// Reparse with the default configuration.
///
/// # Errors
///
/// [`ParseError::EditOutOfRange`] when `edit` does not describe how `text`
/// was derived from the text of `prior`.
pub fn reparse(prior: &SyntaxTree, edit: Edit, text: &str) -> Result<SyntaxTree, ParseError> {
    Parser::new(prior.language().clone()).reparse(prior, edit, text)
}

pub(crate) fn reparse_with(
    language: &Language,
    config: &ParserConfig,
    prior: &SyntaxTree,
    edit: Edit,
    text: &str,
) -> Result<(SyntaxTree, ReparseStats), ParseError> {
    let span = edit.validate(prior, text)?;
    let invalidated = invalidated_ranges(prior.green(), edit.old_range());

    if prior.language() != language {
        log::debug!("prior tree was built by another language; parsing from scratch");
        let tree = ParseRun::new(language, config, text).run()?.tree;
        let stats = ReparseStats {
            tokens_lexed: tree.metrics().tokens_consumed,
            invalidated,
            ..ReparseStats::default()
        };
        return Ok((tree, stats));
    }

    let checkpoints = prior.checkpoints();
    let index = resume_index(checkpoints, span.start).unwrap_or(0);
    let reuse = Reuse::new(prior.green().clone(), checkpoints.clone(), span);
    log::debug!("reparsing edit {edit}: resuming from checkpoint {index}");
    let output = ParseRun::resume_from(language, config, text, checkpoints, index, reuse).run()?;

    let stats = ReparseStats {
        resume_offset: output.reuse.resume_offset,
        reused_prefix_bytes: output.reuse.resume_offset,
        reused_suffix_bytes: output.reuse.suffix_bytes,
        tokens_lexed: output.tree.metrics().tokens_consumed,
        adopted_nodes: output.reuse.adopted_nodes,
        invalidated,
    };
    log::debug!(
        "reparse lexed {} tokens, reused {} prefix and {} suffix bytes, adopted {} nodes",
        stats.tokens_lexed,
        stats.reused_prefix_bytes,
        stats.reused_suffix_bytes,
        stats.adopted_nodes
    );
    Ok((output.tree, stats))
}

/// Ranges of every node of `root` (the root included) whose range overlaps
/// or touches `edit`, in preorder.
fn invalidated_ranges(root: &GreenNode, edit: TextRange) -> Vec<TextRange> {
    let mut ranges = Vec::new();
    let mut work = vec![(root, TextSize::zero())];
    while let Some((node, start)) = work.pop() {
        let range = TextRange::at(start, node.text_len());
        if !range.touches(edit) {
            continue;
        }
        ranges.push(range);
        let children = node.children();
        let first = children.partition_point(|child| start + child.offset() + child.element().text_len() < edit.start());
        let mut touching = Vec::new();
        for child in &children[first..] {
            let child_start = start + child.offset();
            if child_start > edit.end() {
                break;
            }
            if let GreenElement::Node(inner) = child.element() {
                touching.push((inner.as_ref(), child_start));
            }
        }
        work.extend(touching.into_iter().rev());
    }
    ranges
}

/// A text buffer that keeps its tree current across edits.
///
/// ```rust
/// use vrl_syntax::incremental::Document;
/// use vrl_syntax::parser::Parser;
/// use vrl_syntax::testing::statements_language;
///
/// let mut doc = Document::new(Parser::new(statements_language()), "let a; a;").unwrap();
/// doc.edit(4..5, "b").unwrap();
/// assert_eq!(doc.text(), "let b; a;");
/// assert!(!doc.tree().has_errors());
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    parser: Parser,
    text: String,
    tree: SyntaxTree,
}

impl Document {
    /// # Errors
    ///
    /// Fails when the initial parse exhausts the parser's budget.
    pub fn new(parser: Parser, text: impl Into<String>) -> Result<Self, ParseError> {
        let text = text.into();
        let tree = parser.parse(&text)?;
        Ok(Self { parser, text, tree })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Replace `range` with `replacement` and reparse. On failure the
    /// document is left unchanged.
    ///
    /// # Errors
    ///
    /// Fails when the reparse exhausts the parser's budget.
    pub fn edit(&mut self, range: Range<usize>, replacement: &str) -> Result<ReparseStats, ParseError> {
        let (edit, text) = Edit::from_change(&self.text, range, replacement);
        let (tree, stats) = self.parser.reparse_with_stats(&self.tree, edit, &text)?;
        self.text = text;
        self.tree = tree;
        Ok(stats)
    }
}
