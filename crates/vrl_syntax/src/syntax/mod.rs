//! # Syntax Trees
//!
//! Lossless concrete syntax trees in two layers:
//!
//! - **Green** ([`GreenNode`], [`GreenToken`]): immutable, reference counted
//!   and position independent. Every version of a document shares the green
//!   subtrees an edit did not touch.
//! - **Red** ([`SyntaxNode`], [`SyntaxToken`]): positioned views built on
//!   demand, with parent pointers for upward navigation.
//!
//! A [`SyntaxTree`] bundles a green root with the [`Language`](crate::language::Language)
//! that produced it and the data needed to reparse it incrementally.
//!
//! ## Invariants
//!
//! - The concatenated text of a node's children is exactly the node's text, so
//!   child ranges are contiguous, ordered, and cover their parent.
//! - The root always spans the whole source, `[0, len)`.
//! - A node's error count includes every `ERROR` node below it, so the error
//!   flag of a subtree is visible on all of its ancestors.

pub mod diff;
mod green;
mod kind;
mod red;
mod sexp;
mod text;
mod tree;

pub use diff::changed_ranges;
pub use green::{FieldEntry, GreenChild, GreenElement, GreenNode, GreenToken};
pub use kind::{FieldId, SyntaxKind};
pub use red::{Preorder, SyntaxElement, SyntaxNode, SyntaxToken, TreeCursor};
pub use sexp::to_sexp;
pub use text::{Point, TextRange, TextSize, MAX_SOURCE_LEN};
pub use tree::SyntaxTree;
