//! # vrl-syntax
//!
//! A grammar-driven, incremental GLR parser runtime that turns VRL source
//! text into lossless concrete syntax trees.
//!
//! ## Overview
//!
//! Everything grammar specific lives in a compiled [`Language`]: the symbol
//! table, the lexical matchers and the LR action tables. The runtime is
//! generic over it:
//!
//! - [`Language::load`] reads a compiled grammar artifact and rejects
//!   corrupt, truncated or version-mismatched input.
//! - The [`lexer`] is directed by the parser: it only tries the terminals
//!   valid in the current parse states.
//! - The [`parser`] runs generalized LR with a bounded number of parallel
//!   stacks, embedding syntax errors in the tree as `ERROR` nodes.
//! - The [`syntax`] module holds the immutable green/red trees, traversal,
//!   range queries and structural diffing.
//! - [`incremental`] reparses after an edit. The result is identical to a
//!   full parse and shares every unaffected subtree with the prior tree.
//!
//! ## Quick Start
//!
//! ```rust
//! use vrl_syntax::{parse, reparse, Edit};
//! use vrl_syntax::testing::statements_language;
//!
//! let language = statements_language();
//! let tree = parse("let a; a + 1;", &language).unwrap();
//! assert_eq!(
//!     tree.to_sexp(),
//!     "(program (declaration (identifier)) (statement (expression \
//!      left: (expression (identifier)) right: (expression (number)))))"
//! );
//!
//! let (edit, text) = Edit::from_change("let a; a + 1;", 11..12, "22");
//! let new_tree = reparse(&tree, edit, &text).unwrap();
//! assert_eq!(new_tree.text(), "let a; a + 22;");
//! ```
//!
//! A compiled grammar is normally loaded from its artifact bytes:
//!
//! ```rust
//! use vrl_syntax::Language;
//! use vrl_syntax::testing::statements_language;
//!
//! let bytes = statements_language().to_bytes();
//! let language = Language::load(&bytes).unwrap();
//! assert_eq!(language.name(), "statements");
//! assert!(Language::load(&bytes[..bytes.len() - 1]).is_err());
//! ```
//!
//! ## Modules
//!
//! - [`language`] - Compiled grammar tables, artifact loading and the table builder
//! - [`lexer`] - Grammar-directed tokenization
//! - [`parser`] - The GLR parser, its configuration, budget and metrics
//! - [`incremental`] - Edits and incremental reparsing
//! - [`syntax`] - Syntax tree types, traversal and diffing
//! - [`error`] - Error types
//! - [`testing`] - Fixture languages and source generators

pub mod error;
pub mod incremental;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod testing;

pub use error::{Exhaustion, InvalidGrammar, LanguageError, ParseError, SyntaxError};
pub use incremental::{reparse, Document, Edit, ReparseStats};
pub use language::{Language, LanguageBuilder};
pub use lexer::{Lexer, Pattern};
pub use parser::{parse, CancellationFlag, ParseBudget, ParseMetrics, Parser, ParserConfig};
pub use syntax::{
    FieldId, GreenNode, GreenToken, Point, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken,
    SyntaxTree, TextRange, TextSize,
};
