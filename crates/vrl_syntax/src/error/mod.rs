//! # Error Types
//!
//! Failures surfaced by the crate fall into two groups:
//!
//! - [`LanguageError`]: a grammar artifact could not be loaded or assembled.
//!   Loading failures carry an [`InvalidGrammar`] reason.
//! - [`ParseError`]: a parse or reparse call returned no tree, either because
//!   its budget ran out or because the edit did not fit the prior tree.
//!
//! Syntax errors in the input are *not* failures. They are embedded in the
//! tree as `ERROR` nodes and can be listed afterwards as [`SyntaxError`]
//! values through [`SyntaxTree::syntax_errors`](crate::syntax::SyntaxTree::syntax_errors).

use crate::incremental::Edit;
use crate::lexer::PatternError;
use crate::syntax::{SyntaxKind, TextRange};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    /// The artifact or assembled tables failed validation.
    #[error("invalid grammar: {0}")]
    InvalidGrammar(#[from] InvalidGrammar),

    #[error("symbol `{0}` is declared twice")]
    DuplicateSymbol(String),

    #[error("field `{0}` is declared twice")]
    DuplicateField(String),

    #[error("no start symbol was set")]
    MissingStart,

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Why an artifact was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidGrammar {
    #[error("bad magic header")]
    BadMagic,

    #[error("unsupported artifact version {found} (expected {expected})")]
    UnsupportedVersion { found: u16, expected: u16 },

    #[error("payload length {declared} does not match the {actual} bytes present")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch: header says {expected:#018x}, payload hashes to {actual:#018x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("truncated artifact while reading {0}")]
    Truncated(&'static str),

    #[error("{0} trailing bytes after the last section")]
    TrailingBytes(usize),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("inconsistent tables: {0}")]
    Inconsistent(String),
}

impl InvalidGrammar {
    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent(message.into())
    }
}

/// Failure of a parse call; no tree is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("parse aborted after {tokens_consumed} tokens: {reason}")]
    ResourceExhausted {
        reason: Exhaustion,
        tokens_consumed: usize,
    },

    #[error("edit {edit} does not fit a source of {source_len} bytes")]
    EditOutOfRange { edit: Edit, source_len: u32 },
}

/// Which budget limit stopped the parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    TokenLimit(usize),
    Deadline,
    Cancelled,
    /// The text is longer than [`MAX_SOURCE_LEN`](crate::syntax::MAX_SOURCE_LEN) bytes
    SourceTooLarge(usize),
}

impl fmt::Display for Exhaustion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenLimit(limit) => write!(f, "token limit of {limit} reached"),
            Self::Deadline => f.write_str("deadline passed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::SourceTooLarge(len) => write!(
                f,
                "source of {len} bytes exceeds the {} byte limit",
                crate::syntax::MAX_SOURCE_LEN
            ),
        }
    }
}

/// Syntax error recovered into the tree
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SyntaxError {
    /// Range of the `ERROR` node
    pub range: TextRange,
    /// Kind of the first token swallowed by the error, if any
    pub unexpected: Option<SyntaxKind>,
    /// Name of that kind in the language
    pub unexpected_name: Option<String>,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unexpected_name {
            Some(name) => write!(f, "unexpected {name} at {}", self.range),
            None => write!(f, "syntax error at {}", self.range),
        }
    }
}

impl std::error::Error for SyntaxError {}
