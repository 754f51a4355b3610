//! # GLR Parser
//!
//! Table-driven generalized LR parsing over a [`Language`].
//!
//! ## Overview
//!
//! The parser pulls tokens from the grammar-directed [`Lexer`](crate::lexer::Lexer)
//! one at a time and keeps a set of parallel stacks:
//!
//! 1. For each token, every stack applies all actions the table lists for
//!    its state. A state with several actions forks the stack.
//! 2. Reductions are re-examined against the same token until every stack
//!    has shifted, accepted or died.
//! 3. Shifted stacks that reach the same state sequence merge; the set is
//!    bounded by [`ParserConfig::max_stacks`].
//! 4. When every stack dies, error recovery wraps the offending input in an
//!    `ERROR` node and resynchronizes at the next sync token.
//!
//! Parsing never fails on bad input. It fails only when the
//! [`ParseBudget`] runs out, in which case no tree is returned.
//!
//! ## Example
//!
//! ```rust
//! use vrl_syntax::testing::statements_language;
//!
//! let language = statements_language();
//! let tree = vrl_syntax::parse("let x; x + 2;", &language)
//!     .unwrap_or_else(|error| panic!("{error}"));
//! assert_eq!(tree.source_len().to_usize(), 13);
//! assert!(!tree.has_errors());
//! ```

mod build;
pub(crate) mod checkpoint;
pub(crate) mod driver;
mod recovery;
mod stack;

pub(crate) use checkpoint::Checkpoint;
pub(crate) use driver::ParseRun;

use crate::error::ParseError;
use crate::incremental::{self, Edit, ReparseStats};
use crate::language::Language;
use crate::syntax::SyntaxTree;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tuning knobs for the GLR parser.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ParserConfig {
    /// Maximum number of parallel stacks kept after each token
    pub max_stacks: usize,
    /// Reductions allowed while processing one token before remaining
    /// reductions are dropped
    pub max_reductions_per_token: usize,
    /// Limits after which the parse is abandoned
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub budget: ParseBudget,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_stacks: 32,
            max_reductions_per_token: 4096,
            budget: ParseBudget::default(),
        }
    }
}

impl ParserConfig {
    #[must_use]
    pub const fn with_max_stacks(mut self, max_stacks: usize) -> Self {
        self.max_stacks = max_stacks;
        self
    }

    #[must_use]
    pub const fn with_max_reductions_per_token(mut self, limit: usize) -> Self {
        self.max_reductions_per_token = limit;
        self
    }

    #[must_use]
    pub fn with_budget(mut self, budget: ParseBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// Cooperative limits checked before every token is lexed.
#[derive(Debug, Clone, Default)]
pub struct ParseBudget {
    pub max_tokens: Option<usize>,
    pub deadline: Option<Instant>,
    pub cancel: Option<CancellationFlag>,
}

impl ParseBudget {
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_tokens: None,
            deadline: None,
            cancel: None,
        }
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Shared flag another thread can raise to stop a running parse.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Counters collected during one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ParseMetrics {
    /// Lexemes produced, including those skipped by recovery
    pub tokens_consumed: usize,
    pub reductions: usize,
    /// Times a stack had more than one action for a token
    pub forks: usize,
    /// Times two stacks reached the same state sequence
    pub merges: usize,
    /// Largest number of stacks alive after one token
    pub max_stacks: usize,
    pub errors_recovered: usize,
    pub parse_time: Duration,
}

/// GLR parser bound to one language.
#[derive(Debug, Clone)]
pub struct Parser {
    language: Language,
    config: ParserConfig,
}

impl Parser {
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self::with_config(language, ParserConfig::default())
    }

    #[must_use]
    pub const fn with_config(language: Language, config: ParserConfig) -> Self {
        Self { language, config }
    }

    #[must_use]
    pub const fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `text` from scratch.
    ///
    /// # Errors
    ///
    /// [`ParseError::ResourceExhausted`] when the budget runs out.
    pub fn parse(&self, text: &str) -> Result<SyntaxTree, ParseError> {
        driver::ParseRun::new(&self.language, &self.config, text)
            .run()
            .map(|output| output.tree)
    }

    /// Parse `text`, reusing `prior` when given along with the edit that
    /// turned the prior text into `text`.
    ///
    /// # Errors
    ///
    /// [`ParseError::EditOutOfRange`] when the edit does not fit, and
    /// [`ParseError::ResourceExhausted`] when the budget runs out.
    pub fn parse_with(
        &self,
        text: &str,
        prior: Option<(&SyntaxTree, Edit)>,
    ) -> Result<SyntaxTree, ParseError> {
        match prior {
            Some((tree, edit)) => self.reparse(tree, edit, text),
            None => self.parse(text),
        }
    }

    /// Incrementally reparse `prior` after `edit`, producing the tree for `text`.
    ///
    /// # Errors
    ///
    /// See [`parse_with`](Self::parse_with).
    pub fn reparse(&self, prior: &SyntaxTree, edit: Edit, text: &str) -> Result<SyntaxTree, ParseError> {
        self.reparse_with_stats(prior, edit, text).map(|(tree, _)| tree)
    }

    /// Like [`reparse`](Self::reparse), also reporting what was reused.
    ///
    /// # Errors
    ///
    /// See [`parse_with`](Self::parse_with).
    pub fn reparse_with_stats(
        &self,
        prior: &SyntaxTree,
        edit: Edit,
        text: &str,
    ) -> Result<(SyntaxTree, ReparseStats), ParseError> {
        incremental::reparse_with(&self.language, &self.config, prior, edit, text)
    }
}

/// Parse `text` with the default configuration.
///
/// # Errors
///
/// Never fails with the default (unlimited) budget; the `Result` mirrors
/// [`Parser::parse`].
pub fn parse(text: &str, language: &Language) -> Result<SyntaxTree, ParseError> {
    Parser::new(language.clone()).parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Exhaustion;
    use crate::testing::{ambiguous_language, statements_language};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_empty_input_yields_empty_root() {
        init();
        let tree = parse("", &statements_language()).unwrap();
        assert_eq!(tree.root().child_count(), 0);
        assert_eq!(tree.root().range().as_usize_range(), 0..0);
        assert!(!tree.has_errors());
    }

    #[test]
    fn test_statements_produce_fields() {
        init();
        let tree = parse("a + b;", &statements_language()).unwrap();
        assert_eq!(
            tree.to_sexp(),
            "(program (statement (expression left: (expression (identifier)) right: (expression (identifier)))))"
        );
        assert_eq!(tree.metrics().errors_recovered, 0);
    }

    #[test]
    fn test_binary_chain_is_left_nested() {
        init();
        let tree = parse("a + b + c;", &statements_language()).unwrap();
        let statement = tree.root().child_nodes().next().unwrap();
        let chain = statement.child_nodes().next().unwrap();
        let left = chain.child_by_field("left").unwrap().into_node().unwrap();
        assert_eq!(left.text(), "a + b");
        assert!(tree.metrics().forks > 0);
    }

    #[test]
    fn test_trivia_is_kept_losslessly() {
        init();
        let text = "  # leading\nlet x;\n  y ;  # trailing";
        let tree = parse(text, &statements_language()).unwrap();
        assert_eq!(tree.text(), text);
        assert_eq!(tree.root().range().as_usize_range(), 0..text.len());
    }

    #[test]
    fn test_ambiguity_forks_and_merges() {
        init();
        let tree = parse("x x x x", &ambiguous_language()).unwrap();
        assert!(!tree.has_errors());
        assert!(tree.metrics().forks > 0);
        assert!(tree.metrics().merges > 0);
        assert!(tree.metrics().max_stacks > 1);
    }

    #[test]
    fn test_token_budget_aborts_without_tree() {
        init();
        let config = ParserConfig::default().with_budget(ParseBudget::unlimited().with_max_tokens(3));
        let parser = Parser::with_config(statements_language(), config);
        let error = parser.parse("a; b; c; d;").unwrap_err();
        assert_eq!(
            error,
            ParseError::ResourceExhausted {
                reason: Exhaustion::TokenLimit(3),
                tokens_consumed: 3,
            }
        );
    }

    #[test]
    fn test_cancelled_parse_aborts() {
        init();
        let flag = CancellationFlag::new();
        flag.cancel();
        let config = ParserConfig::default().with_budget(ParseBudget::unlimited().with_cancel(flag.clone()));
        let parser = Parser::with_config(statements_language(), config);
        assert!(matches!(
            parser.parse("a;"),
            Err(ParseError::ResourceExhausted {
                reason: Exhaustion::Cancelled,
                ..
            })
        ));
        flag.reset();
        assert!(parser.parse("a;").is_ok());
    }

    #[test]
    fn test_oversized_source_is_rejected_up_front() {
        assert!(driver::check_source_len(0).is_ok());
        assert!(driver::check_source_len(crate::syntax::MAX_SOURCE_LEN).is_ok());
        if let Some(len) = crate::syntax::MAX_SOURCE_LEN.checked_add(1) {
            let error = driver::check_source_len(len).unwrap_err();
            assert_eq!(
                error,
                ParseError::ResourceExhausted {
                    reason: Exhaustion::SourceTooLarge(len),
                    tokens_consumed: 0,
                }
            );
            assert!(error.to_string().contains("byte limit"));
        }
    }

    #[test]
    fn test_past_deadline_aborts() {
        init();
        let budget = ParseBudget::unlimited().with_deadline(Instant::now());
        std::thread::sleep(Duration::from_millis(2));
        let parser = Parser::with_config(statements_language(), ParserConfig::default().with_budget(budget));
        assert!(matches!(
            parser.parse("a;"),
            Err(ParseError::ResourceExhausted {
                reason: Exhaustion::Deadline,
                tokens_consumed: 0,
            })
        ));
    }

    #[test]
    fn test_single_stack_limit_still_parses() {
        init();
        let parser = Parser::with_config(statements_language(), ParserConfig::default().with_max_stacks(1));
        let tree = parser.parse("a + b + c;").unwrap();
        assert!(!tree.has_errors());
        assert_eq!(tree.metrics().max_stacks, 1);
    }
}
