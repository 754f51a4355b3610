//! Tests for the GLR parser

use rstest::rstest;
use std::time::Duration;
use vrl_syntax::testing::{ambiguous_language, statements_language, vrl_language, SourceGenerator};
use vrl_syntax::{
    parse, CancellationFlag, Exhaustion, Language, ParseBudget, ParseError, Parser, ParserConfig,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_empty_input() {
    init();
    for language in [statements_language(), ambiguous_language()] {
        let tree = parse("", &language).unwrap();
        assert_eq!(tree.root().kind(), language.start_symbol());
        assert_eq!(tree.root().child_count(), 0);
        assert_eq!(tree.root().range().as_usize_range(), 0..0);
    }
}

#[test]
fn test_only_trivia() {
    init();
    let tree = parse("  # nothing here\n", &statements_language()).unwrap();
    assert!(!tree.has_errors());
    assert_eq!(tree.root().child_nodes().count(), 0);
    assert_eq!(tree.text(), "  # nothing here\n");
}

#[rstest]
#[case("a;", "(program (statement (expression (identifier))))")]
#[case("let a;", "(program (declaration (identifier)))")]
#[case(
    "let n; n + 1;",
    "(program (declaration (identifier)) (statement (expression left: (expression (identifier)) right: (expression (number)))))"
)]
#[case(
    "1 + 2 + 3;",
    "(program (statement (expression left: (expression left: (expression (number)) right: (expression (number))) right: (expression (number)))))"
)]
fn test_well_formed_programs(#[case] text: &str, #[case] sexp: &str) {
    init();
    let tree = parse(text, &statements_language()).unwrap();
    assert_eq!(tree.to_sexp(), sexp);
    assert!(!tree.has_errors());
    assert!(tree.syntax_errors().is_empty());
}

#[rstest]
#[case::missing_operand("a + ;", 1)]
#[case::missing_name("let ;", 1)]
#[case::stray_characters("a; @@ b;", 1)]
#[case::two_bad_statements("a + ; let 1;", 2)]
#[case::unterminated("a + b", 1)]
fn test_syntax_errors_are_embedded(#[case] text: &str, #[case] expected: usize) {
    init();
    let tree = parse(text, &statements_language()).unwrap();
    assert!(tree.has_errors());
    assert_eq!(tree.syntax_errors().len(), expected, "{}", tree.to_sexp());
    assert_eq!(tree.text(), text);
}

#[rstest]
#[case::single("a", "(program (ident))")]
#[case::lines("a\nb;c", "(program (ident) (ident) (ident))")]
#[case::blank_lines_and_comments("a\n\n# note\n  b;\n", "(program (ident) (ident))")]
#[case::coalesce_binds_loosest(
    "a ?? b || c + d",
    "(program (binary_expression left: (ident) right: (binary_expression left: (ident) right: (binary_expression left: (ident) right: (ident)))))"
)]
#[case::left_associative(
    "a + b + c",
    "(program (binary_expression left: (binary_expression left: (ident) right: (ident)) right: (ident)))"
)]
#[case::operator_continues_line(
    "a ??\n  b",
    "(program (binary_expression left: (ident) right: (ident)))"
)]
#[case::group(
    "(a ?? b) + 1;\ntrue",
    "(program (binary_expression left: (group (binary_expression left: (ident) right: (ident))) right: (integer)) (boolean))"
)]
fn test_vrl_expressions(#[case] text: &str, #[case] sexp: &str) {
    init();
    let tree = parse(text, &vrl_language()).unwrap();
    assert_eq!(tree.to_sexp(), sexp);
    assert!(!tree.has_errors());
    assert_eq!(tree.text(), text);
}

#[test]
fn test_vrl_operator_field_names_the_token() {
    init();
    let tree = parse("a || b", &vrl_language()).unwrap();
    let binary = tree.root().child_nodes().next().unwrap();
    assert_eq!(binary.kind_name(), "binary_expression");
    assert_eq!(binary.child_by_field("operator").unwrap().kind_name(), "||");
    assert_eq!(binary.child_by_field("left").unwrap().range().as_usize_range(), 0..1);
    assert_eq!(binary.child_by_field("right").unwrap().range().as_usize_range(), 5..6);
}

#[test]
fn test_vrl_recovers_at_line_break() {
    init();
    let tree = parse("a ?? ?? b\nc", &vrl_language()).unwrap();
    assert_eq!(tree.to_sexp(), "(program (ident) (ERROR (ident)) (ident))");
    let errors = tree.syntax_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].unexpected_name.as_deref(), Some("??"));

    let tree = parse("a +\n\nb c\nd", &vrl_language()).unwrap();
    assert_eq!(
        tree.to_sexp(),
        "(program (binary_expression left: (ident) right: (ident) (ERROR (ident))) (ident))"
    );
    assert_eq!(tree.syntax_errors()[0].unexpected_name.as_deref(), Some("ident"));
}

#[test]
fn test_ambiguous_input_is_resolved_deterministically() {
    init();
    let language = ambiguous_language();
    let text = "x x x x x x";
    let first = parse(text, &language).unwrap();
    for _ in 0..5 {
        assert_eq!(parse(text, &language).unwrap().to_sexp(), first.to_sexp());
    }
    let metrics = first.metrics();
    assert!(metrics.forks > 0);
    assert!(metrics.merges > 0);
    assert!(metrics.max_stacks > 1);
    assert!(metrics.max_stacks <= ParserConfig::default().max_stacks);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
fn test_stack_bound_is_respected(#[case] max_stacks: usize) {
    init();
    let parser = Parser::with_config(ambiguous_language(), ParserConfig::default().with_max_stacks(max_stacks));
    let tree = parser.parse("x x x x x x x x").unwrap();
    assert!(!tree.has_errors());
    assert!(tree.metrics().max_stacks <= max_stacks);
}

#[test]
fn test_token_budget_counts_skipped_tokens() {
    init();
    let config = ParserConfig::default().with_budget(ParseBudget::unlimited().with_max_tokens(4));
    let parser = Parser::with_config(statements_language(), config);
    assert!(parser.parse("a;").is_ok());
    assert!(matches!(
        parser.parse("$ $ $ $ $ $;"),
        Err(ParseError::ResourceExhausted {
            reason: Exhaustion::TokenLimit(4),
            tokens_consumed: 4,
        })
    ));
}

#[test]
fn test_cancellation_from_another_thread() {
    init();
    let flag = CancellationFlag::new();
    let budget = ParseBudget::unlimited().with_cancel(flag.clone());
    let parser = Parser::with_config(statements_language(), ParserConfig::default().with_budget(budget));
    std::thread::spawn(move || flag.cancel()).join().unwrap();
    let error = parser.parse("a; b;").unwrap_err();
    assert!(error.to_string().contains("cancelled"));
}

#[test]
fn test_generous_timeout_allows_parse() {
    init();
    let budget = ParseBudget::unlimited().with_timeout(Duration::from_secs(60));
    let parser = Parser::with_config(statements_language(), ParserConfig::default().with_budget(budget));
    let text = SourceGenerator::new(5).program(200);
    assert!(!parser.parse(&text).unwrap().has_errors());
}

#[test]
fn test_parsers_are_shareable_across_threads() {
    init();
    let parser = std::sync::Arc::new(Parser::new(statements_language()));
    let expected = parser.parse("let a; a + 1;").unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let parser = parser.clone();
            std::thread::spawn(move || parser.parse("let a; a + 1;").unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_loaded_language_is_interchangeable() {
    init();
    let built = statements_language();
    let loaded = Language::load(&built.to_bytes()).unwrap();
    let text = "let q; q + q + 1;";
    assert_eq!(parse(text, &loaded).unwrap(), parse(text, &built).unwrap());
}
