//! Tests for incremental reparsing

use rstest::rstest;
use std::sync::Arc;
use vrl_syntax::testing::{statements_language, vrl_language, SourceGenerator};
use vrl_syntax::{parse, reparse, Edit, GreenNode, Language, ParseError, Parser, SyntaxTree};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn apply(language: &Language, old_text: &str, range: std::ops::Range<usize>, replacement: &str) -> (SyntaxTree, SyntaxTree, String) {
    let prior = parse(old_text, language).unwrap();
    let (edit, text) = Edit::from_change(old_text, range, replacement);
    let reparsed = reparse(&prior, edit, &text).unwrap();
    (prior, reparsed, text)
}

fn statement_nodes(tree: &SyntaxTree) -> Vec<Arc<GreenNode>> {
    tree.green()
        .elements()
        .filter_map(|element| element.as_node().cloned())
        .collect()
}

/// 100 bytes of well-formed statements, padded with trailing whitespace.
fn hundred_bytes() -> String {
    let mut text = String::from("let alpha;\nalpha + 1;\nlet beta; beta + alpha + 22;\n# running total\ntotal + beta;\n");
    while text.len() < 100 {
        text.push(' ');
    }
    assert_eq!(text.len(), 100);
    text
}

#[test]
fn test_hundred_byte_edit_matches_full_parse() {
    init();
    let language = statements_language();
    let old_text = hundred_bytes();
    let prior = parse(&old_text, &language).unwrap();

    let edit = Edit::replace(20..25, 8);
    let text = format!("{}{}{}", &old_text[..20], "gamma+ 9", &old_text[25..]);
    assert_eq!(text.len(), 103);

    let reparsed = reparse(&prior, edit, &text).unwrap();
    let fresh = parse(&text, &language).unwrap();
    assert_eq!(reparsed, fresh);
    assert_eq!(reparsed.to_sexp(), fresh.to_sexp());
    assert_eq!(reparsed.text(), text);
    assert_eq!(reparsed.root().range().as_usize_range(), 0..103);
}

#[rstest]
#[case::insert_statement("a; b; c;", 3..3, "x + 1; ")]
#[case::delete_statement("a; b; c;", 3..6, "")]
#[case::rename("let a; a + b; c;", 4..5, "alpha")]
#[case::break_statement("a; b; c;", 4..5, "")]
#[case::fix_statement("a; b c;", 4..4, ";")]
#[case::edit_at_start("a; b;", 0..0, "let z; ")]
#[case::edit_at_end("a; b;", 5..5, " c + d;")]
#[case::replace_everything("a; b;", 0..5, "let q;")]
#[case::comment_out("a; b; c;", 3..3, "# ")]
#[case::join_tokens("ab cd;", 2..3, "")]
#[case::split_token("abcd;", 2..2, " + ")]
#[case::empty_to_text("", 0..0, "a + b;")]
#[case::text_to_empty("a + b;", 0..6, "")]
fn test_reparse_equals_full_parse(
    #[case] old_text: &str,
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    init();
    let language = statements_language();
    let (_, reparsed, text) = apply(&language, old_text, range, replacement);
    assert_eq!(reparsed, parse(&text, &language).unwrap(), "reparse of {text:?}");
    assert_eq!(reparsed.text(), text);
}

#[rstest]
#[case::join_lines("a\nb\nc", 1..2, " + ")]
#[case::split_line("a + b + c", 5..6, "\n")]
#[case::terminator_to_newline("a; b; c", 1..2, "\n")]
#[case::comment_out_operator("a ?? b\nc", 2..2, "# ")]
#[case::uncomment("a # ?? b\nc", 2..4, "")]
#[case::close_group("(a ?? b\nc", 7..7, ")")]
#[case::keyword_to_ident("true\nfalse", 4..4, "ish")]
#[case::break_then_resume("a || b\nc + d\ne", 9..10, "")]
fn test_vrl_reparse_equals_full_parse(
    #[case] old_text: &str,
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    init();
    let language = vrl_language();
    let (_, reparsed, text) = apply(&language, old_text, range, replacement);
    assert_eq!(reparsed, parse(&text, &language).unwrap(), "reparse of {text:?}");
    assert_eq!(reparsed.to_sexp(), parse(&text, &language).unwrap().to_sexp());
}

#[test]
fn test_unaffected_statements_are_shared() {
    init();
    let language = statements_language();
    let (prior, reparsed, _) = apply(&language, "a; b; c; d;", 3..4, "bb");
    let old = statement_nodes(&prior);
    let new = statement_nodes(&reparsed);
    assert_eq!(old.len(), 4);
    assert_eq!(new.len(), 4);
    assert!(Arc::ptr_eq(&old[0], &new[0]), "statement before the edit is reused");
    assert!(!Arc::ptr_eq(&old[1], &new[1]), "edited statement is rebuilt");
    assert!(Arc::ptr_eq(&old[3], &new[3]), "statement after the edit is reused");
}

#[test]
fn test_reparse_reports_reuse() {
    init();
    let language = statements_language();
    let old_text = SourceGenerator::new(11).program(40);
    let prior = parse(&old_text, &language).unwrap();
    let middle = old_text.len() / 2;
    let at = old_text[middle..].find(';').map_or(middle, |index| middle + index + 1);
    let (edit, text) = Edit::from_change(&old_text, at..at, " extra;");

    let parser = Parser::new(language.clone());
    let (tree, stats) = parser.reparse_with_stats(&prior, edit, &text).unwrap();
    assert_eq!(tree, parse(&text, &language).unwrap());
    assert!(stats.reused_prefix_bytes > 0);
    assert!(stats.reused_prefix_bytes <= at);
    assert!(stats.tokens_lexed < parse(&text, &language).unwrap().metrics().tokens_consumed);
}

#[test]
fn test_chained_edits_stay_consistent() {
    init();
    let language = statements_language();
    let mut text = String::from("let a; a;");
    let mut tree = parse(&text, &language).unwrap();
    let edits: [(std::ops::Range<usize>, &str); 5] = [
        (9..9, " b + 1;"),
        (4..5, "count"),
        (0..0, "# header\n"),
        (9..13, "lett"),
        (0..9, ""),
    ];
    for (range, replacement) in edits {
        let (edit, next) = Edit::from_change(&text, range, replacement);
        tree = reparse(&tree, edit, &next).unwrap();
        text = next;
        assert_eq!(tree, parse(&text, &language).unwrap(), "after editing to {text:?}");
    }
}

#[test]
fn test_identity_edit_reuses_everything() {
    init();
    let language = statements_language();
    let prior = parse("a; b;", &language).unwrap();
    let reparsed = reparse(&prior, Edit::insert(5, 0), "a; b;").unwrap();
    assert_eq!(reparsed, prior);
    assert!(reparsed.changed_ranges(&prior).is_empty());
}

#[test]
fn test_changed_ranges_cover_edit() {
    init();
    let language = statements_language();
    let (prior, reparsed, _) = apply(&language, "a; b; c;", 3..4, "x + y");
    let changed = reparsed.changed_ranges(&prior);
    assert!(!changed.is_empty());
    assert!(changed.iter().any(|range| range.start().to_usize() <= 3 && range.end().to_usize() >= 8));
    assert!(changed.iter().all(|range| range.end().to_usize() <= reparsed.source_len().to_usize()));
}

#[rstest]
#[case::past_end(Edit::new(4, 9, 4), "a;")]
#[case::wrong_length(Edit::insert(0, 3), "a; b;")]
fn test_edit_out_of_range(#[case] edit: Edit, #[case] text: &str) {
    let prior = parse("a; b;", &statements_language()).unwrap();
    let error = reparse(&prior, edit, text).unwrap_err();
    assert_eq!(error, ParseError::EditOutOfRange { edit, source_len: 5 });
}

#[test]
fn test_reparse_with_other_language_parses_from_scratch() {
    init();
    let prior = parse("x x", &vrl_syntax::testing::ambiguous_language()).unwrap();
    let language = statements_language();
    let parser = Parser::new(language.clone());
    let (tree, stats) = parser.reparse_with_stats(&prior, Edit::replace(1..2, 1), "x;x").unwrap();
    assert_eq!(tree, parse("x;x", &language).unwrap());
    assert_eq!(stats.resume_offset, 0);
}
