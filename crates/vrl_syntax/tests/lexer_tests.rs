//! Tests for the grammar-directed lexer

use proptest::prelude::*;
use vrl_syntax::language::{Language, LanguageBuilder, StateId};
use vrl_syntax::lexer::{Lexer, LexerState, Pattern};
use vrl_syntax::testing::{statements_language, vrl_language};
use vrl_syntax::{Point, SyntaxKind, TextRange};

/// `root -> word`, with a keyword literal, an immediate tick and whitespace.
fn words_language(word_precedence: Option<i8>) -> Language {
    let mut b = LanguageBuilder::new("words");
    let word = b.terminal("word", Pattern::regex("[a-z]+").unwrap());
    b.literal("if");
    let tick = b.literal("'");
    b.set_immediate(tick);
    b.extra("whitespace", Pattern::regex("[ \n]+").unwrap());
    if let Some(precedence) = word_precedence {
        b.set_precedence(word, precedence);
    }
    let root = b.nonterminal("root");
    b.start(root);
    let p = b.production(root, &[word]);
    b.shift(0, word, 2).goto(0, root, 1).accept(1);
    b.reduce(2, SyntaxKind::END, p);
    b.build().unwrap()
}

fn kinds(language: &Language, text: &str) -> Vec<String> {
    Lexer::new(language)
        .tokenize(text)
        .iter()
        .map(|token| language.kind_name(token.kind).to_string())
        .collect()
}

#[test]
fn test_literal_beats_pattern_of_same_length() {
    let language = words_language(None);
    assert_eq!(kinds(&language, "if"), ["if"]);
    assert_eq!(kinds(&language, "iffy"), ["word"]);
}

#[test]
fn test_precedence_beats_literal() {
    let language = words_language(Some(1));
    assert_eq!(kinds(&language, "if"), ["word"]);
}

#[test]
fn test_immediate_token_cannot_follow_trivia() {
    let language = words_language(None);
    assert_eq!(kinds(&language, "a'"), ["word", "'"]);
    assert_eq!(kinds(&language, "a '"), ["word", "whitespace", "ERROR"]);
}

#[test]
fn test_valid_terminals_steer_ambiguous_text() {
    let language = statements_language();
    let lexer = Lexer::new(&language);
    let keyword = language.kind_by_name("let", false).unwrap();
    let identifier = language.kind_by_name("identifier", true).unwrap();

    // after `let` only an identifier is valid
    let after_let = language.valid_terminals(StateId(6)).unwrap();
    let lexeme = lexer.next_token("let let", LexerState::new(3, Point::new(0, 3)), after_let);
    assert_eq!(lexeme.token.kind, identifier);
    assert_eq!(lexeme.trivia.len(), 1);
    assert_eq!(lexeme.start(), 3);

    let anywhere = language.valid_terminals(StateId(0)).unwrap();
    let lexeme = lexer.next_token("let let", LexerState::default(), anywhere);
    assert_eq!(lexeme.token.kind, keyword);
}

#[test]
fn test_valid_extra_is_returned_as_token() {
    let language = vrl_language();
    let lexer = Lexer::new(&language);
    let newline = language.kind_by_name("newline", true).unwrap();
    let ident = language.kind_by_name("ident", true).unwrap();
    let after_operand = LexerState::new(1, Point::new(0, 1));

    // an expression may end here, so the line break is significant
    let ending = language.valid_terminals(StateId(4)).unwrap();
    assert!(ending.contains(newline));
    let lexeme = lexer.next_token("a\nb", after_operand, ending);
    assert_eq!(lexeme.token.kind, newline);
    assert!(lexeme.trivia.is_empty());

    // after `??` an operand must follow and the line break is trivia
    let operand = language.valid_terminals(StateId(14)).unwrap();
    assert!(!operand.contains(newline));
    let lexeme = lexer.next_token("a\nb", after_operand, operand);
    assert_eq!(lexeme.token.kind, ident);
    assert_eq!(lexeme.trivia.len(), 1);
    assert_eq!(lexeme.trivia[0].kind, newline);
    assert_eq!(lexeme.start(), 1);
    assert_eq!(lexeme.token.range.as_usize_range(), 2..3);
}

#[test]
fn test_vrl_keywords_and_numbers() {
    let language = vrl_language();
    assert_eq!(kinds(&language, "true"), ["boolean"]);
    assert_eq!(kinds(&language, "trueish false_"), ["ident", "whitespace", "ident"]);
    assert_eq!(kinds(&language, "0 -12 1_000"), ["integer", "whitespace", "integer", "whitespace", "integer"]);
    assert_eq!(kinds(&language, "a ?? b || c"), ["ident", "whitespace", "??", "whitespace", "ident", "whitespace", "||", "whitespace", "ident"]);
    assert_eq!(kinds(&language, "a # b\nc"), ["ident", "whitespace", "comment", "newline", "ident"]);
}

#[test]
fn test_points_track_rows_and_columns() {
    let language = statements_language();
    let text = "a;\n  bb;\n\n c";
    let tokens = Lexer::new(&language).tokenize(text);
    let significant: Vec<_> = tokens
        .iter()
        .filter(|token| !language.is_extra(token.kind))
        .map(|token| (token.text(text), token.point))
        .collect();
    assert_eq!(
        significant,
        [
            ("a", Point::new(0, 0)),
            (";", Point::new(0, 1)),
            ("bb", Point::new(1, 2)),
            (";", Point::new(1, 4)),
            ("c", Point::new(3, 1)),
        ]
    );
}

#[test]
fn test_end_token_is_empty_at_text_end() {
    let language = statements_language();
    let lexer = Lexer::new(&language);
    let lexeme = lexer.next_token("a # tail", LexerState::new(1, Point::new(0, 1)), language.significant_terminals());
    assert!(lexeme.token.is_end());
    assert_eq!(lexeme.token.range, TextRange::from_usize(8, 8));
    assert_eq!(lexeme.trivia.len(), 2);
    assert!(lexeme.horizon > 8);
}

proptest! {
    #[test]
    fn prop_tokens_tile_the_input(text in "[a-z0-9 ;+#\n$é]{0,64}") {
        let language = statements_language();
        let tokens = Lexer::new(&language).tokenize(&text);
        let mut offset = 0;
        for token in &tokens {
            prop_assert_eq!(token.range.start().to_usize(), offset);
            prop_assert!(!token.range.is_empty());
            offset = token.range.end().to_usize();
        }
        prop_assert_eq!(offset, text.len());
    }

    #[test]
    fn prop_lexing_is_deterministic(text in "[a-z0-9 ;+#\n]{0,64}") {
        let language = statements_language();
        let lexer = Lexer::new(&language);
        prop_assert_eq!(lexer.tokenize(&text), lexer.tokenize(&text));
    }

    #[test]
    fn prop_resuming_mid_stream_matches(text in "[a-z ;+]{0,48}") {
        let language = statements_language();
        let lexer = Lexer::new(&language);
        let tokens = lexer.tokenize(&text);
        if let Some(token) = tokens.get(tokens.len() / 2) {
            let state = LexerState::new(token.range.start().to_usize(), token.point);
            let rest = lexer.next_token(&text, state, language.significant_terminals());
            let first = rest.trivia.first().copied().unwrap_or(rest.token);
            prop_assert_eq!(first, *token);
        }
    }
}
