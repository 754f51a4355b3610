//! # Testing Utilities
//!
//! Hand-written languages used by the crate's tests, benchmarks and fuzz
//! targets, plus a generator of source text for them.
//!
//! [`statements_language`] parses a sequence of statements:
//!
//! ```text
//! program     -> _items | ε
//! _items      -> _items statement | _items declaration | statement | declaration
//! statement   -> expression ";"
//! declaration -> "let" identifier ";"
//! expression  -> expression "+" expression | identifier | number
//! ```
//!
//! The table keeps the `+` shift/reduce conflict, so binary chains fork.
//! `;` is the sync token. Whitespace and `#` line comments are extras.
//!
//! [`ambiguous_language`] is `source -> term`, `term -> term term | "x"`,
//! whose table forks on every `x` after the first.
//!
//! [`vrl_language`] is the expression core of VRL:
//!
//! ```text
//! program           -> _body | ε
//! _body             -> _lines | _lines _arith | _arith
//! _lines            -> _lines _arith newline | _lines _arith ";"
//!                    | _arith newline | _arith ";"
//! binary_expression -> _arith "??" _arith | _arith "||" _arith | _arith "+" _arith
//! _arith            -> binary_expression | ident | integer | boolean | group
//! group             -> "(" _arith ")"
//! ```
//!
//! Operators bind `??` loosest, then `||`, then `+`, all left-associative;
//! the table is conflict free. `newline` is an extra that also ends an
//! expression: where the table accepts it the lexer returns it as a token,
//! anywhere else (after an operator, inside a group) it is trivia. Both
//! terminators are sync tokens. `#` comments run to the end of the line.

mod generators;

pub use generators::{GeneratorConfig, SourceGenerator};

use crate::error::LanguageError;
use crate::language::{Language, LanguageBuilder};
use crate::lexer::Pattern;
use crate::syntax::SyntaxKind;

/// Builds the statements language.
///
/// # Errors
///
/// Only if the builder rejects the tables, which would be a bug.
pub fn statements_grammar() -> Result<Language, LanguageError> {
    let mut b = LanguageBuilder::new("statements");
    let identifier = b.terminal("identifier", Pattern::regex("[a-z_][a-z0-9_]*")?);
    let number = b.terminal("number", Pattern::regex("[0-9]+")?);
    let semicolon = b.literal(";");
    let plus = b.literal("+");
    let keyword = b.literal("let");
    b.extra("whitespace", Pattern::regex("[ \t\r\n]+")?);
    b.extra("comment", Pattern::regex("#.*")?);
    b.set_sync(semicolon);

    let program = b.nonterminal("program");
    let items = b.nonterminal("_items");
    let statement = b.nonterminal("statement");
    let declaration = b.nonterminal("declaration");
    let expression = b.nonterminal("expression");
    b.start(program);

    let left = b.field("left");
    let right = b.field("right");

    let program_items = b.production(program, &[items]);
    let program_empty = b.production(program, &[]);
    let items_statement = b.production(items, &[items, statement]);
    let items_declaration = b.production(items, &[items, declaration]);
    let single_statement = b.production(items, &[statement]);
    let single_declaration = b.production(items, &[declaration]);
    let statement_rule = b.production(statement, &[expression, semicolon]);
    let declaration_rule = b.production(declaration, &[keyword, identifier, semicolon]);
    let binary = b.production_with_fields(expression, &[expression, plus, expression], &[(0, left), (2, right)]);
    let variable = b.production(expression, &[identifier]);
    let literal = b.production(expression, &[number]);

    let follow_items = [SyntaxKind::END, keyword, identifier, number];
    let follow_operand = [semicolon, plus];

    b.shift(0, keyword, 6).shift(0, identifier, 7).shift(0, number, 8);
    b.reduce(0, SyntaxKind::END, program_empty);
    b.goto(0, program, 1)
        .goto(0, items, 2)
        .goto(0, statement, 3)
        .goto(0, declaration, 4)
        .goto(0, expression, 5);

    b.accept(1);

    b.reduce(2, SyntaxKind::END, program_items);
    b.shift(2, keyword, 6).shift(2, identifier, 7).shift(2, number, 8);
    b.goto(2, statement, 9).goto(2, declaration, 10).goto(2, expression, 5);

    b.reduce_on(3, &follow_items, single_statement);
    b.reduce_on(4, &follow_items, single_declaration);

    b.shift(5, semicolon, 11).shift(5, plus, 12);
    b.shift(6, identifier, 13);
    b.reduce_on(7, &follow_operand, variable);
    b.reduce_on(8, &follow_operand, literal);
    b.reduce_on(9, &follow_items, items_statement);
    b.reduce_on(10, &follow_items, items_declaration);
    b.reduce_on(11, &follow_items, statement_rule);

    b.shift(12, identifier, 7).shift(12, number, 8);
    b.goto(12, expression, 14);

    b.shift(13, semicolon, 15);

    b.shift(14, plus, 12);
    b.reduce_on(14, &follow_operand, binary);

    b.reduce_on(15, &follow_items, declaration_rule);

    b.build()
}

/// The statements language.
///
/// # Panics
///
/// If [`statements_grammar`] fails.
#[must_use]
pub fn statements_language() -> Language {
    statements_grammar().expect("statements grammar is well formed")
}

/// Builds the ambiguous language.
///
/// # Errors
///
/// Only if the builder rejects the tables, which would be a bug.
pub fn ambiguous_grammar() -> Result<Language, LanguageError> {
    let mut b = LanguageBuilder::new("ambiguous");
    let x = b.literal("x");
    b.extra("whitespace", Pattern::regex("[ \t\r\n]+")?);
    let source = b.nonterminal("source");
    let term = b.nonterminal("term");
    b.start(source);

    let whole = b.production(source, &[term]);
    let pair = b.production(term, &[term, term]);
    let leaf = b.production(term, &[x]);

    b.shift(0, x, 3);
    b.goto(0, source, 1).goto(0, term, 2);
    b.accept(1);
    b.reduce(2, SyntaxKind::END, whole);
    b.shift(2, x, 3);
    b.goto(2, term, 4);
    b.reduce_on(3, &[x, SyntaxKind::END], leaf);
    b.reduce(4, SyntaxKind::END, pair);
    b.shift(4, x, 3).reduce(4, x, pair);
    b.goto(4, term, 4);

    b.build()
}

/// The ambiguous language.
///
/// # Panics
///
/// If [`ambiguous_grammar`] fails.
#[must_use]
pub fn ambiguous_language() -> Language {
    ambiguous_grammar().expect("ambiguous grammar is well formed")
}

/// Builds the VRL expression language.
///
/// # Errors
///
/// Only if the builder rejects the tables, which would be a bug.
pub fn vrl_grammar() -> Result<Language, LanguageError> {
    let mut b = LanguageBuilder::new("vrl");
    let boolean = b.terminal("boolean", Pattern::regex("true|false")?);
    let ident = b.terminal("ident", Pattern::regex("[_a-zA-Z][a-zA-Z0-9_]*")?);
    let integer = b.terminal("integer", Pattern::regex("-?(0|[1-9][_0-9]*)")?);
    let coalesce = b.literal("??");
    let or = b.literal("||");
    let plus = b.literal("+");
    let semicolon = b.literal(";");
    let open = b.literal("(");
    let close = b.literal(")");
    let newline = b.extra("newline", Pattern::regex(r"\n")?);
    b.extra("whitespace", Pattern::regex(r"[ \t\r]+")?);
    b.extra("comment", Pattern::regex("#.*")?);
    b.set_sync(semicolon).set_sync(newline);

    let program = b.nonterminal("program");
    let body = b.nonterminal("_body");
    let lines = b.nonterminal("_lines");
    let arith = b.nonterminal("_arith");
    let binary = b.nonterminal("binary_expression");
    let group = b.nonterminal("group");
    b.start(program);

    let left = b.field("left");
    let operator = b.field("operator");
    let right = b.field("right");
    let operands = [(0, left), (1, operator), (2, right)];

    let program_body = b.production(program, &[body]);
    let program_empty = b.production(program, &[]);
    let body_lines = b.production(body, &[lines]);
    let body_lines_tail = b.production(body, &[lines, arith]);
    let body_tail = b.production(body, &[arith]);
    let lines_newline = b.production(lines, &[lines, arith, newline]);
    let lines_semicolon = b.production(lines, &[lines, arith, semicolon]);
    let line_newline = b.production(lines, &[arith, newline]);
    let line_semicolon = b.production(lines, &[arith, semicolon]);
    let coalesce_rule = b.production_with_fields(binary, &[arith, coalesce, arith], &operands);
    let or_rule = b.production_with_fields(binary, &[arith, or, arith], &operands);
    let plus_rule = b.production_with_fields(binary, &[arith, plus, arith], &operands);
    let arith_binary = b.production(arith, &[binary]);
    let arith_ident = b.production(arith, &[ident]);
    let arith_integer = b.production(arith, &[integer]);
    let arith_boolean = b.production(arith, &[boolean]);
    let arith_group = b.production(arith, &[group]);
    let group_rule = b.production(group, &[open, arith, close]);

    let follow_lines = [SyntaxKind::END, boolean, ident, integer, open];
    let follow_arith = [SyntaxKind::END, newline, semicolon, coalesce, or, plus, close];

    // every state that expects an operand
    for state in [0, 3, 10, 14, 15, 16] {
        b.shift(state, boolean, 8)
            .shift(state, ident, 6)
            .shift(state, integer, 7)
            .shift(state, open, 10);
        b.goto(state, binary, 5).goto(state, group, 9);
    }

    b.reduce(0, SyntaxKind::END, program_empty);
    b.goto(0, program, 1).goto(0, body, 2).goto(0, lines, 3).goto(0, arith, 4);
    b.accept(1);
    b.reduce(2, SyntaxKind::END, program_body);

    b.reduce(3, SyntaxKind::END, body_lines);
    b.goto(3, arith, 11);

    b.reduce(4, SyntaxKind::END, body_tail);
    b.shift(4, newline, 12).shift(4, semicolon, 13);

    b.reduce_on(5, &follow_arith, arith_binary);
    b.reduce_on(6, &follow_arith, arith_ident);
    b.reduce_on(7, &follow_arith, arith_integer);
    b.reduce_on(8, &follow_arith, arith_boolean);
    b.reduce_on(9, &follow_arith, arith_group);

    b.goto(10, arith, 17);

    b.reduce(11, SyntaxKind::END, body_lines_tail);
    b.shift(11, newline, 18).shift(11, semicolon, 19);

    b.reduce_on(12, &follow_lines, line_newline);
    b.reduce_on(13, &follow_lines, line_semicolon);

    b.goto(14, arith, 20).goto(15, arith, 21).goto(16, arith, 22);

    for state in [4, 11, 17] {
        b.shift(state, coalesce, 14).shift(state, or, 15).shift(state, plus, 16);
    }
    b.shift(17, close, 23);

    b.reduce_on(18, &follow_lines, lines_newline);
    b.reduce_on(19, &follow_lines, lines_semicolon);

    b.shift(20, or, 15).shift(20, plus, 16);
    b.reduce_on(20, &[SyntaxKind::END, newline, semicolon, coalesce, close], coalesce_rule);
    b.shift(21, plus, 16);
    b.reduce_on(21, &[SyntaxKind::END, newline, semicolon, coalesce, or, close], or_rule);
    b.reduce_on(22, &follow_arith, plus_rule);

    b.reduce_on(23, &follow_arith, group_rule);

    b.build()
}

/// The VRL expression language.
///
/// # Panics
///
/// If [`vrl_grammar`] fails.
#[must_use]
pub fn vrl_language() -> Language {
    vrl_grammar().expect("vrl grammar is well formed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{Action, StateId};

    #[test]
    fn test_statements_kind_ids_are_stable() {
        let language = statements_language();
        assert_eq!(language.kind_by_name("identifier", true), Some(SyntaxKind(2)));
        assert_eq!(language.kind_by_name("whitespace", true), Some(SyntaxKind(7)));
        assert_eq!(language.kind_by_name("_items", true), Some(SyntaxKind(10)));
        assert_eq!(language.state_count(), 16);
        assert_eq!(language.production_count(), 11);
    }

    #[test]
    fn test_operator_conflict_is_kept() {
        let language = statements_language();
        let plus = language.kind_by_name("+", false).unwrap();
        let actions = language.actions(StateId(14), plus);
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], Action::Shift(_)));
        assert!(matches!(actions[1], Action::Reduce(_)));
    }

    #[test]
    fn test_ambiguous_language_forks_on_x() {
        let language = ambiguous_language();
        let x = language.kind_by_name("x", false).unwrap();
        assert_eq!(language.actions(StateId(4), x).len(), 2);
    }

    #[test]
    fn test_vrl_table_is_deterministic() {
        let language = vrl_language();
        assert_eq!(language.state_count(), 24);
        assert_eq!(language.production_count(), 18);
        for state in 0..24 {
            for terminal in 0..language.symbol_count() {
                let kind = SyntaxKind(u16::try_from(terminal).unwrap());
                assert!(language.actions(StateId(state), kind).len() <= 1, "state {state}");
            }
        }
    }

    #[test]
    fn test_vrl_newline_is_a_sync_extra() {
        let language = vrl_language();
        let newline = language.kind_by_name("newline", true).unwrap();
        assert!(language.is_sync(newline));
        assert!(language.significant_terminals().contains(newline));
        let whitespace = language.kind_by_name("whitespace", true).unwrap();
        assert!(!language.significant_terminals().contains(whitespace));
    }
}
