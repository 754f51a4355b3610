//! # Lexer
//!
//! Grammar-directed, resumable tokenization.
//!
//! The lexer is stateless between calls: [`Lexer::next_token`] receives the
//! offset to resume from and the set of terminals the parser can accept at
//! that point, and returns the next [`Lexeme`]. The same inputs always yield
//! the same output, which is what lets incremental reparsing reuse lexing
//! decisions made before an edit.
//!
//! ## Token selection
//!
//! At each position every terminal's matcher is run. Candidates are split
//! into a preferred group (terminals valid in the current state, plus extras)
//! and the rest; the rest only compete when the preferred group is empty.
//! Within a group the winner is decided by, in order:
//!
//! 1. higher lexical precedence
//! 2. longer match
//! 3. valid terminal over extra
//! 4. literal over pattern
//! 5. lower symbol id
//!
//! An extra that is not valid in the current state is collected as trivia
//! and lexing continues after it. Immediate terminals are skipped once any
//! trivia has been collected. Input no terminal matches becomes a single
//! `ERROR` token spanning the unmatched run.

mod nfa;
mod pattern;
mod token;

pub use nfa::{CharRange, Nfa, NfaMatch, NfaState};
pub use pattern::{CharSet, Pattern, PatternError, MAX_REPEAT};
pub use token::{Lexeme, LexerState, Token};

use crate::language::{Language, SymbolInfo, TerminalSet};
use crate::syntax::{SyntaxKind, TextRange};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Tokenizer bound to one language
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'l> {
    language: &'l Language,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    kind: SyntaxKind,
    len: usize,
    precedence: i8,
    valid: bool,
    extra: bool,
    literal: bool,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.precedence
            .cmp(&other.precedence)
            .then(self.len.cmp(&other.len))
            .then(self.valid.cmp(&other.valid))
            .then(self.literal.cmp(&other.literal))
            .then(other.kind.cmp(&self.kind))
    }

    fn offer(slot: &mut Option<Self>, candidate: Self) {
        if slot.is_none_or(|best| candidate.rank(&best) == Ordering::Greater) {
            *slot = Some(candidate);
        }
    }
}

impl<'l> Lexer<'l> {
    #[must_use]
    pub const fn new(language: &'l Language) -> Self {
        Self { language }
    }

    #[must_use]
    pub const fn language(&self) -> &'l Language {
        self.language
    }

    /// Lex the next significant token at `state`, given the terminals the
    /// parser accepts there.
    ///
    /// At the end of `text` an `end` token with an empty range is returned.
    #[must_use]
    pub fn next_token(&self, text: &str, state: LexerState, valid: &TerminalSet) -> Lexeme {
        let mut trivia = SmallVec::new();
        let mut offset = state.offset.min(text.len());
        let mut point = state.point;
        let mut horizon = offset;

        loop {
            if offset >= text.len() {
                let end = TextRange::from_usize(text.len(), text.len());
                return Lexeme {
                    trivia,
                    token: Token {
                        kind: SyntaxKind::END,
                        range: end,
                        point,
                    },
                    horizon: text.len() + 1,
                };
            }

            let mut preferred = None;
            let mut fallback = None;
            for (kind, symbol, nfa) in self.language.lexable() {
                if symbol.is_immediate() && !trivia.is_empty() {
                    continue;
                }
                let found = nfa.longest_match(text, offset);
                horizon = horizon.max(found.horizon);
                let Some(len) = found.len.filter(|&len| len > 0) else {
                    continue;
                };
                let candidate = candidate(kind, symbol, len, valid);
                if candidate.valid || candidate.extra {
                    Candidate::offer(&mut preferred, candidate);
                } else {
                    Candidate::offer(&mut fallback, candidate);
                }
            }

            let (kind, end) = match preferred.or(fallback) {
                Some(winner) if winner.extra && !winner.valid => {
                    let token = Token {
                        kind: winner.kind,
                        range: TextRange::from_usize(offset, offset + winner.len),
                        point,
                    };
                    point = point.advance(token.text(text));
                    offset += winner.len;
                    trivia.push(token);
                    continue;
                }
                Some(winner) => (winner.kind, offset + winner.len),
                None => {
                    let (end, scanned) = self.unmatched_run(text, offset);
                    horizon = horizon.max(scanned);
                    log::trace!("no terminal matches at {offset}; error token up to {end}");
                    (SyntaxKind::ERROR, end)
                }
            };
            return Lexeme {
                trivia,
                token: Token {
                    kind,
                    range: TextRange::from_usize(offset, end),
                    point,
                },
                horizon,
            };
        }
    }

    /// End of the run of characters starting at `offset` where no terminal
    /// matches, paired with the horizon of that scan.
    fn unmatched_run(&self, text: &str, offset: usize) -> (usize, usize) {
        let mut horizon = offset;
        let Some(rest) = text.get(offset..) else {
            return (text.len(), text.len() + 1);
        };
        let mut chars = rest.char_indices().skip(1);
        loop {
            let Some((relative, _)) = chars.next() else {
                return (text.len(), horizon.max(text.len() + 1));
            };
            let position = offset + relative;
            let mut matched = false;
            for (_, _, nfa) in self.language.lexable() {
                let found = nfa.longest_match(text, position);
                horizon = horizon.max(found.horizon);
                if found.len.is_some_and(|len| len > 0) {
                    matched = true;
                    break;
                }
            }
            if matched {
                return (position, horizon);
            }
        }
    }

    /// Tokenize all of `text` with the significant terminals considered
    /// valid; extras are returned in place as ordinary tokens. The `end` token is
    /// not included.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let valid = self.language.significant_terminals();
        let mut tokens = Vec::new();
        let mut state = LexerState::default();
        loop {
            let lexeme = self.next_token(text, state, valid);
            tokens.extend(lexeme.trivia.iter().copied());
            if lexeme.token.is_end() {
                return tokens;
            }
            state = lexeme.end_state(text);
            tokens.push(lexeme.token);
        }
    }
}

fn candidate(kind: SyntaxKind, symbol: &SymbolInfo, len: usize, valid: &TerminalSet) -> Candidate {
    Candidate {
        kind,
        len,
        precedence: symbol.lex_precedence,
        valid: valid.contains(kind),
        extra: symbol.is_extra(),
        literal: symbol.is_literal(),
    }
}
