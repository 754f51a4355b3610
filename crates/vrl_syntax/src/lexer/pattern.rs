//! Lexical patterns.
//!
//! A [`Pattern`] is a small regular-expression AST. Patterns are compiled to
//! Thompson NFAs ([`Nfa`]) when a language is built; only the NFA is stored
//! in the grammar artifact.

use crate::lexer::nfa::{Nfa, NfaBuilder};
use regex_syntax::hir::{Class, Hir, HirKind, Literal};
use regex_syntax::ParserBuilder;
use std::fmt;
use thiserror::Error;

/// Lexical pattern for a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Exact text such as `let` or `??`
    Literal(String),
    CharClass(CharSet),
    /// Any character except a newline
    Any,
    Seq(Vec<Pattern>),
    Alt(Vec<Pattern>),
    Repeat {
        pattern: Box<Pattern>,
        min: u32,
        max: Option<u32>,
    },
}

/// Set of characters as inclusive ranges, optionally negated
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharSet {
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharSet {
    #[must_use]
    pub const fn new(ranges: Vec<(char, char)>) -> Self {
        Self {
            ranges,
            negated: false,
        }
    }

    #[must_use]
    pub fn single(c: char) -> Self {
        Self::new(vec![(c, c)])
    }

    #[must_use]
    pub fn digits() -> Self {
        Self::new(vec![('0', '9')])
    }

    /// `[_a-zA-Z0-9]`
    #[must_use]
    pub fn word() -> Self {
        Self::new(vec![('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')])
    }

    /// Space, tab, carriage return and newline
    #[must_use]
    pub fn whitespace() -> Self {
        Self::new(vec![('\t', '\n'), ('\r', '\r'), (' ', ' ')])
    }

    #[must_use]
    pub fn range(mut self, start: char, end: char) -> Self {
        self.ranges.push((start.min(end), start.max(end)));
        self
    }

    #[must_use]
    pub fn with(mut self, c: char) -> Self {
        self.ranges.push((c, c));
        self
    }

    #[must_use]
    pub fn union(mut self, other: &Self) -> Self {
        for range in other.normalized() {
            self.ranges.push(range);
        }
        self
    }

    #[must_use]
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        let inside = self.ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi);
        inside != self.negated
    }

    /// Sorted, merged, non-negated ranges covering exactly the matched characters.
    #[must_use]
    pub fn normalized(&self) -> Vec<(char, char)> {
        let mut ranges = self.ranges.clone();
        ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if next_char(last.1).is_some_and(|n| n >= lo) || last.1 >= lo => {
                    last.1 = last.1.max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        if !self.negated {
            return merged;
        }
        let mut complement = Vec::with_capacity(merged.len() + 1);
        let mut cursor = Some('\0');
        for (lo, hi) in merged {
            if let Some(start) = cursor {
                if start < lo {
                    if let Some(end) = prev_char(lo) {
                        complement.push((start, end));
                    }
                }
            }
            cursor = next_char(hi);
        }
        if let Some(start) = cursor {
            complement.push((start, char::MAX));
        }
        complement
    }
}

fn next_char(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        char::MAX => None,
        _ => char::from_u32(u32::from(c) + 1),
    }
}

fn prev_char(c: char) -> Option<char> {
    match c {
        '\0' => None,
        '\u{E000}' => Some('\u{D7FF}'),
        _ => char::from_u32(u32::from(c) - 1),
    }
}

/// Largest repetition count a pattern may use; each repetition is unrolled
/// into the NFA.
pub const MAX_REPEAT: u32 = 1000;

/// Error raised by [`Pattern::regex`] and [`Pattern::check`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pattern `{pattern}` at byte {offset}: {message}")]
pub struct PatternError {
    pub pattern: String,
    /// Byte offset of the offending construct; 0 when it cannot be located
    pub offset: usize,
    pub message: String,
}

impl PatternError {
    fn from_syntax(source: &str, error: &regex_syntax::Error) -> Self {
        let (offset, message) = match error {
            regex_syntax::Error::Parse(error) => (error.span().start.offset, error.kind().to_string()),
            regex_syntax::Error::Translate(error) => (error.span().start.offset, error.kind().to_string()),
            other => (0, other.to_string()),
        };
        Self {
            pattern: source.to_string(),
            offset,
            message,
        }
    }
}

impl Pattern {
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub const fn class(set: CharSet) -> Self {
        Self::CharClass(set)
    }

    #[must_use]
    pub const fn seq(parts: Vec<Self>) -> Self {
        Self::Seq(parts)
    }

    #[must_use]
    pub const fn alt(choices: Vec<Self>) -> Self {
        Self::Alt(choices)
    }

    #[must_use]
    pub fn optional(self) -> Self {
        self.repeat(0, Some(1))
    }

    #[must_use]
    pub fn star(self) -> Self {
        self.repeat(0, None)
    }

    #[must_use]
    pub fn plus(self) -> Self {
        self.repeat(1, None)
    }

    #[must_use]
    pub fn repeat(self, min: u32, max: Option<u32>) -> Self {
        Self::Repeat {
            pattern: Box::new(self),
            min,
            max,
        }
    }

    /// True for a plain literal; literals win ties against other patterns.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Parse a regular expression with `regex-syntax` and lower it.
    ///
    /// Everything the `regex` crate accepts is allowed except look-around
    /// assertions (`^`, `$`, `\b` and friends), which a longest-match lexer
    /// has no use for. Repetition counts are capped at [`MAX_REPEAT`].
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] for malformed syntax, look-around, or an
    /// oversized repetition count.
    pub fn regex(source: &str) -> Result<Self, PatternError> {
        let hir = ParserBuilder::new()
            .build()
            .parse(source)
            .map_err(|error| PatternError::from_syntax(source, &error))?;
        lower(&hir).map_err(|message| PatternError {
            pattern: source.to_string(),
            offset: 0,
            message,
        })
    }

    /// Reject repetition counts above [`MAX_REPEAT`] in a hand-built pattern.
    ///
    /// # Errors
    ///
    /// Names the first oversized repetition.
    pub fn check(&self) -> Result<(), PatternError> {
        let mut work = vec![self];
        while let Some(pattern) = work.pop() {
            match pattern {
                Self::Seq(parts) | Self::Alt(parts) => work.extend(parts),
                Self::Repeat { pattern: inner, min, max } => {
                    check_repeat(*min, *max).map_err(|message| PatternError {
                        pattern: self.to_string(),
                        offset: 0,
                        message,
                    })?;
                    work.push(inner.as_ref());
                }
                Self::Literal(_) | Self::CharClass(_) | Self::Any => {}
            }
        }
        Ok(())
    }

    /// Compile to a Thompson NFA.
    #[must_use]
    pub fn compile(&self) -> Nfa {
        let mut builder = NfaBuilder::default();
        let accept = builder.accepting();
        let start = self.emit(&mut builder, accept);
        builder.finish(start)
    }

    /// Emit states matching `self` then continuing at `next`; returns the entry state.
    fn emit(&self, builder: &mut NfaBuilder, next: u32) -> u32 {
        match self {
            Self::Literal(text) => text.chars().rev().fold(next, |target, c| {
                builder.transition(vec![(c, c)], target)
            }),
            Self::CharClass(set) => builder.transition(set.normalized(), next),
            Self::Any => builder.transition(CharSet::single('\n').negate().normalized(), next),
            Self::Seq(parts) => parts
                .iter()
                .rev()
                .fold(next, |target, part| part.emit(builder, target)),
            Self::Alt(choices) => {
                let entries: Vec<u32> = choices.iter().map(|c| c.emit(builder, next)).collect();
                builder.split(entries)
            }
            Self::Repeat { pattern, min, max } => {
                let mut target = next;
                match max {
                    None => {
                        let pivot = builder.split(Vec::new());
                        let body = pattern.emit(builder, pivot);
                        builder.patch_split(pivot, vec![body, target]);
                        target = pivot;
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let body = pattern.emit(builder, target);
                            target = builder.split(vec![body, target]);
                        }
                    }
                }
                for _ in 0..*min {
                    target = pattern.emit(builder, target);
                }
                target
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "{text:?}"),
            Self::CharClass(set) => {
                f.write_str(if set.negated { "[^" } else { "[" })?;
                for (lo, hi) in &set.ranges {
                    if lo == hi {
                        write!(f, "{}", lo.escape_debug())?;
                    } else {
                        write!(f, "{}-{}", lo.escape_debug(), hi.escape_debug())?;
                    }
                }
                f.write_str("]")
            }
            Self::Any => f.write_str("."),
            Self::Seq(parts) => parts.iter().try_for_each(|p| write!(f, "({p})")),
            Self::Alt(choices) => {
                for (i, choice) in choices.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{choice}")?;
                }
                Ok(())
            }
            Self::Repeat { pattern, min, max } => match (min, max) {
                (0, None) => write!(f, "({pattern})*"),
                (1, None) => write!(f, "({pattern})+"),
                (0, Some(1)) => write!(f, "({pattern})?"),
                (m, None) => write!(f, "({pattern}){{{m},}}"),
                (m, Some(n)) => write!(f, "({pattern}){{{m},{n}}}"),
            },
        }
    }
}

fn check_repeat(min: u32, max: Option<u32>) -> Result<(), String> {
    let count = max.unwrap_or(min).max(min);
    if count > MAX_REPEAT {
        return Err(format!("repetition count {count} exceeds {MAX_REPEAT}"));
    }
    Ok(())
}

fn lower(hir: &Hir) -> Result<Pattern, String> {
    Ok(match hir.kind() {
        HirKind::Empty => Pattern::Seq(Vec::new()),
        HirKind::Literal(Literal(bytes)) => {
            let text = std::str::from_utf8(bytes).map_err(|_| "literal is not valid UTF-8".to_string())?;
            Pattern::literal(text)
        }
        HirKind::Class(Class::Unicode(class)) => Pattern::CharClass(CharSet::new(
            class.ranges().iter().map(|range| (range.start(), range.end())).collect(),
        )),
        HirKind::Class(Class::Bytes(class)) => {
            if !class.is_ascii() {
                return Err("byte classes must stay within ASCII".to_string());
            }
            Pattern::CharClass(CharSet::new(
                class
                    .ranges()
                    .iter()
                    .map(|range| (char::from(range.start()), char::from(range.end())))
                    .collect(),
            ))
        }
        HirKind::Look(look) => return Err(format!("look-around assertion {look:?} is not supported")),
        HirKind::Repetition(repetition) => {
            check_repeat(repetition.min, repetition.max)?;
            lower(&repetition.sub)?.repeat(repetition.min, repetition.max)
        }
        HirKind::Capture(capture) => lower(&capture.sub)?,
        HirKind::Concat(parts) => Pattern::Seq(parts.iter().map(lower).collect::<Result<_, _>>()?),
        HirKind::Alternation(choices) => Pattern::Alt(choices.iter().map(lower).collect::<Result<_, _>>()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longest(pattern: &Pattern, text: &str) -> Option<usize> {
        pattern.compile().longest_match(text, 0).len
    }

    #[test]
    fn test_literal_match() {
        let p = Pattern::literal("let");
        assert_eq!(longest(&p, "let x"), Some(3));
        assert_eq!(longest(&p, "le"), None);
    }

    #[test]
    fn test_regex_keeps_plain_text_literal() {
        assert_eq!(Pattern::regex("abc").unwrap(), Pattern::literal("abc"));
        assert_eq!(Pattern::regex(r"\?\?").unwrap(), Pattern::literal("??"));
        assert!(!Pattern::regex("a+").unwrap().is_literal());
    }

    #[test]
    fn test_identifier_regex() {
        let p = Pattern::regex("[_a-zA-Z][a-zA-Z0-9_]*").unwrap();
        assert_eq!(longest(&p, "foo_bar9 = 1"), Some(8));
        assert_eq!(longest(&p, "9abc"), None);
    }

    #[test]
    fn test_integer_regex_with_optional_sign() {
        let p = Pattern::regex("-?(0|[1-9][_0-9]*)").unwrap();
        assert_eq!(longest(&p, "-1_000;"), Some(6));
        assert_eq!(longest(&p, "0123"), Some(1));
    }

    #[test]
    fn test_comment_regex() {
        let p = Pattern::regex("#.*").unwrap();
        assert_eq!(longest(&p, "# hi\nnext"), Some(4));
    }

    #[test]
    fn test_bounded_repeat() {
        let p = Pattern::regex("a{2,3}").unwrap();
        assert_eq!(longest(&p, "a"), None);
        assert_eq!(longest(&p, "aaaa"), Some(3));
        let exact = Pattern::regex("x{2}").unwrap();
        assert_eq!(longest(&exact, "xxx"), Some(2));
    }

    #[test]
    fn test_negated_class_spans_unicode() {
        let p = Pattern::regex("[^'\\\\]+").unwrap();
        assert_eq!(longest(&p, "héllo'"), Some(6));
    }

    #[test]
    fn test_normalized_complement() {
        let set = CharSet::new(vec![('b', 'c'), ('a', 'a')]).negate();
        let ranges = set.normalized();
        assert_eq!(ranges[0], ('\0', '`'));
        assert_eq!(ranges[1], ('d', char::MAX));
    }

    #[test]
    fn test_regex_errors() {
        assert!(Pattern::regex("(ab").is_err());
        assert!(Pattern::regex("ab)").is_err());
        assert!(Pattern::regex("[a-").is_err());
        assert!(Pattern::regex("*a").is_err());
        assert!(Pattern::regex("a{3,1}").is_err());
    }

    #[test]
    fn test_regex_error_points_at_construct() {
        let error = Pattern::regex("ab)").unwrap_err();
        assert_eq!(error.offset, 2);
        assert_eq!(error.pattern, "ab)");
    }

    #[test]
    fn test_look_around_is_rejected() {
        for source in ["^let", "let$", r"\bword", r"a\B"] {
            let error = Pattern::regex(source).unwrap_err();
            assert!(error.message.contains("look-around"), "{source}: {error}");
        }
    }

    #[test]
    fn test_repetition_counts_are_capped() {
        assert!(Pattern::regex("a{1000}").is_ok());
        let error = Pattern::regex("a{4000000000}").unwrap_err();
        assert!(error.message.contains("exceeds 1000"), "{error}");
        assert!(Pattern::regex("a{2,1001}").is_err());
        assert!(Pattern::regex("(ab){1001,}").is_err());

        assert!(Pattern::literal("a").repeat(0, Some(MAX_REPEAT)).check().is_ok());
        let nested = Pattern::seq(vec![Pattern::literal("x"), Pattern::literal("a").repeat(5000, None)]);
        assert!(nested.check().is_err());
    }

    #[test]
    fn test_unicode_classes_lower_to_ranges() {
        let p = Pattern::regex(r"\p{Greek}+").unwrap();
        assert_eq!(longest(&p, "λόγος!"), Some("λόγος".len()));
        let word = Pattern::regex(r"\w+").unwrap();
        assert_eq!(longest(&word, "été_1 x"), Some("été_1".len()));
    }
}
