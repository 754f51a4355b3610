use crate::syntax::{Point, SyntaxKind, TextRange};
use smallvec::SmallVec;

/// A token produced by the lexer.
///
/// Tokens borrow nothing: the text is recovered from the source through
/// [`range`](Self::range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: SyntaxKind,
    /// Byte range in the source text
    pub range: TextRange,
    /// Row and column of the first byte
    pub point: Point,
}

impl Token {
    #[must_use]
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.range.as_usize_range()).unwrap_or_default()
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.kind.is_end()
    }
}

/// Position the lexer resumes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LexerState {
    pub offset: usize,
    pub point: Point,
}

impl LexerState {
    #[must_use]
    pub const fn new(offset: usize, point: Point) -> Self {
        Self { offset, point }
    }
}

/// One step of lexing: the trivia skipped, the significant token after it,
/// and how far ahead the lexer looked to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    /// Extras that were not valid in the current parse state
    pub trivia: SmallVec<[Token; 2]>,
    pub token: Token,
    /// Exclusive end of the bytes inspected. Exceeds the source length when
    /// the outcome depended on where the input ends.
    pub horizon: usize,
}

impl Lexeme {
    /// State to lex the following token from.
    #[must_use]
    pub fn end_state(&self, source: &str) -> LexerState {
        LexerState {
            offset: self.token.range.end().to_usize(),
            point: self.token.point.advance(self.token.text(source)),
        }
    }

    /// Start of the first trivia token, or of the token itself.
    #[must_use]
    pub fn start(&self) -> usize {
        self.trivia
            .first()
            .unwrap_or(&self.token)
            .range
            .start()
            .to_usize()
    }
}
