#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol identifier inside a loaded [`Language`](crate::language::Language).
///
/// Kinds are assigned by the grammar artifact, so they are plain numbers rather
/// than an enum. Two ids are reserved in every language:
///
/// - [`SyntaxKind::END`]: the end-of-input terminal.
/// - [`SyntaxKind::ERROR`]: the kind of error nodes and of tokens covering
///   characters no terminal matches.
///
/// Use [`Language::symbol`](crate::language::Language::symbol) to look up the
/// name and flags of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SyntaxKind(pub u16);

impl SyntaxKind {
    pub const END: Self = Self(0);
    pub const ERROR: Self = Self(1);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    #[must_use]
    pub const fn is_end(self) -> bool {
        self.0 == Self::END.0
    }
}

impl From<u16> for SyntaxKind {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Field name identifier (`left`, `operator`, ...) attached to node children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FieldId(pub u16);

impl FieldId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
