use crate::syntax::{FieldId, SyntaxKind};
use smallvec::SmallVec;
use std::fmt;

/// Parser state index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

/// Production index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(pub u32);

impl StateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl ProductionId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// LR parsing action
///
/// A state may hold several actions for one lookahead. Those are the
/// conflicts the GLR driver explores in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Shift(StateId),
    Reduce(ProductionId),
    /// Accept (successful parse); only valid on the end-of-input terminal
    Accept,
}

impl Action {
    #[must_use]
    pub const fn shift(state: u32) -> Self {
        Self::Shift(StateId(state))
    }

    #[must_use]
    pub const fn reduce(production: u32) -> Self {
        Self::Reduce(ProductionId(production))
    }

    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Shift(_) => 0,
            Self::Reduce(_) => 1,
            Self::Accept => 2,
        }
    }

    pub(crate) const fn operand(self) -> u32 {
        match self {
            Self::Shift(state) => state.0,
            Self::Reduce(production) => production.0,
            Self::Accept => 0,
        }
    }

    pub(crate) const fn from_parts(tag: u8, operand: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Shift(StateId(operand))),
            1 => Some(Self::Reduce(ProductionId(operand))),
            2 => Some(Self::Accept),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(state) => write!(f, "s{}", state.0),
            Self::Reduce(production) => write!(f, "r{}", production.0),
            Self::Accept => f.write_str("acc"),
        }
    }
}

pub type ActionList = SmallVec<[Action; 2]>;

/// Field attached to an rhs position of a production
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionField {
    pub position: u16,
    pub field: FieldId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub lhs: SyntaxKind,
    /// Number of stack entries the reduction pops
    pub rhs_len: u16,
    pub fields: Box<[ProductionField]>,
}

impl Production {
    #[must_use]
    pub fn field_at(&self, position: usize) -> Option<FieldId> {
        self.fields
            .iter()
            .find(|f| f.position as usize == position)
            .map(|f| f.field)
    }
}

/// Action and goto rows of one state, both sorted by symbol
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseState {
    pub actions: Box<[(SyntaxKind, ActionList)]>,
    pub gotos: Box<[(SyntaxKind, StateId)]>,
}

impl ParseState {
    #[must_use]
    pub fn actions(&self, terminal: SyntaxKind) -> &[Action] {
        self.actions
            .binary_search_by_key(&terminal, |(kind, _)| *kind)
            .map_or(&[], |index| self.actions[index].1.as_slice())
    }

    #[must_use]
    pub fn goto(&self, nonterminal: SyntaxKind) -> Option<StateId> {
        self.gotos
            .binary_search_by_key(&nonterminal, |(kind, _)| *kind)
            .ok()
            .map(|index| self.gotos[index].1)
    }
}

/// Dense bitset over terminal kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TerminalSet {
    words: SmallVec<[u64; 4]>,
}

impl TerminalSet {
    #[must_use]
    pub fn with_capacity(symbols: usize) -> Self {
        Self {
            words: std::iter::repeat_n(0, symbols.div_ceil(64)).collect(),
        }
    }

    pub fn insert(&mut self, kind: SyntaxKind) {
        let (word, bit) = (kind.index() / 64, kind.index() % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << bit;
    }

    #[must_use]
    pub fn contains(&self, kind: SyntaxKind) -> bool {
        let (word, bit) = (kind.index() / 64, kind.index() % 64);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    pub fn union_with(&mut self, other: &Self) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (dst, src) in self.words.iter_mut().zip(&other.words) {
            *dst |= *src;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SyntaxKind> + '_ {
        self.words.iter().enumerate().flat_map(|(word, &bits)| {
            (0..64u16)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| SyntaxKind(u16::try_from(word).unwrap_or(u16::MAX) * 64 + bit))
        })
    }
}

impl FromIterator<SyntaxKind> for TerminalSet {
    fn from_iter<I: IntoIterator<Item = SyntaxKind>>(iter: I) -> Self {
        let mut set = Self::default();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_set_membership() {
        let mut set = TerminalSet::with_capacity(10);
        set.insert(SyntaxKind(3));
        set.insert(SyntaxKind(130));
        assert!(set.contains(SyntaxKind(3)));
        assert!(set.contains(SyntaxKind(130)));
        assert!(!set.contains(SyntaxKind(4)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![SyntaxKind(3), SyntaxKind(130)]);
    }

    #[test]
    fn test_terminal_set_union() {
        let mut a: TerminalSet = [SyntaxKind(1), SyntaxKind(2)].into_iter().collect();
        let b: TerminalSet = [SyntaxKind(2), SyntaxKind(70)].into_iter().collect();
        a.union_with(&b);
        assert_eq!(a.len(), 3);
        assert!(a.contains(SyntaxKind(70)));
    }

    #[test]
    fn test_state_lookup_is_sorted_search() {
        let state = ParseState {
            actions: vec![
                (SyntaxKind(2), ActionList::from_slice(&[Action::shift(4)])),
                (SyntaxKind(5), ActionList::from_slice(&[Action::shift(1), Action::reduce(3)])),
            ]
            .into_boxed_slice(),
            gotos: vec![(SyntaxKind(9), StateId(7))].into_boxed_slice(),
        };
        assert_eq!(state.actions(SyntaxKind(5)).len(), 2);
        assert!(state.actions(SyntaxKind(3)).is_empty());
        assert_eq!(state.goto(SyntaxKind(9)), Some(StateId(7)));
        assert_eq!(state.goto(SyntaxKind(2)), None);
    }

    #[test]
    fn test_action_parts() {
        for action in [Action::shift(9), Action::reduce(2), Action::Accept] {
            assert_eq!(Action::from_parts(action.tag(), action.operand()), Some(action));
        }
        assert_eq!(Action::from_parts(7, 0), None);
    }
}
