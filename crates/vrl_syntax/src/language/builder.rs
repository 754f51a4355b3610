use super::{
    flags, Action, ActionList, Language, LanguageTables, ParseState, Production, ProductionField,
    ProductionId, StateId, SymbolInfo,
};
use crate::error::LanguageError;
use crate::lexer::Pattern;
use crate::syntax::{FieldId, SyntaxKind};
use hashbrown::HashMap;
use indexmap::{IndexMap, IndexSet};

/// Assembles a [`Language`] from explicitly written tables.
///
/// Symbol ids are assigned in declaration order after the two reserved
/// terminals (`end` = 0, `ERROR` = 1). Production and state ids are the
/// indices at which they are declared; states are created on first use.
///
/// Declaration errors (duplicate names) are remembered and reported by
/// [`build`](Self::build), so calls can be chained without `?`.
///
/// ```
/// use vrl_syntax::language::LanguageBuilder;
/// use vrl_syntax::lexer::Pattern;
/// use vrl_syntax::syntax::SyntaxKind;
///
/// let mut b = LanguageBuilder::new("words");
/// let word = b.terminal("word", Pattern::regex("[a-z]+").unwrap());
/// let root = b.nonterminal("root");
/// b.start(root);
/// let p = b.production(root, &[word]);
/// b.shift(0, word, 2);
/// b.goto(0, root, 1);
/// b.accept(1);
/// b.reduce(2, SyntaxKind::END, p);
/// let language = b.build().unwrap();
/// assert_eq!(language.state_count(), 3);
/// ```
#[derive(Debug)]
pub struct LanguageBuilder {
    name: String,
    symbols: Vec<SymbolInfo>,
    patterns: Vec<Option<Pattern>>,
    names: HashMap<(String, bool), SyntaxKind>,
    fields: IndexSet<String>,
    start: Option<SyntaxKind>,
    productions: Vec<Production>,
    states: Vec<StateDraft>,
    error: Option<LanguageError>,
}

#[derive(Debug, Default)]
struct StateDraft {
    actions: IndexMap<SyntaxKind, ActionList>,
    gotos: IndexMap<SyntaxKind, StateId>,
}

impl LanguageBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut builder = Self {
            name: name.into(),
            symbols: Vec::new(),
            patterns: Vec::new(),
            names: HashMap::new(),
            fields: IndexSet::new(),
            start: None,
            productions: Vec::new(),
            states: Vec::new(),
            error: None,
        };
        builder.push_symbol("end", flags::TERMINAL, None);
        builder.push_symbol("ERROR", flags::TERMINAL | flags::VISIBLE | flags::NAMED, None);
        builder
    }

    fn push_symbol(&mut self, name: &str, symbol_flags: u8, pattern: Option<Pattern>) -> SyntaxKind {
        let named = symbol_flags & flags::NAMED != 0;
        let key = (name.to_string(), named);
        if let Some(&existing) = self.names.get(&key) {
            self.fail(LanguageError::DuplicateSymbol(name.to_string()));
            return existing;
        }
        let kind = SyntaxKind(u16::try_from(self.symbols.len()).unwrap_or(u16::MAX));
        self.symbols.push(SymbolInfo {
            name: name.to_string(),
            flags: symbol_flags,
            lex_precedence: 0,
            matcher: None,
        });
        self.patterns.push(pattern);
        self.names.insert(key, kind);
        kind
    }

    fn fail(&mut self, error: LanguageError) {
        self.error.get_or_insert(error);
    }

    fn symbol_mut(&mut self, kind: SyntaxKind) -> Option<&mut SymbolInfo> {
        self.symbols.get_mut(kind.index())
    }

    fn state_mut(&mut self, state: u32) -> &mut StateDraft {
        let index = state as usize;
        if index >= self.states.len() {
            self.states.resize_with(index + 1, StateDraft::default);
        }
        &mut self.states[index]
    }

    /// Named terminal matched by `pattern`.
    pub fn terminal(&mut self, name: &str, pattern: Pattern) -> SyntaxKind {
        let mut symbol_flags = flags::TERMINAL | flags::VISIBLE | flags::NAMED;
        if pattern.is_literal() {
            symbol_flags |= flags::LITERAL;
        }
        self.push_symbol(name, symbol_flags, Some(pattern))
    }

    /// Anonymous terminal spelled exactly `text`; its name is the text itself.
    pub fn literal(&mut self, text: &str) -> SyntaxKind {
        self.push_symbol(
            text,
            flags::TERMINAL | flags::VISIBLE | flags::LITERAL,
            Some(Pattern::literal(text)),
        )
    }

    /// Terminal that may appear between any two tokens (whitespace, comments).
    pub fn extra(&mut self, name: &str, pattern: Pattern) -> SyntaxKind {
        let mut symbol_flags = flags::TERMINAL | flags::VISIBLE | flags::NAMED | flags::EXTRA;
        if pattern.is_literal() {
            symbol_flags |= flags::LITERAL;
        }
        self.push_symbol(name, symbol_flags, Some(pattern))
    }

    /// Nonterminal; names starting with `_` are hidden and flattened into their parent.
    pub fn nonterminal(&mut self, name: &str) -> SyntaxKind {
        let symbol_flags = if name.starts_with('_') {
            flags::NAMED
        } else {
            flags::VISIBLE | flags::NAMED
        };
        self.push_symbol(name, symbol_flags, None)
    }

    /// The terminal only matches when no trivia precedes it.
    pub fn set_immediate(&mut self, kind: SyntaxKind) -> &mut Self {
        if let Some(symbol) = self.symbol_mut(kind) {
            symbol.flags |= flags::IMMEDIATE;
        }
        self
    }

    /// Marks a statement-boundary terminal used for error recovery.
    pub fn set_sync(&mut self, kind: SyntaxKind) -> &mut Self {
        if let Some(symbol) = self.symbol_mut(kind) {
            symbol.flags |= flags::SYNC;
        }
        self
    }

    pub fn set_precedence(&mut self, kind: SyntaxKind, precedence: i8) -> &mut Self {
        if let Some(symbol) = self.symbol_mut(kind) {
            symbol.lex_precedence = precedence;
        }
        self
    }

    pub fn field(&mut self, name: &str) -> FieldId {
        let (index, inserted) = self.fields.insert_full(name.to_string());
        if !inserted {
            self.fail(LanguageError::DuplicateField(name.to_string()));
        }
        FieldId(u16::try_from(index).unwrap_or(u16::MAX))
    }

    pub fn start(&mut self, kind: SyntaxKind) -> &mut Self {
        self.start = Some(kind);
        self
    }

    /// Declares `lhs -> rhs`; only the rhs length is stored.
    pub fn production(&mut self, lhs: SyntaxKind, rhs: &[SyntaxKind]) -> ProductionId {
        self.production_with_fields(lhs, rhs, &[])
    }

    /// Like [`production`](Self::production), labelling rhs positions with fields.
    pub fn production_with_fields(
        &mut self,
        lhs: SyntaxKind,
        rhs: &[SyntaxKind],
        fields: &[(usize, FieldId)],
    ) -> ProductionId {
        let id = ProductionId(u32::try_from(self.productions.len()).unwrap_or(u32::MAX));
        let mut fields: Vec<_> = fields
            .iter()
            .map(|&(position, field)| ProductionField {
                position: u16::try_from(position).unwrap_or(u16::MAX),
                field,
            })
            .collect();
        fields.sort_unstable();
        self.productions.push(Production {
            lhs,
            rhs_len: u16::try_from(rhs.len()).unwrap_or(u16::MAX),
            fields: fields.into_boxed_slice(),
        });
        id
    }

    fn action(&mut self, state: u32, terminal: SyntaxKind, action: Action) -> &mut Self {
        let list = self.state_mut(state).actions.entry(terminal).or_default();
        if !list.contains(&action) {
            list.push(action);
        }
        self
    }

    pub fn shift(&mut self, state: u32, terminal: SyntaxKind, target: u32) -> &mut Self {
        self.state_mut(target);
        self.action(state, terminal, Action::shift(target))
    }

    pub fn reduce(&mut self, state: u32, terminal: SyntaxKind, production: ProductionId) -> &mut Self {
        self.action(state, terminal, Action::Reduce(production))
    }

    /// Reduce by `production` on each of `lookahead`.
    pub fn reduce_on(
        &mut self,
        state: u32,
        lookahead: &[SyntaxKind],
        production: ProductionId,
    ) -> &mut Self {
        for &terminal in lookahead {
            self.reduce(state, terminal, production);
        }
        self
    }

    /// Accept on end of input.
    pub fn accept(&mut self, state: u32) -> &mut Self {
        self.action(state, SyntaxKind::END, Action::Accept)
    }

    pub fn goto(&mut self, state: u32, nonterminal: SyntaxKind, target: u32) -> &mut Self {
        self.state_mut(target);
        self.state_mut(state).gotos.insert(nonterminal, StateId(target));
        self
    }

    /// Compiles the matchers and validates the assembled tables.
    ///
    /// # Errors
    ///
    /// Reports the first declaration error, a missing start symbol, or any
    /// table inconsistency found by validation.
    pub fn build(self) -> Result<Language, LanguageError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let start = self.start.ok_or(LanguageError::MissingStart)?;

        let mut symbols = self.symbols;
        let mut matchers = Vec::new();
        for (symbol, pattern) in symbols.iter_mut().zip(&self.patterns) {
            if let Some(pattern) = pattern {
                pattern.check()?;
                symbol.matcher = Some(u32::try_from(matchers.len()).unwrap_or(u32::MAX));
                matchers.push(pattern.compile());
            }
        }

        let states = self
            .states
            .into_iter()
            .map(|draft| {
                let mut actions: Vec<_> = draft
                    .actions
                    .into_iter()
                    .map(|(terminal, mut list)| {
                        list.sort_unstable();
                        (terminal, list)
                    })
                    .collect();
                actions.sort_unstable_by_key(|(terminal, _)| *terminal);
                let mut gotos: Vec<_> = draft.gotos.into_iter().collect();
                gotos.sort_unstable_by_key(|(nonterminal, _)| *nonterminal);
                ParseState {
                    actions: actions.into_boxed_slice(),
                    gotos: gotos.into_boxed_slice(),
                }
            })
            .collect();

        let tables = LanguageTables {
            name: self.name,
            symbols,
            fields: self.fields.into_iter().collect(),
            start,
            matchers,
            productions: self.productions,
            states,
        };
        log::trace!(
            "building language `{}` with {} symbols and {} states",
            tables.name,
            tables.symbols.len(),
            tables.states.len()
        );
        Ok(Language::from_tables(tables)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidGrammar;

    fn tiny() -> (LanguageBuilder, SyntaxKind, SyntaxKind) {
        let mut b = LanguageBuilder::new("tiny");
        let word = b.terminal("word", Pattern::regex("[a-z]+").unwrap());
        let root = b.nonterminal("root");
        (b, word, root)
    }

    #[test]
    fn test_duplicate_symbol_is_reported_at_build() {
        let (mut b, _, root) = tiny();
        b.terminal("word", Pattern::literal("x"));
        b.start(root);
        assert_eq!(
            b.build().unwrap_err(),
            LanguageError::DuplicateSymbol("word".into())
        );
    }

    #[test]
    fn test_literal_and_named_may_share_text() {
        let mut b = LanguageBuilder::new("shared");
        let anon = b.literal("in");
        let named = b.terminal("in", Pattern::regex("in[0-9]").unwrap());
        assert_ne!(anon, named);
    }

    #[test]
    fn test_duplicate_field() {
        let (mut b, _, root) = tiny();
        b.field("left");
        b.field("left");
        b.start(root);
        assert_eq!(b.build().unwrap_err(), LanguageError::DuplicateField("left".into()));
    }

    #[test]
    fn test_missing_start() {
        let (b, _, _) = tiny();
        assert_eq!(b.build().unwrap_err(), LanguageError::MissingStart);
    }

    #[test]
    fn test_actions_are_sorted_in_table_order() {
        let (mut b, word, root) = tiny();
        b.start(root);
        let p = b.production(root, &[word]);
        b.reduce(0, word, p).shift(0, word, 1).accept(1);
        b.goto(0, root, 1);
        let language = b.build().unwrap();
        assert_eq!(
            language.actions(StateId(0), word),
            &[Action::shift(1), Action::Reduce(p)]
        );
    }

    #[test]
    fn test_oversized_action_cell_is_rejected() {
        let (mut b, word, root) = tiny();
        b.start(root);
        for _ in 0..256 {
            let p = b.production(root, &[word]);
            b.reduce(0, word, p);
        }
        b.accept(0);
        match b.build() {
            Err(LanguageError::InvalidGrammar(InvalidGrammar::Inconsistent(message))) => {
                assert!(message.contains("256 actions"), "{message}");
            }
            other => panic!("expected an inconsistent table, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_repetition_is_rejected_at_build() {
        let (mut b, _, root) = tiny();
        b.terminal("run", Pattern::literal("a").repeat(0, Some(1_000_000)));
        b.start(root);
        assert!(matches!(b.build(), Err(LanguageError::Pattern(_))));
    }

    #[test]
    fn test_hidden_nonterminal_flags() {
        let mut b = LanguageBuilder::new("hidden");
        let hidden = b.nonterminal("_list");
        let visible = b.nonterminal("list");
        assert_eq!(b.symbols[hidden.index()].flags, flags::NAMED);
        assert!(!b.symbols[hidden.index()].is_visible());
        assert!(b.symbols[visible.index()].is_named());
        assert!(b.symbols[visible.index()].is_visible());
    }

    #[test]
    fn test_validation_errors_surface() {
        let (mut b, word, root) = tiny();
        b.start(word);
        b.goto(0, root, 0);
        assert!(matches!(b.build(), Err(LanguageError::InvalidGrammar(_))));
    }
}
