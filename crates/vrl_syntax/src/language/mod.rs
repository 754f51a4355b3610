//! # Language tables
//!
//! A [`Language`] is the loaded, validated form of a grammar artifact: its
//! symbols, lexical matchers, productions and parse table. It is immutable and
//! cheap to clone (an `Arc` handle), so one instance can serve any number of
//! concurrent parses.
//!
//! Languages come from two places:
//!
//! - [`Language::load`] decodes the binary artifact and validates it.
//! - [`LanguageBuilder`] assembles one from explicitly written tables, mostly
//!   for tests and tooling, and can serialize it with [`Language::to_bytes`].

mod artifact;
mod builder;
mod table;
mod validate;

pub use artifact::{ARTIFACT_MAGIC, ARTIFACT_VERSION};
pub use builder::LanguageBuilder;
pub use table::{
    Action, ActionList, ParseState, Production, ProductionField, ProductionId, StateId,
    TerminalSet,
};

use crate::error::InvalidGrammar;
use crate::lexer::Nfa;
use crate::syntax::{FieldId, SyntaxKind};
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

/// Symbol flag bits as stored in the artifact
pub mod flags {
    pub const TERMINAL: u8 = 1;
    pub const VISIBLE: u8 = 1 << 1;
    pub const NAMED: u8 = 1 << 2;
    pub const EXTRA: u8 = 1 << 3;
    pub const IMMEDIATE: u8 = 1 << 4;
    pub const LITERAL: u8 = 1 << 5;
    pub const SYNC: u8 = 1 << 6;
    pub const ALL: u8 = (1 << 7) - 1;
}

/// Metadata for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    pub flags: u8,
    /// Lexical precedence; higher wins before match length is compared
    pub lex_precedence: i8,
    /// Index into the matcher table for lexable terminals
    pub matcher: Option<u32>,
}

impl SymbolInfo {
    const fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.has(flags::TERMINAL)
    }

    /// Hidden symbols are flattened into their parent.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.has(flags::VISIBLE)
    }

    #[must_use]
    pub const fn is_named(&self) -> bool {
        self.has(flags::NAMED)
    }

    #[must_use]
    pub const fn is_extra(&self) -> bool {
        self.has(flags::EXTRA)
    }

    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        self.has(flags::IMMEDIATE)
    }

    #[must_use]
    pub const fn is_literal(&self) -> bool {
        self.has(flags::LITERAL)
    }

    /// Statement-boundary terminal used to resynchronize after errors.
    #[must_use]
    pub const fn is_sync(&self) -> bool {
        self.has(flags::SYNC)
    }
}

/// Raw tables as stored in an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LanguageTables {
    pub name: String,
    pub symbols: Vec<SymbolInfo>,
    pub fields: Vec<String>,
    pub start: SyntaxKind,
    pub matchers: Vec<Nfa>,
    pub productions: Vec<Production>,
    pub states: Vec<ParseState>,
}

struct LanguageData {
    tables: LanguageTables,
    valid: Vec<TerminalSet>,
    all_terminals: TerminalSet,
    significant: TerminalSet,
    lexable: Vec<(SyntaxKind, u32)>,
    by_name: HashMap<(String, bool), SyntaxKind>,
    fields_by_name: HashMap<String, FieldId>,
}

/// Loaded grammar, shared read-only between parses
#[derive(Clone)]
pub struct Language {
    data: Arc<LanguageData>,
}

/// Entry of [`Language::kinds`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo<'a> {
    pub kind: SyntaxKind,
    pub name: &'a str,
    pub terminal: bool,
    pub named: bool,
    pub visible: bool,
    pub extra: bool,
}

impl Language {
    /// Decode and validate a grammar artifact.
    ///
    /// # Errors
    ///
    /// Any header mismatch, corruption, truncation or table inconsistency
    /// yields [`InvalidGrammar`]; nothing partially loaded is returned.
    pub fn load(bytes: &[u8]) -> Result<Self, InvalidGrammar> {
        let tables = artifact::decode(bytes)?;
        let language = Self::from_tables(tables)?;
        log::debug!(
            "loaded language `{}`: {} symbols, {} states, {} productions",
            language.name(),
            language.symbol_count(),
            language.state_count(),
            language.production_count()
        );
        Ok(language)
    }

    /// Serialize to the artifact format accepted by [`load`](Self::load).
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        artifact::encode(&self.data.tables)
    }

    pub(crate) fn from_tables(tables: LanguageTables) -> Result<Self, InvalidGrammar> {
        validate::validate(&tables)?;

        let symbol_count = tables.symbols.len();
        let mut all_terminals = TerminalSet::with_capacity(symbol_count);
        let mut significant = TerminalSet::with_capacity(symbol_count);
        let mut lexable = Vec::new();
        let mut by_name = HashMap::with_capacity(symbol_count);
        for (index, symbol) in tables.symbols.iter().enumerate() {
            let kind = SyntaxKind(u16::try_from(index).unwrap_or(u16::MAX));
            if symbol.is_terminal() {
                all_terminals.insert(kind);
                if !symbol.is_extra() || symbol.is_sync() {
                    significant.insert(kind);
                }
            }
            if let Some(matcher) = symbol.matcher {
                lexable.push((kind, matcher));
            }
            by_name
                .entry((symbol.name.clone(), symbol.is_named()))
                .or_insert(kind);
        }
        let valid = tables
            .states
            .iter()
            .map(|state| {
                let mut set = TerminalSet::with_capacity(symbol_count);
                for (terminal, _) in state.actions.iter() {
                    set.insert(*terminal);
                }
                set
            })
            .collect();
        let fields_by_name = tables
            .fields
            .iter()
            .enumerate()
            .map(|(index, name)| (name.clone(), FieldId(u16::try_from(index).unwrap_or(u16::MAX))))
            .collect();

        Ok(Self {
            data: Arc::new(LanguageData {
                tables,
                valid,
                all_terminals,
                significant,
                lexable,
                by_name,
                fields_by_name,
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.data.tables.name
    }

    #[must_use]
    pub fn start_symbol(&self) -> SyntaxKind {
        self.data.tables.start
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.data.tables.symbols.len()
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.data.tables.states.len()
    }

    #[must_use]
    pub fn production_count(&self) -> usize {
        self.data.tables.productions.len()
    }

    #[must_use]
    pub fn symbol(&self, kind: SyntaxKind) -> Option<&SymbolInfo> {
        self.data.tables.symbols.get(kind.index())
    }

    /// Name of `kind`, or `"<unknown>"` for ids outside the table.
    #[must_use]
    pub fn kind_name(&self, kind: SyntaxKind) -> &str {
        self.symbol(kind).map_or("<unknown>", |s| s.name.as_str())
    }

    #[must_use]
    pub fn is_named(&self, kind: SyntaxKind) -> bool {
        self.symbol(kind).is_some_and(SymbolInfo::is_named)
    }

    #[must_use]
    pub fn is_visible(&self, kind: SyntaxKind) -> bool {
        self.symbol(kind).is_some_and(SymbolInfo::is_visible)
    }

    #[must_use]
    pub fn is_extra(&self, kind: SyntaxKind) -> bool {
        self.symbol(kind).is_some_and(SymbolInfo::is_extra)
    }

    #[must_use]
    pub fn is_sync(&self, kind: SyntaxKind) -> bool {
        kind.is_end() || self.symbol(kind).is_some_and(SymbolInfo::is_sync)
    }

    /// Look up a kind by name. Literal terminals are anonymous (`named == false`).
    #[must_use]
    pub fn kind_by_name(&self, name: &str, named: bool) -> Option<SyntaxKind> {
        self.data.by_name.get(&(name.to_string(), named)).copied()
    }

    /// Node kind enumeration in id order.
    pub fn kinds(&self) -> impl ExactSizeIterator<Item = KindInfo<'_>> + '_ {
        self.data
            .tables
            .symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| KindInfo {
                kind: SyntaxKind(u16::try_from(index).unwrap_or(u16::MAX)),
                name: &symbol.name,
                terminal: symbol.is_terminal(),
                named: symbol.is_named(),
                visible: symbol.is_visible(),
                extra: symbol.is_extra(),
            })
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.data.tables.fields.len()
    }

    #[must_use]
    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        self.data.tables.fields.get(field.index()).map(String::as_str)
    }

    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<FieldId> {
        self.data.fields_by_name.get(name).copied()
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> Option<&Production> {
        self.data.tables.productions.get(id.index())
    }

    /// Actions for `terminal` in `state`, in shift-then-reduce order.
    #[must_use]
    pub fn actions(&self, state: StateId, terminal: SyntaxKind) -> &[Action] {
        self.data
            .tables
            .states
            .get(state.index())
            .map_or(&[], |s| s.actions(terminal))
    }

    #[must_use]
    pub fn goto(&self, state: StateId, nonterminal: SyntaxKind) -> Option<StateId> {
        self.data.tables.states.get(state.index())?.goto(nonterminal)
    }

    /// Terminals with at least one action in `state`.
    #[must_use]
    pub fn valid_terminals(&self, state: StateId) -> Option<&TerminalSet> {
        self.data.valid.get(state.index())
    }

    #[must_use]
    pub fn all_terminals(&self) -> &TerminalSet {
        &self.data.all_terminals
    }

    /// Terminals that are not extras, plus extras that are sync tokens.
    /// Lexing against this set turns every other extra into trivia.
    #[must_use]
    pub fn significant_terminals(&self) -> &TerminalSet {
        &self.data.significant
    }

    /// Terminals that own a matcher, in id order, with their matcher.
    pub(crate) fn lexable(&self) -> impl Iterator<Item = (SyntaxKind, &SymbolInfo, &Nfa)> + '_ {
        self.data.lexable.iter().filter_map(|&(kind, matcher)| {
            Some((
                kind,
                self.symbol(kind)?,
                self.data.tables.matchers.get(matcher as usize)?,
            ))
        })
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.data.tables == other.data.tables
    }
}

impl Eq for Language {}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name())
            .field("symbols", &self.symbol_count())
            .field("states", &self.state_count())
            .field("productions", &self.production_count())
            .finish()
    }
}
