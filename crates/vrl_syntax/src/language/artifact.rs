//! Binary grammar artifact.
//!
//! Layout (little endian):
//!
//! ```text
//! magic "VRLG" | version u16 | flags u16 | payload length u32 | FNV-1a 64 u64 | payload
//! ```
//!
//! The payload holds, in order: the language name, symbols, field names, the
//! start symbol, lexical matchers (NFAs), productions and parse states. Strings
//! are a `u32` length followed by UTF-8 bytes; sequences are a `u32` count
//! followed by their items.

use super::{ActionList, LanguageTables, ParseState, Production, ProductionField, StateId, SymbolInfo};
use crate::error::InvalidGrammar;
use crate::language::Action;
use crate::lexer::{Nfa, NfaState};
use crate::syntax::{FieldId, SyntaxKind};
use smallvec::SmallVec;

pub const ARTIFACT_MAGIC: &[u8; 4] = b"VRLG";
pub const ARTIFACT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 2 + 2 + 4 + 8;
const NO_MATCHER: u32 = u32::MAX;

/// FNV-1a, 64-bit
fn checksum(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

pub(super) fn encode(tables: &LanguageTables) -> Vec<u8> {
    let mut payload = Writer::default();
    payload.str(&tables.name);

    payload.len(tables.symbols.len());
    for symbol in &tables.symbols {
        payload.str(&symbol.name);
        payload.u8(symbol.flags);
        payload.u8(symbol.lex_precedence.to_le_bytes()[0]);
        payload.u32(symbol.matcher.unwrap_or(NO_MATCHER));
    }

    payload.len(tables.fields.len());
    for field in &tables.fields {
        payload.str(field);
    }

    payload.u16(tables.start.0);

    payload.len(tables.matchers.len());
    for nfa in &tables.matchers {
        payload.u32(nfa.start());
        payload.len(nfa.states().len());
        for state in nfa.states() {
            payload.u8(u8::from(state.accepting));
            payload.len(state.transitions.len());
            for &((lo, hi), target) in &state.transitions {
                payload.u32(u32::from(lo));
                payload.u32(u32::from(hi));
                payload.u32(target);
            }
            payload.len(state.epsilon.len());
            for &target in &state.epsilon {
                payload.u32(target);
            }
        }
    }

    payload.len(tables.productions.len());
    for production in &tables.productions {
        payload.u16(production.lhs.0);
        payload.u16(production.rhs_len);
        payload.u16(u16::try_from(production.fields.len()).unwrap_or(u16::MAX));
        for field in production.fields.iter() {
            payload.u16(field.position);
            payload.u16(field.field.0);
        }
    }

    payload.len(tables.states.len());
    for state in &tables.states {
        payload.len(state.actions.len());
        for (terminal, actions) in state.actions.iter() {
            payload.u16(terminal.0);
            payload.u8(u8::try_from(actions.len()).unwrap_or(u8::MAX));
            for action in actions {
                payload.u8(action.tag());
                payload.u32(action.operand());
            }
        }
        payload.len(state.gotos.len());
        for (nonterminal, target) in state.gotos.iter() {
            payload.u16(nonterminal.0);
            payload.u32(target.0);
        }
    }

    let payload = payload.bytes;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(ARTIFACT_MAGIC);
    out.extend_from_slice(&ARTIFACT_VERSION.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&u32::try_from(payload.len()).unwrap_or(u32::MAX).to_le_bytes());
    out.extend_from_slice(&checksum(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

pub(super) fn decode(bytes: &[u8]) -> Result<LanguageTables, InvalidGrammar> {
    let mut header = Reader::new(bytes);
    if header.take(4, "magic").map_err(|_| InvalidGrammar::BadMagic)? != ARTIFACT_MAGIC {
        return Err(InvalidGrammar::BadMagic);
    }
    let version = header.u16("version")?;
    if version != ARTIFACT_VERSION {
        return Err(InvalidGrammar::UnsupportedVersion {
            found: version,
            expected: ARTIFACT_VERSION,
        });
    }
    let flags = header.u16("header flags")?;
    if flags != 0 {
        return Err(InvalidGrammar::inconsistent(format!("unknown header flags {flags:#06x}")));
    }
    let declared = header.u32("payload length")? as usize;
    let expected = header.u64("checksum")?;
    let payload = &bytes[HEADER_LEN..];
    if declared != payload.len() {
        return Err(InvalidGrammar::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    let actual = checksum(payload);
    if actual != expected {
        return Err(InvalidGrammar::ChecksumMismatch { expected, actual });
    }

    let mut r = Reader::new(payload);
    let name = r.str("language name")?;

    let symbol_count = r.len("symbol count", 7)?;
    let mut symbols = Vec::with_capacity(symbol_count);
    for _ in 0..symbol_count {
        let name = r.str("symbol name")?;
        let flags = r.u8("symbol flags")?;
        let lex_precedence = i8::from_le_bytes([r.u8("symbol precedence")?]);
        let matcher = r.u32("symbol matcher")?;
        symbols.push(SymbolInfo {
            name,
            flags,
            lex_precedence,
            matcher: (matcher != NO_MATCHER).then_some(matcher),
        });
    }

    let field_count = r.len("field count", 4)?;
    let fields = (0..field_count)
        .map(|_| r.str("field name"))
        .collect::<Result<Vec<_>, _>>()?;

    let start = SyntaxKind(r.u16("start symbol")?);

    let matcher_count = r.len("matcher count", 8)?;
    let mut matchers = Vec::with_capacity(matcher_count);
    for _ in 0..matcher_count {
        let start = r.u32("matcher start")?;
        let state_count = r.len("matcher state count", 9)?;
        let mut states = Vec::with_capacity(state_count);
        for _ in 0..state_count {
            let accepting = match r.u8("matcher accept flag")? {
                0 => false,
                1 => true,
                other => {
                    return Err(InvalidGrammar::inconsistent(format!(
                        "matcher accept flag {other} is not a boolean"
                    )));
                }
            };
            let transition_count = r.len("matcher transitions", 12)?;
            let mut transitions = SmallVec::with_capacity(transition_count);
            for _ in 0..transition_count {
                let lo = r.char("transition range start")?;
                let hi = r.char("transition range end")?;
                transitions.push(((lo, hi), r.u32("transition target")?));
            }
            let epsilon_count = r.len("matcher epsilons", 4)?;
            let epsilon = (0..epsilon_count)
                .map(|_| r.u32("epsilon target"))
                .collect::<Result<SmallVec<_>, _>>()?;
            states.push(NfaState {
                transitions,
                epsilon,
                accepting,
            });
        }
        matchers.push(Nfa::from_parts(states, start));
    }

    let production_count = r.len("production count", 6)?;
    let mut productions = Vec::with_capacity(production_count);
    for _ in 0..production_count {
        let lhs = SyntaxKind(r.u16("production lhs")?);
        let rhs_len = r.u16("production length")?;
        let field_count = r.u16("production field count")?;
        let fields = (0..field_count)
            .map(|_| {
                Ok(ProductionField {
                    position: r.u16("field position")?,
                    field: FieldId(r.u16("field id")?),
                })
            })
            .collect::<Result<Vec<_>, InvalidGrammar>>()?;
        productions.push(Production {
            lhs,
            rhs_len,
            fields: fields.into_boxed_slice(),
        });
    }

    let state_count = r.len("state count", 8)?;
    let mut states = Vec::with_capacity(state_count);
    for _ in 0..state_count {
        let action_rows = r.len("action row count", 3)?;
        let mut actions = Vec::with_capacity(action_rows);
        for _ in 0..action_rows {
            let terminal = SyntaxKind(r.u16("action terminal")?);
            let count = r.u8("action count")?;
            let mut list = ActionList::new();
            for _ in 0..count {
                let tag = r.u8("action tag")?;
                let operand = r.u32("action operand")?;
                let action = Action::from_parts(tag, operand)
                    .ok_or_else(|| InvalidGrammar::inconsistent(format!("unknown action tag {tag}")))?;
                list.push(action);
            }
            actions.push((terminal, list));
        }
        let goto_rows = r.len("goto row count", 6)?;
        let gotos = (0..goto_rows)
            .map(|_| Ok((SyntaxKind(r.u16("goto symbol")?), StateId(r.u32("goto target")?))))
            .collect::<Result<Vec<_>, InvalidGrammar>>()?;
        states.push(ParseState {
            actions: actions.into_boxed_slice(),
            gotos: gotos.into_boxed_slice(),
        });
    }

    if r.remaining() > 0 {
        return Err(InvalidGrammar::TrailingBytes(r.remaining()));
    }

    Ok(LanguageTables {
        name,
        symbols,
        fields,
        start,
        matchers,
        productions,
        states,
    })
}

#[derive(Default)]
struct Writer {
    bytes: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn len(&mut self, len: usize) {
        self.u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    fn str(&mut self, value: &str) {
        self.len(value.len());
        self.bytes.extend_from_slice(value.as_bytes());
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], InvalidGrammar> {
        let end = self.pos.checked_add(n).ok_or(InvalidGrammar::Truncated(what))?;
        let slice = self.bytes.get(self.pos..end).ok_or(InvalidGrammar::Truncated(what))?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], InvalidGrammar> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, InvalidGrammar> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, InvalidGrammar> {
        self.array(what).map(u16::from_le_bytes)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, InvalidGrammar> {
        self.array(what).map(u32::from_le_bytes)
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, InvalidGrammar> {
        self.array(what).map(u64::from_le_bytes)
    }

    /// Sequence length; rejects counts that cannot fit in the remaining bytes.
    fn len(&mut self, what: &'static str, min_item_size: usize) -> Result<usize, InvalidGrammar> {
        let count = self.u32(what)? as usize;
        if count.saturating_mul(min_item_size) > self.remaining() {
            return Err(InvalidGrammar::Truncated(what));
        }
        Ok(count)
    }

    fn char(&mut self, what: &'static str) -> Result<char, InvalidGrammar> {
        let raw = self.u32(what)?;
        char::from_u32(raw)
            .ok_or_else(|| InvalidGrammar::inconsistent(format!("{what} {raw:#x} is not a scalar value")))
    }

    fn str(&mut self, what: &'static str) -> Result<String, InvalidGrammar> {
        let len = self.len(what, 1)?;
        let bytes = self.take(len, what)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| InvalidGrammar::InvalidUtf8(what))
    }
}
