use super::{flags, Action, LanguageTables};
use crate::error::InvalidGrammar;
use crate::syntax::SyntaxKind;

/// Checks every cross reference in the tables.
pub(super) fn validate(tables: &LanguageTables) -> Result<(), InvalidGrammar> {
    let symbols = &tables.symbols;
    if symbols.len() < 2 || symbols.len() > usize::from(u16::MAX) {
        return Err(InvalidGrammar::inconsistent(format!(
            "symbol table has {} entries",
            symbols.len()
        )));
    }
    for reserved in [SyntaxKind::END, SyntaxKind::ERROR] {
        let symbol = &symbols[reserved.index()];
        if !symbol.is_terminal() || symbol.matcher.is_some() {
            return Err(InvalidGrammar::inconsistent(format!(
                "reserved symbol {reserved} must be a terminal without matcher"
            )));
        }
    }
    if !symbols[SyntaxKind::ERROR.index()].is_visible() {
        return Err(InvalidGrammar::inconsistent("ERROR must be visible"));
    }

    let is_terminal = |kind: SyntaxKind| symbols.get(kind.index()).map(super::SymbolInfo::is_terminal);

    for (index, symbol) in symbols.iter().enumerate() {
        if symbol.flags & !flags::ALL != 0 {
            return Err(InvalidGrammar::inconsistent(format!(
                "symbol {index} has unknown flag bits {:#04x}",
                symbol.flags
            )));
        }
        match (symbol.is_terminal(), symbol.matcher) {
            (false, Some(_)) => {
                return Err(InvalidGrammar::inconsistent(format!(
                    "nonterminal `{}` has a lexical matcher",
                    symbol.name
                )));
            }
            (true, Some(matcher)) if matcher as usize >= tables.matchers.len() => {
                return Err(InvalidGrammar::inconsistent(format!(
                    "terminal `{}` references missing matcher {matcher}",
                    symbol.name
                )));
            }
            (true, None) if index > SyntaxKind::ERROR.index() => {
                return Err(InvalidGrammar::inconsistent(format!(
                    "terminal `{}` has no matcher",
                    symbol.name
                )));
            }
            _ => {}
        }
        if !symbol.is_terminal()
            && (symbol.is_extra() || symbol.is_immediate() || symbol.is_literal() || symbol.is_sync())
        {
            return Err(InvalidGrammar::inconsistent(format!(
                "nonterminal `{}` carries lexical flags",
                symbol.name
            )));
        }
    }

    for (index, nfa) in tables.matchers.iter().enumerate() {
        nfa.validate()
            .map_err(|reason| InvalidGrammar::inconsistent(format!("matcher {index}: {reason}")))?;
    }

    match is_terminal(tables.start) {
        Some(false) if symbols[tables.start.index()].is_visible() => {}
        _ => {
            return Err(InvalidGrammar::inconsistent(format!(
                "start symbol {} must be a visible nonterminal",
                tables.start
            )));
        }
    }

    for (index, production) in tables.productions.iter().enumerate() {
        if is_terminal(production.lhs) != Some(false) {
            return Err(InvalidGrammar::inconsistent(format!(
                "production {index} has lhs {} which is not a nonterminal",
                production.lhs
            )));
        }
        if production.fields.len() > usize::from(u16::MAX) {
            return Err(InvalidGrammar::inconsistent(format!(
                "production {index} carries {} field labels",
                production.fields.len()
            )));
        }
        for field in production.fields.iter() {
            if field.position >= production.rhs_len {
                return Err(InvalidGrammar::inconsistent(format!(
                    "production {index} labels position {} beyond its {} symbols",
                    field.position, production.rhs_len
                )));
            }
            if field.field.index() >= tables.fields.len() {
                return Err(InvalidGrammar::inconsistent(format!(
                    "production {index} references missing field {}",
                    field.field.0
                )));
            }
        }
    }

    if tables.states.is_empty() {
        return Err(InvalidGrammar::inconsistent("parse table has no states"));
    }
    let state_count = tables.states.len();
    for (index, state) in tables.states.iter().enumerate() {
        if !state.actions.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err(InvalidGrammar::inconsistent(format!(
                "state {index} has unsorted or duplicate action keys"
            )));
        }
        if !state.gotos.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err(InvalidGrammar::inconsistent(format!(
                "state {index} has unsorted or duplicate goto keys"
            )));
        }
        for (terminal, actions) in state.actions.iter() {
            if is_terminal(*terminal) != Some(true) {
                return Err(InvalidGrammar::inconsistent(format!(
                    "state {index} has actions on non-terminal {terminal}"
                )));
            }
            if actions.len() > usize::from(u8::MAX) {
                return Err(InvalidGrammar::inconsistent(format!(
                    "state {index} lists {} actions on {terminal}, more than the {} a cell can hold",
                    actions.len(),
                    u8::MAX
                )));
            }
            if actions.is_empty() || !actions.windows(2).all(|w| w[0] < w[1]) {
                return Err(InvalidGrammar::inconsistent(format!(
                    "state {index} has an empty or unordered action list on {terminal}"
                )));
            }
            for action in actions {
                match *action {
                    Action::Shift(target) if target.index() >= state_count => {
                        return Err(InvalidGrammar::inconsistent(format!(
                            "state {index} shifts to missing state {}",
                            target.0
                        )));
                    }
                    Action::Shift(_) if terminal.is_end() => {
                        return Err(InvalidGrammar::inconsistent(format!(
                            "state {index} shifts the end-of-input terminal"
                        )));
                    }
                    Action::Reduce(production) if production.index() >= tables.productions.len() => {
                        return Err(InvalidGrammar::inconsistent(format!(
                            "state {index} reduces missing production {}",
                            production.0
                        )));
                    }
                    Action::Accept if !terminal.is_end() => {
                        return Err(InvalidGrammar::inconsistent(format!(
                            "state {index} accepts on {terminal}"
                        )));
                    }
                    _ => {}
                }
            }
        }
        for (nonterminal, target) in state.gotos.iter() {
            if is_terminal(*nonterminal) != Some(false) {
                return Err(InvalidGrammar::inconsistent(format!(
                    "state {index} has a goto on terminal {nonterminal}"
                )));
            }
            if target.index() >= state_count {
                return Err(InvalidGrammar::inconsistent(format!(
                    "state {index} goes to missing state {}",
                    target.0
                )));
            }
        }
    }
    Ok(())
}
