//! Error recovery.
//!
//! When no stack can take a token, the parser continues from the stack with
//! the fewest recoveries. Tokens are skipped (lexed against the significant
//! terminals, so only sync extras such as a line break surface as tokens)
//! until a sync token or the end of input. The parser then tries popping 0, 1, 2, ... frames: the
//! popped elements and the skipped tokens become one `ERROR` node attached
//! to the exposed frame, and the sync token is fed to the result. The first
//! depth at which the sync token shifts or accepts wins. If none does, the
//! sync token joins the skipped tokens and skipping continues.
//!
//! Whether a depth can take the sync token depends only on states, so each
//! depth is first checked on the bare state sequence and the `ERROR` node is
//! built only for a depth that resumes. A run of sync tokens that fit nowhere
//! costs one table check per depth and token.
//!
//! Every attempt consumes at least the sync token, so recovery always makes
//! progress, and at the end of input the parse is abandoned into a root that
//! wraps everything in an `ERROR` node.

use super::build::{self, token_element, NodeBuilder};
use super::driver::{ParseRun, Step};
use super::stack::ParseStack;
use crate::error::ParseError;
use crate::language::{Action, StateId};
use crate::lexer::Lexeme;
use crate::syntax::{GreenElement, SyntaxKind};
use hashbrown::HashSet;
use std::collections::VecDeque;

impl ParseRun<'_> {
    /// Recover from `failing`, which no stack in `stacks` could take.
    pub(super) fn recover(&mut self, stacks: &[ParseStack], failing: Lexeme) -> Result<Step, ParseError> {
        let Some(base) = stacks.iter().min_by_key(|stack| stack.errors).cloned() else {
            return Ok(Step::Abandoned(build::fallback_root(self.language, &[])));
        };
        self.metrics.errors_recovered += 1;
        log::debug!(
            "syntax error at {}: unexpected {}",
            failing.token.range,
            self.language.kind_name(failing.token.kind)
        );

        let mut skipped = Vec::new();
        let mut sync = if self.language.is_sync(failing.token.kind) {
            failing
        } else {
            skipped.push(failing);
            self.skip_to_sync(&mut skipped)?
        };

        let states = base.states();
        loop {
            for popped in 0..base.depth() {
                if !self.resumes(&states[..states.len() - popped], sync.token.kind) {
                    continue;
                }
                let Some(attempt) = self.attempt(&base, popped, &skipped) else {
                    continue;
                };
                match self.step(std::slice::from_ref(&attempt), &sync) {
                    Step::Failed => {}
                    step => {
                        log::debug!(
                            "resumed at {} after popping {popped} frames and skipping {} tokens",
                            sync.token.range,
                            skipped.len()
                        );
                        return Ok(step);
                    }
                }
            }
            if sync.token.is_end() {
                log::debug!("no state accepts the end of input; abandoning parse");
                return Ok(Step::Abandoned(self.abandoned_root(&base, &skipped, &sync)));
            }
            skipped.push(sync);
            sync = self.skip_to_sync(&mut skipped)?;
        }
    }

    /// Whether a stack with `states` (bottom up) shifts or accepts `terminal`
    /// after some sequence of reductions, following the same order and limits
    /// as a real step.
    fn resumes(&self, states: &[StateId], terminal: SyntaxKind) -> bool {
        let language = self.language;
        let mut seen: HashSet<Vec<StateId>> = HashSet::from_iter([states.to_vec()]);
        let mut work = VecDeque::from([states.to_vec()]);
        let mut reductions = 0usize;
        while let Some(stack) = work.pop_front() {
            let Some(&top) = stack.last() else {
                continue;
            };
            for &action in language.actions(top, terminal) {
                let Action::Reduce(id) = action else {
                    return true;
                };
                if reductions >= self.config.max_reductions_per_token {
                    continue;
                }
                reductions += 1;
                let Some(production) = language.production(id) else {
                    continue;
                };
                let rhs_len = usize::from(production.rhs_len);
                if rhs_len >= stack.len() {
                    continue;
                }
                let mut next = stack[..stack.len() - rhs_len].to_vec();
                let Some(target) = next.last().and_then(|&state| language.goto(state, production.lhs)) else {
                    continue;
                };
                next.push(target);
                if seen.insert(next.clone()) {
                    work.push_back(next);
                }
            }
        }
        false
    }

    /// Lex in error mode, pushing non-sync lexemes onto `skipped`, and return
    /// the first sync lexeme (possibly `end`).
    fn skip_to_sync(&mut self, skipped: &mut Vec<Lexeme>) -> Result<Lexeme, ParseError> {
        let language = self.language;
        let significant = language.significant_terminals();
        loop {
            let lexeme = self.lex(significant)?;
            if language.is_sync(lexeme.token.kind) {
                return Ok(lexeme);
            }
            skipped.push(lexeme);
        }
    }

    /// `base` with `popped` frames removed and the error node attached, or
    /// `None` when the error node would be empty.
    fn attempt(&self, base: &ParseStack, popped: usize, skipped: &[Lexeme]) -> Option<ParseStack> {
        let (kept, frames) = base.pop(popped)?;
        let mut error = NodeBuilder::new(self.language);
        for frame in &frames {
            error.extend(frame.elements());
        }
        let mut leading = Vec::new();
        for (index, lexeme) in skipped.iter().enumerate() {
            let trivia = lexeme.trivia.iter().map(|trivia| token_element(trivia, self.text));
            if index == 0 && frames.is_empty() {
                leading.extend(trivia);
            } else {
                for element in trivia {
                    error.push(element, None);
                }
            }
            error.push(token_element(&lexeme.token, self.text), None);
        }
        if error.is_empty() {
            return None;
        }
        let node: GreenElement = error.finish(SyntaxKind::ERROR).into();
        let mut attempt = kept.attach(leading).attach([node]);
        attempt.errors = attempt.errors.saturating_add(1);
        Some(attempt)
    }

    /// Root wrapping every element of `base`, the skipped lexemes and the
    /// trivia before the end of input.
    fn abandoned_root(
        &self,
        base: &ParseStack,
        skipped: &[Lexeme],
        end: &Lexeme,
    ) -> std::sync::Arc<crate::syntax::GreenNode> {
        let mut elements = base.elements();
        for lexeme in skipped.iter().chain(std::iter::once(end)) {
            elements.extend(lexeme.trivia.iter().map(|trivia| token_element(trivia, self.text)));
            if !lexeme.token.is_end() {
                elements.push(token_element(&lexeme.token, self.text));
            }
        }
        build::fallback_root(self.language, &elements)
    }
}
