use super::build::{self, token_element};
use super::checkpoint::{Checkpoint, Jump, Reuse, ReuseStats};
use super::stack::{Elements, ParseStack, StackKey};
use super::{ParseMetrics, ParserConfig};
use crate::error::{Exhaustion, ParseError};
use crate::language::{Action, Language, ProductionId, StateId, TerminalSet};
use crate::lexer::{Lexeme, Lexer, LexerState};
use crate::syntax::{GreenNode, SyntaxTree, MAX_SOURCE_LEN};
use hashbrown::HashSet;
use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::smallvec;
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of feeding one lexeme to a set of stacks.
pub(super) enum Step {
    /// Surviving stacks after the shift, in creation order
    Shifted(Vec<ParseStack>),
    Accepted(ParseStack),
    /// Recovery reached end of input without an accepting stack
    Abandoned(Arc<GreenNode>),
    Failed,
}

/// Rejects texts whose offsets would not fit a [`TextSize`](crate::syntax::TextSize).
pub(crate) fn check_source_len(len: usize) -> Result<(), ParseError> {
    if len > MAX_SOURCE_LEN {
        return Err(ParseError::ResourceExhausted {
            reason: Exhaustion::SourceTooLarge(len),
            tokens_consumed: 0,
        });
    }
    Ok(())
}

pub(crate) struct ParseOutput {
    pub tree: SyntaxTree,
    pub reuse: ReuseStats,
}

/// State of one parse call.
pub(crate) struct ParseRun<'a> {
    pub(super) language: &'a Language,
    pub(super) config: &'a ParserConfig,
    pub(super) text: &'a str,
    pub(super) lexer: Lexer<'a>,
    pub(super) stacks: Vec<ParseStack>,
    pub(super) lexer_state: LexerState,
    /// Largest lexeme horizon so far
    pub(super) horizon: usize,
    pub(super) checkpoints: Vec<Checkpoint>,
    pub(super) metrics: ParseMetrics,
    pub(super) reuse: Option<Reuse>,
    started: Instant,
}

impl<'a> ParseRun<'a> {
    pub(crate) fn new(language: &'a Language, config: &'a ParserConfig, text: &'a str) -> Self {
        let stack = ParseStack::new(StateId(0));
        let initial = Checkpoint {
            offset: 0,
            point: LexerState::default().point,
            horizon: 0,
            stack: stack.clone(),
        };
        Self {
            language,
            config,
            text,
            lexer: Lexer::new(language),
            stacks: vec![stack],
            lexer_state: LexerState::default(),
            horizon: 0,
            checkpoints: vec![initial],
            metrics: ParseMetrics::default(),
            reuse: None,
            started: Instant::now(),
        }
    }

    /// Continue from `checkpoints[..=index]` of a prior parse whose
    /// unchanged prefix this run shares.
    pub(crate) fn resume_from(
        language: &'a Language,
        config: &'a ParserConfig,
        text: &'a str,
        prior: &[Checkpoint],
        index: usize,
        reuse: Reuse,
    ) -> Self {
        let mut run = Self::new(language, config, text);
        if let Some(checkpoint) = prior.get(index) {
            run.checkpoints = prior[..=index].to_vec();
            run.stacks = vec![checkpoint.stack.clone()];
            run.lexer_state = LexerState::new(checkpoint.offset, checkpoint.point);
            run.horizon = checkpoint.horizon;
        }
        let mut reuse = reuse;
        reuse.stats.resume_offset = run.lexer_state.offset;
        run.reuse = Some(reuse);
        run
    }

    pub(crate) fn run(mut self) -> Result<ParseOutput, ParseError> {
        check_source_len(self.text.len())?;
        loop {
            let valid = self.valid_terminals();
            let lexeme = self.lex(&valid)?;
            let stacks = std::mem::take(&mut self.stacks);
            let step = match self.step(&stacks, &lexeme) {
                Step::Failed => self.recover(&stacks, lexeme)?,
                step => step,
            };
            match step {
                Step::Shifted(next) => {
                    self.stacks = next;
                    self.after_shift();
                }
                Step::Accepted(stack) => {
                    let root = build::root_node(self.language, &stack_frames(&stack));
                    return Ok(self.finish(root));
                }
                Step::Abandoned(root) => return Ok(self.finish(root)),
                Step::Failed => {
                    let root = build::fallback_root(self.language, &[]);
                    return Ok(self.finish(root));
                }
            }
        }
    }

    fn finish(mut self, root: Arc<GreenNode>) -> ParseOutput {
        self.metrics.parse_time = self.started.elapsed();
        log::debug!(
            "parsed {} bytes: {} tokens, {} reductions, {} forks, {} merges, {} recoveries",
            self.text.len(),
            self.metrics.tokens_consumed,
            self.metrics.reductions,
            self.metrics.forks,
            self.metrics.merges,
            self.metrics.errors_recovered
        );
        let reuse = self.reuse.map(|reuse| reuse.stats).unwrap_or_default();
        ParseOutput {
            tree: SyntaxTree::new(
                root,
                self.language.clone(),
                Arc::from(self.checkpoints),
                self.metrics,
            ),
            reuse,
        }
    }

    /// Union of the terminals valid in the top states of all stacks.
    fn valid_terminals(&self) -> TerminalSet {
        let mut valid = TerminalSet::with_capacity(self.language.symbol_count());
        for stack in &self.stacks {
            if let Some(terminals) = self.language.valid_terminals(stack.state()) {
                valid.union_with(terminals);
            }
        }
        valid
    }

    fn check_budget(&self) -> Result<(), ParseError> {
        let budget = &self.config.budget;
        let tokens_consumed = self.metrics.tokens_consumed;
        let reason = if budget.max_tokens.is_some_and(|max| tokens_consumed >= max) {
            budget.max_tokens.map(Exhaustion::TokenLimit)
        } else if budget.cancel.as_ref().is_some_and(|flag| flag.is_cancelled()) {
            Some(Exhaustion::Cancelled)
        } else if budget.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Some(Exhaustion::Deadline)
        } else {
            None
        };
        match reason {
            Some(reason) => {
                log::debug!("parse aborted after {tokens_consumed} tokens: {reason}");
                Err(ParseError::ResourceExhausted {
                    reason,
                    tokens_consumed,
                })
            }
            None => Ok(()),
        }
    }

    /// Lex the next token against `valid`, charging it to the budget.
    pub(super) fn lex(&mut self, valid: &TerminalSet) -> Result<Lexeme, ParseError> {
        self.check_budget()?;
        let lexeme = self.lexer.next_token(self.text, self.lexer_state, valid);
        self.lexer_state = lexeme.end_state(self.text);
        self.horizon = self.horizon.max(lexeme.horizon);
        self.metrics.tokens_consumed += 1;
        log::trace!(
            "token {} at {}",
            self.language.kind_name(lexeme.token.kind),
            lexeme.token.range
        );
        Ok(lexeme)
    }

    /// Apply `lexeme` to every stack: reduce as far as the table allows,
    /// then shift or accept.
    pub(super) fn step(&mut self, stacks: &[ParseStack], lexeme: &Lexeme) -> Step {
        let kind = lexeme.token.kind;
        let token = token_element(&lexeme.token, self.text);
        let trivia: Elements = lexeme
            .trivia
            .iter()
            .map(|trivia| token_element(trivia, self.text))
            .collect();

        let mut seen: HashSet<StackKey> = stacks.iter().map(StackKey::of).collect();
        let mut work: VecDeque<ParseStack> = stacks.iter().cloned().collect();
        let mut shifted: IndexMap<StackKey, ParseStack> = IndexMap::new();
        let mut accepted = None;
        let mut reductions = 0usize;

        while let Some(stack) = work.pop_front() {
            let actions = self.language.actions(stack.state(), kind);
            if actions.len() > 1 {
                self.metrics.forks += 1;
            }
            for &action in actions {
                match action {
                    Action::Shift(target) => {
                        let next = stack
                            .attach(trivia.iter().cloned())
                            .push(target, smallvec![token.clone()]);
                        match shifted.entry(StackKey::of(&next)) {
                            Entry::Occupied(mut entry) => {
                                self.metrics.merges += 1;
                                if next.errors < entry.get().errors {
                                    entry.insert(next);
                                }
                            }
                            Entry::Vacant(entry) => {
                                entry.insert(next);
                            }
                        }
                    }
                    Action::Reduce(production) => {
                        if reductions >= self.config.max_reductions_per_token {
                            log::debug!(
                                "reduction limit reached at {}; dropping stack",
                                lexeme.token.range
                            );
                            continue;
                        }
                        reductions += 1;
                        let Some(next) = self.reduce(&stack, production) else {
                            continue;
                        };
                        if seen.insert(StackKey::of(&next)) {
                            work.push_back(next);
                        } else {
                            self.metrics.merges += 1;
                        }
                    }
                    Action::Accept => {
                        if accepted.is_none() {
                            accepted = Some(stack.attach(trivia.iter().cloned()));
                        }
                    }
                }
            }
        }

        if let Some(stack) = accepted {
            return Step::Accepted(stack);
        }
        if shifted.is_empty() {
            log::trace!("no stack accepts {}", self.language.kind_name(kind));
            return Step::Failed;
        }
        let survivors = self.prune(shifted.into_values().collect());
        self.metrics.max_stacks = self.metrics.max_stacks.max(survivors.len());
        Step::Shifted(survivors)
    }

    fn reduce(&mut self, stack: &ParseStack, id: ProductionId) -> Option<ParseStack> {
        let production = self.language.production(id)?;
        let (base, popped) = stack.pop(usize::from(production.rhs_len))?;
        let mut node = build::reduce_node(self.language, production, &popped);
        if self.language.is_visible(production.lhs) {
            if let Some(reuse) = self.reuse.as_mut() {
                node = reuse.adopt(node, base.offset());
            }
        }
        let target = self.language.goto(base.state(), production.lhs)?;
        let mut next = base.push(target, smallvec![node.into()]);
        next.reductions = stack.reductions.saturating_add(1);
        self.metrics.reductions += 1;
        Some(next)
    }

    /// Keep at most `max_stacks` stacks, preferring fewer recoveries and
    /// more reductions, then earlier creation.
    fn prune(&self, stacks: Vec<ParseStack>) -> Vec<ParseStack> {
        let limit = self.config.max_stacks.max(1);
        if stacks.len() <= limit {
            return stacks;
        }
        log::debug!("pruning {} stacks down to {limit}", stacks.len());
        let mut ranked: Vec<(usize, ParseStack)> = stacks.into_iter().enumerate().collect();
        ranked.sort_by_key(|(index, stack)| (stack.errors, Reverse(stack.reductions), *index));
        ranked.truncate(limit);
        ranked.sort_by_key(|(index, _)| *index);
        ranked.into_iter().map(|(_, stack)| stack).collect()
    }

    /// Checkpoint a single surviving stack, then try to rejoin the prior parse.
    fn after_shift(&mut self) {
        let [stack] = self.stacks.as_slice() else {
            return;
        };
        let stack = stack.clone();
        let offset = self.lexer_state.offset;
        self.checkpoints.push(Checkpoint {
            offset,
            point: self.lexer_state.point,
            horizon: self.horizon,
            stack: stack.clone(),
        });
        let jump = match self.reuse.as_mut() {
            Some(reuse) => reuse.sync(&stack, offset, self.lexer_state.point, self.horizon, self.text),
            None => None,
        };
        if let Some(jump) = jump {
            self.apply(jump);
        }
    }

    fn apply(&mut self, jump: Jump) {
        let Some(last) = jump.checkpoints.last() else {
            return;
        };
        self.stacks = vec![last.stack.clone()];
        self.lexer_state = LexerState::new(last.offset, last.point);
        self.horizon = self.horizon.max(last.horizon);
        self.checkpoints.extend(jump.checkpoints);
    }
}

/// Frames of `stack` from the bottom up.
fn stack_frames(stack: &ParseStack) -> Vec<Arc<super::stack::Frame>> {
    let mut frames: Vec<_> = stack.frames().cloned().collect();
    frames.reverse();
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::statements_language;

    fn run(text: &str) -> ParseOutput {
        let language = statements_language();
        let config = ParserConfig::default();
        ParseRun::new(&language, &config, text).run().unwrap()
    }

    #[test]
    fn test_checkpoints_are_ordered_and_bounded() {
        let text = "let a; b + c; d;";
        let output = run(text);
        let checkpoints = output.tree.checkpoints();
        assert_eq!(checkpoints[0].offset, 0);
        assert!(checkpoints.windows(2).all(|w| w[0].offset < w[1].offset));
        assert!(checkpoints.windows(2).all(|w| w[0].horizon <= w[1].horizon));
        assert!(checkpoints.iter().all(|c| c.horizon >= c.offset));
        assert!(checkpoints.iter().all(|c| c.stack.offset() == c.offset));
    }

    #[test]
    fn test_fresh_parse_reports_no_reuse() {
        let output = run("a;");
        assert_eq!(output.reuse, ReuseStats::default());
    }

    #[test]
    fn test_metrics_count_tokens_and_reductions() {
        let output = run("a; b;");
        let metrics = output.tree.metrics();
        // a ; b ; end
        assert_eq!(metrics.tokens_consumed, 5);
        assert!(metrics.reductions >= 6);
        assert_eq!(metrics.errors_recovered, 0);
    }
}
