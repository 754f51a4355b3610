use smallvec::SmallVec;

/// Character range for transitions
pub type CharRange = (char, char);

/// Thompson NFA for a single terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa {
    states: Box<[NfaState]>,
    start: u32,
}

/// NFA state: consuming transitions, epsilon edges and an accept flag
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NfaState {
    pub transitions: SmallVec<[(CharRange, u32); 2]>,
    pub epsilon: SmallVec<[u32; 2]>,
    pub accepting: bool,
}

/// Result of a longest-match run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfaMatch {
    /// Byte length of the longest accepted prefix
    pub len: Option<usize>,
    /// Exclusive end of the bytes inspected; `text.len() + 1` if the run hit end of input.
    pub horizon: usize,
}

impl Nfa {
    /// Builds an NFA from raw parts without checking references.
    ///
    /// Use [`validate`](Self::validate) before running untrusted data.
    #[must_use]
    pub fn from_parts(states: Vec<NfaState>, start: u32) -> Self {
        Self {
            states: states.into_boxed_slice(),
            start,
        }
    }

    #[must_use]
    pub fn states(&self) -> &[NfaState] {
        &self.states
    }

    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Checks that every state reference is in bounds and ranges are ordered.
    ///
    /// # Errors
    ///
    /// Returns a description of the first bad reference.
    pub fn validate(&self) -> Result<(), String> {
        let count = self.states.len();
        if self.start as usize >= count {
            return Err(format!("start state {} out of {count}", self.start));
        }
        for (index, state) in self.states.iter().enumerate() {
            for &((lo, hi), target) in &state.transitions {
                if lo > hi {
                    return Err(format!("state {index} has an inverted range"));
                }
                if target as usize >= count {
                    return Err(format!("state {index} targets missing state {target}"));
                }
            }
            if let Some(&target) = state.epsilon.iter().find(|&&t| t as usize >= count) {
                return Err(format!("state {index} has epsilon to missing state {target}"));
            }
        }
        Ok(())
    }

    /// Runs the automaton from `offset` and reports the longest accepted prefix.
    #[must_use]
    pub fn longest_match(&self, text: &str, offset: usize) -> NfaMatch {
        let mut seen = vec![false; self.states.len()];
        let mut current: Vec<u32> = Vec::new();
        self.close(self.start, &mut current, &mut seen);

        let mut best = self.any_accepting(&current).then_some(0);
        let mut horizon = offset;
        let Some(rest) = text.get(offset..) else {
            return NfaMatch { len: None, horizon };
        };

        let mut next = Vec::new();
        for (index, c) in rest.char_indices() {
            if !self.can_advance(&current) {
                return NfaMatch { len: best, horizon };
            }
            let consumed = index + c.len_utf8();
            horizon = offset + consumed;
            seen.iter_mut().for_each(|flag| *flag = false);
            next.clear();
            for &state in &current {
                for &((lo, hi), target) in &self.states[state as usize].transitions {
                    if c >= lo && c <= hi {
                        self.close(target, &mut next, &mut seen);
                    }
                }
            }
            std::mem::swap(&mut current, &mut next);
            if self.any_accepting(&current) {
                best = Some(consumed);
            }
        }
        if self.can_advance(&current) {
            horizon = text.len() + 1;
        }
        NfaMatch { len: best, horizon }
    }

    fn can_advance(&self, states: &[u32]) -> bool {
        states
            .iter()
            .any(|&s| !self.states[s as usize].transitions.is_empty())
    }

    fn any_accepting(&self, states: &[u32]) -> bool {
        states.iter().any(|&s| self.states[s as usize].accepting)
    }

    fn close(&self, state: u32, out: &mut Vec<u32>, seen: &mut [bool]) {
        let mut pending: SmallVec<[u32; 16]> = SmallVec::new();
        pending.push(state);
        while let Some(state) = pending.pop() {
            let Some(flag) = seen.get_mut(state as usize) else {
                continue;
            };
            if *flag {
                continue;
            }
            *flag = true;
            out.push(state);
            pending.extend(self.states[state as usize].epsilon.iter().rev().copied());
        }
    }
}

/// Incremental constructor used by pattern compilation
#[derive(Debug, Default)]
pub(crate) struct NfaBuilder {
    states: Vec<NfaState>,
}

impl NfaBuilder {
    fn push(&mut self, state: NfaState) -> u32 {
        let id = u32::try_from(self.states.len()).unwrap_or(u32::MAX);
        self.states.push(state);
        id
    }

    pub(crate) fn accepting(&mut self) -> u32 {
        self.push(NfaState {
            accepting: true,
            ..NfaState::default()
        })
    }

    pub(crate) fn transition(&mut self, ranges: Vec<CharRange>, target: u32) -> u32 {
        self.push(NfaState {
            transitions: ranges.into_iter().map(|range| (range, target)).collect(),
            ..NfaState::default()
        })
    }

    pub(crate) fn split(&mut self, targets: Vec<u32>) -> u32 {
        self.push(NfaState {
            epsilon: targets.into_iter().collect(),
            ..NfaState::default()
        })
    }

    pub(crate) fn patch_split(&mut self, state: u32, targets: Vec<u32>) {
        if let Some(slot) = self.states.get_mut(state as usize) {
            slot.epsilon = targets.into_iter().collect();
        }
    }

    pub(crate) fn finish(self, start: u32) -> Nfa {
        Nfa::from_parts(self.states, start)
    }
}
