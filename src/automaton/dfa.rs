//! Deterministic automaton over Unicode scalar values.

use super::nfa::Nfa;
use super::TooManyStates;
use regex_syntax::hir::Hir;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Index of a DFA state.
pub type StateId = usize;

/// Transition on the inclusive code-point range `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub start: u32,
    pub end: u32,
    pub target: StateId,
}

impl Transition {
    /// Number of code points the transition accepts.
    pub fn width(&self) -> u32 {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone)]
struct DfaState {
    /// Sorted, disjoint; adjacent ranges always lead to different targets
    transitions: Vec<Transition>,
    accept: bool,
}

/// A DFA built by subset construction from a regex HIR.
///
/// Missing transitions reject. State 0 is the start state.
#[derive(Debug, Clone)]
pub struct CharDfa {
    states: Vec<DfaState>,
}

impl CharDfa {
    /// Determinize `hir` into at most `max_states` states.
    pub fn new(hir: &Hir, max_states: usize) -> Result<Self, TooManyStates> {
        let nfa = Nfa::new(hir, max_states.saturating_mul(8).max(1024))?;
        Determinizer::new(&nfa, max_states).run()
    }

    #[inline]
    pub fn start(&self) -> StateId {
        0
    }

    /// Follow the transition for `c`, if there is one.
    #[inline]
    pub fn step(&self, state: StateId, c: char) -> Option<StateId> {
        let transitions = &self.states[state].transitions;
        let c = c as u32;
        let i = transitions.partition_point(|t| t.end < c);
        match transitions.get(i) {
            Some(t) if t.start <= c => Some(t.target),
            _ => None,
        }
    }

    #[inline]
    pub fn is_accept(&self, state: StateId) -> bool {
        self.states[state].accept
    }

    pub fn transitions(&self, state: StateId) -> &[Transition] {
        &self.states[state].transitions
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Whether the whole of `text` is accepted.
    pub fn matches(&self, text: &str) -> bool {
        let mut state = self.start();
        for c in text.chars() {
            match self.step(state, c) {
                Some(next) => state = next,
                None => return false,
            }
        }
        self.is_accept(state)
    }
}

struct Determinizer<'a> {
    nfa: &'a Nfa,
    max_states: usize,
    states: Vec<DfaState>,
    ids: FxHashMap<Vec<usize>, StateId>,
    sets: Vec<Vec<usize>>,
}

impl<'a> Determinizer<'a> {
    fn new(nfa: &'a Nfa, max_states: usize) -> Self {
        Self {
            nfa,
            max_states,
            states: Vec::new(),
            ids: FxHashMap::default(),
            sets: Vec::new(),
        }
    }

    fn run(mut self) -> Result<CharDfa, TooManyStates> {
        let start = self.closure(&[self.nfa.start]);
        self.intern(start)?;

        let mut next = 0;
        while next < self.sets.len() {
            let transitions = self.transitions_of(next)?;
            self.states[next].transitions = transitions;
            next += 1;
        }
        Ok(CharDfa {
            states: self.states,
        })
    }

    /// Epsilon closure, keeping only states that consume input or accept.
    fn closure(&self, seeds: &[usize]) -> Vec<usize> {
        let mut seen = FxHashSet::default();
        let mut stack = seeds.to_vec();
        let mut important = Vec::new();
        while let Some(s) = stack.pop() {
            if !seen.insert(s) {
                continue;
            }
            let state = &self.nfa.states[s];
            if !state.ranges.is_empty() || s == self.nfa.accept {
                important.push(s);
            }
            stack.extend(state.epsilons.iter().copied());
        }
        important.sort_unstable();
        important
    }

    fn intern(&mut self, set: Vec<usize>) -> Result<StateId, TooManyStates> {
        if let Some(&id) = self.ids.get(&set) {
            return Ok(id);
        }
        if self.states.len() >= self.max_states {
            return Err(TooManyStates {
                limit: self.max_states,
            });
        }
        let id = self.states.len();
        self.states.push(DfaState {
            transitions: Vec::new(),
            accept: set.binary_search(&self.nfa.accept).is_ok(),
        });
        self.ids.insert(set.clone(), id);
        self.sets.push(set);
        Ok(id)
    }

    /// Sweep the range boundaries of every NFA state in the set, tracking
    /// which NFA targets are active between consecutive boundaries.
    fn transitions_of(&mut self, id: StateId) -> Result<Vec<Transition>, TooManyStates> {
        let mut events: Vec<(u32, bool, usize)> = Vec::new();
        for &s in &self.sets[id] {
            let state = &self.nfa.states[s];
            for &(lo, hi) in &state.ranges {
                events.push((lo, true, state.next));
                events.push((hi + 1, false, state.next));
            }
        }
        events.sort_unstable();

        let mut active: BTreeMap<usize, usize> = BTreeMap::new();
        let mut targets: FxHashMap<Vec<usize>, StateId> = FxHashMap::default();
        let mut transitions: Vec<Transition> = Vec::new();
        let mut i = 0;
        while i < events.len() {
            let point = events[i].0;
            while i < events.len() && events[i].0 == point {
                let (_, opens, target) = events[i];
                if opens {
                    *active.entry(target).or_insert(0) += 1;
                } else if let Some(count) = active.get_mut(&target) {
                    *count -= 1;
                    if *count == 0 {
                        active.remove(&target);
                    }
                }
                i += 1;
            }
            let Some(&(boundary, _, _)) = events.get(i) else {
                break;
            };
            if active.is_empty() {
                continue;
            }

            let key: Vec<usize> = active.keys().copied().collect();
            let target = match targets.get(&key) {
                Some(&target) => target,
                None => {
                    let set = self.closure(&key);
                    let target = self.intern(set)?;
                    targets.insert(key, target);
                    target
                }
            };
            match transitions.last_mut() {
                Some(last) if last.target == target && last.end + 1 == point => last.end = boundary - 1,
                _ => transitions.push(Transition {
                    start: point,
                    end: boundary - 1,
                    target,
                }),
            }
        }
        Ok(transitions)
    }
}
