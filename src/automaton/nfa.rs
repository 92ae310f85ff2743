//! Thompson construction over code-point ranges.

use super::TooManyStates;
use regex_syntax::hir::{Class, Hir, HirKind};

pub(crate) struct NfaState {
    /// Inclusive code-point ranges leading to `next`
    pub(crate) ranges: Vec<(u32, u32)>,
    pub(crate) next: usize,
    pub(crate) epsilons: Vec<usize>,
}

pub(crate) struct Nfa {
    pub(crate) states: Vec<NfaState>,
    pub(crate) start: usize,
    pub(crate) accept: usize,
}

impl Nfa {
    /// Build an NFA with at most `max_states` states.
    ///
    /// Counted repetitions are expanded by copying the repeated fragment, so
    /// the bound is what stops `a{1000}{1000}`.
    pub(crate) fn new(hir: &Hir, max_states: usize) -> Result<Self, TooManyStates> {
        let mut builder = Builder {
            states: Vec::new(),
            limit: max_states,
        };
        let (start, accept) = builder.build(hir)?;
        Ok(Nfa {
            states: builder.states,
            start,
            accept,
        })
    }
}

struct Builder {
    states: Vec<NfaState>,
    limit: usize,
}

impl Builder {
    fn add(&mut self) -> Result<usize, TooManyStates> {
        if self.states.len() >= self.limit {
            return Err(TooManyStates { limit: self.limit });
        }
        self.states.push(NfaState {
            ranges: Vec::new(),
            next: 0,
            epsilons: Vec::new(),
        });
        Ok(self.states.len() - 1)
    }

    fn epsilon(&mut self, from: usize, to: usize) {
        self.states[from].epsilons.push(to);
    }

    fn class(&mut self, ranges: Vec<(u32, u32)>) -> Result<(usize, usize), TooManyStates> {
        let start = self.add()?;
        let end = self.add()?;
        self.states[start].ranges = ranges;
        self.states[start].next = end;
        Ok((start, end))
    }

    /// Returns the (start, end) states of the fragment for `hir`.
    fn build(&mut self, hir: &Hir) -> Result<(usize, usize), TooManyStates> {
        match hir.kind() {
            HirKind::Empty | HirKind::Look(_) => {
                let state = self.add()?;
                Ok((state, state))
            }
            HirKind::Literal(lit) => {
                let start = self.add()?;
                let mut end = start;
                for c in String::from_utf8_lossy(&lit.0).chars() {
                    let next = self.add()?;
                    self.states[end].ranges.push((c as u32, c as u32));
                    self.states[end].next = next;
                    end = next;
                }
                Ok((start, end))
            }
            HirKind::Class(Class::Unicode(class)) => self.class(
                class
                    .ranges()
                    .iter()
                    .map(|r| (r.start() as u32, r.end() as u32))
                    .collect(),
            ),
            HirKind::Class(Class::Bytes(class)) => self.class(
                class
                    .ranges()
                    .iter()
                    .map(|r| (r.start() as u32, r.end() as u32))
                    .collect(),
            ),
            HirKind::Capture(capture) => self.build(&capture.sub),
            HirKind::Concat(subs) => {
                let start = self.add()?;
                let mut end = start;
                for sub in subs {
                    let (s, e) = self.build(sub)?;
                    self.epsilon(end, s);
                    end = e;
                }
                Ok((start, end))
            }
            HirKind::Alternation(subs) => {
                let start = self.add()?;
                let end = self.add()?;
                for sub in subs {
                    let (s, e) = self.build(sub)?;
                    self.epsilon(start, s);
                    self.epsilon(e, end);
                }
                Ok((start, end))
            }
            HirKind::Repetition(rep) => {
                let start = self.add()?;
                let mut end = start;
                for _ in 0..rep.min {
                    let (s, e) = self.build(&rep.sub)?;
                    self.epsilon(end, s);
                    end = e;
                }
                let exit = self.add()?;
                match rep.max {
                    None => {
                        let (s, e) = self.build(&rep.sub)?;
                        self.epsilon(end, s);
                        self.epsilon(e, s);
                        self.epsilon(e, exit);
                    }
                    Some(max) => {
                        for _ in rep.min..max {
                            let (s, e) = self.build(&rep.sub)?;
                            self.epsilon(end, exit);
                            self.epsilon(end, s);
                            end = e;
                        }
                    }
                }
                self.epsilon(end, exit);
                Ok((start, exit))
            }
        }
    }
}
