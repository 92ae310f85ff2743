//! Exact verification of candidate documents.
//!
//! The fast strategies search for a match starting at every position of the
//! text by stepping the regex automaton directly, so no `.*` wrapper is ever
//! built. Case-insensitive strategies fold the text one code point at a time
//! while scanning; locales where that gives wrong answers lowercase the whole
//! value first instead.

use crate::automaton::{parse_regex, wrap_unanchored, CharDfa};
use crate::error::RegexError;
use crate::locale::{greek_fold, simple_lowercase, CaseFold, Locale};
use crate::search::Settings;
use std::borrow::Cow;
use tracing::debug;

/// How candidate text is folded and scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckStrategy {
    /// No folding
    CaseSensitive,
    /// Unicode simple lowercase applied per code point during the scan
    LowercaseOnTheFly,
    /// Greek fold applied per code point during the scan
    GreekOnTheFly,
    /// Lowercase the whole value with the locale's rules, then scan
    Prefolded,
    /// Full match of the `.*regex.*` automaton over the lowercased value
    Baseline,
}

impl RecheckStrategy {
    /// The fastest correct strategy for a locale.
    pub fn select(case_sensitive: bool, locale: &Locale) -> Self {
        if case_sensitive {
            RecheckStrategy::CaseSensitive
        } else if locale.needs_prefolding() {
            RecheckStrategy::Prefolded
        } else if *locale == Locale::Greek {
            RecheckStrategy::GreekOnTheFly
        } else {
            RecheckStrategy::LowercaseOnTheFly
        }
    }
}

/// Automaton built on first use; empty until then
#[derive(Default)]
struct RecheckAutomaton(Option<CharDfa>);

impl RecheckAutomaton {
    fn get_or_try_init<E>(&mut self, init: impl FnOnce() -> Result<CharDfa, E>) -> Result<&CharDfa, E> {
        let dfa = match self.0.take() {
            Some(dfa) => dfa,
            None => init()?,
        };
        Ok(self.0.insert(dfa))
    }
}

/// Decides whether any value of a document contains a match.
///
/// One instance belongs to a single execution; the automaton is compiled
/// lazily on the first recheck.
pub struct Rechecker {
    regex: String,
    strategy: RecheckStrategy,
    locale: Locale,
    case_sensitive: bool,
    max_determinized_states: usize,
    automaton: RecheckAutomaton,
}

impl Rechecker {
    pub fn new(regex: impl Into<String>, settings: &Settings) -> Self {
        Self {
            regex: regex.into(),
            strategy: RecheckStrategy::select(settings.case_sensitive, &settings.locale),
            locale: settings.locale.clone(),
            case_sensitive: settings.case_sensitive,
            max_determinized_states: settings.max_determinized_states,
            automaton: RecheckAutomaton::default(),
        }
    }

    /// Override the selected strategy.
    pub fn with_strategy(mut self, strategy: RecheckStrategy) -> Self {
        self.strategy = strategy;
        self.automaton = RecheckAutomaton::default();
        self
    }

    pub fn strategy(&self) -> RecheckStrategy {
        self.strategy
    }

    /// Whether some value contains a match of the regex.
    pub fn recheck<S: AsRef<str>>(&mut self, values: &[S]) -> Result<bool, RegexError> {
        let strategy = self.strategy;
        let case_sensitive = self.case_sensitive;
        let locale = &self.locale;
        let dfa = self.automaton.get_or_try_init(|| {
            compile(
                &self.regex,
                strategy,
                locale,
                case_sensitive,
                self.max_determinized_states,
            )
        })?;

        let matched = values.iter().any(|value| {
            let text = value.as_ref();
            match strategy {
                RecheckStrategy::CaseSensitive => contains_match(dfa, text, |c| c),
                RecheckStrategy::LowercaseOnTheFly => contains_match(dfa, text, simple_lowercase),
                RecheckStrategy::GreekOnTheFly => contains_match(dfa, text, greek_fold),
                RecheckStrategy::Prefolded => contains_match(dfa, &locale.lowercase(text), |c| c),
                RecheckStrategy::Baseline => {
                    let text = if case_sensitive {
                        Cow::Borrowed(text)
                    } else {
                        Cow::Owned(locale.lowercase(text))
                    };
                    dfa.matches(&text)
                }
            }
        });
        Ok(matched)
    }

    /// Relative cost of one recheck, proportional to the automaton size.
    pub fn cost(&mut self) -> Result<u64, RegexError> {
        let strategy = self.strategy;
        let case_sensitive = self.case_sensitive;
        let locale = &self.locale;
        let dfa = self.automaton.get_or_try_init(|| {
            compile(
                &self.regex,
                strategy,
                locale,
                case_sensitive,
                self.max_determinized_states,
            )
        })?;
        Ok(4 * dfa.num_states() as u64)
    }
}

fn compile(
    regex: &str,
    strategy: RecheckStrategy,
    locale: &Locale,
    case_sensitive: bool,
    max_determinized_states: usize,
) -> Result<CharDfa, RegexError> {
    let fold = match strategy {
        RecheckStrategy::CaseSensitive => None,
        RecheckStrategy::LowercaseOnTheFly => Some(CaseFold::Lowercase),
        RecheckStrategy::GreekOnTheFly => Some(CaseFold::Greek),
        RecheckStrategy::Prefolded => Some(locale.char_fold()),
        RecheckStrategy::Baseline => (!case_sensitive).then(|| locale.char_fold()),
    };
    let mut hir = parse_regex(regex, fold)?;
    if strategy == RecheckStrategy::Baseline {
        hir = wrap_unanchored(hir);
    }

    let dfa = CharDfa::new(&hir, max_determinized_states).map_err(|_| {
        RegexError::TooComplexToDeterminize {
            regex: regex.to_string(),
            max_determinized_states,
        }
    })?;
    debug!(
        regex = %regex,
        strategy = ?strategy,
        states = dfa.num_states(),
        "Compiled recheck automaton"
    );
    Ok(dfa)
}

/// Whether some substring of `text` is accepted, folding each code point.
fn contains_match(dfa: &CharDfa, text: &str, fold: impl Fn(char) -> char) -> bool {
    let start = dfa.start();
    if dfa.is_accept(start) {
        return true;
    }

    let mut chars = text.chars();
    loop {
        let mut rest = chars.clone();
        let Some(first) = rest.next() else {
            return false;
        };
        // First step unrolled: most positions have no way out of the start state
        if let Some(mut state) = dfa.step(start, fold(first)) {
            if dfa.is_accept(state) {
                return true;
            }
            for c in rest.clone() {
                match dfa.step(state, fold(c)) {
                    Some(next) if dfa.is_accept(next) => return true,
                    Some(next) => state = next,
                    None => break,
                }
            }
        }
        chars = rest;
    }
}
