//! Finite automata compiled from regexes.
//!
//! The same [`CharDfa`] type serves two purposes: n-gram extraction walks its
//! transition graph, and the rechecker runs it over candidate text.

mod dfa;
mod nfa;
mod parse;

pub use dfa::{CharDfa, StateId, Transition};
pub use parse::{literal_text, parse_regex, wrap_unanchored};

use thiserror::Error;

/// An automaton grew past its state bound
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("automaton exceeds {limit} states")]
pub struct TooManyStates {
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::CaseFold;

    #[test]
    fn test_folded_regex_matches_lowercase_text() {
        let hir = parse_regex("Hello [A-Z]orld", Some(CaseFold::Lowercase)).unwrap();
        let dfa = CharDfa::new(&hir, 1000).unwrap();
        assert!(dfa.matches("hello world"));
        assert!(!dfa.matches("Hello World"));
    }

    #[test]
    fn test_greek_fold_of_regex() {
        let hir = parse_regex("ΆΣ", Some(CaseFold::Greek)).unwrap();
        let dfa = CharDfa::new(&hir, 1000).unwrap();
        assert!(dfa.matches("ασ"));
    }

    #[test]
    fn test_unanchored_wrapper() {
        let hir = wrap_unanchored(parse_regex("b+c", None).unwrap());
        let dfa = CharDfa::new(&hir, 1000).unwrap();
        assert!(dfa.matches("abbc\nd"));
        assert!(dfa.matches("bc"));
        assert!(!dfa.matches("ab\nc"));
    }
}
