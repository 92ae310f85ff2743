//! Error types for regex acceleration and verification.
//!
//! Errors fall into four groups: configuration problems found while building a
//! query, complexity bounds hit while compiling automata, a refusal to run an
//! unaccelerated scan (only when asked for), and I/O failures while loading
//! field values. Timeouts are not errors; see [`crate::search::TimeoutChecker`].

use std::fmt;
use thiserror::Error;

/// The main error type for building and running regex queries
#[derive(Error, Debug)]
pub enum RegexError {
    /// The regex string was empty
    #[error("regex must be non-empty")]
    EmptyRegex,

    /// The regex could not be parsed
    #[error("invalid regex `{regex}`: {message}")]
    InvalidRegex {
        /// The offending regex
        regex: String,
        /// Parser diagnostic
        message: String,
    },

    /// The regex uses an assertion that a substring recheck cannot honour
    #[error("regex `{regex}` uses an unsupported assertion ({assertion}); anchors and word boundaries are not supported")]
    UnsupportedAssertion {
        /// The offending regex
        regex: String,
        /// Debug rendering of the assertion
        assertion: String,
    },

    /// A setting has a value the engine cannot work with
    #[error("invalid setting `{name}`: {message}")]
    InvalidSetting {
        /// Setting name as it appears in configuration
        name: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The query names an n-gram field the schema does not define
    #[error("unknown n-gram field `{0}`")]
    UnknownNGramField(String),

    /// Acceleration was impossible and `reject_unaccelerated` is set
    #[error("unable to accelerate regex `{regex}` with n-gram field `{ngram_field}` and gram size {gram_size}: {reason}")]
    UnableToAccelerate {
        /// The offending regex
        regex: String,
        /// Configured n-gram field, or `<none>`
        ngram_field: String,
        /// Configured gram size
        gram_size: usize,
        /// The downgrade step that gave up on acceleration
        reason: Downgrade,
    },

    /// N-gram extraction traced more automaton states than allowed
    #[error("regex `{regex}` is too complex for the current max_states_traced of {max_states_traced}; raise the limit or simplify the regex")]
    TooComplexToTrace {
        /// The offending regex
        regex: String,
        /// The configured bound
        max_states_traced: usize,
    },

    /// Determinizing the regex automaton exceeded its state budget
    #[error("regex `{regex}` is too complex to determinize within max_determinized_states of {max_determinized_states}")]
    TooComplexToDeterminize {
        /// The offending regex
        regex: String,
        /// The configured bound
        max_determinized_states: usize,
    },

    /// Loading a document's field values failed
    #[error("failed to load field `{field}` for document {doc_id}")]
    FieldLoad {
        /// Field being loaded
        field: String,
        /// Document within its segment
        doc_id: u32,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

/// The step of the planner's downgrade path that ended acceleration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downgrade {
    /// No n-gram field was configured for the query
    NoNGramField,
    /// Every string the regex accepts could lack every n-gram
    NoRequiredNGrams,
    /// The n-gram query stayed above the clause budget after degrading
    OverClauseBudget {
        /// Clauses in the simplified expression
        clauses: usize,
        /// Configured maximum
        max_clauses: usize,
    },
}

impl fmt::Display for Downgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Downgrade::NoNGramField => write!(f, "no n-gram field configured"),
            Downgrade::NoRequiredNGrams => write!(f, "no n-grams are required by every match"),
            Downgrade::OverClauseBudget {
                clauses,
                max_clauses,
            } => write!(
                f,
                "{} clauses exceed the maximum of {} even as a disjunction",
                clauses, max_clauses
            ),
        }
    }
}
