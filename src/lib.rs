//! Regex search accelerated by an n-gram index.
//!
//! A regex is compiled into the boolean combination of n-grams that every
//! match must contain. That expression becomes an index query selecting
//! candidate documents, and each candidate is rechecked exactly with a
//! locale-aware automaton.

pub mod automaton;
pub mod config;
pub mod discovery;
pub mod error;
pub mod expression;
pub mod index;
pub mod locale;
pub mod ngram;
pub mod search;
pub mod utils;

pub use error::{Downgrade, RegexError};
pub use expression::{degrade_to_disjunction, CompositeKind, Expression, ExpressionTransformer};
pub use index::{
    DocAddress, Document, FieldLoader, FileContentLoader, Index, IndexOptions, NGramQuery, Schema,
    SearchResults, Segment, SegmentReader, StoredFieldLoader,
};
pub use locale::{CaseFold, Locale};
pub use ngram::{Analyzer, NGramAnalyzer, NGramExtractor};
pub use search::{
    CompiledQuery, ExecutionStats, QueryPlan, QueryPlanner, RecheckStrategy, Rechecker, RegexQuery,
    Settings, TimeoutChecker,
};
