//! N-gram analysis and extraction of required n-grams from automata.

pub mod analyzer;
pub mod extractor;

pub use analyzer::{extract_ngrams, Analyzer, NGramAnalyzer};
pub use extractor::{NGramExtractor, TooComplexToTrace};
