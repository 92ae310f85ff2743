//! Boolean term queries over an n-gram field.

use serde::Serialize;
use std::fmt;

/// Query understood by a [`SegmentReader`](super::SegmentReader)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NGramQuery {
    MatchAll,
    MatchNone,
    /// Documents containing `term` in `field`
    Term { field: String, term: String },
    /// Documents containing any of `terms` in `field`
    Terms { field: String, terms: Vec<String> },
    And(Vec<NGramQuery>),
    Or(Vec<NGramQuery>),
}

impl NGramQuery {
    /// Number of term clauses in the query.
    pub fn clause_count(&self) -> usize {
        match self {
            NGramQuery::MatchAll | NGramQuery::MatchNone => 0,
            NGramQuery::Term { .. } => 1,
            NGramQuery::Terms { terms, .. } => terms.len(),
            NGramQuery::And(children) | NGramQuery::Or(children) => {
                children.iter().map(NGramQuery::clause_count).sum()
            }
        }
    }

    /// Normalize: constant children are folded away, nested queries of the
    /// same type are flattened and one-child queries are unwrapped.
    pub fn rewrite(self) -> NGramQuery {
        match self {
            NGramQuery::Terms { field, mut terms } => {
                terms.sort();
                terms.dedup();
                match terms.len() {
                    0 => NGramQuery::MatchNone,
                    1 => NGramQuery::Term {
                        field,
                        term: terms.remove(0),
                    },
                    _ => NGramQuery::Terms { field, terms },
                }
            }
            NGramQuery::And(children) => {
                let mut kept = Vec::with_capacity(children.len());
                for child in children {
                    match child.rewrite() {
                        NGramQuery::MatchAll => {}
                        NGramQuery::MatchNone => return NGramQuery::MatchNone,
                        NGramQuery::And(nested) => kept.extend(nested),
                        other => kept.push(other),
                    }
                }
                match kept.len() {
                    0 => NGramQuery::MatchAll,
                    1 => kept.remove(0),
                    _ => NGramQuery::And(kept),
                }
            }
            NGramQuery::Or(children) => {
                let mut kept = Vec::with_capacity(children.len());
                for child in children {
                    match child.rewrite() {
                        NGramQuery::MatchNone => {}
                        NGramQuery::MatchAll => return NGramQuery::MatchAll,
                        NGramQuery::Or(nested) => kept.extend(nested),
                        other => kept.push(other),
                    }
                }
                match kept.len() {
                    0 => NGramQuery::MatchNone,
                    1 => kept.remove(0),
                    _ => NGramQuery::Or(kept),
                }
            }
            other => other,
        }
    }
}

impl fmt::Display for NGramQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NGramQuery::MatchAll => f.write_str("*"),
            NGramQuery::MatchNone => f.write_str("-*"),
            NGramQuery::Term { field, term } => write!(f, "{}:{:?}", field, term),
            NGramQuery::Terms { field, terms } => write!(f, "{}:{:?}", field, terms),
            NGramQuery::And(children) | NGramQuery::Or(children) => {
                let separator = if matches!(self, NGramQuery::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}
