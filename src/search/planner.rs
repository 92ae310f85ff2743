//! Regex planning with n-gram acceleration.
//!
//! The planner compiles a regex into the n-grams every match must contain and
//! turns them into an index query that narrows the documents to recheck. When
//! that is impossible or too costly it falls back to rechecking every
//! document, or refuses the query if `reject_unaccelerated` is set.

use crate::automaton::{literal_text, parse_regex, CharDfa};
use crate::error::{Downgrade, RegexError};
use crate::expression::{degrade_to_disjunction, Expression};
use crate::index::NGramQuery;
use crate::ngram::{Analyzer, NGramExtractor};
use crate::search::{QueryTransformer, Settings};
use regex_syntax::hir::Hir;
use std::fmt;
use tracing::debug;

/// How a compiled regex query finds its matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Recheck every document
    Unaccelerated,
    /// Recheck only documents matching the n-gram query
    Accelerated(NGramQuery),
    /// Nothing can match
    NoMatch,
}

impl QueryPlan {
    pub fn is_accelerated(&self) -> bool {
        matches!(self, QueryPlan::Accelerated(_))
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryPlan::Unaccelerated => f.write_str("unaccelerated (full scan)"),
            QueryPlan::Accelerated(query) => write!(f, "accelerated: {}", query),
            QueryPlan::NoMatch => f.write_str("no match"),
        }
    }
}

/// Plans one regex against an optional n-gram field.
pub struct QueryPlanner<'a> {
    regex: &'a str,
    settings: &'a Settings,
    ngram_field: Option<(&'a str, &'a dyn Analyzer)>,
}

impl<'a> QueryPlanner<'a> {
    pub fn new(regex: &'a str, settings: &'a Settings) -> Self {
        Self {
            regex,
            settings,
            ngram_field: None,
        }
    }

    /// Accelerate with the n-gram field `name`, whose terms `analyzer` produces.
    pub fn with_ngram_field(mut self, name: &'a str, analyzer: &'a dyn Analyzer) -> Self {
        self.ngram_field = Some((name, analyzer));
        self
    }

    /// Decide the plan for the regex.
    ///
    /// The regex is always parsed, so syntax and setting errors surface even
    /// when no n-gram field is configured.
    pub fn rewrite(&self) -> Result<QueryPlan, RegexError> {
        if self.regex.is_empty() {
            return Err(RegexError::EmptyRegex);
        }
        self.settings.validate()?;
        let hir = parse_regex(self.regex, self.settings.fold())?;

        let Some((field, analyzer)) = self.ngram_field else {
            return self.unaccelerated(Downgrade::NoNGramField);
        };

        let expr = self.required_ngrams(&hir, analyzer)?.simplify();
        if expr.is_true() {
            return self.unaccelerated(Downgrade::NoRequiredNGrams);
        }
        if expr.is_false() {
            debug!(regex = %self.regex, "Regex can never match");
            return Ok(QueryPlan::NoMatch);
        }

        let max_clauses = self.settings.max_ngram_clauses;
        let clauses = expr.count_clauses();
        if clauses <= max_clauses {
            return Ok(self.accelerated(field, &expr));
        }

        let degraded = degrade_to_disjunction(&expr, max_clauses);
        let over_budget = Downgrade::OverClauseBudget {
            clauses,
            max_clauses,
        };
        if degraded.is_true() || degraded.count_clauses() > max_clauses {
            return self.unaccelerated(over_budget);
        }
        debug!(
            regex = %self.regex,
            clauses,
            degraded = degraded.count_clauses(),
            "Degraded n-gram expression to a disjunction"
        );
        Ok(self.accelerated(field, &degraded))
    }

    /// Re-derive the plan after the host rewrote the accelerated query.
    pub fn replan(&self, rewritten: NGramQuery) -> Result<QueryPlan, RegexError> {
        match rewritten {
            NGramQuery::MatchNone => Ok(QueryPlan::NoMatch),
            NGramQuery::MatchAll => self.unaccelerated(Downgrade::NoRequiredNGrams),
            query => Ok(QueryPlan::Accelerated(query)),
        }
    }

    /// The n-grams every match of `hir` must contain, unsimplified.
    pub fn required_ngrams(&self, hir: &Hir, analyzer: &dyn Analyzer) -> Result<Expression<String>, RegexError> {
        let settings = self.settings;
        let extractor = NGramExtractor::new(
            settings.gram_size,
            settings.max_expand,
            settings.max_states_traced,
            settings.max_ngrams_extracted,
            analyzer,
        );

        // Literal sequences skip the automaton entirely
        if let Some(literal) = literal_text(hir) {
            return Ok(extractor.extract_literal(&literal));
        }
        if settings.max_states_traced == 0 {
            return Ok(Expression::True);
        }

        let dfa = CharDfa::new(hir, settings.max_determinized_states).map_err(|_| {
            RegexError::TooComplexToDeterminize {
                regex: self.regex.to_string(),
                max_determinized_states: settings.max_determinized_states,
            }
        })?;
        extractor
            .extract(&dfa)
            .map_err(|e| RegexError::TooComplexToTrace {
                regex: self.regex.to_string(),
                max_states_traced: e.max_states_traced,
            })
    }

    fn unaccelerated(&self, reason: Downgrade) -> Result<QueryPlan, RegexError> {
        let ngram_field = self.ngram_field.map_or("<none>", |(name, _)| name);
        if self.settings.reject_unaccelerated {
            debug!(regex = %self.regex, %reason, "Rejecting unaccelerated regex");
            return Err(RegexError::UnableToAccelerate {
                regex: self.regex.to_string(),
                ngram_field: ngram_field.to_string(),
                gram_size: self.settings.gram_size,
                reason,
            });
        }
        debug!(regex = %self.regex, %reason, "Falling back to an unaccelerated scan");
        Ok(QueryPlan::Unaccelerated)
    }

    fn accelerated(&self, field: &str, expr: &Expression<String>) -> QueryPlan {
        let query = expr.transform(&mut QueryTransformer::new(field)).rewrite();
        debug!(regex = %self.regex, clauses = query.clause_count(), "Accelerated regex");
        match query {
            NGramQuery::MatchAll => QueryPlan::Unaccelerated,
            NGramQuery::MatchNone => QueryPlan::NoMatch,
            query => QueryPlan::Accelerated(query),
        }
    }
}
