//! A regex query against one text field, optionally accelerated by an
//! n-gram field.

use crate::error::RegexError;
use crate::index::{FieldLoader, Schema, SegmentReader};
use crate::search::{
    Clock, ExecutionContext, QueryPlan, QueryPlanner, Rechecker, RegexMatcher, Settings,
    TimeoutChecker,
};
use tracing::debug;

/// Find documents whose `field` contains a match of `regex`.
#[derive(Debug, Clone)]
pub struct RegexQuery {
    field: String,
    regex: String,
    ngram_field: Option<String>,
    settings: Settings,
}

impl RegexQuery {
    pub fn new(field: impl Into<String>, regex: impl Into<String>) -> Result<Self, RegexError> {
        let regex = regex.into();
        if regex.is_empty() {
            return Err(RegexError::EmptyRegex);
        }
        Ok(Self {
            field: field.into(),
            regex,
            ngram_field: None,
            settings: Settings::default(),
        })
    }

    /// Accelerate with the n-gram field `name`.
    pub fn with_ngram_field(mut self, name: impl Into<String>) -> Self {
        self.ngram_field = Some(name.into());
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn regex(&self) -> &str {
        &self.regex
    }

    pub fn ngram_field(&self) -> Option<&str> {
        self.ngram_field.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn planner(&self) -> QueryPlanner<'_> {
        QueryPlanner::new(&self.regex, &self.settings)
    }

    /// Plan the query against `schema`.
    pub fn compile(&self, schema: &Schema) -> Result<CompiledQuery, RegexError> {
        self.settings.validate()?;
        let plan = match &self.ngram_field {
            Some(name) => {
                let field = schema
                    .ngram_field(name)
                    .ok_or_else(|| RegexError::UnknownNGramField(name.clone()))?;
                if field.analyzer.gram_size != self.settings.gram_size {
                    return Err(RegexError::InvalidSetting {
                        name: "gram_size",
                        message: format!(
                            "{} does not match the gram size {} of n-gram field `{}`",
                            self.settings.gram_size, field.analyzer.gram_size, name
                        ),
                    });
                }
                self.planner()
                    .with_ngram_field(&field.name, &field.analyzer)
                    .rewrite()?
            }
            None => self.planner().rewrite()?,
        };

        debug!(regex = %self.regex, field = %self.field, %plan, "Compiled regex query");
        Ok(CompiledQuery {
            query: self.clone(),
            plan,
        })
    }
}

/// A planned [`RegexQuery`], shared by every shard that runs it
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    query: RegexQuery,
    plan: QueryPlan,
}

impl CompiledQuery {
    pub fn query(&self) -> &RegexQuery {
        &self.query
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// The plan after `reader` rewrote the n-gram query for its own terms.
    pub fn plan_for_segment(&self, reader: &dyn SegmentReader) -> Result<QueryPlan, RegexError> {
        match &self.plan {
            QueryPlan::Accelerated(query) => self.query.planner().replan(reader.rewrite(query)),
            plan => Ok(plan.clone()),
        }
    }

    /// A fresh execution context with its own rechecker and timeout.
    pub fn context<'a>(&'a self, loader: &'a dyn FieldLoader) -> ExecutionContext<'a> {
        let settings = &self.query.settings;
        ExecutionContext::new(
            &self.query.field,
            loader,
            Rechecker::new(self.query.regex.as_str(), settings),
            TimeoutChecker::new(settings.timeout_ms),
        )
    }

    /// Matching documents of one segment, in document order.
    pub fn search_segment<C: Clock>(
        &self,
        ctx: &mut ExecutionContext<'_, C>,
        reader: &dyn SegmentReader,
    ) -> Result<Vec<u32>, RegexError> {
        let plan = self.plan_for_segment(reader)?;
        RegexMatcher::new(plan).search_segment(ctx, reader)
    }
}
