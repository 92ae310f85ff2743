//! Two-phase execution: cheap candidate selection, then exact recheck.

use crate::error::RegexError;
use crate::index::{FieldLoader, SegmentReader};
use crate::search::{Clock, QueryPlan, Rechecker, SystemClock, TimeoutChecker, TimeoutStatus};
use roaring::RoaringBitmap;
use serde::Serialize;
use tracing::debug;

/// Fixed part of the confirmation cost; loading field values dominates it
const LOAD_COST: u64 = 10_000;

/// Counters for one query execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    pub segments_searched: usize,
    /// Segments whose plan could never match
    pub segments_skipped: usize,
    /// Documents returned by the approximation phase
    pub candidates: u64,
    /// Documents whose values were loaded and rechecked
    pub rechecked: u64,
    pub matched: u64,
    /// The recheck pass stopped early; results are partial
    pub timed_out: bool,
}

impl ExecutionStats {
    pub fn merge(&mut self, other: &ExecutionStats) {
        self.segments_searched += other.segments_searched;
        self.segments_skipped += other.segments_skipped;
        self.candidates += other.candidates;
        self.rechecked += other.rechecked;
        self.matched += other.matched;
        self.timed_out |= other.timed_out;
    }
}

/// Outcome of confirming one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Match,
    NoMatch,
    /// The budget ran out before this candidate was checked
    TimedOut,
}

/// State owned by one execution: the rechecker, the timeout and the counters.
pub struct ExecutionContext<'a, C: Clock = SystemClock> {
    field: &'a str,
    loader: &'a dyn FieldLoader,
    rechecker: Rechecker,
    timeout: TimeoutChecker<C>,
    stats: ExecutionStats,
}

impl<'a, C: Clock> ExecutionContext<'a, C> {
    pub fn new(
        field: &'a str,
        loader: &'a dyn FieldLoader,
        rechecker: Rechecker,
        timeout: TimeoutChecker<C>,
    ) -> Self {
        Self {
            field,
            loader,
            rechecker,
            timeout,
            stats: ExecutionStats::default(),
        }
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn into_stats(self) -> ExecutionStats {
        self.stats
    }

    pub fn is_timed_out(&self) -> bool {
        self.timeout.is_expired()
    }
}

/// Runs a [`QueryPlan`] over segments.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    plan: QueryPlan,
}

impl RegexMatcher {
    pub fn new(plan: QueryPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Candidate documents: the n-gram query's hits, or every document when
    /// the plan is unaccelerated.
    pub fn approximation(&self, reader: &dyn SegmentReader) -> RoaringBitmap {
        match &self.plan {
            QueryPlan::Accelerated(query) => reader.evaluate(query),
            QueryPlan::Unaccelerated => {
                let mut all = RoaringBitmap::new();
                all.insert_range(0..reader.doc_count());
                all
            }
            QueryPlan::NoMatch => RoaringBitmap::new(),
        }
    }

    /// Exact check of one candidate.
    ///
    /// Field load failures are fatal for the whole execution.
    pub fn confirm<C: Clock>(
        &self,
        ctx: &mut ExecutionContext<'_, C>,
        reader: &dyn SegmentReader,
        doc_id: u32,
    ) -> Result<Confirmation, RegexError> {
        if ctx.timeout.check() == TimeoutStatus::Expired {
            ctx.stats.timed_out = true;
            return Ok(Confirmation::TimedOut);
        }

        let values = ctx
            .loader
            .load(ctx.field, reader, doc_id)
            .map_err(|source| RegexError::FieldLoad {
                field: ctx.field.to_string(),
                doc_id,
                source,
            })?;
        ctx.stats.rechecked += 1;

        if ctx.rechecker.recheck(&values)? {
            ctx.stats.matched += 1;
            Ok(Confirmation::Match)
        } else {
            Ok(Confirmation::NoMatch)
        }
    }

    /// Cost of confirming one candidate, for ordering against other queries.
    pub fn match_cost<C: Clock>(&self, ctx: &mut ExecutionContext<'_, C>) -> Result<u64, RegexError> {
        Ok(LOAD_COST + ctx.rechecker.cost()?)
    }

    /// Both phases over one segment. Returns the matching documents found
    /// before the timeout, if it expires.
    pub fn search_segment<C: Clock>(
        &self,
        ctx: &mut ExecutionContext<'_, C>,
        reader: &dyn SegmentReader,
    ) -> Result<Vec<u32>, RegexError> {
        if matches!(self.plan, QueryPlan::NoMatch) {
            ctx.stats.segments_skipped += 1;
            return Ok(Vec::new());
        }
        if ctx.is_timed_out() {
            return Ok(Vec::new());
        }
        ctx.stats.segments_searched += 1;

        let candidates = self.approximation(reader);
        ctx.stats.candidates += candidates.len();

        let mut hits = Vec::new();
        for doc_id in candidates.iter() {
            match self.confirm(ctx, reader, doc_id)? {
                Confirmation::Match => hits.push(doc_id),
                Confirmation::NoMatch => {}
                Confirmation::TimedOut => break,
            }
        }
        debug!(
            candidates = candidates.len(),
            hits = hits.len(),
            timed_out = ctx.is_timed_out(),
            "Searched segment"
        );
        Ok(hits)
    }
}
