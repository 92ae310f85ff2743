//! Shards and the index that spreads documents over them.
//!
//! Each shard searches its segments on one thread with its own rechecker and
//! timeout; shards run in parallel.

use super::{Document, FieldLoader, Schema, Segment, SegmentReader};
use crate::error::RegexError;
use crate::search::{CompiledQuery, ExecutionStats, RegexQuery};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Where a document lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DocAddress {
    pub shard: usize,
    pub segment: usize,
    pub doc_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub shards: usize,
    /// New documents go to a fresh segment once the last one is this full
    pub max_docs_per_segment: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            shards: 4,
            max_docs_per_segment: 10_000,
        }
    }
}

/// Matches of one search, with the counters of every shard merged
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub hits: Vec<DocAddress>,
    pub stats: ExecutionStats,
}

/// A sequence of segments searched by one execution
#[derive(Debug)]
pub struct Shard {
    segments: Vec<Segment>,
    max_docs_per_segment: usize,
}

impl Shard {
    pub fn new(max_docs_per_segment: usize) -> Self {
        Self {
            segments: Vec::new(),
            max_docs_per_segment: max_docs_per_segment.max(1),
        }
    }

    /// Add a document, returning its segment and ID within that segment.
    pub fn add_document(&mut self, schema: &Schema, document: Document) -> (usize, u32) {
        let full = self
            .segments
            .last()
            .map_or(true, |segment| segment.len() >= self.max_docs_per_segment);
        if full {
            self.segments.push(Segment::new());
        }
        let segment = self.segments.len() - 1;
        let doc_id = self.segments[segment].add_document(schema, document);
        (segment, doc_id)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of documents in the shard
    pub fn len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `compiled` over every segment; stops early when the timeout expires.
    pub fn search(
        &self,
        shard: usize,
        compiled: &CompiledQuery,
        loader: &dyn FieldLoader,
    ) -> Result<(Vec<DocAddress>, ExecutionStats), RegexError> {
        let mut ctx = compiled.context(loader);
        let mut hits = Vec::new();
        for (segment, reader) in self.segments.iter().enumerate() {
            if ctx.is_timed_out() {
                break;
            }
            hits.extend(
                compiled
                    .search_segment(&mut ctx, reader)?
                    .into_iter()
                    .map(|doc_id| DocAddress {
                        shard,
                        segment,
                        doc_id,
                    }),
            );
        }
        Ok((hits, ctx.into_stats()))
    }
}

/// Documents spread round-robin over a fixed number of shards
#[derive(Debug)]
pub struct Index {
    schema: Schema,
    shards: Vec<Shard>,
    next_shard: usize,
}

impl Index {
    pub fn new(schema: Schema, options: IndexOptions) -> Self {
        let shards = (0..options.shards.max(1))
            .map(|_| Shard::new(options.max_docs_per_segment))
            .collect();
        Self {
            schema,
            shards,
            next_shard: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn add_document(&mut self, document: Document) -> DocAddress {
        let shard = self.next_shard;
        self.next_shard = (self.next_shard + 1) % self.shards.len();
        let (segment, doc_id) = self.shards[shard].add_document(&self.schema, document);
        DocAddress {
            shard,
            segment,
            doc_id,
        }
    }

    /// Number of documents in the index
    pub fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored values of `field` for the document at `address`.
    pub fn stored(&self, address: DocAddress, field: &str) -> Option<&[String]> {
        self.shards
            .get(address.shard)?
            .segments
            .get(address.segment)?
            .stored(field, address.doc_id)
    }

    /// Compile `query` against the schema and search every shard.
    pub fn search(&self, query: &RegexQuery, loader: &dyn FieldLoader) -> Result<SearchResults, RegexError> {
        let compiled = query.compile(&self.schema)?;
        self.search_compiled(&compiled, loader)
    }

    pub fn search_compiled(
        &self,
        compiled: &CompiledQuery,
        loader: &dyn FieldLoader,
    ) -> Result<SearchResults, RegexError> {
        let per_shard: Vec<(Vec<DocAddress>, ExecutionStats)> = self
            .shards
            .par_iter()
            .enumerate()
            .map(|(id, shard)| shard.search(id, compiled, loader))
            .collect::<Result<_, _>>()?;

        let mut results = SearchResults::default();
        for (hits, stats) in per_shard {
            results.hits.extend(hits);
            results.stats.merge(&stats);
        }
        results.hits.sort_unstable();

        debug!(
            regex = %compiled.query().regex(),
            hits = results.hits.len(),
            candidates = results.stats.candidates,
            timed_out = results.stats.timed_out,
            "Search complete"
        );
        Ok(results)
    }
}
