//! The index the regex engine runs against.
//!
//! [`SegmentReader`] and [`FieldLoader`] are the seams the engine depends on;
//! the rest of this module is an in-memory implementation of them.

pub mod file_store;
pub mod ngram_index;
pub mod query;
pub mod segment;
pub mod shard;

pub use file_store::{FileContentLoader, MappedFile};
pub use ngram_index::NGramIndex;
pub use query::NGramQuery;
pub use segment::{Document, NGramField, Schema, Segment};
pub use shard::{DocAddress, Index, IndexOptions, SearchResults, Shard};

use roaring::RoaringBitmap;
use std::io;

/// Read access to one segment of an index
pub trait SegmentReader {
    fn doc_count(&self) -> u32;

    /// Documents matching `query`.
    fn evaluate(&self, query: &NGramQuery) -> RoaringBitmap;

    /// Stored values of `field`, or `None` for an unknown document.
    fn stored(&self, field: &str, doc_id: u32) -> Option<&[String]>;

    /// Segment-specific rewrite; terms absent from the segment match nothing.
    fn rewrite(&self, query: &NGramQuery) -> NGramQuery;
}

/// Loads the text values of a field for the recheck.
pub trait FieldLoader: Send + Sync {
    fn load(&self, field: &str, reader: &dyn SegmentReader, doc_id: u32) -> io::Result<Vec<String>>;
}

/// Loads a field from the segment's stored values
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredFieldLoader;

impl FieldLoader for StoredFieldLoader {
    fn load(&self, field: &str, reader: &dyn SegmentReader, doc_id: u32) -> io::Result<Vec<String>> {
        Ok(reader
            .stored(field, doc_id)
            .map(<[String]>::to_vec)
            .unwrap_or_default())
    }
}
