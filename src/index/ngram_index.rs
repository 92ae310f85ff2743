use roaring::RoaringBitmap;
use rustc_hash::{FxHashMap, FxHashSet};

/// Inverted index mapping n-gram terms to document IDs using roaring bitmaps
#[derive(Debug, Default)]
pub struct NGramIndex {
    // Map from term to set of document IDs containing that term
    postings: FxHashMap<String, RoaringBitmap>,
}

impl NGramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document's analyzed terms to the index
    pub fn add_document(&mut self, doc_id: u32, terms: impl IntoIterator<Item = String>) {
        // Deduplicate terms to avoid redundant HashMap lookups and bitmap insertions
        let unique_terms: FxHashSet<String> = terms.into_iter().collect();

        for term in unique_terms {
            self.postings.entry(term).or_default().insert(doc_id);
        }
    }

    /// Documents containing `term`
    pub fn postings(&self, term: &str) -> Option<&RoaringBitmap> {
        self.postings.get(term)
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.postings.contains_key(term)
    }

    /// Documents containing every one of `terms`
    ///
    /// Postings are intersected smallest first, so the running result is never
    /// larger than the rarest term's posting list.
    pub fn intersect<'a>(&self, terms: impl IntoIterator<Item = &'a str>) -> RoaringBitmap {
        let mut postings = Vec::new();
        for term in terms {
            match self.postings(term) {
                Some(docs) => postings.push(docs),
                // If any term is not in the index, no documents match
                None => return RoaringBitmap::new(),
            }
        }
        postings.sort_by_key(|docs| docs.len());

        let mut postings = postings.into_iter();
        let Some(first) = postings.next() else {
            return RoaringBitmap::new();
        };
        let mut result = first.clone();
        for docs in postings {
            if result.is_empty() {
                break;
            }
            result &= docs;
        }
        result
    }

    /// Documents containing any of `terms`
    pub fn union<'a>(&self, terms: impl IntoIterator<Item = &'a str>) -> RoaringBitmap {
        let mut result = RoaringBitmap::new();
        for term in terms {
            if let Some(docs) = self.postings(term) {
                result |= docs;
            }
        }
        result
    }

    /// Get total number of distinct terms in the index
    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }
}
