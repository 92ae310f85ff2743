//! In-memory segments: n-gram postings plus stored field values.

use super::{NGramIndex, NGramQuery, SegmentReader};
use crate::ngram::{Analyzer, NGramAnalyzer};
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

/// An n-gram field derived from a source text field
#[derive(Debug, Clone)]
pub struct NGramField {
    pub name: String,
    pub source: String,
    pub analyzer: NGramAnalyzer,
}

/// Which n-gram fields exist and which fields are not stored
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub ngram_fields: Vec<NGramField>,
    pub unstored: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `source` into the n-gram field `name` using `analyzer`.
    pub fn with_ngram_field(
        mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        analyzer: NGramAnalyzer,
    ) -> Self {
        self.ngram_fields.push(NGramField {
            name: name.into(),
            source: source.into(),
            analyzer,
        });
        self
    }

    /// Do not keep the values of `field` after indexing them.
    pub fn with_unstored(mut self, field: impl Into<String>) -> Self {
        self.unstored.push(field.into());
        self
    }

    pub fn ngram_field(&self, name: &str) -> Option<&NGramField> {
        self.ngram_fields.iter().find(|f| f.name == name)
    }

    fn is_stored(&self, field: &str) -> bool {
        !self.unstored.iter().any(|f| f == field)
    }
}

/// A document: named fields holding one or more text values
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: FxHashMap<String, Vec<String>>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `name`.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_value(name, value);
        self
    }

    pub fn add_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// An immutable-once-searched batch of documents
#[derive(Debug, Default)]
pub struct Segment {
    /// Postings per n-gram field
    postings: FxHashMap<String, NGramIndex>,
    stored: Vec<Document>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index and store `document`, returning its ID within the segment.
    pub fn add_document(&mut self, schema: &Schema, mut document: Document) -> u32 {
        let doc_id = self.stored.len() as u32;
        for field in &schema.ngram_fields {
            let terms = document
                .values(&field.source)
                .iter()
                .flat_map(|value| field.analyzer.analyze(value));
            self.postings
                .entry(field.name.clone())
                .or_default()
                .add_document(doc_id, terms);
        }
        document.fields.retain(|name, _| schema.is_stored(name));
        self.stored.push(document);
        doc_id
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    fn all_documents(&self) -> RoaringBitmap {
        let mut all = RoaringBitmap::new();
        all.insert_range(0..self.doc_count());
        all
    }

    fn has_term(&self, field: &str, term: &str) -> bool {
        self.postings
            .get(field)
            .is_some_and(|index| index.contains_term(term))
    }
}

impl SegmentReader for Segment {
    fn doc_count(&self) -> u32 {
        self.stored.len() as u32
    }

    fn evaluate(&self, query: &NGramQuery) -> RoaringBitmap {
        match query {
            NGramQuery::MatchAll => self.all_documents(),
            NGramQuery::MatchNone => RoaringBitmap::new(),
            NGramQuery::Term { field, term } => self
                .postings
                .get(field)
                .and_then(|index| index.postings(term))
                .cloned()
                .unwrap_or_default(),
            NGramQuery::Terms { field, terms } => match self.postings.get(field) {
                Some(index) => index.union(terms.iter().map(String::as_str)),
                None => RoaringBitmap::new(),
            },
            NGramQuery::And(children) => {
                if let Some((field, terms)) = same_field_terms(children) {
                    return match self.postings.get(field) {
                        Some(index) => index.intersect(terms),
                        None => RoaringBitmap::new(),
                    };
                }
                let mut children = children.iter();
                let Some(first) = children.next() else {
                    return self.all_documents();
                };
                let mut result = self.evaluate(first);
                for child in children {
                    if result.is_empty() {
                        break;
                    }
                    result &= self.evaluate(child);
                }
                result
            }
            NGramQuery::Or(children) => {
                let mut result = RoaringBitmap::new();
                for child in children {
                    result |= self.evaluate(child);
                }
                result
            }
        }
    }

    fn stored(&self, field: &str, doc_id: u32) -> Option<&[String]> {
        self.stored
            .get(doc_id as usize)
            .map(|document| document.values(field))
    }

    fn rewrite(&self, query: &NGramQuery) -> NGramQuery {
        let rewritten = match query {
            NGramQuery::Term { field, term } if !self.has_term(field, term) => NGramQuery::MatchNone,
            NGramQuery::Terms { field, terms } => NGramQuery::Terms {
                field: field.clone(),
                terms: terms
                    .iter()
                    .filter(|term| self.has_term(field, term))
                    .cloned()
                    .collect(),
            },
            NGramQuery::And(children) => {
                NGramQuery::And(children.iter().map(|c| self.rewrite(c)).collect())
            }
            NGramQuery::Or(children) => {
                NGramQuery::Or(children.iter().map(|c| self.rewrite(c)).collect())
            }
            other => other.clone(),
        };
        rewritten.rewrite()
    }
}

/// The field and terms of a conjunction made only of terms on one field.
fn same_field_terms(children: &[NGramQuery]) -> Option<(&str, Vec<&str>)> {
    let mut field = None;
    let mut terms = Vec::with_capacity(children.len());
    for child in children {
        let NGramQuery::Term { field: f, term } = child else {
            return None;
        };
        match field {
            None => field = Some(f.as_str()),
            Some(existing) if existing != f => return None,
            Some(_) => {}
        }
        terms.push(term.as_str());
    }
    field.map(|field| (field, terms))
}
