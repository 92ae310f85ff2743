use crate::locale::Locale;
use serde::{Deserialize, Serialize};

/// Splits text into the index's n-gram terms.
///
/// The same analyzer must run at index time and on every n-gram extracted at
/// query time, so both sides agree on folding and special characters.
pub trait Analyzer {
    fn analyze(&self, text: &str) -> Vec<String>;
}

impl<F> Analyzer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn analyze(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Character n-grams, optionally lowercased with a locale's rules first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NGramAnalyzer {
    pub gram_size: usize,
    #[serde(default)]
    pub lowercase: Option<Locale>,
}

impl NGramAnalyzer {
    pub fn new(gram_size: usize) -> Self {
        Self {
            gram_size,
            lowercase: None,
        }
    }

    pub fn lowercased(gram_size: usize, locale: Locale) -> Self {
        Self {
            gram_size,
            lowercase: Some(locale),
        }
    }
}

impl Analyzer for NGramAnalyzer {
    fn analyze(&self, text: &str) -> Vec<String> {
        match &self.lowercase {
            Some(locale) => extract_ngrams(&locale.lowercase(text), self.gram_size),
            None => extract_ngrams(text, self.gram_size),
        }
    }
}

/// Extract every window of `gram_size` characters from text
pub fn extract_ngrams(text: &str, gram_size: usize) -> Vec<String> {
    if gram_size == 0 {
        return Vec::new();
    }
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let count = bounds.len().saturating_sub(gram_size);

    let mut grams = Vec::with_capacity(count);
    for i in 0..count {
        grams.push(text[bounds[i]..bounds[i + gram_size]].to_string());
    }
    grams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngram_extraction() {
        let grams = extract_ngrams("hello", 3);
        assert_eq!(grams, vec!["hel", "ell", "llo"]);
        assert!(extract_ngrams("he", 3).is_empty());
        assert_eq!(extract_ngrams("he", 1), vec!["h", "e"]);
        assert!(extract_ngrams("hello", 0).is_empty());
    }

    #[test]
    fn test_ngrams_are_character_windows() {
        let grams = extract_ngrams("ıstanbul", 3);
        assert_eq!(grams[0], "ıst");
        assert_eq!(grams.len(), 6);
    }

    #[test]
    fn test_lowercasing_analyzer() {
        let analyzer = NGramAnalyzer::lowercased(3, Locale::Turkish);
        assert_eq!(analyzer.analyze("DIŞ"), vec!["dış"]);

        let analyzer = NGramAnalyzer::lowercased(3, Locale::Root);
        assert_eq!(analyzer.analyze("ABCd"), vec!["abc", "bcd"]);
    }

    #[test]
    fn test_closure_analyzer() {
        let upper = |text: &str| vec![text.to_uppercase()];
        assert_eq!(upper.analyze("abc"), vec!["ABC"]);
    }
}
