//! Per-query regex settings.

use crate::error::RegexError;
use crate::locale::{CaseFold, Locale};
use serde::{Deserialize, Serialize};

/// Immutable settings shared by every execution of one regex query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Length of the n-grams in the index field (default: 3)
    #[serde(default = "default_gram_size")]
    pub gram_size: usize,

    /// Widest character range expanded into separate n-grams (default: 4)
    #[serde(default = "default_max_expand")]
    pub max_expand: usize,

    /// Bound on (state, partial n-gram) pairs traced during extraction
    /// (default: 10000; 0 accelerates only literal sequences)
    #[serde(default = "default_max_states_traced")]
    pub max_states_traced: usize,

    /// Bound on automaton states when determinizing the regex (default: 20000)
    #[serde(default = "default_max_determinized_states")]
    pub max_determinized_states: usize,

    /// Bound on distinct n-grams extracted (default: 100)
    #[serde(default = "default_max_ngrams_extracted")]
    pub max_ngrams_extracted: usize,

    /// Bound on leaf clauses in the index query (default: 1024)
    #[serde(default = "default_max_ngram_clauses")]
    pub max_ngram_clauses: usize,

    #[serde(default)]
    pub case_sensitive: bool,

    /// Language whose lowercasing rules apply when case-insensitive
    #[serde(default)]
    pub locale: Locale,

    /// Fail instead of scanning every document when acceleration is impossible
    #[serde(default)]
    pub reject_unaccelerated: bool,

    /// Wall-clock budget for the recheck pass in milliseconds (0 = unbounded)
    #[serde(default)]
    pub timeout_ms: u64,
}

fn default_gram_size() -> usize {
    3
}

fn default_max_expand() -> usize {
    4
}

fn default_max_states_traced() -> usize {
    10_000
}

fn default_max_determinized_states() -> usize {
    20_000
}

fn default_max_ngrams_extracted() -> usize {
    100
}

fn default_max_ngram_clauses() -> usize {
    1024
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gram_size: default_gram_size(),
            max_expand: default_max_expand(),
            max_states_traced: default_max_states_traced(),
            max_determinized_states: default_max_determinized_states(),
            max_ngrams_extracted: default_max_ngrams_extracted(),
            max_ngram_clauses: default_max_ngram_clauses(),
            case_sensitive: false,
            locale: Locale::Root,
            reject_unaccelerated: false,
            timeout_ms: 0,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), RegexError> {
        if self.gram_size == 0 {
            return Err(RegexError::InvalidSetting {
                name: "gram_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_determinized_states == 0 {
            return Err(RegexError::InvalidSetting {
                name: "max_determinized_states",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fold applied to the regex before building the extraction automaton.
    pub fn fold(&self) -> Option<CaseFold> {
        if self.case_sensitive {
            None
        } else {
            Some(self.locale.char_fold())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.gram_size, 3);
        assert_eq!(settings.max_expand, 4);
        assert_eq!(settings.max_states_traced, 10_000);
        assert_eq!(settings.max_determinized_states, 20_000);
        assert_eq!(settings.max_ngrams_extracted, 100);
        assert_eq!(settings.max_ngram_clauses, 1024);
        assert!(!settings.case_sensitive);
        assert_eq!(settings.locale, Locale::Root);
        assert!(!settings.reject_unaccelerated);
        assert_eq!(settings.timeout_ms, 0);
    }

    #[test]
    fn test_parse_partial_settings() {
        let settings: Settings = toml::from_str(
            r#"
max_expand = 2
locale = "tr"
reject_unaccelerated = true
"#,
        )
        .unwrap();
        assert_eq!(settings.max_expand, 2);
        assert_eq!(settings.locale, Locale::Turkish);
        assert!(settings.reject_unaccelerated);
        assert_eq!(settings.gram_size, 3);
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate().is_ok());
        let settings = Settings {
            gram_size: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(RegexError::InvalidSetting { name: "gram_size", .. })
        ));
        let settings = Settings {
            max_determinized_states: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_fold_follows_locale() {
        let mut settings = Settings::default();
        assert_eq!(settings.fold(), Some(CaseFold::Lowercase));
        settings.locale = Locale::Greek;
        assert_eq!(settings.fold(), Some(CaseFold::Greek));
        settings.case_sensitive = true;
        assert_eq!(settings.fold(), None);
    }
}
