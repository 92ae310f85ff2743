//! Locale-sensitive lowercasing used for case-insensitive matching.
//!
//! Default Unicode lowercasing is wrong for a handful of languages. Turkish and
//! Azerbaijani distinguish dotted and dotless i, and Irish inserts a hyphen
//! after an initial `n`/`t` mutation before an uppercase vowel. Greek search
//! expects accents and final sigma to fold to their base letters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Last code point with a lowercase mapping (end of the Adlam block).
pub(crate) const LAST_CASED_CODE_POINT: u32 = 0x1E95F;

/// Language used to pick lowercasing rules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Locale {
    /// Language-neutral Unicode lowercasing
    #[default]
    Root,
    /// `tr`
    Turkish,
    /// `az`
    Azerbaijani,
    /// `ga`
    Irish,
    /// `el`
    Greek,
    /// Any other language; lowercased like [`Locale::Root`]
    Other(String),
}

impl Locale {
    /// Parse a language tag such as `tr`, `el-GR` or `ga_IE`.
    pub fn from_tag(tag: &str) -> Self {
        let language = tag
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "" | "root" | "und" => Locale::Root,
            "tr" => Locale::Turkish,
            "az" => Locale::Azerbaijani,
            "ga" => Locale::Irish,
            "el" => Locale::Greek,
            _ => Locale::Other(tag.to_string()),
        }
    }

    /// The tag this locale was parsed from (canonical for known languages).
    pub fn tag(&self) -> &str {
        match self {
            Locale::Root => "root",
            Locale::Turkish => "tr",
            Locale::Azerbaijani => "az",
            Locale::Irish => "ga",
            Locale::Greek => "el",
            Locale::Other(tag) => tag,
        }
    }

    /// Whether lowercasing one code point at a time gives wrong answers here.
    pub fn needs_prefolding(&self) -> bool {
        matches!(
            self,
            Locale::Turkish | Locale::Azerbaijani | Locale::Irish
        )
    }

    /// Per-code-point fold used to normalize regex literals for this locale.
    pub fn char_fold(&self) -> CaseFold {
        match self {
            Locale::Greek => CaseFold::Greek,
            Locale::Turkish | Locale::Azerbaijani => CaseFold::Turkish,
            _ => CaseFold::Lowercase,
        }
    }

    /// Lowercase a whole string with this locale's rules.
    ///
    /// Every code point maps to exactly one code point except where a locale
    /// rule says otherwise, so index terms line up with folded regex literals.
    pub fn lowercase(&self, text: &str) -> String {
        match self {
            Locale::Turkish | Locale::Azerbaijani => turkish_lowercase(text),
            Locale::Irish => irish_lowercase(text),
            Locale::Greek => text.chars().map(greek_fold).collect(),
            Locale::Root | Locale::Other(_) => text.chars().map(simple_lowercase).collect(),
        }
    }
}

impl From<String> for Locale {
    fn from(tag: String) -> Self {
        Locale::from_tag(&tag)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Locale::from_tag(tag)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.tag().to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Folding applied to one code point at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFold {
    /// Unicode simple lowercase mapping
    Lowercase,
    /// Lowercase, then strip tonos/dialytika and fold final sigma
    Greek,
    /// Lowercase with Turkish dotted/dotless i
    Turkish,
}

impl CaseFold {
    /// Fold a single code point.
    #[inline]
    pub fn fold(self, c: char) -> char {
        match self {
            CaseFold::Lowercase => simple_lowercase(c),
            CaseFold::Greek => greek_fold(c),
            CaseFold::Turkish => match c {
                'I' => 'ı',
                'İ' => 'i',
                _ => simple_lowercase(c),
            },
        }
    }
}

/// Single-code-point lowercase mapping.
///
/// `char::to_lowercase` yields the full mapping, which is two code points only
/// for `İ`; its first code point is the simple mapping.
#[inline]
pub fn simple_lowercase(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    c.to_lowercase().next().unwrap_or(c)
}

/// Greek fold: lowercase, unaccented, medial sigma.
#[inline]
pub fn greek_fold(c: char) -> char {
    match c {
        'Σ' | 'ς' | 'ϲ' | 'Ϲ' => 'σ',
        'Ά' | 'ά' => 'α',
        'Έ' | 'έ' => 'ε',
        'Ή' | 'ή' => 'η',
        'Ί' | 'ί' | 'Ϊ' | 'ϊ' | 'ΐ' => 'ι',
        'Ό' | 'ό' => 'ο',
        'Ύ' | 'ύ' | 'Ϋ' | 'ϋ' | 'ΰ' => 'υ',
        'Ώ' | 'ώ' => 'ω',
        _ => simple_lowercase(c),
    }
}

fn turkish_lowercase(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // I followed by a combining dot above is a decomposed İ
            'I' if chars.peek() == Some(&'\u{307}') => {
                chars.next();
                out.push('i');
            }
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            _ => out.push(simple_lowercase(c)),
        }
    }
    out
}

fn is_irish_upper_vowel(c: char) -> bool {
    matches!(
        c,
        'A' | 'E' | 'I' | 'O' | 'U' | 'Á' | 'É' | 'Í' | 'Ó' | 'Ú'
    )
}

fn irish_lowercase(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut chars = text.chars().peekable();
    let mut word_start = true;
    while let Some(c) = chars.next() {
        if word_start
            && matches!(c, 'n' | 't')
            && chars.peek().copied().is_some_and(is_irish_upper_vowel)
        {
            out.push(c);
            out.push('-');
        } else {
            out.push(simple_lowercase(c));
        }
        word_start = !c.is_alphanumeric();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(Locale::from_tag("tr"), Locale::Turkish);
        assert_eq!(Locale::from_tag("tr-TR"), Locale::Turkish);
        assert_eq!(Locale::from_tag("el_GR"), Locale::Greek);
        assert_eq!(Locale::from_tag("GA"), Locale::Irish);
        assert_eq!(Locale::from_tag(""), Locale::Root);
        assert_eq!(Locale::from_tag("en-US"), Locale::Other("en-US".to_string()));
        assert_eq!(Locale::from_tag("en-US").tag(), "en-US");
    }

    #[test]
    fn test_simple_lowercase_dotted_capital_i() {
        assert_eq!(simple_lowercase('İ'), 'i');
        assert_eq!(simple_lowercase('A'), 'a');
        assert_eq!(simple_lowercase('Ж'), 'ж');
        assert_eq!(simple_lowercase('7'), '7');
    }

    #[test]
    fn test_turkish_lowercase() {
        assert_eq!(Locale::Turkish.lowercase("ISTANBUL"), "ıstanbul");
        assert_eq!(Locale::Turkish.lowercase("İstanbul"), "istanbul");
        assert_eq!(Locale::Turkish.lowercase("I\u{307}stanbul"), "istanbul");
        assert_eq!(Locale::Root.lowercase("ISTANBUL"), "istanbul");
    }

    #[test]
    fn test_irish_lowercase() {
        assert_eq!(Locale::Irish.lowercase("nAthair"), "n-athair");
        assert_eq!(Locale::Irish.lowercase("ár nAthair"), "ár n-athair");
        assert_eq!(Locale::Irish.lowercase("tUisce"), "t-uisce");
        assert_eq!(Locale::Irish.lowercase("Naomh"), "naomh");
        assert_eq!(Locale::Root.lowercase("nAthair"), "nathair");
    }

    #[test]
    fn test_root_lowercase_is_per_code_point() {
        // No final sigma context and no combining dot after İ
        assert_eq!(Locale::Root.lowercase("ΛΟΓΟΣ"), "λογοσ");
        assert_eq!(Locale::Root.lowercase("İstanbul"), "istanbul");
        assert_eq!(Locale::from_tag("de").lowercase("STRAẞE"), "straße");
        assert_eq!(Locale::Irish.lowercase("İ"), "i");
        for text in ["ΛΟΓΟΣ", "İstanbul", "ЖУРНАЛ", "STRAẞE"] {
            let folded: String = text.chars().map(|c| CaseFold::Lowercase.fold(c)).collect();
            assert_eq!(Locale::Root.lowercase(text), folded);
        }
    }

    #[test]
    fn test_greek_fold() {
        assert_eq!(greek_fold('Ά'), 'α');
        assert_eq!(greek_fold('ς'), 'σ');
        assert_eq!(greek_fold('Σ'), 'σ');
        assert_eq!(greek_fold('ΰ'), 'υ');
        assert_eq!(greek_fold('Β'), 'β');
        assert_eq!(Locale::Greek.lowercase("ΌΣΟΣ"), "οσοσ");
        assert_eq!(simple_lowercase('Ά'), 'ά');
    }

    #[test]
    fn test_folds_are_idempotent() {
        for fold in [CaseFold::Lowercase, CaseFold::Greek, CaseFold::Turkish] {
            for c in ['A', 'İ', 'I', 'ı', 'Ά', 'ς', 'Ϊ', 'ǅ', 'K', 'z'] {
                let once = fold.fold(c);
                assert_eq!(fold.fold(once), once, "{:?} on {:?}", fold, c);
            }
        }
    }

    #[test]
    fn test_locale_serde_round_trips_through_tag() {
        let locale: Locale = serde_json::from_str("\"el-GR\"").unwrap();
        assert_eq!(locale, Locale::Greek);
        assert_eq!(serde_json::to_string(&Locale::Turkish).unwrap(), "\"tr\"");
    }
}
