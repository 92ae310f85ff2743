//! Property-based tests for the expression algebra, n-gram extraction,
//! rechecking and timeouts.
//!
//! Run with: `cargo test --test properties`

use proptest::collection::vec;
use proptest::prelude::*;
use regex::RegexBuilder;
use rustc_hash::FxHashSet;
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use ngram_regex::automaton::parse_regex;
use ngram_regex::expression::{degrade_to_disjunction, Expression};
use ngram_regex::index::{Document, Index, IndexOptions, Schema, StoredFieldLoader};
use ngram_regex::locale::Locale;
use ngram_regex::ngram::{extract_ngrams, NGramAnalyzer};
use ngram_regex::search::{
    Clock, QueryPlanner, RecheckStrategy, Rechecker, RegexQuery, Settings, TimeoutChecker,
    TimeoutStatus,
};
use ngram_regex::RegexError;

// =============================================================================
// Strategies
// =============================================================================

const LEAVES: u8 = 5;

/// Owned expression shape, converted to an [`Expression`] inside each test
#[derive(Debug, Clone)]
enum Tree {
    True,
    False,
    Leaf(u8),
    And(Vec<Tree>),
    Or(Vec<Tree>),
}

impl Tree {
    fn build(&self) -> Expression<u8> {
        match self {
            Tree::True => Expression::True,
            Tree::False => Expression::False,
            Tree::Leaf(l) => Expression::leaf(*l),
            Tree::And(children) => Expression::and(children.iter().map(Tree::build)),
            Tree::Or(children) => Expression::or(children.iter().map(Tree::build)),
        }
    }
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        1 => Just(Tree::True),
        1 => Just(Tree::False),
        6 => (0..LEAVES).prop_map(Tree::Leaf),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..4).prop_map(Tree::And),
            vec(inner, 0..4).prop_map(Tree::Or),
        ]
    })
}

/// Regexes over a small alphabet, without anchors
fn regex_strategy() -> impl Strategy<Value = String> {
    let atom = prop_oneof![
        4 => "[abc]{1,4}",
        1 => Just("[ab]".to_string()),
        1 => Just("[a-c]".to_string()),
        1 => Just(".".to_string()),
    ];
    atom.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            vec(inner.clone(), 1..4).prop_map(|parts| parts.concat()),
            vec(inner.clone(), 2..4).prop_map(|parts| format!("(?:{})", parts.join("|"))),
            inner.clone().prop_map(|r| format!("(?:{})*", r)),
            inner.clone().prop_map(|r| format!("(?:{})+", r)),
            inner.prop_map(|r| format!("(?:{})?", r)),
        ]
    })
}

fn text_strategy() -> impl Strategy<Value = String> {
    "[abcd\n]{0,16}"
}

/// Mixed-case Greek, Cyrillic, Turkish and German letters whose lowercase
/// forms differ between locales
const UNICODE_LETTERS: &str = "aAiIıİlLσΣςάΆλΛжЖßẞ";

fn unicode_regex_strategy() -> impl Strategy<Value = String> {
    let atom = prop_oneof![
        4 => proptest::string::string_regex(&format!("[{}]{{1,4}}", UNICODE_LETTERS)).unwrap(),
        1 => Just(".".to_string()),
        1 => Just("[σς]".to_string()),
    ];
    atom.prop_recursive(2, 12, 3, |inner| {
        prop_oneof![
            vec(inner.clone(), 1..4).prop_map(|parts| parts.concat()),
            vec(inner.clone(), 2..3).prop_map(|parts| format!("(?:{})", parts.join("|"))),
            inner.prop_map(|r| format!("(?:{})+", r)),
        ]
    })
}

fn unicode_text_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[{} ]{{0,12}}", UNICODE_LETTERS)).unwrap()
}

fn locale_strategy() -> impl Strategy<Value = Locale> {
    prop_oneof![Just(Locale::Root), Just(Locale::Greek), Just(Locale::Turkish)]
}

fn is_too_complex(err: &RegexError) -> bool {
    matches!(
        err,
        RegexError::TooComplexToTrace { .. } | RegexError::TooComplexToDeterminize { .. }
    )
}

fn truth(mask: u32) -> impl Fn(&u8) -> bool {
    move |leaf| mask & (1 << leaf) != 0
}

// =============================================================================
// Expression algebra
// =============================================================================

proptest! {
    #[test]
    fn test_simplify_is_idempotent(tree in tree_strategy()) {
        let simplified = tree.build().simplify();
        prop_assert_eq!(simplified.simplify(), simplified);
    }

    #[test]
    fn test_simplify_preserves_truth(tree in tree_strategy()) {
        let expr = tree.build();
        let simplified = expr.simplify();
        for mask in 0..(1u32 << LEAVES) {
            prop_assert_eq!(
                expr.evaluate(truth(mask)),
                simplified.evaluate(truth(mask)),
                "assignment {:b}", mask
            );
        }
    }

    #[test]
    fn test_degrade_over_approximates(tree in tree_strategy(), max_clauses in 0usize..8) {
        let expr = tree.build().simplify();
        let degraded = degrade_to_disjunction(&expr, max_clauses);

        if !degraded.is_true() {
            prop_assert!(degraded.count_clauses() <= max_clauses);
            let leaves_only = degraded.as_leaf().is_some()
                || degraded.is_false()
                || degraded.children().iter().all(|c| c.as_leaf().is_some());
            prop_assert!(leaves_only, "not a flat disjunction: {}", degraded);
        }
        for mask in 0..(1u32 << LEAVES) {
            if expr.evaluate(truth(mask)) {
                prop_assert!(degraded.evaluate(truth(mask)), "assignment {:b}", mask);
            }
        }
    }
}

// =============================================================================
// N-gram extraction
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_extracted_ngrams_are_necessary(
        regex in regex_strategy(),
        texts in vec(text_strategy(), 1..8),
        gram_size in 2usize..4,
    ) {
        let settings = Settings {
            gram_size,
            case_sensitive: true,
            ..Settings::default()
        };
        let analyzer = NGramAnalyzer::new(gram_size);
        let hir = parse_regex(&regex, None).unwrap();
        let required = match QueryPlanner::new(&regex, &settings).required_ngrams(&hir, &analyzer) {
            Ok(expr) => expr,
            Err(RegexError::TooComplexToTrace { .. } | RegexError::TooComplexToDeterminize { .. }) => {
                return Ok(());
            }
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        let simplified = required.simplify();
        let degraded = degrade_to_disjunction(&simplified, 4);

        let oracle = RegexBuilder::new(&regex).build().unwrap();
        for text in &texts {
            if !oracle.is_match(text) {
                continue;
            }
            let grams: FxHashSet<String> = extract_ngrams(text, gram_size).into_iter().collect();
            let present = |gram: &String| grams.contains(gram);
            prop_assert!(required.evaluate(present), "{} on {:?}: {}", regex, text, required);
            prop_assert!(simplified.evaluate(present), "{} on {:?}: {}", regex, text, simplified);
            prop_assert!(degraded.evaluate(present), "{} on {:?}: {}", regex, text, degraded);
        }
    }

    #[test]
    fn test_rechecker_agrees_with_regex_crate(
        regex in regex_strategy(),
        texts in vec(text_strategy(), 1..8),
        case_sensitive in any::<bool>(),
    ) {
        let settings = Settings {
            case_sensitive,
            ..Settings::default()
        };
        let mut rechecker = Rechecker::new(regex.as_str(), &settings);
        let oracle = RegexBuilder::new(&regex)
            .case_insensitive(!case_sensitive)
            .build()
            .unwrap();
        for text in &texts {
            let upper = text.to_uppercase();
            for value in [text.as_str(), upper.as_str()] {
                match rechecker.recheck(&[value]) {
                    Ok(matched) => prop_assert_eq!(matched, oracle.is_match(value), "{} on {:?}", regex, value),
                    Err(RegexError::TooComplexToDeterminize { .. }) => return Ok(()),
                    Err(e) => return Err(TestCaseError::fail(e.to_string())),
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn test_accelerated_search_agrees_on_unicode_text(
        regex in unicode_regex_strategy(),
        texts in vec(unicode_text_strategy(), 1..8),
        locale in locale_strategy(),
    ) {
        let schema = Schema::new()
            .with_ngram_field("body.ngram", "body", NGramAnalyzer::lowercased(3, locale.clone()));
        let mut index = Index::new(schema, IndexOptions { shards: 1, max_docs_per_segment: 3 });
        for text in &texts {
            index.add_document(Document::new().with_field("body", text.as_str()));
        }
        let settings = Settings { locale, ..Settings::default() };
        let plain = RegexQuery::new("body", regex.as_str()).unwrap().with_settings(settings);
        let accelerated = plain.clone().with_ngram_field("body.ngram");

        let full_scan = match index.search(&plain, &StoredFieldLoader) {
            Ok(results) => results.hits,
            Err(e) if is_too_complex(&e) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        let filtered = match index.search(&accelerated, &StoredFieldLoader) {
            Ok(results) => results.hits,
            Err(e) if is_too_complex(&e) => return Ok(()),
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        prop_assert_eq!(full_scan, filtered, "{} over {:?}", regex, texts);
    }

    #[test]
    fn test_baseline_agrees_with_selected_strategy(
        regex in unicode_regex_strategy(),
        texts in vec(unicode_text_strategy(), 1..8),
        locale in locale_strategy(),
    ) {
        let settings = Settings { locale, ..Settings::default() };
        let mut selected = Rechecker::new(regex.as_str(), &settings);
        let mut baseline = Rechecker::new(regex.as_str(), &settings)
            .with_strategy(RecheckStrategy::Baseline);
        for text in &texts {
            let fast = match selected.recheck(&[text]) {
                Ok(matched) => matched,
                Err(e) if is_too_complex(&e) => return Ok(()),
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            };
            let slow = match baseline.recheck(&[text]) {
                Ok(matched) => matched,
                Err(e) if is_too_complex(&e) => return Ok(()),
                Err(e) => return Err(TestCaseError::fail(e.to_string())),
            };
            prop_assert_eq!(fast, slow, "{:?} {} on {:?}", selected.strategy(), regex, text);
        }
    }
}

#[test]
fn test_two_gram_extraction_requires_te() {
    let settings = Settings {
        gram_size: 2,
        case_sensitive: true,
        ..Settings::default()
    };
    let analyzer = NGramAnalyzer::new(2);
    let hir = parse_regex("te[st]t", None).unwrap();
    let required = QueryPlanner::new("te[st]t", &settings)
        .required_ngrams(&hir, &analyzer)
        .unwrap()
        .simplify();
    for text in ["test", "tett", "a test b"] {
        let grams: FxHashSet<String> = extract_ngrams(text, 2).into_iter().collect();
        assert!(required.evaluate(|g| grams.contains(g)));
    }
    let grams: FxHashSet<String> = extract_ngrams("tst", 2).into_iter().collect();
    assert!(!required.evaluate(|g| grams.contains(g)));
}

// =============================================================================
// Settings and timeouts
// =============================================================================

#[derive(Clone)]
struct ScriptedClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl Clock for ScriptedClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

proptest! {
    #[test]
    fn test_empty_regex_always_fails(
        gram_size in 0usize..5,
        max_expand in 0usize..5,
        reject_unaccelerated in any::<bool>(),
        case_sensitive in any::<bool>(),
    ) {
        let settings = Settings {
            gram_size,
            max_expand,
            reject_unaccelerated,
            case_sensitive,
            ..Settings::default()
        };
        let analyzer = NGramAnalyzer::new(gram_size);
        prop_assert!(matches!(
            QueryPlanner::new("", &settings).with_ngram_field("f", &analyzer).rewrite(),
            Err(RegexError::EmptyRegex)
        ));
    }

    #[test]
    fn test_timeout_expiry_is_sticky(
        budget_ms in 1u64..50,
        // Offsets jump forwards and backwards
        offsets in vec(0u64..200, 1..40),
    ) {
        let clock = ScriptedClock {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::from_millis(100))),
        };
        let mut checker = TimeoutChecker::with_clock(budget_ms, clock.clone());
        let mut expired = false;
        let mut previous = Duration::ZERO;
        for offset in offsets {
            clock.offset.set(Duration::from_millis(offset));
            let status = checker.check();
            if expired {
                prop_assert_eq!(status, TimeoutStatus::Expired);
            }
            expired |= status == TimeoutStatus::Expired;
            prop_assert!(checker.elapsed() >= previous);
            previous = checker.elapsed();
        }
        prop_assert_eq!(checker.is_expired(), expired);
    }
}
