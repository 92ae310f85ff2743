//! Regex front end: parse, case-fold and translate to HIR.

use crate::error::RegexError;
use crate::locale::{CaseFold, LAST_CASED_CODE_POINT};
use regex_syntax::ast::{self, Ast, ClassSet, ClassSetItem};
use regex_syntax::hir::{self, Hir, HirKind};

/// Class ranges up to this many code points are folded member by member.
const MAX_EXPANDED_RANGE: u32 = 512;

/// Parse `regex`, folding its literals and class ranges when `fold` is set.
///
/// Folding happens on the AST so negated classes keep their meaning: `[^A]`
/// folds to `[^a]`. Look-around assertions are rejected because matches are
/// searched for as substrings.
pub fn parse_regex(regex: &str, fold: Option<CaseFold>) -> Result<Hir, RegexError> {
    let invalid = |message: String| RegexError::InvalidRegex {
        regex: regex.to_string(),
        message,
    };

    let mut ast = ast::parse::Parser::new()
        .parse(regex)
        .map_err(|e| invalid(e.to_string()))?;
    if let Some(fold) = fold {
        fold_ast(&mut ast, fold);
    }
    let hir = hir::translate::Translator::new()
        .translate(regex, &ast)
        .map_err(|e| invalid(e.to_string()))?;

    if let Some(look) = hir.properties().look_set().iter().next() {
        return Err(RegexError::UnsupportedAssertion {
            regex: regex.to_string(),
            assertion: format!("{:?}", look),
        });
    }
    Ok(hir)
}

/// The text a regex matches when it is a plain literal sequence.
pub fn literal_text(hir: &Hir) -> Option<String> {
    match hir.kind() {
        HirKind::Empty => Some(String::new()),
        // Literal wraps the raw UTF-8 bytes
        HirKind::Literal(lit) => std::str::from_utf8(&lit.0).ok().map(str::to_string),
        HirKind::Capture(capture) => literal_text(&capture.sub),
        HirKind::Concat(subs) => subs.iter().map(literal_text).collect(),
        _ => None,
    }
}

/// `.*hir.*` with `.` matching every code point, newlines included.
pub fn wrap_unanchored(hir: Hir) -> Hir {
    let any = Hir::repetition(hir::Repetition {
        min: 0,
        max: None,
        greedy: true,
        sub: Box::new(Hir::dot(hir::Dot::AnyChar)),
    });
    Hir::concat(vec![any.clone(), hir, any])
}

fn fold_ast(ast: &mut Ast, fold: CaseFold) {
    match ast {
        Ast::Literal(lit) => lit.c = fold.fold(lit.c),
        Ast::ClassBracketed(class) => fold_class_set(&mut class.kind, fold),
        Ast::Repetition(rep) => fold_ast(&mut rep.ast, fold),
        Ast::Group(group) => fold_ast(&mut group.ast, fold),
        Ast::Alternation(alt) => alt.asts.iter_mut().for_each(|a| fold_ast(a, fold)),
        Ast::Concat(concat) => concat.asts.iter_mut().for_each(|a| fold_ast(a, fold)),
        // Named classes (\w, \p{Lu}, [[:upper:]]) are matched as written.
        _ => {}
    }
}

fn fold_class_set(set: &mut ClassSet, fold: CaseFold) {
    match set {
        ClassSet::Item(item) => fold_class_item(item, fold),
        ClassSet::BinaryOp(op) => {
            fold_class_set(&mut op.lhs, fold);
            fold_class_set(&mut op.rhs, fold);
        }
    }
}

fn fold_class_item(item: &mut ClassSetItem, fold: CaseFold) {
    match item {
        ClassSetItem::Literal(lit) => lit.c = fold.fold(lit.c),
        ClassSetItem::Range(range) => {
            if let Some(folded) = fold_range(range, fold) {
                *item = folded;
            }
        }
        ClassSetItem::Bracketed(class) => fold_class_set(&mut class.kind, fold),
        ClassSetItem::Union(union) => union.items.iter_mut().for_each(|i| fold_class_item(i, fold)),
        _ => {}
    }
}

/// Replacement for a class range whose folded image differs from the range.
fn fold_range(range: &ast::ClassSetRange, fold: CaseFold) -> Option<ClassSetItem> {
    let (start, end) = (range.start.c as u32, range.end.c as u32);
    let mut members: Vec<char> = Vec::new();
    let mut items = Vec::new();

    if end - start < MAX_EXPANDED_RANGE {
        members.extend((start..=end).filter_map(char::from_u32).map(|c| fold.fold(c)));
        members.sort_unstable();
        members.dedup();
        let unchanged = members.len() == (end - start + 1) as usize
            && members.first().map(|&c| c as u32) == Some(start);
        if unchanged {
            return None;
        }
    } else {
        // Wide ranges keep their span and gain the images that fall outside it.
        members.extend(
            (start..=end.min(LAST_CASED_CODE_POINT))
                .filter_map(char::from_u32)
                .map(|c| fold.fold(c))
                .filter(|&f| (f as u32) < start || (f as u32) > end),
        );
        if members.is_empty() {
            return None;
        }
        members.sort_unstable();
        members.dedup();
        items.push(ClassSetItem::Range(range.clone()));
    }

    let span = range.span;
    let literal = |c: char| ast::Literal {
        span,
        kind: ast::LiteralKind::Verbatim,
        c,
    };
    let mut runs: Vec<(char, char)> = Vec::new();
    for c in members {
        match runs.last_mut() {
            Some((_, hi)) if *hi as u32 + 1 == c as u32 => *hi = c,
            _ => runs.push((c, c)),
        }
    }
    items.extend(runs.into_iter().map(|(lo, hi)| {
        if lo == hi {
            ClassSetItem::Literal(literal(lo))
        } else {
            ClassSetItem::Range(ast::ClassSetRange {
                span,
                start: literal(lo),
                end: literal(hi),
            })
        }
    }));

    if items.len() == 1 {
        items.pop()
    } else {
        Some(ClassSetItem::Union(ast::ClassSetUnion { span, items }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_assertions() {
        for regex in ["^abc", "abc$", r"\bfoo", r"(?m)^x"] {
            assert!(
                matches!(
                    parse_regex(regex, None),
                    Err(RegexError::UnsupportedAssertion { .. })
                ),
                "{} should be rejected",
                regex
            );
        }
    }

    #[test]
    fn test_invalid_regex() {
        let err = parse_regex("a(b", None).unwrap_err();
        assert!(matches!(err, RegexError::InvalidRegex { .. }));
        assert!(err.to_string().contains("a(b"));
    }

    #[test]
    fn test_literal_text() {
        let hir = parse_regex("hello", None).unwrap();
        assert_eq!(literal_text(&hir).as_deref(), Some("hello"));

        let hir = parse_regex("(he)llo", None).unwrap();
        assert_eq!(literal_text(&hir).as_deref(), Some("hello"));

        let hir = parse_regex(r"\.unwrap\(\)", None).unwrap();
        assert_eq!(literal_text(&hir).as_deref(), Some(".unwrap()"));

        let hir = parse_regex("h.llo", None).unwrap();
        assert_eq!(literal_text(&hir), None);
    }

    #[test]
    fn test_folds_literals_and_ranges() {
        let folded = parse_regex("HeLLo[A-C]", Some(CaseFold::Lowercase)).unwrap();
        let expected = parse_regex("hello[a-c]", None).unwrap();
        assert_eq!(folded, expected);
    }

    #[test]
    fn test_folding_keeps_negation() {
        let folded = parse_regex("[^A]", Some(CaseFold::Lowercase)).unwrap();
        let expected = parse_regex("[^a]", None).unwrap();
        assert_eq!(folded, expected);
    }

    #[test]
    fn test_folding_mixed_range_is_exact() {
        // [Z-b] covers Z, [, \, ], ^, _, `, a, b
        let folded = parse_regex("[Z-b]", Some(CaseFold::Lowercase)).unwrap();
        let expected = parse_regex(r"[\[-`a-bz]", None).unwrap();
        assert_eq!(folded, expected);
    }

    #[test]
    fn test_turkish_fold_of_literals() {
        let folded = parse_regex("DIŞ", Some(CaseFold::Turkish)).unwrap();
        assert_eq!(literal_text(&folded).as_deref(), Some("dış"));
    }
}
