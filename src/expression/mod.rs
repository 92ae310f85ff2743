//! Immutable boolean expressions over opaque leaf values.
//!
//! Expressions are structurally shared DAGs: composite children live behind
//! [`Rc`], so the same sub-expression may be reachable along several paths.
//! Composite children form a set. They are kept sorted by a total order that
//! compares cached structural hashes first, which makes equality and hashing
//! structural and order-independent.

mod rewrite;
mod simplify;

pub use rewrite::degrade_to_disjunction;

use rustc_hash::{FxHashMap, FxHasher};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// The two composite node types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    And,
    Or,
}

impl CompositeKind {
    /// The other composite type.
    pub fn dual(self) -> Self {
        match self {
            CompositeKind::And => CompositeKind::Or,
            CompositeKind::Or => CompositeKind::And,
        }
    }

    /// Value of an empty composite of this type.
    pub fn identity<T>(self) -> Expression<T> {
        match self {
            CompositeKind::And => Expression::True,
            CompositeKind::Or => Expression::False,
        }
    }

    fn is_identity<T>(self, expr: &Expression<T>) -> bool {
        matches!(
            (self, expr),
            (CompositeKind::And, Expression::True) | (CompositeKind::Or, Expression::False)
        )
    }

    fn is_absorbing<T>(self, expr: &Expression<T>) -> bool {
        matches!(
            (self, expr),
            (CompositeKind::And, Expression::False) | (CompositeKind::Or, Expression::True)
        )
    }
}

/// A single leaf value with its cached hash
pub struct Leaf<T> {
    value: T,
    hash: u64,
}

/// Children of an `And`/`Or`, sorted and deduplicated
pub struct Composite<T> {
    children: Box<[Expression<T>]>,
    hash: u64,
}

impl<T> Composite<T> {
    pub fn children(&self) -> &[Expression<T>] {
        &self.children
    }
}

/// A boolean expression tree (DAG) over leaves of type `T`.
pub enum Expression<T> {
    True,
    False,
    Leaf(Rc<Leaf<T>>),
    And(Rc<Composite<T>>),
    Or(Rc<Composite<T>>),
}

const FALSE_HASH: u64 = 0x9e37_79b9_7f4a_7c15;
const TRUE_HASH: u64 = 0x6a09_e667_f3bc_c908;

impl<T> Expression<T> {
    /// Wrap a single value.
    pub fn leaf(value: T) -> Self
    where
        T: Hash,
    {
        let mut hasher = FxHasher::default();
        2u8.hash(&mut hasher);
        value.hash(&mut hasher);
        Expression::Leaf(Rc::new(Leaf {
            value,
            hash: hasher.finish(),
        }))
    }

    /// Conjunction of `children`, without simplification.
    pub fn and(children: impl IntoIterator<Item = Self>) -> Self
    where
        T: Ord,
    {
        Self::composite(CompositeKind::And, children)
    }

    /// Disjunction of `children`, without simplification.
    pub fn or(children: impl IntoIterator<Item = Self>) -> Self
    where
        T: Ord,
    {
        Self::composite(CompositeKind::Or, children)
    }

    /// Build a composite node. Duplicate children collapse.
    pub fn composite(kind: CompositeKind, children: impl IntoIterator<Item = Self>) -> Self
    where
        T: Ord,
    {
        let mut children: Vec<Self> = children.into_iter().collect();
        children.sort();
        children.dedup();

        let mut hasher = FxHasher::default();
        kind.hash(&mut hasher);
        for child in &children {
            hasher.write_u64(child.structural_hash());
        }
        let node = Rc::new(Composite {
            children: children.into_boxed_slice(),
            hash: hasher.finish(),
        });
        match kind {
            CompositeKind::And => Expression::And(node),
            CompositeKind::Or => Expression::Or(node),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expression::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expression::False)
    }

    /// The composite type of this node, if it is one.
    pub fn kind(&self) -> Option<CompositeKind> {
        match self {
            Expression::And(_) => Some(CompositeKind::And),
            Expression::Or(_) => Some(CompositeKind::Or),
            _ => None,
        }
    }

    /// Children of a composite; empty for every other node.
    pub fn children(&self) -> &[Expression<T>] {
        match self {
            Expression::And(node) | Expression::Or(node) => &node.children,
            _ => &[],
        }
    }

    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Expression::Leaf(leaf) => Some(&leaf.value),
            _ => None,
        }
    }

    /// Identity of a shared composite node, used to avoid re-walking the DAG.
    pub(crate) fn composite_ptr(&self) -> Option<*const Composite<T>> {
        match self {
            Expression::And(node) | Expression::Or(node) => Some(Rc::as_ptr(node)),
            _ => None,
        }
    }

    fn structural_hash(&self) -> u64 {
        match self {
            Expression::False => FALSE_HASH,
            Expression::True => TRUE_HASH,
            Expression::Leaf(leaf) => leaf.hash,
            Expression::And(node) | Expression::Or(node) => node.hash,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Expression::False => 0,
            Expression::True => 1,
            Expression::Leaf(_) => 2,
            Expression::And(_) => 3,
            Expression::Or(_) => 4,
        }
    }

    /// Number of leaf clauses the expression expands to as a query tree.
    ///
    /// Shared sub-expressions count once per path that reaches them, because
    /// that is how many clauses the transformed query will contain.
    pub fn count_clauses(&self) -> usize {
        fn count<T>(expr: &Expression<T>, memo: &mut FxHashMap<*const Composite<T>, usize>) -> usize {
            match expr {
                Expression::True | Expression::False => 0,
                Expression::Leaf(_) => 1,
                Expression::And(node) | Expression::Or(node) => {
                    let key = Rc::as_ptr(node);
                    if let Some(&clauses) = memo.get(&key) {
                        return clauses;
                    }
                    let clauses = node
                        .children
                        .iter()
                        .fold(0usize, |sum, child| sum.saturating_add(count(child, memo)));
                    memo.insert(key, clauses);
                    clauses
                }
            }
        }
        count(self, &mut FxHashMap::default())
    }

    /// Truth value of the expression given a truth value for each leaf.
    pub fn evaluate(&self, mut truth: impl FnMut(&T) -> bool) -> bool {
        fn eval<T>(
            expr: &Expression<T>,
            truth: &mut dyn FnMut(&T) -> bool,
            memo: &mut FxHashMap<*const Composite<T>, bool>,
        ) -> bool {
            match expr {
                Expression::True => true,
                Expression::False => false,
                Expression::Leaf(leaf) => truth(&leaf.value),
                Expression::And(node) | Expression::Or(node) => {
                    let key = Rc::as_ptr(node);
                    if let Some(&value) = memo.get(&key) {
                        return value;
                    }
                    let value = if matches!(expr, Expression::And(_)) {
                        node.children.iter().all(|c| eval(c, truth, memo))
                    } else {
                        node.children.iter().any(|c| eval(c, truth, memo))
                    };
                    memo.insert(key, value);
                    value
                }
            }
        }
        eval(self, &mut truth, &mut FxHashMap::default())
    }

    /// Bottom-up fold into another representation.
    pub fn transform<J>(&self, transformer: &mut impl ExpressionTransformer<T, J>) -> J {
        match self {
            Expression::True => transformer.always_true(),
            Expression::False => transformer.always_false(),
            Expression::Leaf(leaf) => transformer.leaf(&leaf.value),
            Expression::And(node) => {
                let children = node.children.iter().map(|c| c.transform(transformer)).collect();
                transformer.and(children)
            }
            Expression::Or(node) => {
                let children = node.children.iter().map(|c| c.transform(transformer)).collect();
                transformer.or(children)
            }
        }
    }
}

/// Visitor used by [`Expression::transform`]; every variant must be handled.
pub trait ExpressionTransformer<T, J> {
    fn always_true(&mut self) -> J;
    fn always_false(&mut self) -> J;
    fn leaf(&mut self, value: &T) -> J;
    fn and(&mut self, children: Vec<J>) -> J;
    fn or(&mut self, children: Vec<J>) -> J;
}

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self {
        match self {
            Expression::True => Expression::True,
            Expression::False => Expression::False,
            Expression::Leaf(leaf) => Expression::Leaf(Rc::clone(leaf)),
            Expression::And(node) => Expression::And(Rc::clone(node)),
            Expression::Or(node) => Expression::Or(Rc::clone(node)),
        }
    }
}

impl<T: Ord> Ord for Expression<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.structural_hash().cmp(&other.structural_hash()))
            .then_with(|| match (self, other) {
                (Expression::Leaf(a), Expression::Leaf(b)) => {
                    if Rc::ptr_eq(a, b) {
                        Ordering::Equal
                    } else {
                        a.value.cmp(&b.value)
                    }
                }
                (Expression::And(a), Expression::And(b)) | (Expression::Or(a), Expression::Or(b)) => {
                    if Rc::ptr_eq(a, b) {
                        Ordering::Equal
                    } else {
                        a.children.iter().cmp(b.children.iter())
                    }
                }
                _ => Ordering::Equal,
            })
    }
}

impl<T: Ord> PartialOrd for Expression<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> PartialEq for Expression<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Expression<T> {}

impl<T> Hash for Expression<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl<T: fmt::Debug> fmt::Debug for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::True => f.write_str("True"),
            Expression::False => f.write_str("False"),
            Expression::Leaf(leaf) => f.debug_tuple("Leaf").field(&leaf.value).finish(),
            Expression::And(node) => f.debug_tuple("And").field(&node.children).finish(),
            Expression::Or(node) => f.debug_tuple("Or").field(&node.children).finish(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (node, separator) = match self {
            Expression::True => return f.write_str("true"),
            Expression::False => return f.write_str("false"),
            Expression::Leaf(leaf) => return write!(f, "{}", leaf.value),
            Expression::And(node) => (node, " AND "),
            Expression::Or(node) => (node, " OR "),
        };
        f.write_str("(")?;
        for (i, child) in node.children.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(s: &str) -> Expression<String> {
        Expression::leaf(s.to_string())
    }

    #[test]
    fn test_composite_children_are_a_set() {
        let a = Expression::and([leaf("abc"), leaf("bcd"), leaf("abc")]);
        let b = Expression::and([leaf("bcd"), leaf("abc")]);
        assert_eq!(a.children().len(), 2);
        assert_eq!(a, b);

        let mut hasher_a = FxHasher::default();
        a.hash(&mut hasher_a);
        let mut hasher_b = FxHasher::default();
        b.hash(&mut hasher_b);
        assert_eq!(hasher_a.finish(), hasher_b.finish());
    }

    #[test]
    fn test_and_differs_from_or() {
        let a = Expression::and([leaf("abc"), leaf("bcd")]);
        let o = Expression::or([leaf("abc"), leaf("bcd")]);
        assert_ne!(a, o);
    }

    #[test]
    fn test_count_clauses_counts_shared_paths() {
        let shared = Expression::or([leaf("abc"), leaf("xyz")]);
        let expr = Expression::and([
            Expression::or([shared.clone(), leaf("aaa")]),
            Expression::or([shared, leaf("bbb")]),
        ]);
        assert_eq!(expr.count_clauses(), 6);
        assert_eq!(Expression::<String>::True.count_clauses(), 0);
        assert_eq!(leaf("abc").count_clauses(), 1);
    }

    #[test]
    fn test_evaluate() {
        let expr = Expression::and([leaf("abc"), Expression::or([leaf("bcd"), leaf("cde")])]);
        assert!(expr.evaluate(|g| g == "abc" || g == "cde"));
        assert!(!expr.evaluate(|g| g == "abc"));
        assert!(!expr.evaluate(|g| g == "cde"));
        assert!(Expression::<String>::and([]).evaluate(|_| false));
        assert!(!Expression::<String>::or([]).evaluate(|_| true));
    }

    #[test]
    fn test_display() {
        let expr = Expression::and([leaf("abc"), Expression::or([leaf("bcd"), Expression::True])]);
        let rendered = expr.to_string();
        assert!(rendered.contains("abc"));
        assert!(rendered.contains(" AND "));
        assert!(rendered.contains("true"));
    }

    struct Render;

    impl ExpressionTransformer<String, String> for Render {
        fn always_true(&mut self) -> String {
            "*".to_string()
        }
        fn always_false(&mut self) -> String {
            "!".to_string()
        }
        fn leaf(&mut self, value: &String) -> String {
            value.clone()
        }
        fn and(&mut self, children: Vec<String>) -> String {
            format!("and({})", children.join(","))
        }
        fn or(&mut self, children: Vec<String>) -> String {
            format!("or({})", children.join(","))
        }
    }

    #[test]
    fn test_transform_visits_every_variant() {
        assert_eq!(Expression::<String>::True.transform(&mut Render), "*");
        assert_eq!(Expression::<String>::False.transform(&mut Render), "!");
        let expr = Expression::or([leaf("abc"), Expression::and([leaf("bcd")])]);
        let rendered = expr.transform(&mut Render);
        assert!(rendered.starts_with("or("));
        assert!(rendered.contains("and(bcd)"));
        assert!(rendered.contains("abc"));
    }
}
