//! Lossy rewrite of an expression into one flat disjunction.

use super::{Composite, Expression};
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Weaken `expr` to `Or` of its distinct leaves, or `True` if that needs more
/// than `max_clauses` leaves.
///
/// Any string satisfying `expr` satisfies the result, because a constant-free
/// monotone expression can only be true when at least one of its leaves is. A
/// reachable `True` (or an empty `And`) breaks that argument, so the result is
/// `True` then. Shared composites are visited once.
pub fn degrade_to_disjunction<T: Ord>(expr: &Expression<T>, max_clauses: usize) -> Expression<T> {
    let mut leaves: BTreeSet<&Expression<T>> = BTreeSet::new();
    let mut visited: FxHashSet<*const Composite<T>> = FxHashSet::default();
    let mut stack = vec![expr];

    while let Some(node) = stack.pop() {
        match node {
            Expression::True => return Expression::True,
            Expression::False => {}
            Expression::Leaf(_) => {
                leaves.insert(node);
                if leaves.len() > max_clauses {
                    return Expression::True;
                }
            }
            Expression::And(composite) | Expression::Or(composite) => {
                if node.composite_ptr().is_some_and(|ptr| !visited.insert(ptr)) {
                    continue;
                }
                if composite.children.is_empty() && matches!(node, Expression::And(_)) {
                    return Expression::True;
                }
                stack.extend(composite.children.iter());
            }
        }
    }

    Expression::or(leaves.into_iter().cloned()).simplify()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(s: &str) -> Expression<String> {
        Expression::leaf(s.to_string())
    }

    #[test]
    fn test_degrades_to_flat_disjunction() {
        let expr = Expression::and([
            leaf("abc"),
            Expression::or([leaf("bcd"), Expression::and([leaf("cde"), leaf("abc")])]),
        ]);
        let degraded = degrade_to_disjunction(&expr, 10);
        assert_eq!(
            degraded,
            Expression::or([leaf("abc"), leaf("bcd"), leaf("cde")])
        );
    }

    #[test]
    fn test_over_budget_is_true() {
        let expr = Expression::and([leaf("a"), leaf("b"), leaf("c")]);
        assert!(degrade_to_disjunction(&expr, 2).is_true());
        assert!(!degrade_to_disjunction(&expr, 3).is_true());
    }

    #[test]
    fn test_reachable_true_is_true() {
        let expr = Expression::and([leaf("a"), Expression::or([leaf("b"), Expression::True])]);
        assert!(degrade_to_disjunction(&expr, 10).is_true());
        let expr = Expression::or([leaf("a"), Expression::and([])]);
        assert!(degrade_to_disjunction(&expr, 10).is_true());
    }

    #[test]
    fn test_single_leaf_and_false() {
        assert_eq!(degrade_to_disjunction(&leaf("abc"), 1), leaf("abc"));
        assert!(degrade_to_disjunction(&Expression::<String>::False, 1).is_false());
    }

    #[test]
    fn test_shared_dag_is_walked_once() {
        // 2^40 paths through a chain of 40 shared diamonds.
        let mut expr = leaf("end");
        for i in 0..40 {
            let left = Expression::and([leaf(&format!("l{}", i)), expr.clone()]);
            let right = Expression::and([leaf(&format!("r{}", i)), expr]);
            expr = Expression::or([left, right]);
        }
        let degraded = degrade_to_disjunction(&expr, 1000);
        assert_eq!(degraded.children().len(), 81);
    }
}
