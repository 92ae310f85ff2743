//! Denotation-preserving simplification of [`Expression`]s.

use super::{Composite, CompositeKind, Expression};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::iter;
use std::rc::Rc;

impl<T: Ord> Expression<T> {
    /// Simplify the expression without changing what it denotes.
    ///
    /// Identity children are dropped, an absorbing child collapses its parent,
    /// nested composites of the same type are flattened and sub-terms shared by
    /// every child of a composite of composites are factored out. The result is
    /// a fixpoint: simplifying it again returns an equal expression.
    pub fn simplify(&self) -> Expression<T> {
        Simplifier::default().simplify(self)
    }
}

/// Memoizes simplification per shared composite node.
///
/// The source node is stored next to its result so its address cannot be
/// reused by another allocation while the memo is alive.
struct Simplifier<T> {
    memo: FxHashMap<*const Composite<T>, (Expression<T>, Expression<T>)>,
}

impl<T> Default for Simplifier<T> {
    fn default() -> Self {
        Self {
            memo: FxHashMap::default(),
        }
    }
}

impl<T: Ord> Simplifier<T> {
    fn simplify(&mut self, expr: &Expression<T>) -> Expression<T> {
        let (kind, node) = match expr {
            Expression::And(node) => (CompositeKind::And, node),
            Expression::Or(node) => (CompositeKind::Or, node),
            _ => return expr.clone(),
        };
        let key = Rc::as_ptr(node);
        if let Some((_, simplified)) = self.memo.get(&key) {
            return simplified.clone();
        }

        let mut simplified = self.simplify_composite(kind, &node.children);
        if simplified == *expr {
            simplified = expr.clone();
        }
        self.memo.insert(key, (expr.clone(), simplified.clone()));
        simplified
    }

    fn simplify_composite(&mut self, kind: CompositeKind, children: &[Expression<T>]) -> Expression<T> {
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            let child = self.simplify(child);
            if kind.is_identity(&child) {
                continue;
            }
            if kind.is_absorbing(&child) {
                return child;
            }
            if child.kind() == Some(kind) {
                kept.extend(child.children().iter().cloned());
            } else {
                kept.push(child);
            }
        }

        let node = Expression::composite(kind, kept);
        let children = node.children();
        match children.len() {
            0 => return kind.identity(),
            1 => return children[0].clone(),
            _ => {}
        }
        match self.factor(kind, children) {
            Some(factored) => factored,
            None => node,
        }
    }

    /// Pull sub-terms common to every child out of a composite of composites.
    ///
    /// `Or(And(a, b), And(a, c))` becomes `And(a, Or(And(b), And(c)))` and
    /// `And(Or(a, b), a)` becomes `Or(a, And(Or(b), Or()))`, both simplified.
    fn factor(&mut self, kind: CompositeKind, children: &[Expression<T>]) -> Option<Expression<T>> {
        let dual = kind.dual();
        if !children.iter().any(|c| c.kind() == Some(dual)) {
            return None;
        }

        let mut common: BTreeSet<&Expression<T>> = parts(&children[0], dual).iter().collect();
        for child in &children[1..] {
            let child_parts = parts(child, dual);
            common.retain(|part| child_parts.binary_search(*part).is_ok());
            if common.is_empty() {
                return None;
            }
        }

        let remainders: Vec<Expression<T>> = children
            .iter()
            .map(|child| {
                let rest = parts(child, dual)
                    .iter()
                    .filter(|part| !common.contains(part))
                    .cloned();
                Expression::composite(dual, rest)
            })
            .collect();
        let factored = Expression::composite(
            dual,
            common
                .iter()
                .map(|part| (*part).clone())
                .chain(iter::once(Expression::composite(kind, remainders))),
        );
        Some(self.simplify(&factored))
    }
}

/// The operands a child contributes to factoring: its own children when it is
/// a composite of `dual` type, otherwise the child itself.
fn parts<T>(expr: &Expression<T>, dual: CompositeKind) -> &[Expression<T>] {
    if expr.kind() == Some(dual) {
        expr.children()
    } else {
        std::slice::from_ref(expr)
    }
}
