//! Derives the n-grams every match of an automaton must contain.
//!
//! Extraction runs in two phases. First a breadth-first walk builds a graph
//! whose nodes are (DFA state, last `gram_size - 1` characters read) pairs and
//! whose edges carry the n-gram completed by the character read, if any.
//! Then the graph's strongly connected components are evaluated sinks first:
//! a node requires `Or(edge gram AND target requirement)` over its edges, and
//! every node of a cycle shares the requirement of the cycle's exits. Grams
//! read inside a cycle are dropped, which weakens the result but keeps it
//! necessary.

use super::Analyzer;
use crate::automaton::{CharDfa, StateId};
use crate::expression::Expression;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, trace};

/// The walk visited more (state, partial n-gram) pairs than allowed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("n-gram extraction traced more than {max_states_traced} states")]
pub struct TooComplexToTrace {
    pub max_states_traced: usize,
}

/// Extraction bounds plus the analyzer the index field uses.
pub struct NGramExtractor<'a> {
    gram_size: usize,
    max_expand: usize,
    max_states_traced: usize,
    max_ngrams: usize,
    analyzer: &'a dyn Analyzer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Edge {
    gram: Option<usize>,
    target: usize,
}

/// Phase one output
struct GramGraph {
    edges: Vec<Vec<Edge>>,
    accepting: Vec<bool>,
    grams: Vec<String>,
}

impl<'a> NGramExtractor<'a> {
    pub fn new(
        gram_size: usize,
        max_expand: usize,
        max_states_traced: usize,
        max_ngrams: usize,
        analyzer: &'a dyn Analyzer,
    ) -> Self {
        Self {
            gram_size,
            max_expand,
            max_states_traced,
            max_ngrams,
            analyzer,
        }
    }

    /// Required n-grams of a plain literal: the conjunction of its first
    /// `max_ngrams` distinct analyzed grams, in text order.
    pub fn extract_literal(&self, literal: &str) -> Expression<String> {
        let mut seen = FxHashSet::default();
        let grams: Vec<String> = self
            .analyzer
            .analyze(literal)
            .into_iter()
            .filter(|gram| seen.insert(gram.clone()))
            .take(self.max_ngrams)
            .collect();
        Expression::and(grams.into_iter().map(Expression::leaf))
    }

    /// Required n-grams of every string `dfa` accepts.
    ///
    /// The result is not simplified. A zero `max_states_traced` disables the
    /// walk and yields `True`.
    pub fn extract(&self, dfa: &CharDfa) -> Result<Expression<String>, TooComplexToTrace> {
        if self.max_states_traced == 0 || self.gram_size == 0 {
            return Ok(Expression::True);
        }
        let graph = self.trace(dfa)?;
        debug!(
            nodes = graph.edges.len(),
            grams = graph.grams.len(),
            "Traced automaton for n-gram extraction"
        );
        Ok(self.evaluate(&graph))
    }

    fn trace(&self, dfa: &CharDfa) -> Result<GramGraph, TooComplexToTrace> {
        let mut ids: FxHashMap<(StateId, String), usize> = FxHashMap::default();
        let mut nodes: Vec<(StateId, String)> = Vec::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        let mut gram_ids: FxHashMap<String, usize> = FxHashMap::default();
        let mut graph = GramGraph {
            edges: Vec::new(),
            accepting: Vec::new(),
            grams: Vec::new(),
        };
        let mut dropped = 0usize;

        let mut intern = |key: (StateId, String),
                          nodes: &mut Vec<(StateId, String)>,
                          queue: &mut VecDeque<usize>|
         -> Result<usize, TooComplexToTrace> {
            if let Some(&id) = ids.get(&key) {
                return Ok(id);
            }
            if nodes.len() >= self.max_states_traced {
                return Err(TooComplexToTrace {
                    max_states_traced: self.max_states_traced,
                });
            }
            let id = nodes.len();
            ids.insert(key.clone(), id);
            nodes.push(key);
            queue.push_back(id);
            Ok(id)
        };

        intern((dfa.start(), String::new()), &mut nodes, &mut queue)?;
        while let Some(id) = queue.pop_front() {
            let (state, prefix) = nodes[id].clone();
            let mut edges = Vec::new();
            let accepting = dfa.is_accept(state);

            // Accepting nodes need nothing further.
            if !accepting {
                for transition in dfa.transitions(state) {
                    if transition.width() as usize > self.max_expand {
                        let target = intern((transition.target, String::new()), &mut nodes, &mut queue)?;
                        edges.push(Edge { gram: None, target });
                        continue;
                    }
                    for c in (transition.start..=transition.end).filter_map(char::from_u32) {
                        let mut window = prefix.clone();
                        window.push(c);
                        let (gram, next_prefix) = if window.chars().count() == self.gram_size {
                            let rest = window.char_indices().nth(1).map_or(window.len(), |(i, _)| i);
                            let next_prefix = window[rest..].to_string();
                            (Some(window), next_prefix)
                        } else {
                            (None, window)
                        };
                        let gram = match gram {
                            Some(gram) => match gram_ids.get(&gram) {
                                Some(&g) => Some(g),
                                None if graph.grams.len() < self.max_ngrams => {
                                    gram_ids.insert(gram.clone(), graph.grams.len());
                                    graph.grams.push(gram);
                                    Some(graph.grams.len() - 1)
                                }
                                None => {
                                    dropped += 1;
                                    None
                                }
                            },
                            None => None,
                        };
                        let target = intern((transition.target, next_prefix), &mut nodes, &mut queue)?;
                        edges.push(Edge { gram, target });
                    }
                }
                edges.sort_unstable();
                edges.dedup();
            }

            graph.edges.push(edges);
            graph.accepting.push(accepting);
        }

        if dropped > 0 {
            trace!(dropped, max_ngrams = self.max_ngrams, "Dropped n-grams past the extraction limit");
        }
        Ok(graph)
    }

    fn evaluate(&self, graph: &GramGraph) -> Expression<String> {
        let gram_exprs: Vec<Expression<String>> =
            graph.grams.iter().map(|gram| self.gram_expression(gram)).collect();
        let gram_expr = |edge: &Edge| match edge.gram {
            Some(g) => gram_exprs[g].clone(),
            None => Expression::True,
        };

        let mut component_of: Vec<usize> = vec![usize::MAX; graph.edges.len()];
        let mut exprs: Vec<Option<Expression<String>>> = vec![None; graph.edges.len()];

        for (index, component) in strongly_connected(&graph.edges).into_iter().enumerate() {
            for &node in &component {
                component_of[node] = index;
            }
            let expr = if component.iter().any(|&node| graph.accepting[node]) {
                Expression::True
            } else {
                let mut alternatives = Vec::new();
                for &node in &component {
                    for edge in &graph.edges[node] {
                        if component_of[edge.target] == index {
                            continue;
                        }
                        let target = exprs[edge.target].clone().unwrap_or(Expression::True);
                        alternatives.push(Expression::and([gram_expr(edge), target]));
                    }
                }
                Expression::or(alternatives)
            };
            for &node in &component {
                exprs[node] = Some(expr.clone());
            }
        }

        exprs.first().cloned().flatten().unwrap_or(Expression::True)
    }

    fn gram_expression(&self, gram: &str) -> Expression<String> {
        let mut tokens = self.analyzer.analyze(gram);
        match tokens.len() {
            0 => Expression::True,
            1 => Expression::leaf(tokens.remove(0)),
            _ => Expression::and(tokens.into_iter().map(Expression::leaf)),
        }
    }
}

/// Tarjan's algorithm without recursion. Components come out sinks first.
fn strongly_connected(edges: &[Vec<Edge>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;
    let n = edges.len();
    let mut index = vec![UNVISITED; n];
    let mut low = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut components = Vec::new();
    let mut next_index = 0;
    let mut calls: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        index[root] = next_index;
        low[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        calls.push((root, 0));

        while let Some(&(node, edge)) = calls.last() {
            if let Some(e) = edges[node].get(edge) {
                if let Some(frame) = calls.last_mut() {
                    frame.1 += 1;
                }
                let target = e.target;
                if index[target] == UNVISITED {
                    index[target] = next_index;
                    low[target] = next_index;
                    next_index += 1;
                    stack.push(target);
                    on_stack[target] = true;
                    calls.push((target, 0));
                } else if on_stack[target] {
                    low[node] = low[node].min(index[target]);
                }
                continue;
            }

            calls.pop();
            if let Some(&(parent, _)) = calls.last() {
                low[parent] = low[parent].min(low[node]);
            }
            if low[node] == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}
