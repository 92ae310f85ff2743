use crate::expression::ExpressionTransformer;
use crate::index::NGramQuery;

/// Turns an n-gram expression into a query on one n-gram field.
///
/// A disjunction made only of terms becomes a single multi-term lookup.
pub struct QueryTransformer<'a> {
    field: &'a str,
}

impl<'a> QueryTransformer<'a> {
    pub fn new(field: &'a str) -> Self {
        Self { field }
    }
}

impl ExpressionTransformer<String, NGramQuery> for QueryTransformer<'_> {
    fn always_true(&mut self) -> NGramQuery {
        NGramQuery::MatchAll
    }

    fn always_false(&mut self) -> NGramQuery {
        NGramQuery::MatchNone
    }

    fn leaf(&mut self, value: &String) -> NGramQuery {
        NGramQuery::Term {
            field: self.field.to_string(),
            term: value.clone(),
        }
    }

    fn and(&mut self, children: Vec<NGramQuery>) -> NGramQuery {
        NGramQuery::And(children)
    }

    fn or(&mut self, children: Vec<NGramQuery>) -> NGramQuery {
        if children.len() > 1 && children.iter().all(|c| matches!(c, NGramQuery::Term { .. })) {
            let terms = children
                .into_iter()
                .filter_map(|c| match c {
                    NGramQuery::Term { term, .. } => Some(term),
                    _ => None,
                })
                .collect();
            return NGramQuery::Terms {
                field: self.field.to_string(),
                terms,
            };
        }
        NGramQuery::Or(children)
    }
}
