//! Predicate evaluation against in-memory documents.
//!
//! [`DocumentEvaluator`] walks a compiled [`Predicate`] through the
//! [`PredicateVisitor`] seam. Evaluation cannot fail: every kind mismatch, missing
//! field or malformed operand simply resolves to a boolean.
//!
//! Comparison rules for the default operators (`Eq`, `Ne`, `Gt`, `Gte`, `Lt`, `Lte`):
//!
//! - A missing field behaves as null.
//! - Values of different kinds only ever satisfy `Ne`.
//! - Scalars of the same kind use their native ordering.
//! - Sequences and mappings compare element by element once their lengths
//!   (or key sets) agree, stopping at the first element that decides the result.

use std::{cmp::Ordering, convert::Infallible};

use docmock_core::{
    query::{FieldPredicate, Operator, Predicate, PredicateVisitor, Relation},
    value::Value,
};

/// Evaluates predicates against the value currently in scope.
///
/// The scope starts at the document root and narrows whenever a predicate carries a
/// `key`. A scope of `None` means the key did not resolve.
pub(crate) struct DocumentEvaluator<'a> {
    current: Option<&'a Value>,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self { current: Some(document) }
    }

    fn scoped(current: Option<&'a Value>) -> Self {
        Self { current }
    }

    pub fn evaluate(&mut self, predicate: &Predicate) -> bool {
        let Ok(matched) = self.visit_predicate(predicate);
        matched
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Value>,
        predicate: &Predicate,
    ) -> Vec<Value> {
        documents
            .into_iter()
            .filter(|document| DocumentEvaluator::new(document).evaluate(predicate))
            .cloned()
            .collect::<Vec<_>>()
    }

    /// Folds the clauses of `predicate` under its relation.
    ///
    /// The running result starts out `true`, so an empty clause list matches under
    /// either relation.
    fn combine(&mut self, predicate: &Predicate) -> bool {
        let mut matched = true;

        for clause in &predicate.fields {
            let Ok(result) = self.visit_clause(clause);
            matched = result;

            match predicate.relation {
                Relation::And if !matched => return false,
                Relation::Or if matched => return true,
                _ => {}
            }
        }

        matched
    }
}

impl<'a> PredicateVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = Infallible;

    fn visit_predicate(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error> {
        let scope = match &predicate.key {
            Some(key) => self.current.and_then(|value| value.get_path(key)),
            None => self.current,
        };

        if predicate.element_match {
            let matched = match scope {
                Some(Value::Array(elements)) => elements
                    .iter()
                    .any(|element| DocumentEvaluator::new(element).combine(predicate)),
                _ => false,
            };

            return Ok(matched);
        }

        Ok(DocumentEvaluator::scoped(scope).combine(predicate))
    }

    fn visit_field(&mut self, field: &FieldPredicate) -> Result<Self::Output, Self::Error> {
        let operand = self.current.and_then(|value| value.get_path(&field.path));

        Ok(compare(operand, &field.value, field.operator))
    }
}

/// Returns whether `document` satisfies `predicate`.
pub fn matches(document: &Value, predicate: &Predicate) -> bool {
    DocumentEvaluator::new(document).evaluate(predicate)
}

/// Applies `operator` to a resolved operand (`None` when the path was missing) and a literal.
pub fn compare(operand: Option<&Value>, literal: &Value, operator: Operator) -> bool {
    match operator {
        Operator::Exists => match literal {
            Value::Bool(expected) => operand.is_some() == *expected,
            _ => false,
        },
        Operator::In => match literal {
            Value::Array(candidates) => candidates
                .iter()
                .any(|candidate| compare(operand, candidate, Operator::Eq)),
            _ => false,
        },
        Operator::Nin => match literal {
            Value::Array(candidates) => {
                operand.is_none()
                    || !candidates
                        .iter()
                        .any(|candidate| compare(operand, candidate, Operator::Eq))
            }
            _ => false,
        },
        _ => compare_values(operand.unwrap_or(&Value::Null), literal, operator),
    }
}

fn compare_values(left: &Value, right: &Value, operator: Operator) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => satisfies(Ordering::Equal, operator),
        (Value::Bool(a), Value::Bool(b)) => satisfies(a.cmp(b), operator),
        (Value::Int(a), Value::Int(b)) => satisfies(a.cmp(b), operator),
        (Value::Float(a), Value::Float(b)) => match a.partial_cmp(b) {
            Some(ordering) => satisfies(ordering, operator),
            None => operator == Operator::Ne,
        },
        (Value::String(a), Value::String(b)) => satisfies(a.cmp(b), operator),
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return operator == Operator::Ne;
            }

            compare_elements(a.iter().zip(b.iter()), operator)
        }
        (Value::Map(a), Value::Map(b)) => {
            if !a.keys().eq(b.keys()) {
                return operator == Operator::Ne;
            }

            compare_elements(a.values().zip(b.values()), operator)
        }
        _ => operator == Operator::Ne,
    }
}

/// Compares paired elements in order, stopping at the first pair that decides the
/// outcome: a match under `Ne` or a mismatch under anything else.
fn compare_elements<'v>(
    pairs: impl Iterator<Item = (&'v Value, &'v Value)>,
    operator: Operator,
) -> bool {
    let decisive = operator == Operator::Ne;
    let mut result = !decisive;

    for (left, right) in pairs {
        result = compare_values(left, right, operator);

        if result == decisive {
            return result;
        }
    }

    result
}

fn satisfies(ordering: Ordering, operator: Operator) -> bool {
    match operator {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Gte => ordering != Ordering::Less,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Lte => ordering != Ordering::Greater,
        Operator::In | Operator::Nin | Operator::Exists => false,
    }
}
