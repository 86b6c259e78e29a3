//! Filter compilation and query description.
//!
//! A filter specification is a [`Value::Map`] written in the MongoDB filter dialect:
//!
//! ```ignore
//! use docmock_core::{query::Predicate, value::Value};
//! use serde_json::json;
//!
//! let predicate = Predicate::compile(&Value::from(json!({
//!     "$or": [{ "age": { "$lt": 18 } }, { "guardian": { "$exists": true } }],
//! })))?;
//! ```
//!
//! Compilation turns it into a [`Predicate`] tree: leaves are [`FieldPredicate`]
//! `(path, operator, operand)` triples, inner nodes group clauses under an AND/OR
//! [`Relation`], may carry a field-path `key` that every clause beneath them is
//! resolved against, and may require an element match against a sequence.
//!
//! Supported operator keywords: `$or`, `$elemMatch`, `$ne`, `$gt`, `$gte`, `$lt`,
//! `$lte`, `$all`, `$in`, `$nin` and `$exists`. `$all` compares the whole array
//! operand for equality.
//!
//! Evaluation lives with the storage engine; anything that needs to walk a compiled
//! tree does so through [`PredicateVisitor`].

use std::{collections::BTreeMap, mem, str::FromStr};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    value::Value,
};

const OR: &str = "$or";
const ELEM_MATCH: &str = "$elemMatch";

/// Comparison applied by a [`FieldPredicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal to (also produced by `$all`).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Equal to any element of the array operand.
    In,
    /// Equal to no element of the array operand.
    Nin,
    /// Presence test against a boolean operand.
    Exists,
}

impl Operator {
    /// Maps a filter keyword such as `"$gte"` to its operator.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "$ne" => Some(Operator::Ne),
            "$gt" => Some(Operator::Gt),
            "$gte" => Some(Operator::Gte),
            "$lt" => Some(Operator::Lt),
            "$lte" => Some(Operator::Lte),
            "$all" => Some(Operator::Eq),
            "$in" => Some(Operator::In),
            "$nin" => Some(Operator::Nin),
            "$exists" => Some(Operator::Exists),
            _ => None,
        }
    }
}

/// How the clauses of a [`Predicate`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relation {
    #[default]
    And,
    Or,
}

/// A leaf comparison: resolve `path`, then compare it against `value` under `operator`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub path: String,
    pub value: Value,
    pub operator: Operator,
}

impl FieldPredicate {
    pub fn new(path: impl Into<String>, value: impl Into<Value>, operator: Operator) -> Self {
        Self { path: path.into(), value: value.into(), operator }
    }
}

/// One entry of [`Predicate::fields`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Field(FieldPredicate),
    Group(Predicate),
}

/// A compiled filter node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Predicate {
    /// How the clauses combine.
    pub relation: Relation,
    /// When set, the clauses must hold for at least one element of the resolved sequence.
    pub element_match: bool,
    /// Field path resolved once before any clause is evaluated.
    pub key: Option<String>,
    /// Clauses, evaluated left to right.
    pub fields: Vec<Clause>,
}

impl Predicate {
    /// Compiles a filter specification.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnknownQueryKind`] if `filter` is not a mapping,
    /// if it uses an operator keyword that is not supported, or if `$or` is not given
    /// an array of mappings.
    pub fn compile(filter: &Value) -> DocumentStoreResult<Self> {
        let predicate = match filter {
            Value::Map(map) => compile_map("", map, false)?,
            other => {
                return Err(DocumentStoreError::UnknownQueryKind(format!(
                    "filter must be a mapping, got {}",
                    other.kind()
                )));
            }
        };

        tracing::trace!(?predicate, "compiled filter");

        Ok(predicate)
    }

    fn attach(&mut self, child: Predicate) {
        // A lone clause with nothing to scope it can sit directly in the parent.
        if child.fields.len() == 1 && child.key.is_none() && !child.element_match {
            self.fields.extend(child.fields);
        } else {
            self.fields.push(Clause::Group(child));
        }
    }
}

fn compile_map(
    field: &str,
    map: &BTreeMap<String, Value>,
    element_match: bool,
) -> DocumentStoreResult<Predicate> {
    let mut node = Predicate {
        relation: Relation::And,
        element_match,
        key: (!field.is_empty()).then(|| field.to_string()),
        fields: Vec::with_capacity(map.len()),
    };

    for (name, value) in map {
        let mut name = name.as_str();
        let mut operator = Operator::Eq;
        let is_or = name == OR;
        let is_elem_match = name == ELEM_MATCH;

        if is_or || is_elem_match {
            name = "";
        } else if let Some(keyword) = Operator::from_keyword(name) {
            operator = keyword;
            name = "";
        } else if name.starts_with('$') {
            return Err(DocumentStoreError::UnknownQueryKind(format!("unsupported operator {name}")));
        }

        if name.is_empty() {
            name = field;
            node.key = None;
        }

        match value {
            Value::Map(nested) if !is_or => node.attach(compile_map(name, nested, is_elem_match)?),
            Value::Array(items) if is_or => {
                let mut branches = Predicate {
                    relation: Relation::Or,
                    fields: Vec::with_capacity(items.len()),
                    ..Predicate::default()
                };

                for item in items {
                    let Value::Map(nested) = item else {
                        return Err(DocumentStoreError::UnknownQueryKind(format!(
                            "$or expects mappings, got {}",
                            item.kind()
                        )));
                    };

                    branches.attach(compile_map(name, nested, false)?);
                }

                node.attach(branches);
            }
            other if is_or => {
                return Err(DocumentStoreError::UnknownQueryKind(format!(
                    "$or expects an array, got {}",
                    other.kind()
                )));
            }
            other => node.fields.push(Clause::Field(FieldPredicate::new(name, other.clone(), operator))),
        }
    }

    // An unscoped node around a single group is that group.
    match node.fields.as_mut_slice() {
        [Clause::Group(group)] if node.key.is_none() && !node.element_match => Ok(mem::take(group)),
        _ => Ok(node),
    }
}

/// Walks a compiled [`Predicate`] tree.
pub trait PredicateVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_predicate(&mut self, predicate: &Predicate) -> Result<Self::Output, Self::Error>;
    fn visit_field(&mut self, field: &FieldPredicate) -> Result<Self::Output, Self::Error>;

    fn visit_clause(&mut self, clause: &Clause) -> Result<Self::Output, Self::Error> {
        match clause {
            Clause::Field(field) => self.visit_field(field),
            Clause::Group(predicate) => self.visit_predicate(predicate),
        }
    }
}

/// One level of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// Dotted field path to sort by.
    pub path: String,
    /// Ascending when `true`, descending otherwise.
    pub ascending: bool,
}

impl SortKey {
    pub fn asc(path: impl Into<String>) -> Self {
        Self { path: path.into(), ascending: true }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self { path: path.into(), ascending: false }
    }

    /// Parses `"field"`, `"+field"` (ascending) or `"-field"` (descending).
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::EmptySortFieldName`] when no field name remains.
    pub fn parse(spec: &str) -> DocumentStoreResult<Self> {
        let (path, ascending) = match spec.strip_prefix('-') {
            Some(rest) => (rest, false),
            None => (spec.strip_prefix('+').unwrap_or(spec), true),
        };

        if path.is_empty() {
            return Err(DocumentStoreError::EmptySortFieldName);
        }

        Ok(Self { path: path.to_string(), ascending })
    }
}

impl FromStr for SortKey {
    type Err = DocumentStoreError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        SortKey::parse(spec)
    }
}

/// An uncompiled query: filter specification, sort keys and pagination as the caller wrote them.
///
/// Nothing here is validated until [`Query::compile`] runs.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Filter specification. `Value::Null` matches every document.
    pub filter: Value,
    /// Sort key specs in `"[+|-]field"` form.
    pub sort: Vec<String>,
    /// Documents to skip. Zero or negative skips nothing.
    pub skip: i64,
    /// Maximum documents to return. Zero or negative means unlimited.
    pub limit: i64,
    /// Projection requested by the caller. Accepted for compatibility, never applied.
    pub projection: Option<Value>,
}

impl Query {
    pub fn new(filter: impl Into<Value>) -> Self {
        Self { filter: filter.into(), ..Self::default() }
    }

    /// Validates and compiles every part of the query.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentStoreError::UnknownQueryKind`] for a malformed filter and
    /// [`DocumentStoreError::EmptySortFieldName`] for an empty sort key.
    pub fn compile(&self) -> DocumentStoreResult<CompiledQuery> {
        let predicate = match &self.filter {
            Value::Null => None,
            filter => Some(Predicate::compile(filter)?),
        };

        let sort = self.sort
            .iter()
            .map(|spec| SortKey::parse(spec))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(CompiledQuery {
            predicate,
            sort,
            skip: usize::try_from(self.skip).unwrap_or(0),
            limit: usize::try_from(self.limit).ok().filter(|limit| *limit > 0),
        })
    }
}

/// A validated [`Query`] ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// `None` matches every document.
    pub predicate: Option<Predicate>,
    pub sort: Vec<SortKey>,
    pub skip: usize,
    /// `None` is unlimited.
    pub limit: Option<usize>,
}
