//! Multi-key sorting by partition and refinement.
//!
//! Documents start out as a single group. Each sort key stably sorts every group by
//! that key alone and then splits it wherever neighbours differ under the key, so
//! later keys only ever reorder documents that tied on every earlier key.
//!
//! Ordering within a key:
//!
//! - A document missing the field sorts first, whatever the direction.
//! - Null sorts below every other value.
//! - Scalars of the same kind use their native ordering (floats via `total_cmp`).
//! - Sequences compare element-wise; a strict prefix sorts first.
//! - Mappings with the same fields compare field values in key order.
//!
//! Anything else is incomparable and fails the whole sort. Incomparable values taken
//! from documents of different shapes fail as a type mismatch.

use std::cmp::Ordering;

use docmock_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::SortKey,
    value::Value,
};

/// Sorts `documents` lexicographically by `keys`.
///
/// # Errors
///
/// Returns [`DocumentStoreError::KindMismatch`] or [`DocumentStoreError::TypeMismatch`]
/// when two documents in the same group hold incomparable values under a key. No
/// documents are returned in that case.
pub fn sort_multi(documents: Vec<Value>, keys: &[SortKey]) -> DocumentStoreResult<Vec<Value>> {
    let mut groups = vec![documents];

    for key in keys {
        let mut refined = Vec::with_capacity(groups.len());

        for mut group in groups {
            if group.len() < 2 {
                refined.push(group);
                continue;
            }

            sort_group(&mut group, key)?;
            refined.extend(split_runs(group, key)?);
        }

        groups = refined;
    }

    Ok(groups
        .into_iter()
        .flatten()
        .collect())
}

fn sort_group(group: &mut [Value], key: &SortKey) -> DocumentStoreResult<()> {
    let mut failure = None;

    group.sort_by(|a, b| {
        compare_documents(a, b, key, key.ascending).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn split_runs(group: Vec<Value>, key: &SortKey) -> DocumentStoreResult<Vec<Vec<Value>>> {
    let mut runs: Vec<Vec<Value>> = Vec::new();

    for document in group {
        let joins_last = match runs.last().and_then(|run| run.last()) {
            Some(previous) => {
                compare_documents(previous, &document, key, true)? == Ordering::Equal
            }
            None => false,
        };

        match runs.last_mut() {
            Some(run) if joins_last => run.push(document),
            _ => runs.push(vec![document]),
        }
    }

    Ok(runs)
}

/// Orders two documents by `key`. A kind mismatch between documents of different
/// shapes is reported as a [`DocumentStoreError::TypeMismatch`].
fn compare_documents(left: &Value, right: &Value, key: &SortKey, ascending: bool) -> DocumentStoreResult<Ordering> {
    compare_keys(left.get_path(&key.path), right.get_path(&key.path), ascending).map_err(|err| match err {
        DocumentStoreError::KindMismatch { .. } if !same_shape(left, right) => {
            DocumentStoreError::TypeMismatch(format!("documents of different shapes under sort key {}", key.path))
        }
        err => err,
    })
}

/// Same top-level fields holding values of the same kinds.
fn same_shape(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Map(a), Value::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((left_key, left), (right_key, right))| left_key == right_key && left.kind() == right.kind())
        }
        _ => left.kind() == right.kind(),
    }
}

fn compare_keys(left: Option<&Value>, right: Option<&Value>, ascending: bool) -> DocumentStoreResult<Ordering> {
    match (left, right) {
        (None, None) => Ok(Ordering::Equal),
        (None, Some(_)) => Ok(Ordering::Less),
        (Some(_), None) => Ok(Ordering::Greater),
        (Some(left), Some(right)) => {
            let ordering = compare_values(left, right)?;

            Ok(if ascending { ordering } else { ordering.reverse() })
        }
    }
}

/// Orders two present values.
///
/// # Errors
///
/// Fails with [`DocumentStoreError::KindMismatch`] for values of different kinds and
/// [`DocumentStoreError::TypeMismatch`] for mappings with different fields.
pub fn compare_values(left: &Value, right: &Value) -> DocumentStoreResult<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Less),
        (_, Value::Null) => Ok(Ordering::Greater),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => Ok(a.total_cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Array(a), Value::Array(b)) => {
            for (left, right) in a.iter().zip(b.iter()) {
                match compare_values(left, right)? {
                    Ordering::Equal => continue,
                    ordering => return Ok(ordering),
                }
            }

            Ok(a.len().cmp(&b.len()))
        }
        (Value::Map(a), Value::Map(b)) => {
            if !a.keys().eq(b.keys()) {
                return Err(DocumentStoreError::TypeMismatch(format!(
                    "mappings with fields {:?} and {:?}",
                    a.keys().collect::<Vec<_>>(),
                    b.keys().collect::<Vec<_>>()
                )));
            }

            for (left, right) in a.values().zip(b.values()) {
                match compare_values(left, right)? {
                    Ordering::Equal => continue,
                    ordering => return Ok(ordering),
                }
            }

            Ok(Ordering::Equal)
        }
        _ => Err(DocumentStoreError::KindMismatch {
            left: left.kind(),
            right: right.kind(),
        }),
    }
}
