//! Lazily materialized query cursors.
//!
//! A [`Cursor`] moves through three states:
//!
//! - **Unevaluated** - created by [`QueryBuilder::cursor`](crate::collection::QueryBuilder::cursor),
//!   nothing has been read from the collection yet
//! - **Materialized** - the first pull scanned the collection under its read lock,
//!   copied the matches out, then sorted and paginated them into a private buffer
//! - **Exhausted** - the buffer is empty
//!
//! Materialization happens exactly once. A pull that fails during materialization
//! returns the error and leaves the cursor exhausted.

use std::{collections::VecDeque, mem};

use serde::de::DeserializeOwned;

use docmock_core::{
    document::decode,
    error::DocumentStoreResult,
    query::CompiledQuery,
    value::Value,
};

use crate::{collection::Collection, sort::sort_multi};

/// Observable state of a [`Cursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unevaluated,
    Materialized,
    Exhausted,
}

#[derive(Debug)]
enum Stage {
    Unevaluated(CompiledQuery),
    Materialized(VecDeque<Value>),
    Exhausted,
}

/// Streams the results of a single query execution.
#[derive(Debug)]
pub struct Cursor {
    collection: Collection,
    stage: Stage,
}

impl Cursor {
    pub(crate) fn new(collection: Collection, query: CompiledQuery) -> Self {
        Self { collection, stage: Stage::Unevaluated(query) }
    }

    pub fn state(&self) -> CursorState {
        match self.stage {
            Stage::Unevaluated(_) => CursorState::Unevaluated,
            Stage::Materialized(_) => CursorState::Materialized,
            Stage::Exhausted => CursorState::Exhausted,
        }
    }

    /// Cursors never time out.
    pub fn timed_out(&self) -> bool {
        false
    }

    /// Pulls the next document, materializing the results on the first call.
    ///
    /// # Errors
    ///
    /// Sort failures surface here, on the pull that triggers materialization.
    pub async fn next(&mut self) -> DocumentStoreResult<Option<Value>> {
        self.materialize().await?;

        let Stage::Materialized(buffer) = &mut self.stage else {
            return Ok(None);
        };

        let document = buffer.pop_front();

        if buffer.is_empty() {
            self.stage = Stage::Exhausted;
        }

        Ok(document)
    }

    /// Pulls the next document and decodes it into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ResultTypeMismatch`](docmock_core::error::DocumentStoreError::ResultTypeMismatch)
    /// if the document does not decode. The document is consumed either way.
    pub async fn next_as<T: DeserializeOwned>(&mut self) -> DocumentStoreResult<Option<T>> {
        self.next()
            .await?
            .map(decode)
            .transpose()
    }

    /// Drains every remaining document.
    pub async fn all(&mut self) -> DocumentStoreResult<Vec<Value>> {
        self.materialize().await?;

        match mem::replace(&mut self.stage, Stage::Exhausted) {
            Stage::Materialized(buffer) => Ok(Vec::from(buffer)),
            _ => Ok(Vec::new()),
        }
    }

    /// Drains every remaining document, decoding each into `T`.
    pub async fn all_as<T: DeserializeOwned>(&mut self) -> DocumentStoreResult<Vec<T>> {
        self.all()
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn materialize(&mut self) -> DocumentStoreResult<()> {
        let Stage::Unevaluated(query) = mem::replace(&mut self.stage, Stage::Exhausted) else {
            return Ok(());
        };

        let buffer = execute(&self.collection, query).await?;

        if !buffer.is_empty() {
            self.stage = Stage::Materialized(buffer);
        }

        Ok(())
    }
}

async fn execute(collection: &Collection, query: CompiledQuery) -> DocumentStoreResult<VecDeque<Value>> {
    let matched = collection
        .scan(query.predicate.as_ref())
        .await;
    let total = matched.len();

    let sorted = if query.sort.is_empty() {
        matched
    } else {
        sort_multi(matched, &query.sort)?
    };

    let buffer = sorted
        .into_iter()
        .skip(query.skip)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect::<VecDeque<_>>();

    tracing::debug!(
        collection = %collection.name(),
        matched = total,
        returned = buffer.len(),
        "materialized cursor"
    );

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmock_core::{error::DocumentStoreError, query::Query, writer::DocumentWriter};
    use serde_json::json;

    fn seeded() -> Collection {
        Collection::with_documents(
            "numbers",
            [
                json!({ "_id": "1", "n": 3 }),
                json!({ "_id": "2", "n": 1 }),
                json!({ "_id": "3", "n": 2 }),
            ]
            .into_iter()
            .map(Value::from),
        )
        .unwrap()
    }

    fn compiled(filter: serde_json::Value, sort: &[&str], skip: i64, limit: i64) -> CompiledQuery {
        let mut query = Query::new(filter);
        query.sort = sort.iter().map(|key| key.to_string()).collect();
        query.skip = skip;
        query.limit = limit;
        query.compile().unwrap()
    }

    #[tokio::test]
    async fn walks_through_every_state() {
        let mut cursor = Cursor::new(seeded(), compiled(json!({}), &["n"], 0, 0));
        assert_eq!(cursor.state(), CursorState::Unevaluated);

        assert_eq!(cursor.next().await.unwrap(), Some(Value::from(json!({ "_id": "2", "n": 1 }))));
        assert_eq!(cursor.state(), CursorState::Materialized);

        assert_eq!(cursor.next().await.unwrap(), Some(Value::from(json!({ "_id": "3", "n": 2 }))));
        assert_eq!(cursor.next().await.unwrap(), Some(Value::from(json!({ "_id": "1", "n": 3 }))));
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(cursor.next().await.unwrap(), None);
        assert!(!cursor.timed_out());
    }

    #[tokio::test]
    async fn empty_results_exhaust_immediately() {
        let mut cursor = Cursor::new(seeded(), compiled(json!({ "n": 10 }), &[], 0, 0));

        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(cursor.state(), CursorState::Exhausted);
    }

    #[tokio::test]
    async fn drains_the_remaining_buffer() {
        let mut cursor = Cursor::new(seeded(), compiled(json!(null), &["-n"], 1, 0));

        assert_eq!(cursor.next().await.unwrap(), Some(Value::from(json!({ "_id": "3", "n": 2 }))));
        assert_eq!(cursor.all().await.unwrap(), vec![Value::from(json!({ "_id": "2", "n": 1 }))]);
        assert!(cursor.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn materializes_once() {
        let collection = seeded();
        let mut cursor = Cursor::new(collection.clone(), compiled(json!({}), &[], 0, 2));

        assert!(cursor.next().await.unwrap().is_some());
        collection.remove_all(Value::Null).await.unwrap();

        assert!(cursor.next().await.unwrap().is_some());
        assert_eq!(cursor.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sort_errors_surface_on_first_pull() {
        let collection = Collection::with_documents(
            "mixed",
            [json!({ "_id": "1", "n": 1 }), json!({ "_id": "2", "n": "one" })]
                .into_iter()
                .map(Value::from),
        )
        .unwrap();
        let mut cursor = Cursor::new(collection, compiled(json!({}), &["n"], 0, 0));

        assert!(matches!(cursor.next().await, Err(DocumentStoreError::TypeMismatch(_))));
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(cursor.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn decodes_into_caller_types() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct Number {
            n: i64,
        }

        let mut cursor = Cursor::new(seeded(), compiled(json!({}), &["n"], 0, 0));

        assert_eq!(cursor.next_as::<Number>().await.unwrap(), Some(Number { n: 1 }));
        assert_eq!(cursor.all_as::<Number>().await.unwrap(), vec![Number { n: 2 }, Number { n: 3 }]);
    }
}
