//! Collections and the query builder.
//!
//! A [`Collection`] is a cheap, cloneable handle onto a named set of documents keyed
//! by their `_id`. Every clone shares the same documents and the same lock. Reads
//! hold the lock shared only while scanning and copying, writes hold it exclusively.

use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use serde::de::DeserializeOwned;

use docmock_core::{
    document::{decode, Document, DocumentExt, DocumentId, ID_FIELD},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Clause, Operator, Predicate, Query},
    value::Value,
    writer::DocumentWriter,
};

use crate::{cursor::Cursor, evaluator::DocumentEvaluator};

type DocumentMap = BTreeMap<String, Value>;

/// A named set of documents behind a single reader/writer lock.
///
/// Unsorted results come back in ascending `_id` order.
#[derive(Clone, Debug)]
pub struct Collection {
    name: Arc<str>,
    documents: Arc<RwLock<DocumentMap>>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            documents: Arc::new(RwLock::new(DocumentMap::new())),
        }
    }

    /// Creates a collection seeded with `documents`.
    ///
    /// # Errors
    ///
    /// Fails like [`DocumentWriter::insert`] on the first document that cannot be stored.
    pub fn with_documents(
        name: impl Into<String>,
        documents: impl IntoIterator<Item = Value>,
    ) -> DocumentStoreResult<Self> {
        let name: String = name.into();
        let mut map = DocumentMap::new();

        for document in documents {
            let (id, document) = identify(document)?;

            if map.contains_key(id.as_str()) {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), name));
            }

            map.insert(id.to_string(), document);
        }

        Ok(Self {
            name: Arc::from(name),
            documents: Arc::new(RwLock::new(map)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Starts a query. `Value::Null` matches every document.
    pub fn find(&self, filter: impl Into<Value>) -> QueryBuilder<'_> {
        QueryBuilder {
            collection: self,
            query: Query::new(filter),
        }
    }

    /// Starts a query for the document stored under `id`.
    pub fn find_by_id(&self, id: impl Into<DocumentId>) -> QueryBuilder<'_> {
        let id: DocumentId = id.into();
        let filter = [(ID_FIELD, Value::from(id))]
            .into_iter()
            .collect::<Value>();

        self.find(filter)
    }

    /// Number of documents stored.
    pub async fn len(&self) -> usize {
        self.documents
            .read()
            .await
            .len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Copies out every document matching `predicate`, in scan order.
    pub(crate) async fn scan(&self, predicate: Option<&Predicate>) -> Vec<Value> {
        let documents = self.documents.read().await;

        if let Some(document) = direct_lookup(&documents, predicate) {
            return document
                .into_iter()
                .cloned()
                .collect();
        }

        match predicate {
            Some(predicate) => DocumentEvaluator::filter_documents(documents.values(), predicate),
            None => documents
                .values()
                .cloned()
                .collect::<Vec<_>>(),
        }
    }

    async fn count_matching(&self, predicate: Option<&Predicate>) -> usize {
        let documents = self.documents.read().await;

        if let Some(document) = direct_lookup(&documents, predicate) {
            return usize::from(document.is_some());
        }

        match predicate {
            Some(predicate) => documents
                .values()
                .filter(|document| DocumentEvaluator::new(document).evaluate(predicate))
                .count(),
            None => documents.len(),
        }
    }

    fn not_found(&self, lookup: impl ToString) -> DocumentStoreError {
        DocumentStoreError::DocumentNotFound(lookup.to_string(), self.name.to_string())
    }
}

#[async_trait]
impl DocumentWriter for Collection {
    async fn insert(&self, document: Value) -> DocumentStoreResult<DocumentId> {
        let (id, document) = identify(document)?;
        let mut documents = self.documents.write().await;

        if documents.contains_key(id.as_str()) {
            return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), self.name.to_string()));
        }

        documents.insert(id.to_string(), document);
        tracing::debug!(collection = %self.name, %id, "inserted document");

        Ok(id)
    }

    async fn update(&self, selector: Value, change: Value) -> DocumentStoreResult<()> {
        let predicate = compile_selector(&selector)?;
        let mut documents = self.documents.write().await;

        let id = first_match(&documents, predicate.as_ref())
            .cloned()
            .ok_or_else(|| self.not_found(&selector))?;

        let change = with_id(change, &id)?;
        documents.insert(id.clone(), change);
        tracing::debug!(collection = %self.name, %id, "updated document");

        Ok(())
    }

    async fn update_by_id(&self, id: DocumentId, change: Value) -> DocumentStoreResult<()> {
        let mut documents = self.documents.write().await;

        let Some(slot) = documents.get_mut(id.as_str()) else {
            return Err(self.not_found(&id));
        };

        *slot = with_id(change, id.as_str())?;
        tracing::debug!(collection = %self.name, %id, "updated document");

        Ok(())
    }

    async fn remove(&self, selector: Value) -> DocumentStoreResult<()> {
        let predicate = compile_selector(&selector)?;
        let mut documents = self.documents.write().await;

        let id = first_match(&documents, predicate.as_ref())
            .cloned()
            .ok_or_else(|| self.not_found(&selector))?;

        documents.remove(&id);
        tracing::debug!(collection = %self.name, %id, "removed document");

        Ok(())
    }

    async fn remove_by_id(&self, id: DocumentId) -> DocumentStoreResult<()> {
        let mut documents = self.documents.write().await;

        if documents.remove(id.as_str()).is_none() {
            return Err(self.not_found(&id));
        }

        tracing::debug!(collection = %self.name, %id, "removed document");

        Ok(())
    }

    async fn remove_all(&self, selector: Value) -> DocumentStoreResult<usize> {
        let predicate = compile_selector(&selector)?;
        let mut documents = self.documents.write().await;

        let before = documents.len();
        documents.retain(|_, document| match &predicate {
            Some(predicate) => !DocumentEvaluator::new(document).evaluate(predicate),
            None => false,
        });
        let removed = before - documents.len();

        tracing::debug!(collection = %self.name, removed, "removed documents");

        Ok(removed)
    }
}

/// A query under construction.
///
/// Builder methods never fail. The filter and sort keys are validated by whichever
/// terminal call runs the query.
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    collection: &'a Collection,
    query: Query,
}

impl<'a> QueryBuilder<'a> {
    /// Replaces the sort keys. Each key is a field path, prefixed with `-` for
    /// descending or optionally `+` for ascending.
    pub fn sort<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.sort = keys
            .into_iter()
            .map(Into::into)
            .collect();
        self
    }

    /// Zero or negative skips nothing.
    pub fn skip(mut self, skip: i64) -> Self {
        self.query.skip = skip;
        self
    }

    /// Zero or negative is unlimited.
    pub fn limit(mut self, limit: i64) -> Self {
        self.query.limit = limit;
        self
    }

    /// Records a projection. Projections are accepted but not applied: results
    /// always carry every field.
    pub fn select(mut self, projection: impl Into<Value>) -> Self {
        self.query.projection = Some(projection.into());
        self
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Compiles the query into an unevaluated cursor.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::UnknownQueryKind`] for a malformed filter and
    /// [`DocumentStoreError::EmptySortFieldName`] for an empty sort key.
    pub fn cursor(self) -> DocumentStoreResult<Cursor> {
        let compiled = self.query.compile()?;

        Ok(Cursor::new(self.collection.clone(), compiled))
    }

    /// Returns the first result after sorting and skipping.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] when nothing matches.
    pub async fn one(self) -> DocumentStoreResult<Value> {
        let collection = self.collection;
        let lookup = self.query.filter.to_string();

        self.limit(1)
            .cursor()?
            .next()
            .await?
            .ok_or_else(|| collection.not_found(lookup))
    }

    /// Like [`one`](Self::one), decoding the result into `T`.
    pub async fn one_as<T: DeserializeOwned>(self) -> DocumentStoreResult<T> {
        decode(self.one().await?)
    }

    pub async fn all(self) -> DocumentStoreResult<Vec<Value>> {
        self.cursor()?
            .all()
            .await
    }

    pub async fn all_as<T: DeserializeOwned>(self) -> DocumentStoreResult<Vec<T>> {
        self.cursor()?
            .all_as()
            .await
    }

    /// Replaces the contents of `results` with every result decoded into `T`.
    ///
    /// `results` is left untouched if the query or any decode fails.
    pub async fn all_into<T: DeserializeOwned>(self, results: &mut Vec<T>) -> DocumentStoreResult<()> {
        *results = self.all_as().await?;

        Ok(())
    }

    /// Counts matching documents. Sort keys and pagination are ignored.
    pub async fn count(self) -> DocumentStoreResult<usize> {
        let compiled = self.query.compile()?;
        let count = self.collection
            .count_matching(compiled.predicate.as_ref())
            .await;

        tracing::debug!(collection = %self.collection.name(), count, "counted documents");

        Ok(count)
    }

    /// Collects the distinct values of `path` across matching documents, in scan order.
    /// Documents where `path` does not resolve are skipped.
    pub async fn distinct(self, path: &str) -> DocumentStoreResult<Vec<Value>> {
        let compiled = self.query.compile()?;
        let matched = self.collection
            .scan(compiled.predicate.as_ref())
            .await;

        let mut values: Vec<Value> = Vec::new();

        for value in matched.iter().filter_map(|document| document.get_path(path)) {
            if !values.contains(value) {
                values.push(value.clone());
            }
        }

        Ok(values)
    }
}

/// A [`Collection`] bound to a caller-defined [`Document`] type.
#[derive(Debug)]
pub struct TypedCollection<D: Document> {
    collection: Collection,
    _marker: PhantomData<fn() -> D>,
}

impl<D: Document> Clone for TypedCollection<D> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<D: Document> TypedCollection<D> {
    pub(crate) fn new(collection: Collection) -> Self {
        Self { collection, _marker: PhantomData }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub async fn insert(&self, document: &D) -> DocumentStoreResult<DocumentId> {
        self.collection
            .insert(document.to_value()?)
            .await
    }

    /// Fetches and decodes the document stored under `id`.
    pub async fn get(&self, id: impl Into<DocumentId>) -> DocumentStoreResult<D> {
        self.collection
            .find_by_id(id)
            .one_as()
            .await
    }

    pub fn find(&self, filter: impl Into<Value>) -> QueryBuilder<'_> {
        self.collection.find(filter)
    }
}

/// Validates a document for storage, generating an `_id` when it has none.
fn identify(mut document: Value) -> DocumentStoreResult<(DocumentId, Value)> {
    let kind = document.kind();
    let Some(map) = document.as_map_mut() else {
        return Err(DocumentStoreError::InvalidDocument(format!("expected a mapping, got {kind}")));
    };

    if !map.contains_key(ID_FIELD) {
        map.insert(ID_FIELD.to_string(), DocumentId::generate().into());
    }

    let id = DocumentId::of(&document)?;

    Ok((id, document))
}

fn with_id(change: Value, id: &str) -> DocumentStoreResult<Value> {
    let mut change = change;
    let kind = change.kind();

    let Some(map) = change.as_map_mut() else {
        return Err(DocumentStoreError::InvalidDocument(format!("expected a mapping, got {kind}")));
    };

    map.insert(ID_FIELD.to_string(), Value::from(id));

    Ok(change)
}

fn compile_selector(selector: &Value) -> DocumentStoreResult<Option<Predicate>> {
    match selector {
        Value::Null => Ok(None),
        selector => Predicate::compile(selector).map(Some),
    }
}

fn first_match<'m>(documents: &'m DocumentMap, predicate: Option<&Predicate>) -> Option<&'m String> {
    match predicate {
        Some(predicate) => documents
            .iter()
            .find(|(_, document)| DocumentEvaluator::new(document).evaluate(predicate))
            .map(|(id, _)| id),
        None => documents.keys().next(),
    }
}

/// Short-circuits filters of the exact form `{"_id": "<string>"}` to a key lookup.
///
/// Returns `None` when the filter has any other shape, `Some(None)` when the id is absent.
fn direct_lookup<'m>(documents: &'m DocumentMap, predicate: Option<&Predicate>) -> Option<Option<&'m Value>> {
    let predicate = predicate?;

    if predicate.key.is_some() || predicate.element_match || predicate.fields.len() != 1 {
        return None;
    }

    match predicate.fields.first() {
        Some(Clause::Field(field)) if field.path == ID_FIELD && field.operator == Operator::Eq => {
            match &field.value {
                Value::String(id) => Some(documents.get(id)),
                _ => None,
            }
        }
        _ => None,
    }
}
