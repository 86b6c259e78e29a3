//! The write-path surface a collection exposes next to its query API.
//!
//! Writers locate their targets with the same filter compiler and evaluator the read
//! path uses, so a selector means exactly what it means in `find`.

use async_trait::async_trait;

use crate::{
    document::DocumentId,
    error::DocumentStoreResult,
    value::Value,
};

/// Mutations over a single collection.
///
/// Implementations must hold the collection lock exclusively for the duration of
/// each call.
#[async_trait]
pub trait DocumentWriter: Send + Sync {
    /// Inserts a document, generating an `_id` when it has none.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// for a taken id and [`InvalidDocument`](crate::error::DocumentStoreError::InvalidDocument)
    /// for a non-mapping or a non-string `_id`.
    async fn insert(&self, document: Value) -> DocumentStoreResult<DocumentId>;

    /// Replaces the first document matching `selector` with `change`, keeping its `_id`.
    ///
    /// # Errors
    ///
    /// Fails with [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound)
    /// when nothing matches.
    async fn update(&self, selector: Value, change: Value) -> DocumentStoreResult<()>;

    /// Replaces the document stored under `id`.
    async fn update_by_id(&self, id: DocumentId, change: Value) -> DocumentStoreResult<()>;

    /// Removes the first document matching `selector`.
    async fn remove(&self, selector: Value) -> DocumentStoreResult<()>;

    /// Removes the document stored under `id`.
    async fn remove_by_id(&self, id: DocumentId) -> DocumentStoreResult<()>;

    /// Removes every document matching `selector` and returns how many were removed.
    async fn remove_all(&self, selector: Value) -> DocumentStoreResult<usize>;
}
