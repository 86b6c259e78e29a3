//! Error types and result types for document store operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Errors are plain values scoped to the query engine: nothing is retried,
//! nothing is logged on the way out, and a failing sort returns no partial results.

use std::convert::Infallible;

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::value::ValueKind;

/// Represents all possible errors raised while compiling, evaluating or serving a query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentStoreError {
    /// The filter specification is not a mapping, or an operator inside it has a malformed operand.
    #[error("Unknown query kind: {0}")]
    UnknownQueryKind(String),
    /// A single-result query matched no document.
    /// The first argument describes the lookup, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// A stored document could not be decoded into the type requested by the caller.
    #[error("Result type mismatch: {0}")]
    ResultTypeMismatch(String),
    /// The sort comparator was handed two values of different kinds.
    #[error("Cannot compare values of different kinds: {left} and {right}")]
    KindMismatch {
        /// Kind of the left-hand value.
        left: ValueKind,
        /// Kind of the right-hand value.
        right: ValueKind,
    },
    /// The sort comparator was handed two records of different shapes.
    #[error("Cannot compare values of different types: {0}")]
    TypeMismatch(String),
    /// A sort key was empty after stripping its direction prefix.
    #[error("Sort: empty field name")]
    EmptySortFieldName,
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The document is not a mapping or carries an unusable `_id`.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<Infallible> for DocumentStoreError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
