//! Convenient re-exports of commonly used types from docmock.
//!
//! ```ignore
//! use docmock::prelude::*;
//! ```
//!
//! This provides access to:
//! - The document value model and typed document traits
//! - The store, collections, query builders and cursors
//! - The write-path trait
//! - Error types

pub use docmock_core::{
    document::{Document, DocumentExt, DocumentId},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Operator, Predicate, Query, SortKey},
    value::{Value, ValueKind},
    writer::DocumentWriter,
};
pub use docmock_memory::{
    Collection, Cursor, CursorState, InMemoryStore, InMemoryStoreBuilder, QueryBuilder, TypedCollection,
};
