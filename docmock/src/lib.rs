//! An embedded, in-memory document store that answers MongoDB-style queries.
//!
//! docmock lets code written against a document database run against synthetic
//! data, deterministically and without a server. This crate is the entry point: it
//! re-exports the core types and the in-memory engine.
//!
//! # Features
//!
//! - **MongoDB filter dialect** - `$or`, `$elemMatch`, `$ne`, `$gt(e)`, `$lt(e)`, `$all`, `$in`, `$nin`, `$exists`
//! - **Dotted field paths** - `"address.city"` resolves through nested mappings
//! - **Multi-key sorting** - `sort(["-age", "name"])`
//! - **Pagination** - `skip` and `limit` with lenient handling of zero and negative values
//! - **Typed documents** - Encode and decode your own Serde types
//!
//! # Quick Start
//!
//! ```ignore
//! use docmock::prelude::*;
//! use serde::{Serialize, Deserialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: String,
//!     pub name: String,
//!     pub age: i64,
//! }
//!
//! impl Document for User {
//!     fn id(&self) -> DocumentId { DocumentId::from(&self.id) }
//!     fn collection_name() -> &'static str { "users" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = InMemoryStore::builder()
//!         .with_documents([
//!             User { id: "u1".into(), name: "Alice".into(), age: 30 },
//!             User { id: "u2".into(), name: "Bob".into(), age: 17 },
//!         ])
//!         .build()
//!         .await?;
//!
//!     let users = store.typed_collection::<User>().await;
//!
//!     // Query for adults, oldest first
//!     let adults: Vec<User> = users
//!         .find(json!({ "age": { "$gte": 18 } }))
//!         .sort(["-age"])
//!         .all_as()
//!         .await?;
//!
//!     println!("Adults: {:?}", adults);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Writing
//!
//! Collections implement [`writer::DocumentWriter`]. Writers locate documents with
//! the same filters queries use.
//!
//! ```ignore
//! use docmock::prelude::*;
//! use serde_json::json;
//!
//! let users = store.collection("users").await;
//!
//! let id = users.insert(json!({ "name": "Carol", "age": 41 }).into()).await?;
//! users.update(json!({ "name": "Carol" }).into(), json!({ "name": "Carol", "age": 42 }).into()).await?;
//! users.remove_by_id(id).await?;
//! ```

pub mod prelude;

pub use docmock_core::{document, error, query, value, writer};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage engine.
pub mod memory {
    pub use docmock_memory::{
        Collection, Cursor, CursorState, InMemoryStore, InMemoryStoreBuilder, QueryBuilder, TypedCollection,
        evaluator::{compare, matches},
        sort::{compare_values, sort_multi},
    };
}
