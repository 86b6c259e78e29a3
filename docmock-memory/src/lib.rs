//! In-memory query engine for docmock.
//!
//! This crate owns everything that touches stored documents: collections, the
//! predicate evaluator, the multi-key sort and the cursors that tie them together.
//!
//! # Features
//!
//! - **Thread-safe access** - Each collection sits behind one async-aware RwLock
//! - **MongoDB-style filters** - `$or`, `$elemMatch`, comparisons, `$in`/`$nin`, `$exists`
//! - **Multi-key sorting** - Stable, key-by-key refinement of tie groups
//! - **Lazy cursors** - Results are materialized on the first pull, exactly once
//!
//! # Quick Start
//!
//! ```ignore
//! use docmock_memory::InMemoryStore;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::builder()
//!         .with_collection("users", [
//!             json!({ "_id": "u1", "name": "Alice", "age": 30 }),
//!             json!({ "_id": "u2", "name": "Bob", "age": 17 }),
//!         ])
//!         .build()
//!         .await?;
//!
//!     let mut cursor = store
//!         .collection("users")
//!         .await
//!         .find(json!({ "$or": [{ "age": { "$gte": 18 } }, { "name": "Bob" }] }))
//!         .sort(["-age"])
//!         .cursor()?;
//!
//!     while let Some(user) = cursor.next().await? {
//!         println!("{user}");
//!     }
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmock_memory;

pub mod collection;
pub mod cursor;
pub mod evaluator;
pub mod sort;
pub mod store;

pub use collection::{Collection, QueryBuilder, TypedCollection};
pub use cursor::{Cursor, CursorState};
pub use store::{InMemoryStore, InMemoryStoreBuilder};
