//! Core types for an embedded, in-memory document store that answers MongoDB-style queries.
//!
//! This crate holds everything that does not depend on where documents live:
//!
//! - **Document values** ([`value`]) - The tagged value model and dotted field-path resolution
//! - **Queries** ([`query`]) - Filter compilation into predicate trees, sort keys, pagination
//! - **Typed documents** ([`document`]) - Traits for encoding caller types to and from values
//! - **Write path** ([`writer`]) - The mutation surface collections expose
//! - **Error handling** ([`error`]) - The error enum and result alias
//!
//! # Example
//!
//! ```ignore
//! use docmock_core::{query::Predicate, value::Value};
//! use serde_json::json;
//!
//! let predicate = Predicate::compile(&Value::from(json!({ "age": { "$gte": 18 } })))?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmock_core;

pub mod document;
pub mod error;
pub mod query;
pub mod value;
pub mod writer;
