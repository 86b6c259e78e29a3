//! The in-memory store: a registry of named collections.
//!
//! Collections are created on first use and live until dropped. Every handle handed
//! out by the store shares state with the store itself, so a [`Collection`] obtained
//! before a write sees that write.

use std::{collections::HashMap, sync::Arc};

use mea::rwlock::RwLock;

use docmock_core::{
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    value::Value,
};

use crate::collection::{Collection, TypedCollection};

type StoreMap = HashMap<String, Collection>;

/// Thread-safe registry of in-memory collections.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be shared across async tasks. Clones share the same collections.
///
/// # Example
///
/// ```ignore
/// use docmock_memory::InMemoryStore;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::builder()
///         .with_collection("users", [json!({ "_id": "u1", "name": "Alice", "age": 30 })])
///         .build()
///         .await?;
///
///     let users = store.collection("users").await;
///     let adults = users
///         .find(json!({ "age": { "$gte": 18 } }))
///         .sort(["-age"])
///         .all()
///         .await?;
///
///     assert_eq!(adults.len(), 1);
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> collection
    collections: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new store with no collections.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for seeding a store before first use.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Returns the collection called `name`, creating an empty one if needed.
    pub async fn collection(&self, name: &str) -> Collection {
        if let Some(collection) = self.collections.read().await.get(name) {
            return collection.clone();
        }

        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(collection = name, "created collection");
                Collection::new(name)
            })
            .clone()
    }

    /// Returns the collection `D` documents live in.
    pub async fn typed_collection<D: Document>(&self) -> TypedCollection<D> {
        TypedCollection::new(self.collection(D::collection_name()).await)
    }

    /// Names of every collection, sorted.
    pub async fn list_collections(&self) -> Vec<String> {
        let mut names = self.collections
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        names.sort();
        names
    }

    /// Removes a collection and every document in it.
    ///
    /// Handles obtained earlier keep the shared data alive and keep working on it.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::CollectionNotFound`] if there is no such collection.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut collections = self.collections.write().await;

        if collections.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        tracing::debug!(collection = name, "dropped collection");

        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances with seeded collections.
///
/// Seeding errors are collected and reported by [`build`](Self::build).
///
/// # Example
///
/// ```ignore
/// use docmock_memory::InMemoryStore;
///
/// let store = InMemoryStore::builder()
///     .with_documents(vec![alice, bob])
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder {
    seeds: Vec<(String, DocumentStoreResult<Vec<Value>>)>,
}

impl InMemoryStoreBuilder {
    /// Seeds the collection called `name` with raw documents.
    ///
    /// Calling this twice for the same name adds to the same collection.
    pub fn with_collection<I, V>(mut self, name: impl Into<String>, documents: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let documents = documents
            .into_iter()
            .map(Into::into)
            .collect::<Vec<_>>();

        self.seeds.push((name.into(), Ok(documents)));
        self
    }

    /// Seeds `D`'s collection with typed documents.
    pub fn with_documents<D: Document>(mut self, documents: impl IntoIterator<Item = D>) -> Self {
        let encoded = documents
            .into_iter()
            .map(|document| document.to_value())
            .collect::<DocumentStoreResult<Vec<_>>>();

        self.seeds.push((D::collection_name().to_string(), encoded));
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Fails with the first seeding error: a document that does not encode, is not
    /// a mapping, has a non-string `_id`, or repeats an id within its collection.
    pub async fn build(self) -> DocumentStoreResult<InMemoryStore> {
        let mut grouped: Vec<(String, Vec<Value>)> = Vec::new();

        for (name, documents) in self.seeds {
            let documents = documents?;

            match grouped.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, seeded)) => seeded.extend(documents),
                None => grouped.push((name, documents)),
            }
        }

        let mut collections = StoreMap::with_capacity(grouped.len());

        for (name, documents) in grouped {
            let collection = Collection::with_documents(name.as_str(), documents)?;
            collections.insert(name, collection);
        }

        tracing::debug!(collections = collections.len(), "built in-memory store");

        Ok(InMemoryStore {
            collections: Arc::new(RwLock::new(collections)),
        })
    }
}
