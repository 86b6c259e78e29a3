//! Typed documents and document identifiers.
//!
//! The engine itself only ever sees [`Value`]s. This module is the bridge for callers
//! who want their own structs in and out: [`DocumentExt`] encodes a [`Document`] into a
//! [`Value`] and decodes a stored [`Value`] back into any deserializable type, going
//! through BSON so `bson` field attributes keep working.

use std::fmt;

use bson::{Bson, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    value::Value,
};

/// Field every stored document keeps its identifier in.
pub const ID_FIELD: &str = "_id";

/// Opaque, string-rendered document identifier and the key of a collection's document map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generates a fresh identifier in ObjectId hex form.
    pub fn generate() -> Self {
        Self(ObjectId::new().to_hex())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the identifier of a stored document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] when `_id` is missing or not a string.
    pub fn of(document: &Value) -> DocumentStoreResult<Self> {
        match document.get(ID_FIELD) {
            Some(Value::String(id)) => Ok(Self(id.clone())),
            Some(other) => Err(DocumentStoreError::InvalidDocument(format!(
                "{ID_FIELD} must be a string, got {}",
                other.kind()
            ))),
            None => Err(DocumentStoreError::InvalidDocument(format!("missing {ID_FIELD}"))),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for DocumentId {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

impl From<ObjectId> for DocumentId {
    fn from(id: ObjectId) -> Self {
        Self(id.to_hex())
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<DocumentId> for Value {
    fn from(id: DocumentId) -> Self {
        Value::String(id.0)
    }
}

/// Core trait for caller-defined document types.
///
/// # Example
///
/// ```ignore
/// use docmock::document::{Document, DocumentId};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: String,
///     pub name: String,
/// }
///
/// impl Document for User {
///     fn id(&self) -> DocumentId {
///         DocumentId::from(&self.id)
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns this document's identifier.
    fn id(&self) -> DocumentId;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Conversion helpers between typed documents and [`Value`]s.
///
/// Implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// Encodes this document, writing its identifier into `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Serialization`] if the type does not encode to a mapping
    /// or contains BSON types the value model cannot hold.
    fn to_value(&self) -> DocumentStoreResult<Value>;

    /// Decodes a stored value into this type.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::ResultTypeMismatch`] if the value does not fit.
    fn from_value(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_value(&self) -> DocumentStoreResult<Value> {
        let mut value = encode(self)?;

        match value.as_map_mut() {
            Some(map) => {
                map.insert(ID_FIELD.to_string(), self.id().into());
            }
            None => {
                return Err(DocumentStoreError::Serialization(format!(
                    "{} does not encode to a mapping",
                    std::any::type_name::<D>()
                )));
            }
        }

        Ok(value)
    }

    fn from_value(value: Value) -> DocumentStoreResult<Self> {
        decode(value)
    }
}

/// Encodes any serializable type into a [`Value`].
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`] if encoding fails.
pub fn encode<T: Serialize + ?Sized>(item: &T) -> DocumentStoreResult<Value> {
    Value::try_from(serialize_to_bson(item)?)
}

/// Decodes a [`Value`] into any deserializable type.
///
/// # Errors
///
/// Returns [`DocumentStoreError::ResultTypeMismatch`] if the value does not fit `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> DocumentStoreResult<T> {
    deserialize_from_bson(Bson::from(value)).map_err(|err| {
        DocumentStoreError::ResultTypeMismatch(format!("{}: {err}", std::any::type_name::<T>()))
    })
}
