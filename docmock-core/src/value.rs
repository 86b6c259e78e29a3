//! The semi-structured value every stored document and every filter operand is made of.
//!
//! [`Value`] is a closed tagged union, so comparison code can match on it exhaustively.
//! Mappings are kept in a [`BTreeMap`], which fixes the traversal order of record fields
//! to ascending key order wherever two mappings are compared.
//!
//! # Field paths
//!
//! A field path is a dot-delimited string such as `"address.city"`. Resolution descends
//! one mapping per segment. Resolving through a non-mapping value, through a missing key,
//! or resolving an empty path yields `None` ("absent"), never an error.
//!
//! ```ignore
//! use docmock_core::value::Value;
//! use serde_json::json;
//!
//! let doc = Value::from(json!({ "address": { "city": "Oslo" } }));
//! assert_eq!(doc.get_path("address.city"), Some(&Value::from("Oslo")));
//! assert_eq!(doc.get_path("address.zip"), None);
//! ```

use std::{collections::BTreeMap, fmt};

use bson::{Bson, Document as BsonDocument, spec::BinarySubtype};
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The tag of a [`Value`], used when reporting comparison failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Map => "map",
        };

        f.write_str(name)
    }
}

/// A document, or any part of one.
///
/// Integers and floats are distinct kinds: `Int(10)` and `Float(10.0)` are never equal
/// and never ordered against each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// UTF-8 string value.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Record or nested record, keyed by field name.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Creates an empty mapping.
    pub fn map() -> Self {
        Value::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a direct field of a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Resolves a dotted field path against this value.
    ///
    /// Returns `None` when the path is empty, when a segment names a missing field,
    /// or when a segment has to descend into something that is not a mapping.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }

        path.split('.')
            .try_fold(self, |current, segment| match current {
                Value::Map(map) => map.get(segment),
                _ => None,
            })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", JsonValue::from(self.clone()))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect()
        )
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(value) => Value::Bool(value),
            JsonValue::Number(number) => Value::from(&number),
            JsonValue::String(value) => Value::String(value),
            JsonValue::Array(values) => Value::Array(
                values
                    .into_iter()
                    .map(Value::from)
                    .collect()
            ),
            JsonValue::Object(map) => Value::Map(
                map
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect()
            ),
        }
    }
}

impl From<&Number> for Value {
    fn from(number: &Number) -> Self {
        match (number.as_i64(), number.as_f64()) {
            (Some(value), _) => Value::Int(value),
            (None, Some(value)) => Value::Float(value),
            (None, None) => Value::Null,
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(value) => JsonValue::Bool(value),
            Value::Int(value) => JsonValue::Number(value.into()),
            // Non-finite floats have no JSON rendering.
            Value::Float(value) => Number::from_f64(value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::String(value) => JsonValue::String(value),
            Value::Array(values) => JsonValue::Array(
                values
                    .into_iter()
                    .map(JsonValue::from)
                    .collect()
            ),
            Value::Map(map) => JsonValue::Object(
                map
                    .into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect::<JsonMap<_, _>>()
            ),
        }
    }
}

impl TryFrom<Bson> for Value {
    type Error = DocumentStoreError;

    fn try_from(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(match bson {
            Bson::Null | Bson::Undefined => Value::Null,
            Bson::Boolean(value) => Value::Bool(value),
            Bson::Int32(value) => Value::Int(i64::from(value)),
            Bson::Int64(value) => Value::Int(value),
            Bson::Double(value) => Value::Float(value),
            Bson::String(value) => Value::String(value),
            Bson::ObjectId(oid) => Value::String(oid.to_hex()),
            Bson::DateTime(datetime) => Value::Int(datetime.timestamp_millis()),
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
                let uuid = uuid::Uuid::from_slice(&binary.bytes)
                    .map_err(|err| DocumentStoreError::Serialization(err.to_string()))?;

                Value::String(uuid.to_string())
            }
            Bson::Array(values) => Value::Array(
                values
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<DocumentStoreResult<Vec<_>>>()?
            ),
            Bson::Document(doc) => Value::try_from(doc)?,
            other => {
                return Err(DocumentStoreError::Serialization(format!(
                    "unsupported BSON element type {:?}",
                    other.element_type()
                )));
            }
        })
    }
}

impl TryFrom<BsonDocument> for Value {
    type Error = DocumentStoreError;

    fn try_from(doc: BsonDocument) -> DocumentStoreResult<Self> {
        Ok(Value::Map(
            doc
                .into_iter()
                .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                .collect::<DocumentStoreResult<BTreeMap<_, _>>>()?
        ))
    }
}

impl From<Value> for Bson {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Bson::Null,
            Value::Bool(value) => Bson::Boolean(value),
            Value::Int(value) => match i32::try_from(value) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(value),
            },
            Value::Float(value) => Bson::Double(value),
            Value::String(value) => Bson::String(value),
            Value::Array(values) => Bson::Array(
                values
                    .into_iter()
                    .map(Bson::from)
                    .collect()
            ),
            Value::Map(map) => Bson::Document(
                map
                    .into_iter()
                    .map(|(k, v)| (k, Bson::from(v)))
                    .collect::<BsonDocument>()
            ),
        }
    }
}
