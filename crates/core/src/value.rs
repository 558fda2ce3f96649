//! Storage-neutral property values and their storage kinds.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a value-object type (e.g. `"billing.money"`).
///
/// Value objects are persisted as text tagged with this identifier and rebuilt
/// through the [`DomainFactory`](crate::DomainFactory) registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTypeId(String);

impl ValueTypeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ValueTypeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValueTypeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// How a property is marshalled by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Bytes,
    Guid,
    /// Opaque value object, stored as text and rebuilt by type id.
    Complex(ValueTypeId),
}

impl core::fmt::Display for StorageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageKind::String => f.write_str("string"),
            StorageKind::Integer => f.write_str("integer"),
            StorageKind::Float => f.write_str("float"),
            StorageKind::Boolean => f.write_str("boolean"),
            StorageKind::Timestamp => f.write_str("timestamp"),
            StorageKind::Bytes => f.write_str("bytes"),
            StorageKind::Guid => f.write_str("guid"),
            StorageKind::Complex(id) => write!(f, "complex({id})"),
        }
    }
}

/// A single property value of a generic entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
    Guid(Uuid),
    Complex { type_id: ValueTypeId, stored: String },
}

impl PropertyValue {
    /// Runtime storage kind of this value.
    pub fn kind(&self) -> StorageKind {
        match self {
            PropertyValue::String(_) => StorageKind::String,
            PropertyValue::Integer(_) => StorageKind::Integer,
            PropertyValue::Float(_) => StorageKind::Float,
            PropertyValue::Boolean(_) => StorageKind::Boolean,
            PropertyValue::Timestamp(_) => StorageKind::Timestamp,
            PropertyValue::Bytes(_) => StorageKind::Bytes,
            PropertyValue::Guid(_) => StorageKind::Guid,
            PropertyValue::Complex { type_id, .. } => StorageKind::Complex(type_id.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            PropertyValue::Complex { stored, .. } => Some(stored),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PropertyValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Order two values of compatible kinds.
    ///
    /// Integers and floats compare numerically with each other; every other
    /// pairing of different kinds is incomparable.
    pub fn compare(&self, other: &PropertyValue) -> Option<Ordering> {
        use PropertyValue::*;
        match (self, other) {
            (String(a), String(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            (Guid(a), Guid(b)) => Some(a.cmp(b)),
            (
                Complex { type_id: ta, stored: a },
                Complex { type_id: tb, stored: b },
            ) if ta == tb => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Canonical key used to index values for equi-joins.
    ///
    /// Strings, guids and value objects join on their textual form so that a
    /// guid column can match a string foreign key.
    pub fn join_key(&self) -> String {
        match self {
            PropertyValue::String(s) => format!("s:{s}"),
            PropertyValue::Guid(g) => format!("s:{g}"),
            PropertyValue::Complex { stored, .. } => format!("s:{stored}"),
            PropertyValue::Integer(i) => format!("n:{i}"),
            PropertyValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                format!("n:{}", *f as i64)
            }
            PropertyValue::Float(f) => format!("f:{f}"),
            PropertyValue::Boolean(b) => format!("b:{b}"),
            PropertyValue::Timestamp(t) => format!("t:{}", t.timestamp_nanos_opt().unwrap_or_default()),
            PropertyValue::Bytes(b) => format!("x:{b:?}"),
        }
    }
}

impl core::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Boolean(b) => write!(f, "{b}"),
            PropertyValue::Timestamp(t) => f.write_str(&t.to_rfc3339()),
            PropertyValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            PropertyValue::Guid(g) => write!(f, "{g}"),
            PropertyValue::Complex { stored, .. } => f.write_str(stored),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Timestamp(value)
    }
}

impl From<Uuid> for PropertyValue {
    fn from(value: Uuid) -> Self {
        PropertyValue::Guid(value)
    }
}
