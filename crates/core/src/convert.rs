//! Typed conversion to and from property values.
//!
//! The storage kind of a property comes from the static type written into it,
//! so an explicit null still declares a kind. Value objects convert through the
//! [`DomainFactory`] so that unregistered types are rejected on read.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::factory::DomainFactory;
use crate::id::EntityId;
use crate::value::{PropertyValue, StorageKind};
use crate::value_object::ValueObject;

/// Types that can be written into a property bag.
pub trait IntoProperty {
    /// Kind declared for this type, used when the value itself is null.
    fn storage_kind() -> StorageKind;

    fn to_property(&self) -> Option<PropertyValue>;
}

/// Types that can be read back from a non-null property value.
pub trait FromProperty: Sized {
    fn from_property(value: &PropertyValue, factory: &DomainFactory) -> DomainResult<Self>;
}

fn mismatch(expected: &str, value: &PropertyValue) -> DomainError {
    DomainError::validation(format!("expected {expected} value, found {}", value.kind()))
}

impl IntoProperty for str {
    fn storage_kind() -> StorageKind {
        StorageKind::String
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::String(self.to_string()))
    }
}

impl IntoProperty for String {
    fn storage_kind() -> StorageKind {
        StorageKind::String
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::String(self.clone()))
    }
}

impl FromProperty for String {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::String(s) => Ok(s.clone()),
            PropertyValue::Guid(g) => Ok(g.to_string()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl IntoProperty for i64 {
    fn storage_kind() -> StorageKind {
        StorageKind::Integer
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Integer(*self))
    }
}

impl FromProperty for i64 {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::Integer(i) => Ok(*i),
            other => Err(mismatch("integer", other)),
        }
    }
}

impl IntoProperty for i32 {
    fn storage_kind() -> StorageKind {
        StorageKind::Integer
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Integer(i64::from(*self)))
    }
}

impl FromProperty for i32 {
    fn from_property(value: &PropertyValue, factory: &DomainFactory) -> DomainResult<Self> {
        let wide = i64::from_property(value, factory)?;
        i32::try_from(wide)
            .map_err(|_| DomainError::validation(format!("integer {wide} out of range for i32")))
    }
}

impl IntoProperty for f64 {
    fn storage_kind() -> StorageKind {
        StorageKind::Float
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Float(*self))
    }
}

impl FromProperty for f64 {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::Float(f) => Ok(*f),
            PropertyValue::Integer(i) => Ok(*i as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl IntoProperty for bool {
    fn storage_kind() -> StorageKind {
        StorageKind::Boolean
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Boolean(*self))
    }
}

impl FromProperty for bool {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value))
    }
}

impl IntoProperty for DateTime<Utc> {
    fn storage_kind() -> StorageKind {
        StorageKind::Timestamp
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Timestamp(*self))
    }
}

impl FromProperty for DateTime<Utc> {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::Timestamp(t) => Ok(*t),
            PropertyValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| DomainError::validation(format!("invalid timestamp '{s}': {e}"))),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl IntoProperty for Vec<u8> {
    fn storage_kind() -> StorageKind {
        StorageKind::Bytes
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Bytes(self.clone()))
    }
}

impl FromProperty for Vec<u8> {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch("bytes", other)),
        }
    }
}

impl IntoProperty for Uuid {
    fn storage_kind() -> StorageKind {
        StorageKind::Guid
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Guid(*self))
    }
}

impl FromProperty for Uuid {
    fn from_property(value: &PropertyValue, _: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::Guid(g) => Ok(*g),
            PropertyValue::String(s) => Uuid::parse_str(s)
                .map_err(|e| DomainError::validation(format!("invalid guid '{s}': {e}"))),
            other => Err(mismatch("guid", other)),
        }
    }
}

impl IntoProperty for EntityId {
    fn storage_kind() -> StorageKind {
        StorageKind::String
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::String(self.as_str().to_string()))
    }
}

impl FromProperty for EntityId {
    fn from_property(value: &PropertyValue, factory: &DomainFactory) -> DomainResult<Self> {
        String::from_property(value, factory)?.parse()
    }
}

impl<T: IntoProperty> IntoProperty for Option<T> {
    fn storage_kind() -> StorageKind {
        T::storage_kind()
    }

    fn to_property(&self) -> Option<PropertyValue> {
        self.as_ref().and_then(T::to_property)
    }
}

impl<V: ValueObject> IntoProperty for V {
    fn storage_kind() -> StorageKind {
        StorageKind::Complex(V::type_id())
    }

    fn to_property(&self) -> Option<PropertyValue> {
        Some(PropertyValue::Complex {
            type_id: V::type_id(),
            stored: self.to_stored(),
        })
    }
}

impl<V: ValueObject> FromProperty for V {
    fn from_property(value: &PropertyValue, factory: &DomainFactory) -> DomainResult<Self> {
        match value {
            PropertyValue::Complex { type_id, stored } if type_id.as_str() == V::TYPE_ID => {
                factory.value::<V>(stored)
            }
            PropertyValue::Complex { type_id, .. } => Err(DomainError::validation(format!(
                "expected value type '{}', found '{type_id}'",
                V::TYPE_ID
            ))),
            PropertyValue::String(stored) => factory.value::<V>(stored),
            other => Err(mismatch(V::TYPE_ID, other)),
        }
    }
}
