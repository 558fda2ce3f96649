//! JSON marshalling of generic entities, driven by schema metadata.
//!
//! Document-style backends persist an entity as one JSON object. JSON cannot
//! tell a timestamp from a string or a guid from a name, so reading back relies
//! on the declared storage kind of each property. Properties with no declared
//! kind fall back to the natural JSON kind.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value as JsonValue};
use uuid::Uuid;

use crate::entity::GenericEntity;
use crate::error::{DomainError, DomainResult};
use crate::factory::DomainFactory;
use crate::schema::SchemaMetadata;
use crate::value::{PropertyValue, StorageKind};

/// Serialize every property of an entity into a JSON object.
pub fn to_json(entity: &GenericEntity) -> JsonValue {
    let mut object = Map::new();
    for (name, value) in entity.properties().iter() {
        object.insert(name.to_string(), value_to_json(value.as_ref()));
    }
    JsonValue::Object(object)
}

fn value_to_json(value: Option<&PropertyValue>) -> JsonValue {
    match value {
        None => JsonValue::Null,
        Some(PropertyValue::String(s)) => JsonValue::String(s.clone()),
        Some(PropertyValue::Integer(i)) => JsonValue::Number((*i).into()),
        Some(PropertyValue::Float(f)) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Some(PropertyValue::Boolean(b)) => JsonValue::Bool(*b),
        Some(PropertyValue::Timestamp(t)) => JsonValue::String(t.to_rfc3339()),
        Some(PropertyValue::Bytes(b)) => {
            JsonValue::Array(b.iter().map(|byte| JsonValue::Number((*byte).into())).collect())
        }
        Some(PropertyValue::Guid(g)) => JsonValue::String(g.to_string()),
        Some(PropertyValue::Complex { stored, .. }) => JsonValue::String(stored.clone()),
    }
}

/// Rebuild an entity from a JSON object using the declared kinds.
///
/// Value-object text is validated through the factory registry.
pub fn from_json(
    document: &JsonValue,
    schema: &SchemaMetadata,
    factory: &DomainFactory,
) -> DomainResult<GenericEntity> {
    let object = document
        .as_object()
        .ok_or_else(|| DomainError::validation("stored document is not a JSON object"))?;

    let mut entity = GenericEntity::from_parts(Default::default(), schema.clone());
    for (name, json) in object {
        let declared = entity.schema().kind_of(name).cloned();
        let value = match declared {
            Some(kind) => json_as_kind(name, json, &kind, factory)?,
            None => json_natural(name, json)?,
        };
        entity.properties_mut().set(name.clone(), value.clone());
        if let Some(v) = value {
            if !entity.schema().contains(name) {
                entity.declare(name.clone(), v.kind());
            }
        }
    }
    Ok(entity)
}

fn invalid(name: &str, kind: &StorageKind, json: &JsonValue) -> DomainError {
    DomainError::validation(format!("property '{name}': cannot read {json} as {kind}"))
}

fn json_as_kind(
    name: &str,
    json: &JsonValue,
    kind: &StorageKind,
    factory: &DomainFactory,
) -> DomainResult<Option<PropertyValue>> {
    if json.is_null() {
        return Ok(None);
    }

    let value = match (kind, json) {
        (StorageKind::String, JsonValue::String(s)) => PropertyValue::String(s.clone()),
        (StorageKind::Integer, JsonValue::Number(n)) => {
            PropertyValue::Integer(n.as_i64().ok_or_else(|| invalid(name, kind, json))?)
        }
        (StorageKind::Float, JsonValue::Number(n)) => {
            PropertyValue::Float(n.as_f64().ok_or_else(|| invalid(name, kind, json))?)
        }
        (StorageKind::Boolean, JsonValue::Bool(b)) => PropertyValue::Boolean(*b),
        (StorageKind::Timestamp, JsonValue::String(s)) => PropertyValue::Timestamp(
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| invalid(name, kind, json))?,
        ),
        (StorageKind::Bytes, JsonValue::Array(items)) => PropertyValue::Bytes(
            items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| invalid(name, kind, json))
                })
                .collect::<DomainResult<Vec<u8>>>()?,
        ),
        (StorageKind::Guid, JsonValue::String(s)) => {
            PropertyValue::Guid(Uuid::parse_str(s).map_err(|_| invalid(name, kind, json))?)
        }
        (StorageKind::Complex(type_id), JsonValue::String(s)) => {
            factory.check(type_id.as_str(), s)?;
            PropertyValue::Complex {
                type_id: type_id.clone(),
                stored: s.clone(),
            }
        }
        _ => return Err(invalid(name, kind, json)),
    };

    Ok(Some(value))
}

fn json_natural(name: &str, json: &JsonValue) -> DomainResult<Option<PropertyValue>> {
    let value = match json {
        JsonValue::Null => return Ok(None),
        JsonValue::String(s) => PropertyValue::String(s.clone()),
        JsonValue::Bool(b) => PropertyValue::Boolean(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => PropertyValue::Integer(i),
            None => PropertyValue::Float(n.as_f64().unwrap_or_default()),
        },
        other => {
            return Err(DomainError::validation(format!(
                "property '{name}': undeclared property holds unsupported JSON {other}"
            )));
        }
    };
    Ok(Some(value))
}
