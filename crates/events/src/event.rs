//! Persisted change records and the typed domain-event contract.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use strata_core::{DomainError, DomainResult};

/// Type tag of the terminal marker appended when a stream is logically deleted.
pub const STREAM_DELETED_TAG: &str = "$stream-deleted";

/// Event type name of the tombstone marker.
pub const STREAM_DELETED_EVENT: &str = "StreamDeleted";

/// A typed domain event raised by an aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **tagged** (`type_tag` drives migration dispatch)
/// - designed to be **append-only**
pub trait DomainEvent: Serialize {
    /// Stable event name (e.g. "OrderPlaced").
    fn event_type(&self) -> &'static str;

    /// Schema tag of the payload (e.g. "order.placed.v2").
    ///
    /// Old tags are upgraded by an [`EventMigrator`](crate::EventMigrator)
    /// before the event reaches the aggregate.
    fn type_tag(&self) -> &'static str;
}

/// A persisted (or about-to-be-persisted) change of one aggregate.
///
/// Wire shape: `{id, entityType, eventType, payload, typeTag, version, persistedAtUtc}`.
/// Owned by the event-store boundary and read-only once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub id: Uuid,
    pub entity_type: String,
    pub event_type: String,
    pub payload: JsonValue,
    pub type_tag: String,
    /// Position in the aggregate stream; always > 0 once persisted.
    pub version: i64,
    pub persisted_at_utc: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(
        entity_type: impl Into<String>,
        event_type: impl Into<String>,
        type_tag: impl Into<String>,
        payload: JsonValue,
        version: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            entity_type: entity_type.into(),
            event_type: event_type.into(),
            payload,
            type_tag: type_tag.into(),
            version,
            persisted_at_utc: Utc::now(),
        }
    }

    /// Serialize a typed domain event into a change at `version`.
    pub fn from_typed<E: DomainEvent>(
        entity_type: impl Into<String>,
        version: i64,
        event: &E,
    ) -> DomainResult<Self> {
        let payload = serde_json::to_value(event).map_err(|e| {
            DomainError::validation(format!(
                "payload serialization failed for {}: {e}",
                event.event_type()
            ))
        })?;
        Ok(Self::new(
            entity_type,
            event.event_type(),
            event.type_tag(),
            payload,
            version,
        ))
    }

    /// Terminal marker for a logically deleted stream.
    pub fn tombstone(entity_type: impl Into<String>, version: i64) -> Self {
        Self::new(
            entity_type,
            STREAM_DELETED_EVENT,
            STREAM_DELETED_TAG,
            JsonValue::Null,
            version,
        )
    }

    pub fn is_tombstone(&self) -> bool {
        self.type_tag == STREAM_DELETED_TAG
    }

    /// Deserialize the payload into a typed event.
    pub fn decode<E: DeserializeOwned>(&self) -> DomainResult<E> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::validation(format!(
                "cannot decode {} ({}) payload: {e}",
                self.event_type, self.type_tag
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Renamed {
        name: String,
    }

    impl DomainEvent for Renamed {
        fn event_type(&self) -> &'static str {
            "Renamed"
        }

        fn type_tag(&self) -> &'static str {
            "customer.renamed.v1"
        }
    }

    #[test]
    fn typed_event_round_trips_through_payload() {
        let ev = Renamed { name: "Ada".into() };
        let change = ChangeEvent::from_typed("Customer", 3, &ev).unwrap();
        assert_eq!(change.version, 3);
        assert_eq!(change.type_tag, "customer.renamed.v1");
        assert_eq!(change.decode::<Renamed>().unwrap(), ev);
        assert!(!change.is_tombstone());
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let change = ChangeEvent::tombstone("Customer", 4);
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["typeTag"], STREAM_DELETED_TAG);
        assert_eq!(json["entityType"], "Customer");
        assert!(json.get("persistedAtUtc").is_some());
        assert!(change.is_tombstone());
    }
}
