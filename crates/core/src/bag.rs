//! Property bag: the dehydrated form of any entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EntityId;
use crate::schema::{is_system_property, ID_PROPERTY, IS_DELETED_PROPERTY, LAST_PERSISTED_PROPERTY};
use crate::value::PropertyValue;

/// Name → optional value map.
///
/// A key mapped to `None` is an explicit null; an absent key was never set.
/// The system properties are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    values: BTreeMap<String, Option<PropertyValue>>,
}

impl PropertyBag {
    /// Bag with the system properties only (not deleted, never persisted).
    pub fn new() -> Self {
        let mut values = BTreeMap::new();
        values.insert(ID_PROPERTY.to_string(), None);
        values.insert(IS_DELETED_PROPERTY.to_string(), Some(PropertyValue::Boolean(false)));
        values.insert(LAST_PERSISTED_PROPERTY.to_string(), None);
        Self { values }
    }

    pub fn with_id(id: EntityId) -> Self {
        let mut bag = Self::new();
        bag.set_id(Some(id));
        bag
    }

    pub fn get(&self, name: &str) -> Option<&Option<PropertyValue>> {
        self.values.get(name)
    }

    /// Value of a property, flattening absent and null.
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Upsert a property.
    pub fn set(&mut self, name: impl Into<String>, value: Option<PropertyValue>) {
        self.values.insert(name.into(), value);
    }

    /// Remove a non-system property.
    pub fn remove(&mut self, name: &str) -> Option<Option<PropertyValue>> {
        if is_system_property(name) {
            return None;
        }
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Option<PropertyValue>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Identity, if present and not blank.
    pub fn id(&self) -> Option<EntityId> {
        match self.value(ID_PROPERTY) {
            Some(PropertyValue::String(s)) if !s.trim().is_empty() => Some(EntityId::from(s.as_str())),
            Some(PropertyValue::Guid(g)) => Some(EntityId::from_uuid(*g)),
            _ => None,
        }
    }

    pub fn set_id(&mut self, id: Option<EntityId>) {
        self.set(ID_PROPERTY, id.map(|id| PropertyValue::String(id.into())));
    }

    pub fn is_deleted(&self) -> bool {
        self.value(IS_DELETED_PROPERTY)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(false)
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.set(IS_DELETED_PROPERTY, Some(PropertyValue::Boolean(deleted)));
    }

    pub fn last_persisted(&self) -> Option<DateTime<Utc>> {
        self.value(LAST_PERSISTED_PROPERTY)
            .and_then(PropertyValue::as_timestamp)
    }

    pub fn set_last_persisted(&mut self, at: DateTime<Utc>) {
        self.set(LAST_PERSISTED_PROPERTY, Some(PropertyValue::Timestamp(at)));
    }

    /// Field-level merge of an incoming partial update onto this (persisted) bag.
    ///
    /// Every non-system property the incoming bag carries with a value replaces
    /// the persisted one. Properties the incoming bag does not carry, or carries
    /// as null, keep their persisted value. Identity, the soft-delete flag and
    /// the persistence timestamp are owned by the store and never overlaid.
    pub fn overlay(&mut self, incoming: &PropertyBag) {
        for (name, value) in incoming.iter() {
            if is_system_property(name) {
                continue;
            }
            if let Some(value) = value {
                self.values.insert(name.to_string(), Some(value.clone()));
            }
        }
    }

    /// Keep the system properties plus names accepted by `keep`.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.values
            .retain(|name, _| is_system_property(name) || keep(name));
    }
}

impl Default for PropertyBag {
    fn default() -> Self {
        Self::new()
    }
}
