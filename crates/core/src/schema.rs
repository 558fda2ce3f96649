//! Schema metadata: property name → storage kind.

use serde::{Deserialize, Serialize};

use crate::value::StorageKind;

/// Identity property present on every generic entity.
pub const ID_PROPERTY: &str = "Id";
/// Soft-delete flag present on every generic entity.
pub const IS_DELETED_PROPERTY: &str = "IsDeleted";
/// Timestamp of the last successful write, present on every generic entity.
pub const LAST_PERSISTED_PROPERTY: &str = "LastPersistedUtc";

/// Names of the three system properties.
pub const SYSTEM_PROPERTIES: [&str; 3] = [ID_PROPERTY, IS_DELETED_PROPERTY, LAST_PERSISTED_PROPERTY];

pub fn is_system_property(name: &str) -> bool {
    SYSTEM_PROPERTIES.contains(&name)
}

/// Declared storage kinds of an entity's properties, in declaration order.
///
/// Mutable by design of the data it describes: redeclaring a property replaces its
/// kind in place, so heterogeneous rows of one container converge on whatever
/// kind was written last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    properties: Vec<(String, StorageKind)>,
}

impl SchemaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema with only the system properties declared.
    pub fn system() -> Self {
        Self::new()
            .with(ID_PROPERTY, StorageKind::String)
            .with(IS_DELETED_PROPERTY, StorageKind::Boolean)
            .with(LAST_PERSISTED_PROPERTY, StorageKind::Timestamp)
    }

    /// Builder form of [`declare`](Self::declare).
    pub fn with(mut self, name: impl Into<String>, kind: StorageKind) -> Self {
        self.declare(name, kind);
        self
    }

    /// Declare a property, updating its kind if already declared.
    pub fn declare(&mut self, name: impl Into<String>, kind: StorageKind) {
        let name = name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = kind,
            None => self.properties.push((name, kind)),
        }
    }

    pub fn kind_of(&self, name: &str) -> Option<&StorageKind> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, k)| k)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    /// Property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }

    /// First declared property, if any.
    pub fn first(&self) -> Option<&str> {
        self.properties.first().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StorageKind)> {
        self.properties.iter().map(|(n, k)| (n.as_str(), k))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Declare every property of `other` (its kinds win).
    pub fn merge(&mut self, other: &SchemaMetadata) {
        for (name, kind) in &other.properties {
            self.declare(name.clone(), kind.clone());
        }
    }

    /// Keep only the given names (declaration order preserved).
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.properties.retain(|(n, _)| keep(n));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redeclaring_updates_kind_in_place() {
        let mut schema = SchemaMetadata::new()
            .with("Name", StorageKind::String)
            .with("Age", StorageKind::Integer);
        schema.declare("Name", StorageKind::Bytes);

        assert_eq!(schema.kind_of("Name"), Some(&StorageKind::Bytes));
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["Name", "Age"]);
        assert_eq!(schema.first(), Some("Name"));
    }

    #[test]
    fn system_schema_declares_three_properties() {
        let schema = SchemaMetadata::system();
        assert_eq!(schema.len(), 3);
        assert!(SYSTEM_PROPERTIES.iter().all(|p| schema.contains(p)));
    }
}
