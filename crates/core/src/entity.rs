//! Generic entity representation and its command/query wrappers.
//!
//! A [`GenericEntity`] is a property bag plus the schema metadata describing it.
//! It is the only shape a backend ever sees, which lets one store
//! implementation persist any DTO, read model or aggregate.

use core::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateRoot, Persistable};
use crate::bag::PropertyBag;
use crate::convert::{FromProperty, IntoProperty};
use crate::error::{DomainError, DomainResult};
use crate::factory::DomainFactory;
use crate::id::EntityId;
use crate::schema::{SchemaMetadata, ID_PROPERTY};
use crate::value::{PropertyValue, StorageKind};

/// Property bag + schema metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericEntity {
    properties: PropertyBag,
    schema: SchemaMetadata,
}

impl GenericEntity {
    /// Entity carrying only the system properties.
    pub fn new() -> Self {
        Self {
            properties: PropertyBag::new(),
            schema: SchemaMetadata::system(),
        }
    }

    pub fn with_id(id: EntityId) -> Self {
        let mut entity = Self::new();
        entity.set_id(Some(id));
        entity
    }

    /// Assemble from a bag and schema; the system properties are always declared.
    pub fn from_parts(properties: PropertyBag, schema: SchemaMetadata) -> Self {
        let mut full = SchemaMetadata::system();
        full.merge(&schema);
        let mut properties_with_system = PropertyBag::new();
        for (name, value) in properties.iter() {
            properties_with_system.set(name, value.clone());
        }
        Self {
            properties: properties_with_system,
            schema: full,
        }
    }

    /// Query projection: `schema` is kept as given, so only the projected names
    /// are declared. The bag still carries the system properties.
    pub fn projected(properties: PropertyBag, schema: SchemaMetadata) -> Self {
        Self { properties, schema }
    }

    /// Capture every declared property of a typed object.
    pub fn from_typed<T: Persistable>(value: &T) -> Self {
        value.dehydrate()
    }

    /// Build an entity holding only the properties of `new_properties` that the
    /// schema reference declares. Identity is always retained.
    pub fn from_filtered(new_properties: &GenericEntity, schema_reference: &SchemaMetadata) -> Self {
        let mut filtered = Self::new();
        filtered.set_id(new_properties.id());

        for (name, value) in new_properties.properties.iter() {
            if name == ID_PROPERTY || !schema_reference.contains(name) {
                continue;
            }
            filtered.properties.set(name, value.clone());
            let kind = value
                .as_ref()
                .map(PropertyValue::kind)
                .or_else(|| new_properties.schema.kind_of(name).cloned())
                .or_else(|| schema_reference.kind_of(name).cloned());
            if let Some(kind) = kind {
                filtered.schema.declare(name, kind);
            }
        }

        filtered
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    pub fn schema(&self) -> &SchemaMetadata {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut SchemaMetadata {
        &mut self.schema
    }

    pub fn into_parts(self) -> (PropertyBag, SchemaMetadata) {
        (self.properties, self.schema)
    }

    pub fn id(&self) -> Option<EntityId> {
        self.properties.id()
    }

    pub fn set_id(&mut self, id: Option<EntityId>) {
        self.properties.set_id(id);
    }

    pub fn is_deleted(&self) -> bool {
        self.properties.is_deleted()
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.properties.set_deleted(deleted);
    }

    pub fn last_persisted(&self) -> Option<DateTime<Utc>> {
        self.properties.last_persisted()
    }

    pub fn set_last_persisted(&mut self, at: DateTime<Utc>) {
        self.properties.set_last_persisted(at);
    }

    /// Upsert a typed property; the declared kind follows the value written.
    pub fn add<T: IntoProperty + ?Sized>(&mut self, name: impl Into<String>, value: &T) {
        let name = name.into();
        let value = value.to_property();
        let kind = value
            .as_ref()
            .map(PropertyValue::kind)
            .unwrap_or_else(T::storage_kind);
        self.schema.declare(name.clone(), kind);
        self.properties.set(name, value);
    }

    /// Builder form of [`add`](Self::add).
    pub fn with<T: IntoProperty + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.add(name, value);
        self
    }

    /// Upsert an untyped property.
    ///
    /// A null keeps whatever kind is already declared for the name.
    pub fn add_raw(&mut self, name: impl Into<String>, value: Option<PropertyValue>) {
        let name = name.into();
        if let Some(v) = &value {
            self.schema.declare(name.clone(), v.kind());
        }
        self.properties.set(name, value);
    }

    /// Declare a kind without touching the value.
    pub fn declare(&mut self, name: impl Into<String>, kind: StorageKind) {
        self.schema.declare(name, kind);
    }

    /// Required property: present and not null.
    pub fn get<T: FromProperty>(&self, name: &str, factory: &DomainFactory) -> DomainResult<T> {
        match self.properties.get(name) {
            Some(Some(value)) => T::from_property(value, factory).map_err(|e| in_property(name, e)),
            Some(None) => Err(DomainError::validation(format!(
                "required property '{name}' is null"
            ))),
            None => Err(DomainError::validation(format!(
                "required property '{name}' is missing"
            ))),
        }
    }

    /// Optional property: absent and null both read as `None`.
    pub fn optional<T: FromProperty>(
        &self,
        name: &str,
        factory: &DomainFactory,
    ) -> DomainResult<Option<T>> {
        match self.properties.value(name) {
            Some(value) => T::from_property(value, factory)
                .map(Some)
                .map_err(|e| in_property(name, e)),
            None => Ok(None),
        }
    }

    /// Nullable property: must be present, may be null.
    pub fn nullable<T: FromProperty>(
        &self,
        name: &str,
        factory: &DomainFactory,
    ) -> DomainResult<Option<T>> {
        match self.properties.get(name) {
            Some(_) => self.optional(name, factory),
            None => Err(DomainError::validation(format!(
                "nullable property '{name}' is missing"
            ))),
        }
    }

    /// Optional nullable property: `None` when absent, `Some(None)` when null.
    pub fn optional_nullable<T: FromProperty>(
        &self,
        name: &str,
        factory: &DomainFactory,
    ) -> DomainResult<Option<Option<T>>> {
        match self.properties.get(name) {
            None => Ok(None),
            Some(None) => Ok(Some(None)),
            Some(Some(value)) => T::from_property(value, factory)
                .map(|v| Some(Some(v)))
                .map_err(|e| in_property(name, e)),
        }
    }

    /// Rebuild a typed object.
    pub fn reconstruct<T: Persistable>(&self, factory: &DomainFactory) -> DomainResult<T> {
        T::rehydrate(self, factory)
    }
}

impl Default for GenericEntity {
    fn default() -> Self {
        Self::new()
    }
}

fn in_property(name: &str, err: DomainError) -> DomainError {
    match err {
        DomainError::Validation(msg) => DomainError::validation(format!("property '{name}': {msg}")),
        other => other,
    }
}

/// Command-side entity: identity is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandEntity {
    id: EntityId,
    entity: GenericEntity,
}

impl CommandEntity {
    /// Dehydrate a domain aggregate. Fails if it has no identity.
    pub fn from_aggregate<A: AggregateRoot>(aggregate: &A) -> DomainResult<Self> {
        let entity = aggregate.dehydrate();
        let id = aggregate
            .id()
            .filter(|id| !id.is_blank())
            .cloned()
            .or_else(|| entity.id())
            .ok_or_else(|| {
                DomainError::validation(format!("cannot persist {} without an identity", A::TYPE_NAME))
            })?;
        Ok(Self::assemble(id, entity))
    }

    /// Dehydrate a plain DTO; a fresh object without identity receives one.
    pub fn from_typed<T: Persistable>(value: &T) -> Self {
        let entity = value.dehydrate();
        let id = entity.id().unwrap_or_default();
        Self::assemble(id, entity)
    }

    /// Wrap an existing generic entity. Fails if it has no identity.
    pub fn from_entity(entity: GenericEntity) -> DomainResult<Self> {
        let id = entity
            .id()
            .ok_or_else(|| DomainError::validation("command entity requires an identity"))?;
        Ok(Self::assemble(id, entity))
    }

    /// Constrain an update payload to the shape of a schema reference.
    pub fn from_filtered(
        new_properties: &GenericEntity,
        schema_reference: &SchemaMetadata,
    ) -> DomainResult<Self> {
        Self::from_entity(GenericEntity::from_filtered(new_properties, schema_reference))
    }

    fn assemble(id: EntityId, mut entity: GenericEntity) -> Self {
        entity.set_id(Some(id.clone()));
        Self { id, entity }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn into_entity(self) -> GenericEntity {
        self.entity
    }
}

impl Deref for CommandEntity {
    type Target = GenericEntity;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

/// Query-side entity: identity is optional until hydrated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryEntity {
    entity: GenericEntity,
}

impl QueryEntity {
    pub fn from_typed<T: Persistable>(value: &T) -> Self {
        Self {
            entity: value.dehydrate(),
        }
    }

    pub fn from_entity(entity: GenericEntity) -> Self {
        Self { entity }
    }

    pub fn from_filtered(new_properties: &GenericEntity, schema_reference: &SchemaMetadata) -> Self {
        Self::from_entity(GenericEntity::from_filtered(new_properties, schema_reference))
    }

    pub fn id(&self) -> Option<EntityId> {
        self.entity.id()
    }

    pub fn into_entity(self) -> GenericEntity {
        self.entity
    }
}

impl Deref for QueryEntity {
    type Target = GenericEntity;

    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl DerefMut for QueryEntity {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_object::ValueObject;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Email(String);

    impl ValueObject for Email {
        const TYPE_ID: &'static str = "contact.email";

        fn to_stored(&self) -> String {
            self.0.clone()
        }

        fn from_stored(raw: &str) -> DomainResult<Self> {
            if !raw.contains('@') {
                return Err(DomainError::validation("email must contain '@'"));
            }
            Ok(Self(raw.to_string()))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct CustomerAggregate {
        id: Option<EntityId>,
        name: String,
        email: Email,
        nickname: Option<String>,
        credit_limit: i64,
    }

    impl Persistable for CustomerAggregate {
        const TYPE_NAME: &'static str = "CustomerAggregate";

        fn dehydrate(&self) -> GenericEntity {
            let mut entity = GenericEntity::new();
            entity.set_id(self.id.clone());
            entity
                .with("Name", &self.name)
                .with("Email", &self.email)
                .with("Nickname", &self.nickname)
                .with("CreditLimit", &self.credit_limit)
        }

        fn rehydrate(entity: &GenericEntity, factory: &DomainFactory) -> DomainResult<Self> {
            Ok(Self {
                id: entity.id(),
                name: entity.get("Name", factory)?,
                email: entity.get("Email", factory)?,
                nickname: entity.optional("Nickname", factory)?,
                credit_limit: entity.get("CreditLimit", factory)?,
            })
        }
    }

    impl AggregateRoot for CustomerAggregate {
        fn id(&self) -> Option<&EntityId> {
            self.id.as_ref()
        }
    }

    fn factory() -> DomainFactory {
        DomainFactory::new().register::<Email>()
    }

    fn customer() -> CustomerAggregate {
        CustomerAggregate {
            id: Some(EntityId::from("c-1")),
            name: "Ada".to_string(),
            email: Email("ada@example.com".to_string()),
            nickname: None,
            credit_limit: 500,
        }
    }

    #[test]
    fn aggregate_round_trips_through_command_entity() {
        let original = customer();
        let command = CommandEntity::from_aggregate(&original).unwrap();
        assert_eq!(command.id().as_str(), "c-1");

        let rebuilt: CustomerAggregate = command.reconstruct(&factory()).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn aggregate_without_identity_is_rejected() {
        let mut c = customer();
        c.id = Some(EntityId::from(""));
        let err = CommandEntity::from_aggregate(&c).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn dto_without_identity_receives_one() {
        let mut c = customer();
        c.id = None;
        let command = CommandEntity::from_typed(&c);
        assert!(!command.id().is_blank());
        assert_eq!(command.id(), &command.entity.id().unwrap());
    }

    #[test]
    fn unregistered_value_object_fails_reconstruction() {
        let command = CommandEntity::from_aggregate(&customer()).unwrap();
        let err = command
            .reconstruct::<CustomerAggregate>(&DomainFactory::new())
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("contact.email")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn null_values_still_declare_their_kind() {
        let entity = customer().dehydrate();
        assert_eq!(entity.schema().kind_of("Nickname"), Some(&StorageKind::String));
        assert_eq!(
            entity.schema().kind_of("Email"),
            Some(&StorageKind::Complex("contact.email".into()))
        );
    }

    #[test]
    fn last_writer_defines_kind() {
        let mut entity = GenericEntity::new().with("Code", &42i64);
        entity.add("Code", "A-42");
        assert_eq!(entity.schema().kind_of("Code"), Some(&StorageKind::String));
        entity.add_raw("Code", None);
        assert_eq!(entity.schema().kind_of("Code"), Some(&StorageKind::String));
    }

    #[test]
    fn optionality_shapes() {
        let f = DomainFactory::new();
        let mut entity = GenericEntity::new().with("Present", &7i64);
        entity.add_raw("Null", None);

        assert_eq!(entity.get::<i64>("Present", &f).unwrap(), 7);
        assert!(entity.get::<i64>("Null", &f).is_err());
        assert!(entity.get::<i64>("Absent", &f).is_err());

        assert_eq!(entity.optional::<i64>("Absent", &f).unwrap(), None);
        assert_eq!(entity.optional::<i64>("Null", &f).unwrap(), None);

        assert_eq!(entity.nullable::<i64>("Null", &f).unwrap(), None);
        assert!(entity.nullable::<i64>("Absent", &f).is_err());

        assert_eq!(entity.optional_nullable::<i64>("Absent", &f).unwrap(), None);
        assert_eq!(entity.optional_nullable::<i64>("Null", &f).unwrap(), Some(None));
        assert_eq!(entity.optional_nullable::<i64>("Present", &f).unwrap(), Some(Some(7)));
    }

    #[test]
    fn type_mismatch_names_the_property() {
        let entity = GenericEntity::new().with("Age", "old");
        let err = entity.get::<i64>("Age", &DomainFactory::new()).unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("'Age'")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn filtered_entity_keeps_declared_names_and_identity() {
        let reference = SchemaMetadata::new().with("Name", StorageKind::String);
        let update = customer().dehydrate();

        let filtered = CommandEntity::from_filtered(&update, &reference).unwrap();
        assert_eq!(filtered.id().as_str(), "c-1");
        assert!(filtered.properties().contains("Name"));
        assert!(!filtered.properties().contains("Email"));
        assert!(!filtered.properties().contains("CreditLimit"));
    }

    #[test]
    fn filtered_entity_can_use_another_entity_as_reference() {
        let reference = GenericEntity::new().with("CreditLimit", &0i64);
        let filtered = QueryEntity::from_filtered(&customer().dehydrate(), reference.schema());
        assert_eq!(filtered.id(), Some(EntityId::from("c-1")));
        assert_eq!(
            filtered.get::<i64>("CreditLimit", &DomainFactory::new()).unwrap(),
            500
        );
        assert!(!filtered.properties().contains("Name"));
    }
}
