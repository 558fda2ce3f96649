//! `strata-core` — persistence building blocks.
//!
//! This crate contains the storage-neutral primitives (no IO): the error
//! taxonomy, the event stream version tracker and the generic entity
//! representation every store persists.

pub mod aggregate;
pub mod bag;
pub mod convert;
pub mod entity;
pub mod error;
pub mod factory;
pub mod id;
pub mod marshal;
pub mod naming;
pub mod schema;
pub mod stream;
pub mod value;
pub mod value_object;

pub use aggregate::{AggregateRoot, Persistable};
pub use bag::PropertyBag;
pub use convert::{FromProperty, IntoProperty};
pub use entity::{CommandEntity, GenericEntity, QueryEntity};
pub use error::{DomainError, DomainResult};
pub use factory::DomainFactory;
pub use id::EntityId;
pub use naming::container_name;
pub use schema::{
    SchemaMetadata, ID_PROPERTY, IS_DELETED_PROPERTY, LAST_PERSISTED_PROPERTY, SYSTEM_PROPERTIES,
};
pub use stream::{EventStream, NO_VERSION};
pub use value::{PropertyValue, StorageKind, ValueTypeId};
pub use value_object::ValueObject;
