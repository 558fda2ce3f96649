//! Persistence contracts for DTOs, read models and aggregate roots.

use crate::entity::GenericEntity;
use crate::error::DomainResult;
use crate::factory::DomainFactory;
use crate::id::EntityId;
use crate::naming;
use crate::schema::SchemaMetadata;

/// A type that can be dehydrated into, and rebuilt from, a generic entity.
///
/// This replaces runtime reflection: every persisted shape spells out its own
/// properties once, in `dehydrate`, and reads them back in `rehydrate` through
/// the typed accessors on [`GenericEntity`].
pub trait Persistable: Sized {
    /// Type name the container name is derived from.
    const TYPE_NAME: &'static str;

    /// Full declared schema of the type.
    ///
    /// Used as the fallback ordering source and to materialize query results.
    /// Defaults to the system properties only.
    fn schema() -> SchemaMetadata {
        SchemaMetadata::system()
    }

    fn dehydrate(&self) -> GenericEntity;

    fn rehydrate(entity: &GenericEntity, factory: &DomainFactory) -> DomainResult<Self>;

    /// Container name with the well-known suffixes stripped.
    fn container_name() -> String {
        naming::container_name(Self::TYPE_NAME, None)
    }
}

/// Aggregate root: the consistency boundary and unit of persistence.
///
/// Unlike a plain DTO, an aggregate never receives an identity from the store;
/// writing one without an identity is rejected.
pub trait AggregateRoot: Persistable {
    fn id(&self) -> Option<&EntityId>;
}
