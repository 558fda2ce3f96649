//! Change events for event-sourced aggregates.
//!
//! - `event`: the persisted change record and the typed-event trait
//! - `buffer` / `aggregate`: uncommitted changes and the event-sourced contract
//! - `migration`: read-time upcasting by type tag
//! - `bus` / `in_memory_bus`: post-commit notification of subscribers

pub mod aggregate;
pub mod buffer;
pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod migration;

pub use aggregate::EventSourced;
pub use buffer::ChangeBuffer;
pub use bus::{ChangeSubscriber, NotifyReport, SubscriberList, Subscription};
pub use envelope::PublishedChange;
pub use event::{ChangeEvent, DomainEvent, STREAM_DELETED_EVENT, STREAM_DELETED_TAG};
pub use in_memory_bus::ChannelSubscriber;
pub use migration::{EventMigrator, NoMigration, Upcasters};
