//! Committed changes as delivered to subscribers.

use serde::{Deserialize, Serialize};

use crate::event::ChangeEvent;

/// A committed change tagged with the physical stream it was appended to.
///
/// This is the unit delivered to subscribers after a successful append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedChange {
    stream_name: String,
    event: ChangeEvent,
}

impl PublishedChange {
    pub fn new(stream_name: impl Into<String>, event: ChangeEvent) -> Self {
        Self {
            stream_name: stream_name.into(),
            event,
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn event(&self) -> &ChangeEvent {
        &self.event
    }

    pub fn into_event(self) -> ChangeEvent {
        self.event
    }
}
