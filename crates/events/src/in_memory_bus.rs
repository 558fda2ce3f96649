//! Channel fan-out subscriber for tests/dev.

use std::sync::{Mutex, mpsc};

use crate::bus::{ChangeSubscriber, Subscription};
use crate::envelope::PublishedChange;

/// Forwards every committed change to each open [`Subscription`].
///
/// - No IO / no async
/// - Best-effort fan-out
/// - Closed subscriptions are dropped on the next delivery
#[derive(Debug)]
pub struct ChannelSubscriber {
    name: String,
    senders: Mutex<Vec<mpsc::Sender<PublishedChange>>>,
}

impl ChannelSubscriber {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription<PublishedChange> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just stays silent.
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }

        Subscription::new(rx)
    }
}

impl ChangeSubscriber for ChannelSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_changes(&self, changes: &[PublishedChange]) -> anyhow::Result<()> {
        let mut senders = self
            .senders
            .lock()
            .map_err(|_| anyhow::anyhow!("channel subscriber '{}' lock poisoned", self.name))?;

        for change in changes {
            senders.retain(|tx| tx.send(change.clone()).is_ok());
        }

        Ok(())
    }
}
