//! Change notification (mechanics only).
//!
//! After a successful append the event-sourced store hands the committed
//! changes to every registered subscriber, in registration order.
//!
//! ## Delivery
//!
//! - **After commit**: subscribers only ever see changes that are already stored
//! - **Isolated**: a subscriber that fails (or panics) is logged and skipped; the
//!   remaining subscribers still run and the save still succeeds
//! - **Synchronous**: `notify` returns once every subscriber has been called
//!
//! Subscribers must be idempotent. The event store is the source of truth and
//! a consumer that missed a batch can rebuild from it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crate::envelope::PublishedChange;

/// Receives committed changes.
pub trait ChangeSubscriber: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn on_changes(&self, changes: &[PublishedChange]) -> anyhow::Result<()>;
}

impl<S> ChangeSubscriber for Arc<S>
where
    S: ChangeSubscriber + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn on_changes(&self, changes: &[PublishedChange]) -> anyhow::Result<()> {
        (**self).on_changes(changes)
    }
}

/// Outcome of one notification round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: usize,
    /// Names of subscribers that returned an error or panicked.
    pub failed: Vec<String>,
}

impl NotifyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Ordered list of subscribers with failure isolation.
#[derive(Clone, Default)]
pub struct SubscriberList {
    subscribers: Vec<Arc<dyn ChangeSubscriber>>,
}

impl core::fmt::Debug for SubscriberList {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.subscribers.iter().map(|s| s.name().to_string()))
            .finish()
    }
}

impl SubscriberList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn ChangeSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn with(mut self, subscriber: Arc<dyn ChangeSubscriber>) -> Self {
        self.subscribe(subscriber);
        self
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `changes` to every subscriber in order.
    ///
    /// Never fails: errors and panics are logged and reported, not propagated.
    pub fn notify(&self, changes: &[PublishedChange]) -> NotifyReport {
        let mut report = NotifyReport::default();
        if changes.is_empty() {
            return report;
        }

        for subscriber in &self.subscribers {
            let name = subscriber.name();
            match catch_unwind(AssertUnwindSafe(|| subscriber.on_changes(changes))) {
                Ok(Ok(())) => {
                    report.delivered += 1;
                    tracing::debug!(subscriber = name, changes = changes.len(), "changes delivered");
                }
                Ok(Err(e)) => {
                    tracing::warn!(subscriber = name, error = %e, "subscriber failed; continuing");
                    report.failed.push(name.to_string());
                }
                Err(_) => {
                    tracing::error!(subscriber = name, "subscriber panicked; continuing");
                    report.failed.push(name.to_string());
                }
            }
        }

        report
    }
}

/// A subscription to a channel fed by [`ChannelSubscriber`](crate::ChannelSubscriber).
///
/// ```ignore
/// let feed = ChannelSubscriber::new("audit");
/// let subscription = feed.subscribe();
///
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)) {
///         Ok(change) => process(change)?,
///         Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
///         Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
///
/// Intended for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}
