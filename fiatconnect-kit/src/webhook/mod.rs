//! Webhook notifications: outbox, delivery and consumer-side deduplication.
//!
//! Lifecycle transitions publish an [`OutboxEntry`] through an [`EventPublisher`] while they
//! still hold the entity lock. [`WebhookDispatcher`] is the publisher used in production: it
//! stores the entry in an [`Outbox`] and delivers it in the background.
//!
//! On the receiving side, [`WebhookConsumer`] parses bodies and drops redeliveries.

use std::sync::Arc;

/// Webhook request bodies.
pub mod body {
    pub use fiatconnect_core::webhook::*;
}

mod consumer;
mod dispatcher;
#[cfg(feature = "http")]
mod http;
mod outbox;
mod transport;

pub use consumer::{ConsumerError, Received, WebhookConsumer};
pub use dispatcher::{DeadLetterReceiver, WebhookDispatcher, lane_for};
#[cfg(feature = "http")]
pub use http::HttpWebhookTransport;
pub use outbox::{DeadLetter, JournalOutbox, MemoryOutbox, Outbox, OutboxEntry, OutboxError};
pub use transport::{Subscriber, TransportError, WebhookTransport};

/// Accepts webhook events emitted by lifecycle transitions.
///
/// `publish` runs inside the transition's critical section: it must not block on delivery,
/// and an `Err` aborts the transition.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError>;
}

impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        (**self).publish(entry)
    }
}

/// Publishing straight into an outbox stores the event for a later
/// [`WebhookDispatcher::recover`].
impl EventPublisher for MemoryOutbox {
    fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        self.enqueue(&entry)
    }
}

impl EventPublisher for JournalOutbox {
    fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        self.enqueue(&entry)
    }
}
