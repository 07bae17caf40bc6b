use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
};

use super::body::WebhookEvent;
use crate::types::{EventId, ProviderId};

#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Malformed webhook body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Webhook from unexpected provider '{0}'")]
    UnexpectedProvider(ProviderId),
}

/// Outcome of receiving a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// First delivery of this event id. Handle it.
    Fresh(WebhookEvent),
    /// A redelivery of an event already accepted. Acknowledge it and do nothing else.
    Duplicate(EventId),
}

#[derive(Debug, Default)]
struct SeenWindow {
    ids: HashSet<EventId>,
    order: VecDeque<EventId>,
}

/// Client-side webhook intake: parses bodies and drops redeliveries by `eventId`.
///
/// Delivery is at least once, so the same event may arrive several times. The consumer
/// remembers the last `capacity` event ids it accepted.
#[derive(Debug)]
pub struct WebhookConsumer {
    capacity: usize,
    provider: Option<ProviderId>,
    seen: Mutex<SeenWindow>,
}

impl WebhookConsumer {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        WebhookConsumer::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WebhookConsumer {
            capacity: capacity.max(1),
            provider: None,
            seen: Mutex::new(SeenWindow::default()),
        }
    }

    /// Only accept webhooks sent by `provider`.
    pub fn expect_provider(mut self, provider: impl Into<ProviderId>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Parse a raw webhook body and deduplicate it.
    ///
    /// Bodies with an unknown `eventType`, or whose payload does not match it, are rejected.
    pub fn receive(&self, body: &[u8]) -> Result<Received, ConsumerError> {
        let event: WebhookEvent = serde_json::from_slice(body)?;
        self.accept(event)
    }

    pub fn accept(&self, event: WebhookEvent) -> Result<Received, ConsumerError> {
        if let Some(expected) = &self.provider {
            if event.provider() != expected {
                return Err(ConsumerError::UnexpectedProvider(event.provider().clone()));
            }
        }

        let id = event.event_id().clone();
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if seen.ids.contains(&id) {
            #[cfg(feature = "tracing")]
            tracing::debug!("Dropping duplicate webhook '{id}'");
            return Ok(Received::Duplicate(id));
        }

        if seen.order.len() >= self.capacity {
            if let Some(oldest) = seen.order.pop_front() {
                seen.ids.remove(&oldest);
            }
        }
        seen.ids.insert(id.clone());
        seen.order.push_back(id);

        Ok(Received::Fresh(event))
    }

    /// Forget an accepted event so a redelivery is handled again, e.g. after the handler failed.
    pub fn forget(&self, event_id: &EventId) {
        let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if seen.ids.remove(event_id) {
            seen.order.retain(|id| id != event_id);
        }
    }
}

impl Default for WebhookConsumer {
    fn default() -> Self {
        WebhookConsumer::new()
    }
}
