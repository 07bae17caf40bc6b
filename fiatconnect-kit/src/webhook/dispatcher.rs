use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::{Arc, Mutex, RwLock},
};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use super::{
    EventPublisher,
    outbox::{DeadLetter, Outbox, OutboxEntry, OutboxError},
    transport::{Subscriber, WebhookTransport},
};
use crate::config::DispatcherConfig;

/// Receives every event that could not be delivered.
pub type DeadLetterReceiver = UnboundedReceiver<DeadLetter>;

/// Delivers outbox entries to subscribers, at least once.
///
/// Entries are routed to a fixed number of lanes by entity key. A lane delivers one entry at a
/// time, retrying transient failures with exponential backoff, so the events of one entity
/// reach each subscriber in enqueue order. An entry is acknowledged in the outbox once every
/// interested subscriber accepted it; a permanent failure is recorded as a dead letter in the
/// outbox and sent on the [`DeadLetterReceiver`].
pub struct WebhookDispatcher<O: Outbox> {
    outbox: Arc<O>,
    lanes: RwLock<Vec<UnboundedSender<OutboxEntry>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<O: Outbox> std::fmt::Debug for WebhookDispatcher<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lanes = self.lanes.read().map(|l| l.len()).unwrap_or_default();
        f.debug_struct("WebhookDispatcher")
            .field("lanes", &lanes)
            .finish_non_exhaustive()
    }
}

impl<O: Outbox> WebhookDispatcher<O> {
    /// Spawn the delivery lanes on the current tokio runtime.
    ///
    /// Entries already pending in `outbox` are not delivered until [`WebhookDispatcher::recover`]
    /// is called.
    pub fn start<T: WebhookTransport>(
        config: DispatcherConfig,
        outbox: Arc<O>,
        transport: Arc<T>,
        subscribers: Vec<Subscriber>,
    ) -> (Self, DeadLetterReceiver) {
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        let config = Arc::new(config);
        let subscribers: Arc<[Subscriber]> = subscribers.into();

        let mut lanes = Vec::new();
        let mut workers = Vec::new();
        for id in 0..config.lanes.max(1) {
            let (tx, rx) = mpsc::unbounded_channel();
            let lane = Lane {
                id,
                config: config.clone(),
                outbox: outbox.clone(),
                transport: transport.clone(),
                subscribers: subscribers.clone(),
                dead_letters: dead_tx.clone(),
            };
            workers.push(tokio::spawn(lane.run(rx)));
            lanes.push(tx);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Webhook dispatcher started: lanes={} subscribers={}",
            lanes.len(),
            subscribers.len()
        );

        let dispatcher = WebhookDispatcher {
            outbox,
            lanes: RwLock::new(lanes),
            workers: Mutex::new(workers),
        };
        (dispatcher, dead_rx)
    }

    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    /// Store `entry` in the outbox and schedule it for delivery.
    ///
    /// Returns once the entry is stored; delivery happens in the background. Fails with
    /// [`OutboxError::Closed`] after [`WebhookDispatcher::shutdown`], without storing anything.
    pub fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        let lanes = self.lanes.read().map_err(|_| OutboxError::Poisoned)?;
        if lanes.is_empty() {
            return Err(OutboxError::Closed);
        }
        self.outbox.enqueue(&entry)?;
        route(&lanes, entry);
        Ok(())
    }

    /// Reschedule every entry still pending in the outbox, in enqueue order.
    ///
    /// Call once after a restart. Entries that were in flight when the process stopped are
    /// delivered again; consumers deduplicate them by event id.
    pub fn recover(&self) -> Result<usize, OutboxError> {
        let lanes = self.lanes.read().map_err(|_| OutboxError::Poisoned)?;
        if lanes.is_empty() {
            return Err(OutboxError::Closed);
        }

        let pending = self.outbox.pending()?;
        let count = pending.len();
        for entry in pending {
            route(&lanes, entry);
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Recovered {count} pending webhook events");

        Ok(count)
    }

    /// Stop accepting events and wait until every lane has drained.
    pub async fn shutdown(&self) {
        let lanes = match self.lanes.write() {
            Ok(mut lanes) => std::mem::take(&mut *lanes),
            Err(_) => return,
        };
        drop(lanes);

        let workers = match self.workers.lock() {
            Ok(mut workers) => std::mem::take(&mut *workers),
            Err(_) => return,
        };
        for worker in workers {
            if let Err(_err) = worker.await {
                #[cfg(feature = "tracing")]
                tracing::error!("Webhook lane terminated abnormally: {_err}");
            }
        }
    }
}

impl<O: Outbox> EventPublisher for WebhookDispatcher<O> {
    fn publish(&self, entry: OutboxEntry) -> Result<(), OutboxError> {
        WebhookDispatcher::publish(self, entry)
    }
}

/// The lane owning `entity_key`.
pub fn lane_for(entity_key: &str, lanes: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    entity_key.hash(&mut hasher);
    (hasher.finish() % lanes.max(1) as u64) as usize
}

fn route(lanes: &[UnboundedSender<OutboxEntry>], entry: OutboxEntry) {
    let lane = lane_for(&entry.entity_key, lanes.len());
    if let Err(_err) = lanes[lane].send(entry) {
        // The entry stays pending in the outbox and is picked up by the next recovery.
        #[cfg(feature = "tracing")]
        tracing::error!(
            "Webhook lane {lane} is gone; event '{}' left pending",
            _err.0.event_id()
        );
    }
}

struct Lane<O, T> {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    id: usize,
    config: Arc<DispatcherConfig>,
    outbox: Arc<O>,
    transport: Arc<T>,
    subscribers: Arc<[Subscriber]>,
    dead_letters: UnboundedSender<DeadLetter>,
}

impl<O: Outbox, T: WebhookTransport> Lane<O, T> {
    async fn run(self, mut rx: UnboundedReceiver<OutboxEntry>) {
        while let Some(entry) = rx.recv().await {
            self.process(entry).await;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Webhook lane {} stopped", self.id);
    }

    async fn process(&self, entry: OutboxEntry) {
        let event_type = entry.event.event_type();
        let mut delivered = true;

        for subscriber in self.subscribers.iter().filter(|s| s.accepts(event_type)) {
            let Err(letter) = self.deliver(subscriber, &entry).await else {
                continue;
            };
            delivered = false;

            #[cfg(feature = "tracing")]
            tracing::error!(
                lane = self.id,
                event_id = %entry.event_id(),
                subscriber = %subscriber.id,
                attempts = letter.attempts,
                "Webhook dead-lettered: {}",
                letter.reason
            );

            if let Err(_err) = self.outbox.dead_letter(&letter) {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to record dead letter: {_err}");
            }
            let _ = self.dead_letters.send(letter);
        }

        if delivered {
            if let Err(_err) = self.outbox.acknowledge(entry.event_id()) {
                #[cfg(feature = "tracing")]
                tracing::error!(
                    "Failed to acknowledge webhook '{}': {_err}",
                    entry.event_id()
                );
            }
        }
    }

    async fn deliver(&self, subscriber: &Subscriber, entry: &OutboxEntry) -> Result<(), DeadLetter> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.deliver(subscriber, &entry.event).await {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "Webhook delivered: event_id='{}' subscriber='{}' attempt={attempt}",
                        entry.event_id(),
                        subscriber.id
                    );
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.config.backoff(attempt);

                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Webhook delivery failed, retrying in {delay:?}: event_id='{}' subscriber='{}' attempt={attempt}: {err}",
                        entry.event_id(),
                        subscriber.id
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(DeadLetter {
                        entry: entry.clone(),
                        subscriber: subscriber.id.clone(),
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }
}
