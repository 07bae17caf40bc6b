//! Durable queue of webhook events awaiting delivery.

use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::body::WebhookEvent;
use crate::types::EventId;

/// An event waiting in the outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    /// Key of the entity the event is about. Events sharing a key are delivered in order.
    pub entity_key: String,
    pub event: WebhookEvent,
    pub enqueued_at: DateTime<Utc>,
}

impl OutboxEntry {
    pub fn new(entity_key: impl Into<String>, event: WebhookEvent, enqueued_at: DateTime<Utc>) -> Self {
        OutboxEntry {
            entity_key: entity_key.into(),
            event,
            enqueued_at,
        }
    }

    pub fn event_id(&self) -> &EventId {
        self.event.event_id()
    }
}

/// An event that could not be delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub entry: OutboxEntry,
    pub subscriber: String,
    pub attempts: u32,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("Outbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Outbox encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Outbox lock poisoned")]
    Poisoned,

    #[error("Outbox is closed")]
    Closed,
}

/// Storage for undelivered events.
///
/// Implementations must be durable enough for their deployment: an entry that was enqueued
/// and not acknowledged is returned by [`Outbox::pending`], in enqueue order, until it is
/// acknowledged or dead-lettered.
pub trait Outbox: Send + Sync + 'static {
    /// Store `entry`. Enqueueing an event id that is already pending is a no-op.
    fn enqueue(&self, entry: &OutboxEntry) -> Result<(), OutboxError>;

    /// Mark an event as delivered to every subscriber.
    fn acknowledge(&self, event_id: &EventId) -> Result<(), OutboxError>;

    /// Record a permanent delivery failure. The event is no longer pending.
    fn dead_letter(&self, letter: &DeadLetter) -> Result<(), OutboxError>;

    fn pending(&self) -> Result<Vec<OutboxEntry>, OutboxError>;

    fn dead_letters(&self) -> Result<Vec<DeadLetter>, OutboxError>;
}

#[derive(Debug, Default)]
struct OutboxState {
    order: Vec<EventId>,
    pending: HashMap<EventId, OutboxEntry>,
    dead: Vec<DeadLetter>,
}

impl OutboxState {
    /// Returns `false` if the record changed nothing.
    fn apply(&mut self, record: JournalRecord) -> bool {
        match record {
            JournalRecord::Enqueued { entry } => {
                let id = entry.event_id().clone();
                if self.pending.contains_key(&id) {
                    return false;
                }
                self.order.push(id.clone());
                self.pending.insert(id, entry);
            }
            JournalRecord::Acknowledged { event_id } => {
                if self.pending.remove(&event_id).is_none() {
                    return false;
                }
                self.prune();
            }
            JournalRecord::DeadLettered { letter } => {
                self.pending.remove(letter.entry.event_id());
                self.dead.push(letter);
                self.prune();
            }
        }
        true
    }

    fn prune(&mut self) {
        if self.order.len() > 2 * self.pending.len() + 64 {
            let pending = &self.pending;
            self.order.retain(|id| pending.contains_key(id));
        }
    }

    fn pending(&self) -> Vec<OutboxEntry> {
        let mut seen = std::collections::HashSet::new();
        self.order
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.pending.get(id))
            .cloned()
            .collect()
    }
}

/// An outbox kept in memory. Pending events are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryOutbox {
    state: Mutex<OutboxState>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        MemoryOutbox::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, OutboxState>, OutboxError> {
        self.state.lock().map_err(|_| OutboxError::Poisoned)
    }
}

impl Outbox for MemoryOutbox {
    fn enqueue(&self, entry: &OutboxEntry) -> Result<(), OutboxError> {
        self.state()?.apply(JournalRecord::Enqueued {
            entry: entry.clone(),
        });
        Ok(())
    }

    fn acknowledge(&self, event_id: &EventId) -> Result<(), OutboxError> {
        self.state()?.apply(JournalRecord::Acknowledged {
            event_id: event_id.clone(),
        });
        Ok(())
    }

    fn dead_letter(&self, letter: &DeadLetter) -> Result<(), OutboxError> {
        self.state()?.apply(JournalRecord::DeadLettered {
            letter: letter.clone(),
        });
        Ok(())
    }

    fn pending(&self) -> Result<Vec<OutboxEntry>, OutboxError> {
        Ok(self.state()?.pending())
    }

    fn dead_letters(&self) -> Result<Vec<DeadLetter>, OutboxError> {
        Ok(self.state()?.dead.clone())
    }
}

/// One line of the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
enum JournalRecord {
    Enqueued { entry: OutboxEntry },
    #[serde(rename_all = "camelCase")]
    Acknowledged { event_id: EventId },
    DeadLettered { letter: DeadLetter },
}

/// An outbox backed by an append-only JSON-lines file.
///
/// Every operation appends one record before returning. Opening an existing journal replays
/// it, so events enqueued before a crash and never acknowledged are pending again.
#[derive(Debug)]
pub struct JournalOutbox {
    path: PathBuf,
    state: Mutex<OutboxState>,
}

impl JournalOutbox {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OutboxError> {
        let path = path.as_ref().to_path_buf();
        let mut state = OutboxState::default();

        if path.exists() {
            let bytes = fs::read(&path)?;

            // A crash mid-append leaves a partial last line. Cut it off so the next record
            // starts on a line of its own.
            let complete = bytes
                .iter()
                .rposition(|b| *b == b'\n')
                .map_or(0, |newline| newline + 1);
            if complete < bytes.len() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "Truncating {} bytes of torn tail in {path:?}",
                    bytes.len() - complete
                );
                let f = OpenOptions::new().write(true).open(&path)?;
                f.set_len(complete as u64)?;
                f.sync_data()?;
            }

            for line in bytes[..complete].split(|b| *b == b'\n') {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<JournalRecord>(line) {
                    Ok(record) => {
                        state.apply(record);
                    }
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Skipping unreadable journal line in {path:?}: {_err}");
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Opened outbox journal {path:?}: {} pending, {} dead letters",
            state.pending.len(),
            state.dead.len()
        );

        Ok(JournalOutbox {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> Result<MutexGuard<'_, OutboxState>, OutboxError> {
        self.state.lock().map_err(|_| OutboxError::Poisoned)
    }

    /// Append `record` to the journal, then apply it in memory. The lock is held across both,
    /// so the file order matches the in-memory order.
    fn record(&self, record: JournalRecord) -> Result<(), OutboxError> {
        let mut state = self.state()?;
        let line = serde_json::to_string(&record)?;
        append_line(&self.path, &line)?;
        state.apply(record);
        Ok(())
    }

    /// Rewrite the journal with only the pending entries and dead letters.
    pub fn compact(&self) -> Result<(), OutboxError> {
        let state = self.state()?;
        let tmp = self.path.with_extension("compact");
        {
            let mut f = fs::File::create(&tmp)?;
            for entry in state.pending() {
                let line = serde_json::to_string(&JournalRecord::Enqueued { entry })?;
                f.write_all(line.as_bytes())?;
                f.write_all(b"\n")?;
            }
            for letter in &state.dead {
                let line = serde_json::to_string(&JournalRecord::DeadLettered {
                    letter: letter.clone(),
                })?;
                f.write_all(line.as_bytes())?;
                f.write_all(b"\n")?;
            }
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Outbox for JournalOutbox {
    fn enqueue(&self, entry: &OutboxEntry) -> Result<(), OutboxError> {
        if self.state()?.pending.contains_key(entry.event_id()) {
            return Ok(());
        }
        self.record(JournalRecord::Enqueued {
            entry: entry.clone(),
        })
    }

    fn acknowledge(&self, event_id: &EventId) -> Result<(), OutboxError> {
        self.record(JournalRecord::Acknowledged {
            event_id: event_id.clone(),
        })
    }

    fn dead_letter(&self, letter: &DeadLetter) -> Result<(), OutboxError> {
        self.record(JournalRecord::DeadLettered {
            letter: letter.clone(),
        })
    }

    fn pending(&self) -> Result<Vec<OutboxEntry>, OutboxError> {
        Ok(self.state()?.pending())
    }

    fn dead_letters(&self) -> Result<Vec<DeadLetter>, OutboxError> {
        Ok(self.state()?.dead.clone())
    }
}

/// Write a single line to file (with trailing newline).
fn append_line(path: &Path, line: &str) -> Result<(), OutboxError> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(line.as_bytes())?;
    f.write_all(b"\n")?;
    f.sync_data()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(event_id: &str, entity_key: &str) -> OutboxEntry {
        let event: WebhookEvent = serde_json::from_value(json!({
            "eventType": "KycStatusEvent",
            "provider": "test-provider",
            "eventId": event_id,
            "accountAddress": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
            "payload": { "kycSchema": "MockNameAndAddress", "kycStatus": "Pending" }
        }))
        .unwrap();
        OutboxEntry::new(entity_key, event, Utc::now())
    }

    fn pending_ids(outbox: &impl Outbox) -> Vec<String> {
        outbox
            .pending()
            .unwrap()
            .iter()
            .map(|e| e.event_id().to_string())
            .collect()
    }

    #[test]
    fn memory_outbox_keeps_enqueue_order() {
        let outbox = MemoryOutbox::new();
        outbox.enqueue(&entry("e1", "a")).unwrap();
        outbox.enqueue(&entry("e2", "b")).unwrap();
        outbox.enqueue(&entry("e3", "a")).unwrap();
        outbox.enqueue(&entry("e1", "a")).unwrap();

        assert_eq!(pending_ids(&outbox), ["e1", "e2", "e3"]);

        outbox.acknowledge(&"e2".into()).unwrap();
        assert_eq!(pending_ids(&outbox), ["e1", "e3"]);
    }

    #[test]
    fn dead_letters_leave_the_pending_set() {
        let outbox = MemoryOutbox::new();
        let e1 = entry("e1", "a");
        outbox.enqueue(&e1).unwrap();
        outbox
            .dead_letter(&DeadLetter {
                entry: e1.clone(),
                subscriber: "wallet".to_string(),
                attempts: 5,
                reason: "timeout".to_string(),
            })
            .unwrap();

        assert!(outbox.pending().unwrap().is_empty());
        let dead = outbox.dead_letters().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].entry, e1);
    }

    #[test]
    fn journal_replays_unacknowledged_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");

        {
            let outbox = JournalOutbox::open(&path).unwrap();
            outbox.enqueue(&entry("e1", "a")).unwrap();
            outbox.enqueue(&entry("e2", "a")).unwrap();
            outbox.enqueue(&entry("e3", "b")).unwrap();
            outbox.acknowledge(&"e1".into()).unwrap();
        }

        let reopened = JournalOutbox::open(&path).unwrap();
        assert_eq!(pending_ids(&reopened), ["e2", "e3"]);
    }

    #[test]
    fn journal_tolerates_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");

        {
            let outbox = JournalOutbox::open(&path).unwrap();
            outbox.enqueue(&entry("e1", "a")).unwrap();
        }
        append_line(&path, r#"{"op":"enqueued","entry":{"entityK"#).unwrap();

        let reopened = JournalOutbox::open(&path).unwrap();
        assert_eq!(pending_ids(&reopened), ["e1"]);
    }

    #[test]
    fn journal_truncates_partial_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");

        {
            let outbox = JournalOutbox::open(&path).unwrap();
            outbox.enqueue(&entry("e1", "a")).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(br#"{"op":"enqueued","entry":{"entityK"#).unwrap();
        }

        {
            let reopened = JournalOutbox::open(&path).unwrap();
            assert_eq!(pending_ids(&reopened), ["e1"]);
            reopened.enqueue(&entry("e2", "b")).unwrap();
        }

        let reopened = JournalOutbox::open(&path).unwrap();
        assert_eq!(pending_ids(&reopened), ["e1", "e2"]);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[test]
    fn compaction_keeps_pending_and_dead() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");

        let outbox = JournalOutbox::open(&path).unwrap();
        for i in 0..10 {
            outbox.enqueue(&entry(&format!("e{i}"), "a")).unwrap();
        }
        for i in 0..8 {
            outbox.acknowledge(&format!("e{i}").into()).unwrap();
        }
        let e8 = entry("e8", "a");
        outbox
            .dead_letter(&DeadLetter {
                entry: e8,
                subscriber: "wallet".to_string(),
                attempts: 1,
                reason: "rejected".to_string(),
            })
            .unwrap();

        outbox.compact().unwrap();
        let lines = fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 2);

        let reopened = JournalOutbox::open(&path).unwrap();
        assert_eq!(pending_ids(&reopened), ["e9"]);
        assert_eq!(reopened.dead_letters().unwrap().len(), 1);
    }
}
