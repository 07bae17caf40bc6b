use std::ops::Deref;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};

use super::entity::LifecycleEntity;
use crate::{
    config::KycPolicy,
    errors::{FiatConnectError, ProtocolError},
};

/// A snapshot of an entity at a given version.
///
/// Transitions take the snapshot they were decided on. If the entity moved on since, the
/// transition fails with [`ProtocolError::Conflict`] instead of overwriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<E> {
    pub version: u64,
    pub entity: E,
}

impl<E> Versioned<E> {
    pub fn new(entity: E) -> Self {
        Versioned { version: 0, entity }
    }
}

impl<E> Deref for Versioned<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

/// Current versions of all entities of one kind.
///
/// Each mutation holds the entity's map entry for its whole duration, so transitions of one
/// entity are serialized. The `commit` callbacks run inside that critical section; when they
/// fail nothing is written.
#[derive(Debug)]
pub struct EntityStore<E: LifecycleEntity> {
    entries: DashMap<E::Key, Versioned<E>>,
}

impl<E: LifecycleEntity> Default for EntityStore<E> {
    fn default() -> Self {
        EntityStore {
            entries: DashMap::new(),
        }
    }
}

impl<E: LifecycleEntity> EntityStore<E> {
    pub fn get(&self, key: &E::Key) -> Option<Versioned<E>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// The stored snapshot for `key`, creating it from `init` if absent. Creation emits nothing.
    pub fn get_or_insert_with(&self, key: E::Key, init: impl FnOnce() -> E) -> Versioned<E> {
        self.entries
            .entry(key)
            .or_insert_with(|| Versioned::new(init()))
            .value()
            .clone()
    }

    /// Insert a new entity at version 0. Fails with `ResourceExists` if the key is taken.
    pub fn insert<F>(&self, entity: E, commit: F) -> Result<Versioned<E>, ProtocolError>
    where
        F: FnOnce(&Versioned<E>) -> Result<(), ProtocolError>,
    {
        match self.entries.entry(entity.key()) {
            Entry::Occupied(_) => Err(FiatConnectError::ResourceExists.into()),
            Entry::Vacant(slot) => {
                let created = Versioned::new(entity);
                commit(&created)?;
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    pub fn remove(&self, key: &E::Key) -> Option<Versioned<E>> {
        self.entries.remove(key).map(|(_, entity)| entity)
    }

    /// Copies of every stored entity.
    pub fn snapshots(&self) -> Vec<Versioned<E>> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Move the entity of `snapshot` to `proposed`.
    ///
    /// Fails with `Conflict` if the stored version differs from the snapshot's, and with
    /// `InvalidTransition` if the rules forbid the edge. `edit` may adjust other fields of the
    /// new version before `commit` sees it.
    pub fn transition<Ed, C>(
        &self,
        snapshot: &Versioned<E>,
        proposed: E::Status,
        policy: &KycPolicy,
        now: DateTime<Utc>,
        edit: Ed,
        commit: C,
    ) -> Result<Versioned<E>, ProtocolError>
    where
        Ed: FnOnce(&mut E),
        C: FnOnce(&Versioned<E>) -> Result<(), ProtocolError>,
    {
        let key = snapshot.entity.key();
        let mut slot = self
            .entries
            .get_mut(&key)
            .ok_or(FiatConnectError::ResourceNotFound)?;

        if slot.version != snapshot.version {
            return Err(ProtocolError::Conflict {
                entity: snapshot.entity_key(),
                expected: snapshot.version,
                actual: slot.version,
            });
        }

        let current = slot.entity.status();
        if !E::transition_allowed(current, proposed, policy) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                entity = %snapshot.entity_key(),
                "Rejected transition {current} -> {proposed}"
            );
            return Err(ProtocolError::InvalidTransition {
                current: current.into(),
                proposed: proposed.into(),
            });
        }

        let mut next = slot.value().clone();
        next.entity.set_status(proposed, now);
        edit(&mut next.entity);
        next.version += 1;

        commit(&next)?;
        *slot = next.clone();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            entity = %next.entity_key(),
            version = next.version,
            "Transition applied: {current} -> {proposed}"
        );

        Ok(next)
    }
}
