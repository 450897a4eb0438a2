//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of the
//! [`VersionStore`] trait. It is intended for embedded usage, tests, and as a
//! reference implementation of the port contract.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::record::{EntityId, SequenceId, VersionAttrs, VersionRecord};
use crate::storage::traits::{StorageError, VersionStore};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug)]
struct StoreState<A> {
    // Keyed by raw sequence number; BTreeMap keeps rows in insertion order.
    rows: BTreeMap<u64, VersionRecord<A>>,
    next_seq: u64,
}

impl<A> Default for StoreState<A> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_seq: 1,
        }
    }
}

/// Thread-safe in-memory version store for one entity kind.
#[derive(Debug)]
pub struct InMemoryVersionStore<A> {
    state: RwLock<StoreState<A>>,
}

impl<A> Default for InMemoryVersionStore<A> {
    fn default() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
        }
    }
}

impl<A> InMemoryVersionStore<A> {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A: VersionAttrs> VersionStore<A> for InMemoryVersionStore<A> {
    fn insert(&self, record: &VersionRecord<A>) -> Result<SequenceId, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("insert"))?;
        let seq = state.next_seq;
        state.next_seq += 1;

        let mut row = record.clone();
        row.seq = SequenceId::new(seq);
        state.rows.insert(seq, row);
        Ok(SequenceId::new(seq))
    }

    fn update(&self, record: &VersionRecord<A>) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("update"))?;
        let seq = record.seq.get();
        match state.rows.get_mut(&seq) {
            Some(row) => {
                *row = record.clone();
                Ok(())
            }
            None => Err(StorageError::RowNotFound(record.seq)),
        }
    }

    fn find_all_by_entity_id(
        &self,
        entity_id: &EntityId,
    ) -> Result<Vec<VersionRecord<A>>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("find_all"))?;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| &row.entity_id == entity_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(rows)
    }

    fn find_active_by_entity_id(
        &self,
        entity_id: &EntityId,
    ) -> Result<Option<VersionRecord<A>>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("find_active"))?;
        Ok(state
            .rows
            .values()
            .find(|row| row.is_active && &row.entity_id == entity_id)
            .cloned())
    }

    fn find_by_entity_id_and_version(
        &self,
        entity_id: &EntityId,
        version: u32,
    ) -> Result<Option<VersionRecord<A>>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("find_by_version"))?;
        Ok(state
            .rows
            .values()
            .find(|row| row.version == version && &row.entity_id == entity_id)
            .cloned())
    }

    fn max_version(&self, entity_id: &EntityId) -> Result<Option<u32>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("max_version"))?;
        Ok(state
            .rows
            .values()
            .filter(|row| &row.entity_id == entity_id)
            .map(|row| row.version)
            .max())
    }

    fn deactivate_all(&self, entity_id: &EntityId) -> Result<u64, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("deactivate_all"))?;
        let mut changed = 0;
        for row in state.rows.values_mut() {
            if row.is_active && &row.entity_id == entity_id {
                row.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn find_all_active(&self) -> Result<Vec<VersionRecord<A>>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("find_all_active"))?;
        let mut rows: Vec<_> = state
            .rows
            .values()
            .filter(|row| row.is_active)
            .cloned()
            .collect();
        // Sequence number breaks created_at ties deterministically.
        rows.sort_by(|a, b| (b.created_at, b.seq).cmp(&(a.created_at, a.seq)));
        Ok(rows)
    }

    fn exists_by_entity_id(&self, entity_id: &EntityId) -> Result<bool, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("exists"))?;
        Ok(state.rows.values().any(|row| &row.entity_id == entity_id))
    }

    fn count(&self, entity_id: &EntityId) -> Result<u64, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("count"))?;
        Ok(state
            .rows
            .values()
            .filter(|row| &row.entity_id == entity_id)
            .count() as u64)
    }
}
