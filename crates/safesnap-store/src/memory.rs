//! In-memory implementation of the Store trait.
//!
//! Same append semantics as SQLite, no persistence. Used by tests and by
//! hosts that rebuild the ledger from elsewhere.

use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use safesnap_core::{event_id_of, Blake3Hash, EventId, LedgerEvent, Principal};

use crate::error::{Result, StoreError};
use crate::traits::{now_millis, AppendResult, Checkpoint, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Journal indexed by seq.
    events: BTreeMap<u64, StoredEvent>,

    /// Ids of every stored event.
    ids: HashSet<EventId>,

    checkpoints: BTreeMap<u64, Checkpoint>,
}

struct StoredEvent {
    id: EventId,
    event: LedgerEvent,
    encoded: Bytes,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn head_seq(&self) -> u64 {
        self.events.keys().next_back().copied().unwrap_or(0)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_event(&self, event: &LedgerEvent, encoded: &[u8]) -> Result<AppendResult> {
        let mut inner = self.write()?;
        let id = event_id_of(encoded);

        if let Some(existing) = inner.events.get(&event.seq) {
            if existing.id == id {
                return Ok(AppendResult::AlreadyExists);
            }
            return Ok(AppendResult::Conflict {
                existing: existing.id,
            });
        }

        let expected = inner.head_seq() + 1;
        if event.seq != expected {
            return Err(StoreError::OutOfOrder {
                expected,
                got: event.seq,
            });
        }

        inner.ids.insert(id);
        inner.events.insert(
            event.seq,
            StoredEvent {
                id,
                event: event.clone(),
                encoded: Bytes::copy_from_slice(encoded),
            },
        );

        Ok(AppendResult::Appended)
    }

    async fn get_event(&self, seq: u64) -> Result<Option<LedgerEvent>> {
        let inner = self.read()?;
        Ok(inner.events.get(&seq).map(|se| se.event.clone()))
    }

    async fn get_event_id(&self, seq: u64) -> Result<Option<EventId>> {
        let inner = self.read()?;
        Ok(inner.events.get(&seq).map(|se| se.id))
    }

    async fn get_events_range(&self, start: u64, end: u64) -> Result<Vec<LedgerEvent>> {
        if start > end {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        Ok(inner
            .events
            .range(start..=end)
            .map(|(_, se)| se.event.clone())
            .collect())
    }

    async fn has_event(&self, id: &EventId) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner.ids.contains(id))
    }

    async fn get_encoded_bytes(&self, seq: u64) -> Result<Option<Vec<u8>>> {
        let inner = self.read()?;
        Ok(inner.events.get(&seq).map(|se| se.encoded.to_vec()))
    }

    async fn head_seq(&self) -> Result<u64> {
        Ok(self.read()?.head_seq())
    }

    async fn events_by_caller(&self, caller: &Principal) -> Result<Vec<LedgerEvent>> {
        let inner = self.read()?;
        Ok(inner
            .events
            .values()
            .filter(|se| se.event.caller == *caller)
            .map(|se| se.event.clone())
            .collect())
    }

    async fn record_checkpoint(&self, seq: u64, state_hash: &Blake3Hash) -> Result<()> {
        let mut inner = self.write()?;
        inner.checkpoints.insert(
            seq,
            Checkpoint {
                seq,
                state_hash: *state_hash,
                created_at: now_millis(),
            },
        );
        Ok(())
    }

    async fn checkpoints(&self) -> Result<Vec<Checkpoint>> {
        let inner = self.read()?;
        Ok(inner.checkpoints.values().cloned().collect())
    }
}
