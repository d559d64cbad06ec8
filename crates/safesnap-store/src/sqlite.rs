//! SQLite implementation of the Store trait.
//!
//! This is the primary journal backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use safesnap_core::{event_id_of, Blake3Hash, EventId, LedgerEvent, Principal};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{now_millis, AppendResult, Checkpoint, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn decode_event(seq: i64, bytes: &[u8]) -> Result<LedgerEvent> {
    let event = LedgerEvent::from_bytes(bytes)?;
    if event.seq as i64 != seq {
        return Err(StoreError::InvalidData(format!(
            "row seq {} holds event with seq {}",
            seq, event.seq
        )));
    }
    Ok(event)
}

fn decode_event_id(bytes: &[u8]) -> Result<EventId> {
    EventId::try_from(bytes)
        .map_err(|_| StoreError::InvalidData(format!("event id of {} bytes", bytes.len())))
}

fn decode_rows(rows: Vec<(i64, Vec<u8>)>) -> Result<Vec<LedgerEvent>> {
    rows.iter()
        .map(|(seq, bytes)| decode_event(*seq, bytes))
        .collect()
}

#[async_trait]
impl Store for SqliteStore {
    async fn append_event(&self, event: &LedgerEvent, encoded: &[u8]) -> Result<AppendResult> {
        let event = event.clone();
        let encoded = encoded.to_vec();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let id = event_id_of(&encoded);

            let existing: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT event_id FROM ledger_events WHERE seq = ?1",
                    params![event.seq as i64],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing) = existing {
                let existing = decode_event_id(&existing)?;
                if existing == id {
                    return Ok(AppendResult::AlreadyExists);
                }
                return Ok(AppendResult::Conflict { existing });
            }

            let head: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM ledger_events",
                [],
                |row| row.get(0),
            )?;
            let expected = head as u64 + 1;
            if event.seq != expected {
                return Err(StoreError::OutOfOrder {
                    expected,
                    got: event.seq,
                });
            }

            tx.execute(
                "INSERT INTO ledger_events (seq, event_id, caller, kind, event_bytes, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.seq as i64,
                    id.0.as_slice(),
                    event.caller.0.as_slice(),
                    event.kind().to_u16() as i64,
                    encoded.as_slice(),
                    now_millis(),
                ],
            )?;
            tx.commit()?;

            tracing::debug!(seq = event.seq, kind = ?event.kind(), event_id = %id, "journal append");
            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn get_event(&self, seq: u64) -> Result<Option<LedgerEvent>> {
        self.run(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT event_bytes FROM ledger_events WHERE seq = ?1",
                    params![seq as i64],
                    |row| row.get(0),
                )
                .optional()?;

            bytes
                .map(|bytes| decode_event(seq as i64, &bytes))
                .transpose()
        })
        .await
    }

    async fn get_event_id(&self, seq: u64) -> Result<Option<EventId>> {
        self.run(move |conn| {
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT event_id FROM ledger_events WHERE seq = ?1",
                    params![seq as i64],
                    |row| row.get(0),
                )
                .optional()?;

            bytes.map(|bytes| decode_event_id(&bytes)).transpose()
        })
        .await
    }

    async fn get_events_range(&self, start: u64, end: u64) -> Result<Vec<LedgerEvent>> {
        if start > end {
            return Ok(Vec::new());
        }
        // SQLite integers are signed; no stored seq exceeds i64::MAX.
        let start = start.min(i64::MAX as u64) as i64;
        let end = end.min(i64::MAX as u64) as i64;

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, event_bytes FROM ledger_events
                 WHERE seq >= ?1 AND seq <= ?2
                 ORDER BY seq",
            )?;

            let rows: Vec<(i64, Vec<u8>)> = stmt
                .query_map(params![start, end], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            decode_rows(rows)
        })
        .await
    }

    async fn has_event(&self, id: &EventId) -> Result<bool> {
        let id = *id;

        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM ledger_events WHERE event_id = ?1",
                params![id.0.as_slice()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    async fn get_encoded_bytes(&self, seq: u64) -> Result<Option<Vec<u8>>> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT event_bytes FROM ledger_events WHERE seq = ?1",
                params![seq as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn head_seq(&self) -> Result<u64> {
        self.run(|conn| {
            let head: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) FROM ledger_events",
                [],
                |row| row.get(0),
            )?;
            Ok(head as u64)
        })
        .await
    }

    async fn events_by_caller(&self, caller: &Principal) -> Result<Vec<LedgerEvent>> {
        let caller = *caller;

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT seq, event_bytes FROM ledger_events
                 WHERE caller = ?1
                 ORDER BY seq",
            )?;

            let rows: Vec<(i64, Vec<u8>)> = stmt
                .query_map(params![caller.0.as_slice()], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            decode_rows(rows)
        })
        .await
    }

    async fn record_checkpoint(&self, seq: u64, state_hash: &Blake3Hash) -> Result<()> {
        let state_hash = *state_hash;

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO checkpoints (seq, state_hash, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(seq) DO UPDATE SET
                    state_hash = excluded.state_hash,
                    created_at = excluded.created_at",
                params![seq as i64, state_hash.0.as_slice(), now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn checkpoints(&self) -> Result<Vec<Checkpoint>> {
        self.run(|conn| {
            let mut stmt =
                conn.prepare("SELECT seq, state_hash, created_at FROM checkpoints ORDER BY seq")?;

            let rows = stmt
                .query_map([], |row| {
                    let seq: i64 = row.get(0)?;
                    let hash: Vec<u8> = row.get(1)?;
                    let created_at: i64 = row.get(2)?;
                    Ok((seq, hash, created_at))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(seq, hash, created_at)| {
                    let bytes: [u8; 32] = hash.as_slice().try_into().map_err(|_| {
                        StoreError::InvalidData(format!("state hash of {} bytes", hash.len()))
                    })?;
                    Ok(Checkpoint {
                        seq: seq as u64,
                        state_hash: Blake3Hash(bytes),
                        created_at,
                    })
                })
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use safesnap_core::{Keypair, LedgerCall, NewPhoto, PhotoId};

    fn alice() -> Principal {
        Keypair::from_seed(&[1u8; 32]).principal()
    }

    fn bob() -> Principal {
        Keypair::from_seed(&[2u8; 32]).principal()
    }

    fn register(seq: u64, hash: &str) -> LedgerEvent {
        LedgerEvent::new(
            seq,
            alice(),
            LedgerCall::RegisterPhoto(NewPhoto::private(hash).with_encryption_key("k")),
        )
    }

    async fn append(store: &SqliteStore, event: &LedgerEvent) -> AppendResult {
        let bytes = event.to_bytes().unwrap();
        store.append_event(event, &bytes).await.unwrap()
    }

    #[tokio::test]
    async fn test_append_and_get() {
        let store = SqliteStore::open_memory().unwrap();
        let event = register(1, "QmA");

        assert_eq!(append(&store, &event).await, AppendResult::Appended);
        assert_eq!(store.get_event(1).await.unwrap(), Some(event.clone()));
        assert_eq!(store.get_event(2).await.unwrap(), None);
        assert_eq!(store.head_seq().await.unwrap(), 1);
        assert_eq!(
            store.get_event_id(1).await.unwrap(),
            Some(event.compute_id().unwrap())
        );
    }

    #[tokio::test]
    async fn test_idempotent_append() {
        let store = SqliteStore::open_memory().unwrap();
        let event = register(1, "QmA");

        append(&store, &event).await;
        assert_eq!(append(&store, &event).await, AppendResult::AlreadyExists);
    }

    #[tokio::test]
    async fn test_conflict_detection() {
        let store = SqliteStore::open_memory().unwrap();
        let first = register(1, "QmA");

        append(&store, &first).await;
        assert_eq!(
            append(&store, &register(1, "QmB")).await,
            AppendResult::Conflict {
                existing: first.compute_id().unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_gap_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        append(&store, &register(1, "QmA")).await;

        let event = register(3, "QmC");
        let bytes = event.to_bytes().unwrap();
        let err = store.append_event(&event, &bytes).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfOrder { expected: 2, got: 3 }));
        assert_eq!(store.head_seq().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_encoded_bytes_preserved() {
        let store = SqliteStore::open_memory().unwrap();
        let event = register(1, "QmA");
        let bytes = event.to_bytes().unwrap();
        store.append_event(&event, &bytes).await.unwrap();

        let stored = store.get_encoded_bytes(1).await.unwrap().unwrap();
        assert_eq!(stored, bytes);
        assert!(store.has_event(&event_id_of(&stored)).await.unwrap());
    }

    #[tokio::test]
    async fn test_range_and_caller_queries() {
        let store = SqliteStore::open_memory().unwrap();
        append(&store, &register(1, "QmA")).await;
        let revoke = LedgerEvent::new(
            2,
            bob(),
            LedgerCall::RevokeAccess {
                photo_id: PhotoId(1),
                grantee: alice(),
            },
        );
        append(&store, &revoke).await;
        append(&store, &register(3, "QmC")).await;

        assert_eq!(store.get_events_range(2, 3).await.unwrap().len(), 2);
        assert_eq!(store.get_events_range(1, u64::MAX).await.unwrap().len(), 3);
        assert!(store.get_events_range(u64::MAX, u64::MAX).await.unwrap().is_empty());
        assert_eq!(store.all_events().await.unwrap().len(), 3);
        assert_eq!(store.events_by_caller(&bob()).await.unwrap(), vec![revoke]);
        assert_eq!(store.events_by_caller(&alice()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_upsert() {
        let store = SqliteStore::open_memory().unwrap();
        store
            .record_checkpoint(8, &Blake3Hash::hash(b"a"))
            .await
            .unwrap();
        store
            .record_checkpoint(8, &Blake3Hash::hash(b"b"))
            .await
            .unwrap();

        let checkpoints = store.checkpoints().await.unwrap();
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].seq, 8);
        assert_eq!(checkpoints[0].state_hash, Blake3Hash::hash(b"b"));
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            append(&store, &register(1, "QmA")).await;
            append(&store, &register(2, "QmB")).await;
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.head_seq().await.unwrap(), 2);
        assert_eq!(store.get_event(2).await.unwrap(), Some(register(2, "QmB")));
    }
}
