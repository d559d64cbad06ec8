//! Store trait: the abstract interface for journal persistence.
//!
//! This trait keeps the ledger storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use safesnap_core::{Blake3Hash, EventId, LedgerEvent, Principal};

use crate::error::Result;

/// Result of appending an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// Event was appended.
    Appended,
    /// The identical event is already at this seq (idempotent - not an error).
    AlreadyExists,
    /// A different event already occupies this seq.
    Conflict {
        /// The existing event ID at this position.
        existing: EventId,
    },
}

/// A state digest recorded after the event at `seq` was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub seq: u64,
    pub state_hash: Blake3Hash,
    /// When the checkpoint was written (Unix ms).
    pub created_at: i64,
}

/// The Store trait: async interface for journal persistence.
///
/// All methods are async to support both blocking (SQLite) and async
/// backends. SQLite runs its work on `spawn_blocking`.
///
/// # Design Notes
///
/// - **Dense journal**: events are appended at `head_seq() + 1` only.
/// - **Idempotent appends**: re-appending the same event returns `AlreadyExists`.
/// - **Conflict detection**: a different event at an occupied seq returns `Conflict`.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Event Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an event to the journal.
    ///
    /// # Arguments
    /// - `event`: The event to append.
    /// - `encoded`: Its encoded bytes (cached to avoid re-encoding).
    async fn append_event(&self, event: &LedgerEvent, encoded: &[u8]) -> Result<AppendResult>;

    /// Get the event at a journal position.
    async fn get_event(&self, seq: u64) -> Result<Option<LedgerEvent>>;

    /// Get the id of the event at a journal position.
    async fn get_event_id(&self, seq: u64) -> Result<Option<EventId>>;

    /// Get events with `start <= seq <= end`, ordered by seq.
    async fn get_events_range(&self, start: u64, end: u64) -> Result<Vec<LedgerEvent>>;

    /// Check if an event exists by ID.
    async fn has_event(&self, id: &EventId) -> Result<bool>;

    /// Get the stored encoded bytes of an event.
    async fn get_encoded_bytes(&self, seq: u64) -> Result<Option<Vec<u8>>>;

    /// Highest appended seq (0 for an empty journal).
    async fn head_seq(&self) -> Result<u64>;

    /// All events issued by a caller, ordered by seq.
    async fn events_by_caller(&self, caller: &Principal) -> Result<Vec<LedgerEvent>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Checkpoint Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Record the state digest after applying the event at `seq`.
    ///
    /// Recording the same seq twice keeps the latest digest.
    async fn record_checkpoint(&self, seq: u64, state_hash: &Blake3Hash) -> Result<()>;

    /// All checkpoints, ordered by seq.
    async fn checkpoints(&self) -> Result<Vec<Checkpoint>>;
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Read the whole journal in order.
    fn all_events(&self) -> impl std::future::Future<Output = Result<Vec<LedgerEvent>>> + Send;
}

impl<S: Store + ?Sized> StoreExt for S {
    async fn all_events(&self) -> Result<Vec<LedgerEvent>> {
        let head = self.head_seq().await?;
        if head == 0 {
            return Ok(Vec::new());
        }
        self.get_events_range(1, head).await
    }
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
