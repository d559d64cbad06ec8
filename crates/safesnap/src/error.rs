//! Error types for the ledger facade.

use safesnap_core::{CodecError, LedgerError};
use safesnap_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum SafeSnapError {
    /// The call was rejected; nothing was journaled or committed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Event encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A journaled call was rejected when replayed.
    #[error("replay failed at seq {seq}: {source}")]
    Replay {
        seq: u64,
        #[source]
        source: LedgerError,
    },

    /// Replayed state does not match the digest recorded at this seq.
    #[error("state digest mismatch at checkpoint seq {seq}")]
    CheckpointMismatch { seq: u64 },

    /// Another writer already holds this journal position.
    #[error("journal conflict at seq {seq}")]
    JournalConflict { seq: u64 },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl SafeSnapError {
    /// The ledger rejection behind this error, if any.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            SafeSnapError::Ledger(e) | SafeSnapError::Replay { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, SafeSnapError>;
