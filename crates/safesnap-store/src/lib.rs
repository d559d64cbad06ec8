//! # SafeSnap Store
//!
//! Journal persistence for the SafeSnap ledger. Every committed mutating call
//! is appended as a [`LedgerEvent`](safesnap_core::LedgerEvent); replaying the
//! journal in order rebuilds the ledger tables.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all journal operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AppendResult`] - Result of appending an event
//! - [`Checkpoint`] - A recorded state digest
//!
//! ## Usage
//!
//! ```rust,no_run
//! use safesnap_core::{Keypair, LedgerCall, LedgerEvent, NewPhoto};
//! use safesnap_store::{SqliteStore, Store};
//!
//! async fn example() -> safesnap_store::Result<()> {
//!     let store = SqliteStore::open("safesnap.db")?;
//!
//!     let caller = Keypair::generate().principal();
//!     let event = LedgerEvent::new(1, caller, LedgerCall::RegisterPhoto(NewPhoto::public("QmA")));
//!     let bytes = event.to_bytes()?;
//!     store.append_event(&event, &bytes).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Dense**: appends must land at `head_seq() + 1`
//! - **Idempotent appends**: appending the same event twice returns `AlreadyExists`
//! - **Conflict detection**: a different event at an occupied seq returns `Conflict`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AppendResult, Checkpoint, Store, StoreExt};
