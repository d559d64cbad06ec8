//! # SafeSnap
//!
//! An access-control ledger for content records ("photos"). Owners register
//! content references, mark them private or public, grant and revoke
//! per-principal viewing rights, optionally escrow a key share per grant,
//! and group photos into named collections.
//!
//! ## Key Concepts
//!
//! - **Photo**: owned, immutable once registered. Ids are dense from 1.
//! - **Grant**: presence authorizes one principal to view one photo.
//!   Revocation deletes it; revoking twice is harmless.
//! - **Key escrow**: the owner reads the canonical key, a grantee reads only
//!   the share escrowed for them.
//! - **Journal**: every successful mutating call is appended to a [`Store`]
//!   and replayed on open.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use safesnap::{CallContext, Keypair, Ledger, LedgerConfig, NewPhoto};
//! use safesnap::store::SqliteStore;
//!
//! async fn example() -> safesnap::Result<()> {
//!     let store = SqliteStore::open("safesnap.db")?;
//!     let ledger = Ledger::open(store, LedgerConfig::default()).await?;
//!
//!     let owner = CallContext::new(Keypair::generate().principal());
//!     let friend = Keypair::generate().principal();
//!
//!     let photo = ledger
//!         .register_photo(&owner, NewPhoto::private("QmHash").with_encryption_key("k1"))
//!         .await?;
//!     ledger
//!         .grant_access(&owner, photo, friend, Some("share-for-friend".into()))
//!         .await?;
//!
//!     assert!(ledger.can_view_photo(&CallContext::new(friend), photo).await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `safesnap::core` - ids, principals, registries, error taxonomy
//! - `safesnap::perms` - the access control table
//! - `safesnap::store` - journal storage and SQLite

pub mod error;
pub mod ledger;
pub mod state;

pub use safesnap_core as core;
pub use safesnap_perms as perms;
pub use safesnap_store as store;

pub use error::{Result, SafeSnapError};
pub use ledger::{Ledger, LedgerConfig};
pub use state::{CallOutcome, LedgerState};

pub use safesnap_core::{
    Blake3Hash, CallContext, Collection, CollectionId, ErrorCode, KeyMaterial, Keypair,
    LedgerCall, LedgerError, LedgerEvent, Limits, NewCollection, NewPhoto, PhotoId,
    PhotoMetadata, Principal, Response,
};
pub use safesnap_perms::AccessGrant;
pub use safesnap_store::Store;
