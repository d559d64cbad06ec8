//! # SafeSnap Core
//!
//! Pure primitives for the SafeSnap ledger: identifiers, principals, the
//! photo and collection registries, and canonical encoding.
//!
//! This crate contains no I/O, no storage, no logging. It is pure computation
//! over the ledger's tables.
//!
//! ## Key Types
//!
//! - [`PhotoRegistry`] / [`Photo`] - registered content, owner and visibility
//! - [`CollectionRegistry`] / [`Collection`] - named, owned groupings
//! - [`Principal`] - an authenticated caller identity
//! - [`CallContext`] - the explicit per-call caller
//! - [`KeyMaterial`] - opaque escrowed key string
//! - [`LedgerError`] / [`Response`] - the error taxonomy every call answers with
//! - [`LedgerEvent`] - a committed mutating call, as recorded in the journal
//!
//! ## Two-phase mutation
//!
//! Registries split every write into `prepare` (all checks, reads only) and
//! `insert` (infallible). A caller composing several tables runs every
//! `prepare` first, so a failed check never leaves a partial write behind.

pub mod canonical;
pub mod collection;
pub mod context;
pub mod crypto;
pub mod error;
pub mod event;
pub mod key;
pub mod photo;
pub mod types;
pub mod validation;

pub use canonical::encode_canonical;
pub use collection::{Collection, CollectionRegistry, NewCollection};
pub use context::CallContext;
pub use crypto::{Blake3Hash, Keypair, Principal};
pub use error::{CodecError, ErrorCode, LedgerError, Response};
pub use event::{event_id_of, CallKind, LedgerCall, LedgerEvent};
pub use key::KeyMaterial;
pub use photo::{NewPhoto, Photo, PhotoMetadata, PhotoRegistry};
pub use types::{CollectionId, EventId, PhotoId};
pub use validation::{validate_ascii, Limits};
