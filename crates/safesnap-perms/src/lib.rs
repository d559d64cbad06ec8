//! # SafeSnap Permissions
//!
//! Per-photo access grants and key escrow.
//!
//! ## Overview
//!
//! Access control is a table of [`AccessGrant`] records keyed by
//! (photo, grantee). A present record means the grantee may view the photo;
//! revocation deletes the record. There is no revoked flag.
//!
//! ## Key Concepts
//!
//! - **Visibility**: the owner always views; anyone views a public photo;
//!   otherwise a grant is required. Denial is `false`, not an error.
//! - **Key share**: a grant on an encrypted photo may carry opaque key
//!   material for the grantee. A share on an unencrypted photo is rejected.
//! - **Release**: the owner retrieves the canonical key, a grantee retrieves
//!   their share, nobody else retrieves anything.
//!
//! Only the photo owner may grant or revoke.

pub mod grant;
pub mod keyshare;
pub mod state;

pub use grant::{AccessGrant, GrantKey};
pub use keyshare::{check_key_share, release_key};
pub use state::AccessControl;
