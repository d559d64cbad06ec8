//! # SafeSnap Testkit
//!
//! Testing utilities for the SafeSnap ledger.
//!
//! - **Fixtures**: deterministic parties and pre-wired in-memory ledgers
//! - **Generators**: proptest strategies for inputs and call sequences
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use safesnap::NewPhoto;
//! use safesnap_testkit::LedgerFixture;
//!
//! async fn example() {
//!     let fx = LedgerFixture::new().await;
//!     let owner = fx.accounts.wallet_1.ctx();
//!     let id = fx.ledger.register_photo(&owner, NewPhoto::public("QmA")).await.unwrap();
//!     assert!(fx.ledger.can_view_photo(&fx.accounts.wallet_2.ctx(), id).await.unwrap());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use safesnap_testkit::{generators::call_sequence, Accounts};
//!
//! proptest! {
//!     #[test]
//!     fn photo_ids_are_dense(calls in call_sequence(Accounts::new().principals(), 32)) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_party, principal, Accounts, LedgerFixture, Party};
pub use generators::{call_sequence, ledger_call};
