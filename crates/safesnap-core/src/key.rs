//! Opaque key material held in escrow.
//!
//! The ledger never interprets key strings. It stores them, compares their
//! presence, and releases them to authorized callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// An opaque key string (a photo's encryption key or a grantee's share).
///
/// The buffer is wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    /// Wrap a key string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying string.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial(<{} bytes redacted>)", self.0.len())
    }
}

impl From<&str> for KeyMaterial {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for KeyMaterial {
    fn from(value: String) -> Self {
        Self(value)
    }
}
