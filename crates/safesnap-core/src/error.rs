//! Error types for the SafeSnap ledger core.
//!
//! Every entry point answers with a [`Response`]: either the value or one of
//! the [`LedgerError`] variants below. Errors are final for the call that
//! produced them and never leave partial state behind.

use thiserror::Error;

use crate::types::{CollectionId, PhotoId};

/// Errors returned by ledger entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The caller lacks the required ownership relation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The referenced photo does not exist.
    #[error("photo not found: {0}")]
    PhotoNotFound(PhotoId),

    /// The referenced collection does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    /// The photo exists but holds no encryption key.
    #[error("no encryption key for {0}")]
    KeyNotFound(PhotoId),

    /// The collection supplied at registration does not exist.
    #[error("invalid collection: {0}")]
    InvalidCollection(CollectionId),

    /// A key share was supplied for a photo without an encryption key.
    #[error("invalid key share: {0} has no encryption key")]
    InvalidKeyShare(PhotoId),

    /// A string argument is not ASCII or exceeds its limit.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The collection has reached its membership limit.
    #[error("collection full: {0}")]
    CollectionFull(CollectionId),
}

/// Stable numeric error codes, one per error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    Unauthorized = 100,
    NotFound = 101,
    InvalidCollection = 102,
    InvalidKeyShare = 103,
    InvalidInput = 104,
    CollectionFull = 105,
}

impl ErrorCode {
    /// Convert to u32 for the wire.
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Try to parse from u32.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            100 => Some(Self::Unauthorized),
            101 => Some(Self::NotFound),
            102 => Some(Self::InvalidCollection),
            103 => Some(Self::InvalidKeyShare),
            104 => Some(Self::InvalidInput),
            105 => Some(Self::CollectionFull),
            _ => None,
        }
    }
}

impl LedgerError {
    /// The error class this error belongs to.
    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::Unauthorized(_) => ErrorCode::Unauthorized,
            LedgerError::PhotoNotFound(_)
            | LedgerError::CollectionNotFound(_)
            | LedgerError::KeyNotFound(_) => ErrorCode::NotFound,
            LedgerError::InvalidCollection(_) => ErrorCode::InvalidCollection,
            LedgerError::InvalidKeyShare(_) => ErrorCode::InvalidKeyShare,
            LedgerError::InvalidInput { .. } => ErrorCode::InvalidInput,
            LedgerError::CollectionFull(_) => ErrorCode::CollectionFull,
        }
    }

    /// Shorthand for the `NotFound` class.
    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    /// Shorthand for the `Unauthorized` class.
    pub fn is_unauthorized(&self) -> bool {
        self.code() == ErrorCode::Unauthorized
    }
}

/// Result type for ledger entry points.
pub type Response<T> = std::result::Result<T, LedgerError>;

/// Errors encoding or decoding journal events.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_variants_share_a_code() {
        assert_eq!(LedgerError::PhotoNotFound(PhotoId(1)).code(), ErrorCode::NotFound);
        assert_eq!(
            LedgerError::CollectionNotFound(CollectionId(1)).code(),
            ErrorCode::NotFound
        );
        assert_eq!(LedgerError::KeyNotFound(PhotoId(1)).code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_error_code_roundtrip() {
        for code in [
            ErrorCode::Unauthorized,
            ErrorCode::NotFound,
            ErrorCode::InvalidCollection,
            ErrorCode::InvalidKeyShare,
            ErrorCode::InvalidInput,
            ErrorCode::CollectionFull,
        ] {
            assert_eq!(ErrorCode::from_u32(code.to_u32()), Some(code));
        }
        assert_eq!(ErrorCode::from_u32(7), None);
    }

    #[test]
    fn test_display_names_the_photo() {
        let err = LedgerError::InvalidKeyShare(PhotoId(3));
        assert_eq!(err.to_string(), "invalid key share: photo#3 has no encryption key");
    }
}
