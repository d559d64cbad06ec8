//! Input validation for ASCII string arguments.
//!
//! Every string crossing the call surface is bounded ASCII. Limits are
//! configurable so hosts with different column widths can tighten them.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Response};
use crate::key::KeyMaterial;

/// Maximum lengths (in bytes) for string arguments and collection size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_content_hash_len: usize,
    pub max_encryption_key_len: usize,
    pub max_key_share_len: usize,
    pub max_name_len: usize,
    pub max_description_len: usize,
    /// Maximum number of photos one collection may list.
    pub max_collection_photos: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_content_hash_len: 64,
            max_encryption_key_len: 256,
            max_key_share_len: 256,
            max_name_len: 64,
            max_description_len: 256,
            max_collection_photos: 100,
        }
    }
}

impl Limits {
    /// Limits that accept any length and any collection size. ASCII is
    /// still required.
    pub fn unbounded() -> Self {
        Self {
            max_content_hash_len: usize::MAX,
            max_encryption_key_len: usize::MAX,
            max_key_share_len: usize::MAX,
            max_name_len: usize::MAX,
            max_description_len: usize::MAX,
            max_collection_photos: usize::MAX,
        }
    }

    pub fn check_content_hash(&self, value: &str) -> Response<()> {
        validate_ascii("content_hash", value, self.max_content_hash_len)
    }

    pub fn check_encryption_key(&self, value: Option<&KeyMaterial>) -> Response<()> {
        match value {
            Some(key) => validate_ascii("encryption_key", key.expose(), self.max_encryption_key_len),
            None => Ok(()),
        }
    }

    pub fn check_key_share(&self, value: Option<&KeyMaterial>) -> Response<()> {
        match value {
            Some(share) => validate_ascii("key_share", share.expose(), self.max_key_share_len),
            None => Ok(()),
        }
    }

    pub fn check_name(&self, value: &str) -> Response<()> {
        validate_ascii("name", value, self.max_name_len)
    }

    pub fn check_description(&self, value: &str) -> Response<()> {
        validate_ascii("description", value, self.max_description_len)
    }
}

/// Validate that `value` is ASCII and at most `max_len` bytes.
pub fn validate_ascii(field: &'static str, value: &str, max_len: usize) -> Response<()> {
    if !value.is_ascii() {
        return Err(LedgerError::InvalidInput {
            field,
            reason: "must be ASCII".into(),
        });
    }

    if value.len() > max_len {
        return Err(LedgerError::InvalidInput {
            field,
            reason: format!("length {} exceeds maximum {}", value.len(), max_len),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_ascii() {
        let err = validate_ascii("name", "café", 64).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { field: "name", .. }));
    }

    #[test]
    fn test_length_boundary() {
        let limits = Limits::default();
        assert!(limits.check_content_hash(&"x".repeat(64)).is_ok());
        assert!(limits.check_content_hash(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_absent_key_is_valid() {
        let limits = Limits::default();
        assert!(limits.check_encryption_key(None).is_ok());
        assert!(limits.check_key_share(None).is_ok());
    }

    #[test]
    fn test_empty_strings_are_valid() {
        let limits = Limits::default();
        assert!(limits.check_name("").is_ok());
        assert!(limits.check_encryption_key(Some(&KeyMaterial::new(""))).is_ok());
    }

    #[test]
    fn test_unbounded_still_requires_ascii() {
        let limits = Limits::unbounded();
        assert!(limits.check_content_hash(&"x".repeat(10_000)).is_ok());
        assert!(limits.check_name("café").is_err());
    }

    #[test]
    fn test_limits_from_partial_json() {
        let limits: Limits = serde_json::from_str(r#"{"max_name_len": 8}"#).unwrap();
        assert_eq!(limits.max_name_len, 8);
        assert_eq!(limits.max_content_hash_len, 64);
    }

    proptest! {
        #[test]
        fn test_ascii_within_limit_accepted(s in "[ -~]{0,64}") {
            prop_assert!(validate_ascii("content_hash", &s, 64).is_ok());
        }
    }
}
