//! Access grant records.
//!
//! A grant authorizes one principal to view one photo. Presence of the
//! record is the authorization; revocation deletes it.

use serde::{Deserialize, Serialize};

use safesnap_core::{KeyMaterial, PhotoId, Principal};

/// Key of the grant table: unique per (photo, grantee) pair.
///
/// Ordered by photo first so all grants of a photo are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrantKey {
    pub photo_id: PhotoId,
    pub grantee: Principal,
}

impl GrantKey {
    pub const fn new(photo_id: PhotoId, grantee: Principal) -> Self {
        Self { photo_id, grantee }
    }

    /// Smallest key for a photo.
    pub(crate) const fn first_of(photo_id: PhotoId) -> Self {
        Self::new(photo_id, Principal::from_bytes([0u8; 32]))
    }

    /// Largest key for a photo.
    pub(crate) const fn last_of(photo_id: PhotoId) -> Self {
        Self::new(photo_id, Principal::from_bytes([0xffu8; 32]))
    }
}

/// An authorization record, optionally carrying escrowed key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub photo_id: PhotoId,
    pub grantee: Principal,

    /// Present only if the photo is encrypted and the owner chose to share.
    pub key_share: Option<KeyMaterial>,
}

impl AccessGrant {
    /// A view-only grant with no key share.
    pub fn view_only(photo_id: PhotoId, grantee: Principal) -> Self {
        Self {
            photo_id,
            grantee,
            key_share: None,
        }
    }

    /// Attach a key share to this grant.
    pub fn with_key_share(mut self, share: impl Into<KeyMaterial>) -> Self {
        self.key_share = Some(share.into());
        self
    }

    pub fn key(&self) -> GrantKey {
        GrantKey::new(self.photo_id, self.grantee)
    }

    pub fn has_key_share(&self) -> bool {
        self.key_share.is_some()
    }
}
