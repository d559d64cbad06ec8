//! Photo registry: identity, ownership and visibility of registered content.
//!
//! Photos are created once and never deleted. Every field is immutable after
//! registration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;
use crate::error::{LedgerError, Response};
use crate::key::KeyMaterial;
use crate::types::{CollectionId, PhotoId};
use crate::validation::Limits;

/// A registered content reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    id: PhotoId,
    owner: Principal,
    content_hash: String,
    is_private: bool,
    encryption_key: Option<KeyMaterial>,
    collection_id: Option<CollectionId>,
}

impl Photo {
    pub fn id(&self) -> PhotoId {
        self.id
    }

    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    /// The canonical encryption key, if the photo is encrypted.
    pub fn encryption_key(&self) -> Option<&KeyMaterial> {
        self.encryption_key.as_ref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption_key.is_some()
    }

    pub fn collection_id(&self) -> Option<CollectionId> {
        self.collection_id
    }

    /// Whether `principal` registered this photo.
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        &self.owner == principal
    }

    /// The publicly readable projection of this photo.
    pub fn metadata(&self) -> PhotoMetadata {
        PhotoMetadata {
            id: self.id,
            owner: self.owner,
            content_hash: self.content_hash.clone(),
            is_private: self.is_private,
            is_encrypted: self.is_encrypted(),
            collection_id: self.collection_id,
        }
    }
}

/// Photo fields readable by any caller. Key material is never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub id: PhotoId,
    pub owner: Principal,
    pub content_hash: String,
    pub is_private: bool,
    pub is_encrypted: bool,
    pub collection_id: Option<CollectionId>,
}

/// Arguments of a photo registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPhoto {
    pub content_hash: String,
    pub is_private: bool,
    pub encryption_key: Option<KeyMaterial>,
    pub collection_id: Option<CollectionId>,
}

impl NewPhoto {
    /// A public, unencrypted photo outside any collection.
    pub fn public(content_hash: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
            is_private: false,
            encryption_key: None,
            collection_id: None,
        }
    }

    /// A private, unencrypted photo outside any collection.
    pub fn private(content_hash: impl Into<String>) -> Self {
        Self {
            is_private: true,
            ..Self::public(content_hash)
        }
    }

    /// Attach an encryption key.
    pub fn with_encryption_key(mut self, key: impl Into<KeyMaterial>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// Register into an existing collection.
    pub fn in_collection(mut self, collection_id: CollectionId) -> Self {
        self.collection_id = Some(collection_id);
        self
    }
}

/// Table of registered photos plus the id sequence counter.
#[derive(Debug, Clone, Default)]
pub struct PhotoRegistry {
    photos: BTreeMap<PhotoId, Photo>,
    last_id: u64,
}

impl PhotoRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next successful registration will receive.
    pub fn next_id(&self) -> PhotoId {
        PhotoId(self.last_id + 1)
    }

    /// Number of photos registered so far (equals the last issued id).
    pub fn count(&self) -> u64 {
        self.last_id
    }

    /// Validate a registration and build the record it would store.
    ///
    /// Reads only; collection checks are the caller's concern since they
    /// live in another table.
    pub fn prepare(&self, owner: Principal, new: NewPhoto, limits: &Limits) -> Response<Photo> {
        limits.check_content_hash(&new.content_hash)?;
        limits.check_encryption_key(new.encryption_key.as_ref())?;

        Ok(Photo {
            id: self.next_id(),
            owner,
            content_hash: new.content_hash,
            is_private: new.is_private,
            encryption_key: new.encryption_key,
            collection_id: new.collection_id,
        })
    }

    /// Store a prepared photo under the next id and advance the counter.
    ///
    /// The id a photo was prepared with is only a preview: a photo prepared
    /// before another insert still receives a fresh id and never replaces an
    /// existing record.
    pub fn insert(&mut self, mut photo: Photo) -> PhotoId {
        let id = self.next_id();
        photo.id = id;
        self.last_id = id.0;
        self.photos.insert(id, photo);
        id
    }

    /// Look up a photo.
    pub fn get(&self, id: PhotoId) -> Response<&Photo> {
        self.photos.get(&id).ok_or(LedgerError::PhotoNotFound(id))
    }

    pub fn contains(&self, id: PhotoId) -> bool {
        self.photos.contains_key(&id)
    }

    /// Iterate photos in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Photo> {
        self.photos.values()
    }

    /// Photos registered by `owner`, in id order.
    pub fn owned_by<'a>(&'a self, owner: &'a Principal) -> impl Iterator<Item = &'a Photo> + 'a {
        self.photos.values().filter(move |p| p.is_owned_by(owner))
    }
}
