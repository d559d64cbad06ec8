//! Collection registry: named, owned groupings of photo ids.
//!
//! Membership only grows, and only as a side effect of registering a photo
//! into a collection the caller owns.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::Principal;
use crate::error::{LedgerError, Response};
use crate::types::{CollectionId, PhotoId};
use crate::validation::Limits;

/// A named grouping of photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub owner: Principal,
    pub name: String,
    pub description: String,
    /// Member photos in insertion order.
    pub photo_ids: Vec<PhotoId>,
}

/// Arguments of a collection creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub description: String,
}

impl NewCollection {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Table of collections plus the id sequence counter.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    collections: BTreeMap<CollectionId, Collection>,
    last_id: u64,
}

impl CollectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next successful creation will receive.
    pub fn next_id(&self) -> CollectionId {
        CollectionId(self.last_id + 1)
    }

    /// Number of collections created so far.
    pub fn count(&self) -> u64 {
        self.last_id
    }

    /// Validate a creation and build the record it would store.
    pub fn prepare(
        &self,
        owner: Principal,
        new: NewCollection,
        limits: &Limits,
    ) -> Response<Collection> {
        limits.check_name(&new.name)?;
        limits.check_description(&new.description)?;

        Ok(Collection {
            id: self.next_id(),
            owner,
            name: new.name,
            description: new.description,
            photo_ids: Vec::new(),
        })
    }

    /// Store a prepared collection under the next id and advance the counter.
    ///
    /// Like photos, a collection never replaces an existing record, even
    /// when it was prepared before another insert.
    pub fn insert(&mut self, mut collection: Collection) -> CollectionId {
        let id = self.next_id();
        collection.id = id;
        self.last_id = id.0;
        self.collections.insert(id, collection);
        id
    }

    /// Look up a collection.
    pub fn get(&self, id: CollectionId) -> Response<&Collection> {
        self.collections
            .get(&id)
            .ok_or(LedgerError::CollectionNotFound(id))
    }

    /// Member photo ids in insertion order. No visibility filtering.
    pub fn photos(&self, id: CollectionId) -> Response<&[PhotoId]> {
        self.get(id).map(|c| c.photo_ids.as_slice())
    }

    /// Check that `caller` may add one more photo to collection `id`.
    ///
    /// Checked in order: existence, ownership, capacity.
    pub fn authorize_append(
        &self,
        id: CollectionId,
        caller: &Principal,
        limits: &Limits,
    ) -> Response<()> {
        let collection = self
            .collections
            .get(&id)
            .ok_or(LedgerError::InvalidCollection(id))?;

        if &collection.owner != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not owned by caller",
                id
            )));
        }

        if collection.photo_ids.len() >= limits.max_collection_photos {
            return Err(LedgerError::CollectionFull(id));
        }

        Ok(())
    }

    /// Append a photo to an authorized collection.
    pub fn append_photo(&mut self, id: CollectionId, photo_id: PhotoId) {
        if let Some(collection) = self.collections.get_mut(&id) {
            collection.photo_ids.push(photo_id);
        }
    }

    /// Iterate collections in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }
}
