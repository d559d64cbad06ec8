//! The ledger state machine.
//!
//! [`LedgerState`] composes the photo registry, the collection registry and
//! the access control table. It is synchronous and owns no I/O; the async,
//! journaled [`Ledger`](crate::Ledger) drives it.
//!
//! Every mutating call runs as `prepare_*` (all checks, `&self`) followed by
//! `commit_*` (infallible, `&mut self`). Nothing is written until every check
//! has passed. The split is crate-private: outside callers go through
//! [`LedgerState::execute`] or the typed entry points, which never let a
//! prepared write outlive the state it was checked against.

use ciborium::Value;

use safesnap_core::canonical::{collection_value, grant_value, photo_value};
use safesnap_core::{
    encode_canonical, Blake3Hash, CallContext, Collection, CollectionId, CollectionRegistry,
    KeyMaterial, LedgerCall, Limits, NewCollection, NewPhoto, Photo, PhotoId, PhotoMetadata,
    PhotoRegistry, Principal, Response,
};
use safesnap_perms::{AccessControl, AccessGrant, GrantKey};

/// A fully checked write, ready to commit.
///
/// Only valid against the state it was prepared from; callers commit it
/// before the state changes again.
#[derive(Debug, Clone)]
pub(crate) enum Effect {
    RegisterPhoto(Photo),
    CreateCollection(Collection),
    GrantAccess(AccessGrant),
    RevokeAccess(GrantKey),
}

/// What a committed call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    PhotoRegistered(PhotoId),
    CollectionCreated(CollectionId),
    AccessGranted,
    AccessRevoked,
}

/// The three ledger tables plus the limits they are checked against.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    photos: PhotoRegistry,
    collections: CollectionRegistry,
    access: AccessControl,
    limits: Limits,
}

impl LedgerState {
    /// Create empty tables checked against `limits`.
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn photos(&self) -> &PhotoRegistry {
        &self.photos
    }

    pub fn collections(&self) -> &CollectionRegistry {
        &self.collections
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Prepare / Commit
    // ─────────────────────────────────────────────────────────────────────────

    /// Check a photo registration.
    ///
    /// Order: input validation, collection existence, collection ownership,
    /// collection capacity.
    pub(crate) fn prepare_photo(&self, ctx: &CallContext, new: NewPhoto) -> Response<Photo> {
        let photo = self.photos.prepare(ctx.caller, new, &self.limits)?;
        if let Some(collection_id) = photo.collection_id() {
            self.collections
                .authorize_append(collection_id, &ctx.caller, &self.limits)?;
        }
        Ok(photo)
    }

    pub(crate) fn commit_photo(&mut self, photo: Photo) -> PhotoId {
        let collection_id = photo.collection_id();
        let id = self.photos.insert(photo);
        if let Some(collection_id) = collection_id {
            self.collections.append_photo(collection_id, id);
        }
        id
    }

    pub(crate) fn prepare_collection(&self, ctx: &CallContext, new: NewCollection) -> Response<Collection> {
        self.collections.prepare(ctx.caller, new, &self.limits)
    }

    pub(crate) fn commit_collection(&mut self, collection: Collection) -> CollectionId {
        self.collections.insert(collection)
    }

    pub(crate) fn prepare_grant(
        &self,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
        key_share: Option<KeyMaterial>,
    ) -> Response<AccessGrant> {
        self.access
            .prepare_grant(&self.photos, ctx, photo_id, grantee, key_share, &self.limits)
    }

    /// Store a grant, overwriting any previous grant for the pair.
    pub(crate) fn commit_grant(&mut self, grant: AccessGrant) {
        self.access.put(grant);
    }

    pub(crate) fn prepare_revoke(
        &self,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
    ) -> Response<GrantKey> {
        self.access.prepare_revoke(&self.photos, ctx, photo_id, grantee)
    }

    pub(crate) fn commit_revoke(&mut self, key: GrantKey) {
        self.access.remove(&key);
    }

    /// Check any mutating call.
    pub(crate) fn prepare(&self, ctx: &CallContext, call: &LedgerCall) -> Response<Effect> {
        match call {
            LedgerCall::RegisterPhoto(new) => self
                .prepare_photo(ctx, new.clone())
                .map(Effect::RegisterPhoto),
            LedgerCall::CreateCollection(new) => self
                .prepare_collection(ctx, new.clone())
                .map(Effect::CreateCollection),
            LedgerCall::GrantAccess {
                photo_id,
                grantee,
                key_share,
            } => self
                .prepare_grant(ctx, *photo_id, *grantee, key_share.clone())
                .map(Effect::GrantAccess),
            LedgerCall::RevokeAccess { photo_id, grantee } => self
                .prepare_revoke(ctx, *photo_id, *grantee)
                .map(Effect::RevokeAccess),
        }
    }

    /// Apply a checked write.
    pub(crate) fn commit(&mut self, effect: Effect) -> CallOutcome {
        match effect {
            Effect::RegisterPhoto(photo) => CallOutcome::PhotoRegistered(self.commit_photo(photo)),
            Effect::CreateCollection(collection) => {
                CallOutcome::CollectionCreated(self.commit_collection(collection))
            }
            Effect::GrantAccess(grant) => {
                self.commit_grant(grant);
                CallOutcome::AccessGranted
            }
            Effect::RevokeAccess(key) => {
                self.commit_revoke(key);
                CallOutcome::AccessRevoked
            }
        }
    }

    /// Run any mutating call to completion.
    pub fn execute(&mut self, ctx: &CallContext, call: &LedgerCall) -> Response<CallOutcome> {
        let effect = self.prepare(ctx, call)?;
        Ok(self.commit(effect))
    }

    /// Re-run a call that was already accepted into the journal.
    ///
    /// Existence and ownership are checked as usual, but input limits are
    /// not: the call passed the limits in force when it was journaled, and
    /// tighter limits today must not drop it and shift every later id.
    pub fn replay(&mut self, ctx: &CallContext, call: &LedgerCall) -> Response<CallOutcome> {
        let limits = std::mem::replace(&mut self.limits, Limits::unbounded());
        let result = self.execute(ctx, call);
        self.limits = limits;
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutating entry points
    // ─────────────────────────────────────────────────────────────────────────

    pub fn register_photo(&mut self, ctx: &CallContext, new: NewPhoto) -> Response<PhotoId> {
        let photo = self.prepare_photo(ctx, new)?;
        Ok(self.commit_photo(photo))
    }

    pub fn create_collection(
        &mut self,
        ctx: &CallContext,
        new: NewCollection,
    ) -> Response<CollectionId> {
        let collection = self.prepare_collection(ctx, new)?;
        Ok(self.commit_collection(collection))
    }

    pub fn grant_access(
        &mut self,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
        key_share: Option<KeyMaterial>,
    ) -> Response<()> {
        let grant = self.prepare_grant(ctx, photo_id, grantee, key_share)?;
        self.commit_grant(grant);
        Ok(())
    }

    /// Revoke a grant. Revoking an absent grant succeeds.
    pub fn revoke_access(
        &mut self,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
    ) -> Response<()> {
        let key = self.prepare_revoke(ctx, photo_id, grantee)?;
        self.commit_revoke(key);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read-only entry points
    // ─────────────────────────────────────────────────────────────────────────

    pub fn get_photo(&self, photo_id: PhotoId) -> Response<PhotoMetadata> {
        self.photos.get(photo_id).map(Photo::metadata)
    }

    pub fn can_view_photo(&self, ctx: &CallContext, photo_id: PhotoId) -> Response<bool> {
        self.access.can_view(&self.photos, ctx, photo_id)
    }

    pub fn get_encryption_key(&self, ctx: &CallContext, photo_id: PhotoId) -> Response<KeyMaterial> {
        self.access.encryption_key(&self.photos, ctx, photo_id)
    }

    pub fn has_grant(&self, photo_id: PhotoId, grantee: &Principal) -> Response<bool> {
        self.access.has_grant(&self.photos, photo_id, grantee)
    }

    pub fn grantees(&self, ctx: &CallContext, photo_id: PhotoId) -> Response<Vec<Principal>> {
        self.access.grantees(&self.photos, ctx, photo_id)
    }

    pub fn get_collection(&self, collection_id: CollectionId) -> Response<Collection> {
        self.collections.get(collection_id).cloned()
    }

    pub fn get_collection_photos(&self, collection_id: CollectionId) -> Response<Vec<PhotoId>> {
        self.collections.photos(collection_id).map(<[PhotoId]>::to_vec)
    }

    /// Photos `grantee` currently holds a grant on, in id order.
    pub fn shared_with(&self, grantee: &Principal) -> Vec<PhotoId> {
        self.access.grants_for(grantee).map(|g| g.photo_id).collect()
    }

    /// Photos registered by `owner`, in id order.
    pub fn photos_owned_by(&self, owner: &Principal) -> Vec<PhotoMetadata> {
        self.photos.owned_by(owner).map(Photo::metadata).collect()
    }

    pub fn photo_count(&self) -> u64 {
        self.photos.count()
    }

    pub fn collection_count(&self) -> u64 {
        self.collections.count()
    }

    /// Blake3 digest over the canonical encoding of all three tables.
    ///
    /// Equal tables give equal digests regardless of the call history that
    /// produced them.
    pub fn state_hash(&self) -> Blake3Hash {
        let photos = self.photos.iter().map(photo_value).collect();
        let collections = self.collections.iter().map(collection_value).collect();
        let grants = self
            .access
            .iter()
            .map(|g| grant_value(g.photo_id, &g.grantee, g.key_share.as_ref()))
            .collect();

        let tables = Value::Array(vec![
            Value::Array(photos),
            Value::Array(collections),
            Value::Array(grants),
        ]);
        Blake3Hash::hash(&encode_canonical(&tables))
    }
}
