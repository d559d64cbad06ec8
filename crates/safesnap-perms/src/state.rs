//! The access control table.
//!
//! Holds one [`AccessGrant`] per (photo, grantee) pair and answers the
//! visibility and key-release questions against the photo registry.
//! Like the registries, writes are split into a checked `prepare_*` step and
//! an infallible apply step.

use std::collections::BTreeMap;

use safesnap_core::{
    CallContext, KeyMaterial, LedgerError, Limits, PhotoId, PhotoRegistry, Principal, Response,
};

use crate::grant::{AccessGrant, GrantKey};
use crate::keyshare::{check_key_share, release_key};

/// Aggregated grant state.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    /// All grants indexed by (photo, grantee).
    grants: BTreeMap<GrantKey, AccessGrant>,
}

impl AccessControl {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the caller may view a photo.
    ///
    /// True for the owner, for anyone when the photo is public, and for
    /// holders of a grant. Denial is `Ok(false)`, never an error.
    pub fn can_view(
        &self,
        photos: &PhotoRegistry,
        ctx: &CallContext,
        photo_id: PhotoId,
    ) -> Response<bool> {
        let photo = photos.get(photo_id)?;

        if photo.is_owned_by(&ctx.caller) || !photo.is_private() {
            return Ok(true);
        }

        Ok(self.get(photo_id, &ctx.caller).is_some())
    }

    /// Check a grant request and build the record it would store.
    ///
    /// Checked in order: photo existence, ownership, share length, share
    /// validity.
    pub fn prepare_grant(
        &self,
        photos: &PhotoRegistry,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
        key_share: Option<KeyMaterial>,
        limits: &Limits,
    ) -> Response<AccessGrant> {
        let photo = photos.get(photo_id)?;
        require_owner(photo.owner(), ctx, photo_id)?;
        limits.check_key_share(key_share.as_ref())?;
        check_key_share(photo, key_share.as_ref())?;

        Ok(AccessGrant {
            photo_id,
            grantee,
            key_share,
        })
    }

    /// Store a grant, replacing any previous grant for the same pair.
    pub fn put(&mut self, grant: AccessGrant) -> Option<AccessGrant> {
        self.grants.insert(grant.key(), grant)
    }

    /// Check a revoke request.
    ///
    /// Revoking a pair that holds no grant is allowed.
    pub fn prepare_revoke(
        &self,
        photos: &PhotoRegistry,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
    ) -> Response<GrantKey> {
        let photo = photos.get(photo_id)?;
        require_owner(photo.owner(), ctx, photo_id)?;
        Ok(GrantKey::new(photo_id, grantee))
    }

    /// Delete a grant if present.
    pub fn remove(&mut self, key: &GrantKey) -> Option<AccessGrant> {
        self.grants.remove(key)
    }

    /// Retrieve the key string the caller is entitled to.
    pub fn encryption_key(
        &self,
        photos: &PhotoRegistry,
        ctx: &CallContext,
        photo_id: PhotoId,
    ) -> Response<KeyMaterial> {
        let photo = photos.get(photo_id)?;
        let grant = self.get(photo_id, &ctx.caller);
        release_key(photo, grant, &ctx.caller).cloned()
    }

    /// Whether a grant exists for the pair.
    pub fn has_grant(
        &self,
        photos: &PhotoRegistry,
        photo_id: PhotoId,
        grantee: &Principal,
    ) -> Response<bool> {
        photos.get(photo_id)?;
        Ok(self.get(photo_id, grantee).is_some())
    }

    /// Current grantees of a photo, ordered by principal. Owner only.
    pub fn grantees(
        &self,
        photos: &PhotoRegistry,
        ctx: &CallContext,
        photo_id: PhotoId,
    ) -> Response<Vec<Principal>> {
        let photo = photos.get(photo_id)?;
        require_owner(photo.owner(), ctx, photo_id)?;
        Ok(self.grants_for_photo(photo_id).map(|g| g.grantee).collect())
    }

    /// Look up a grant without any checks.
    pub fn get(&self, photo_id: PhotoId, grantee: &Principal) -> Option<&AccessGrant> {
        self.grants.get(&GrantKey::new(photo_id, *grantee))
    }

    /// All grants of a photo, ordered by grantee.
    pub fn grants_for_photo(&self, photo_id: PhotoId) -> impl Iterator<Item = &AccessGrant> {
        self.grants
            .range(GrantKey::first_of(photo_id)..=GrantKey::last_of(photo_id))
            .map(|(_, g)| g)
    }

    /// All grants held by a principal, ordered by photo.
    pub fn grants_for<'a>(
        &'a self,
        grantee: &'a Principal,
    ) -> impl Iterator<Item = &'a AccessGrant> + 'a {
        self.grants.values().filter(move |g| &g.grantee == grantee)
    }

    /// Iterate all grants in key order.
    pub fn iter(&self) -> impl Iterator<Item = &AccessGrant> {
        self.grants.values()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

fn require_owner(owner: &Principal, ctx: &CallContext, photo_id: PhotoId) -> Response<()> {
    if ctx.is(owner) {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized(format!(
            "caller does not own {}",
            photo_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safesnap_core::{Keypair, NewPhoto};

    struct Setup {
        photos: PhotoRegistry,
        acl: AccessControl,
        owner: CallContext,
        viewer: CallContext,
    }

    fn principal(seed: u8) -> Principal {
        Keypair::from_seed(&[seed; 32]).principal()
    }

    fn setup() -> Setup {
        Setup {
            photos: PhotoRegistry::new(),
            acl: AccessControl::new(),
            owner: CallContext::new(principal(1)),
            viewer: CallContext::new(principal(2)),
        }
    }

    impl Setup {
        fn register(&mut self, new: NewPhoto) -> PhotoId {
            let photo = self
                .photos
                .prepare(self.owner.caller, new, &Limits::default())
                .unwrap();
            self.photos.insert(photo)
        }

        fn grant(&mut self, photo_id: PhotoId, share: Option<&str>) -> Response<()> {
            let grant = self.acl.prepare_grant(
                &self.photos,
                &self.owner,
                photo_id,
                self.viewer.caller,
                share.map(KeyMaterial::from),
                &Limits::default(),
            )?;
            self.acl.put(grant);
            Ok(())
        }

        fn revoke(&mut self, photo_id: PhotoId) -> Response<()> {
            let key =
                self.acl
                    .prepare_revoke(&self.photos, &self.owner, photo_id, self.viewer.caller)?;
            self.acl.remove(&key);
            Ok(())
        }
    }

    #[test]
    fn test_grant_and_revoke_toggle_visibility() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmHash123"));

        assert!(!s.acl.can_view(&s.photos, &s.viewer, id).unwrap());
        s.grant(id, None).unwrap();
        assert!(s.acl.can_view(&s.photos, &s.viewer, id).unwrap());
        s.revoke(id).unwrap();
        assert!(!s.acl.can_view(&s.photos, &s.viewer, id).unwrap());
    }

    #[test]
    fn test_public_photo_visible_without_grant() {
        let mut s = setup();
        let id = s.register(NewPhoto::public("QmHash456"));
        assert!(s.acl.can_view(&s.photos, &s.viewer, id).unwrap());
        assert!(s.acl.is_empty());
    }

    #[test]
    fn test_owner_always_views() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmHash789"));
        assert!(s.acl.can_view(&s.photos, &s.owner, id).unwrap());
    }

    #[test]
    fn test_can_view_unknown_photo_is_not_found() {
        let s = setup();
        assert!(s
            .acl
            .can_view(&s.photos, &s.viewer, PhotoId(1))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_only_owner_grants() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmA"));
        let err = s
            .acl
            .prepare_grant(
                &s.photos,
                &s.viewer,
                id,
                s.viewer.caller,
                None,
                &Limits::default(),
            )
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_only_owner_revokes() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmA"));
        let err = s
            .acl
            .prepare_revoke(&s.photos, &s.viewer, id, s.viewer.caller)
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_share_on_unencrypted_photo_rejected() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmA"));
        assert_eq!(s.grant(id, Some("s")), Err(LedgerError::InvalidKeyShare(id)));
        assert!(s.acl.is_empty());
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmA"));
        s.grant(id, None).unwrap();
        s.revoke(id).unwrap();
        s.revoke(id).unwrap();
        assert!(s.acl.is_empty());
    }

    #[test]
    fn test_regrant_overwrites_share() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmA").with_encryption_key("k"));
        s.grant(id, Some("s1")).unwrap();
        s.grant(id, Some("s2")).unwrap();
        assert_eq!(s.acl.len(), 1);

        let key = s.acl.encryption_key(&s.photos, &s.viewer, id).unwrap();
        assert_eq!(key.expose(), "s2");

        s.grant(id, None).unwrap();
        assert!(s
            .acl
            .encryption_key(&s.photos, &s.viewer, id)
            .unwrap_err()
            .is_unauthorized());
    }

    #[test]
    fn test_stranger_cannot_get_key() {
        let mut s = setup();
        let id = s.register(NewPhoto::private("QmA").with_encryption_key("k"));
        let stranger = CallContext::new(principal(3));
        assert!(s
            .acl
            .encryption_key(&s.photos, &stranger, id)
            .unwrap_err()
            .is_unauthorized());
    }

    #[test]
    fn test_grantees_listing() {
        let mut s = setup();
        let first = s.register(NewPhoto::private("QmA"));
        let second = s.register(NewPhoto::private("QmB"));
        s.grant(first, None).unwrap();

        assert_eq!(
            s.acl.grantees(&s.photos, &s.owner, first).unwrap(),
            vec![s.viewer.caller]
        );
        assert!(s.acl.grantees(&s.photos, &s.owner, second).unwrap().is_empty());
        assert!(s
            .acl
            .grantees(&s.photos, &s.viewer, first)
            .unwrap_err()
            .is_unauthorized());
        assert_eq!(s.acl.grants_for(&s.viewer.caller).count(), 1);
    }

    #[test]
    fn test_has_grant_requires_photo() {
        let s = setup();
        assert!(s
            .acl
            .has_grant(&s.photos, PhotoId(4), &s.viewer.caller)
            .unwrap_err()
            .is_not_found());
    }
}
