//! Key escrow rules.
//!
//! The ledger performs no cryptography. It only decides whether a key share
//! may be attached to a grant and which key string a caller may retrieve.

use safesnap_core::{KeyMaterial, LedgerError, Photo, Principal, Response};

use crate::grant::AccessGrant;

/// Check that a key share may be attached to a grant on `photo`.
///
/// A share is only meaningful when the photo has an encryption key.
pub fn check_key_share(photo: &Photo, key_share: Option<&KeyMaterial>) -> Response<()> {
    if key_share.is_some() && !photo.is_encrypted() {
        return Err(LedgerError::InvalidKeyShare(photo.id()));
    }
    Ok(())
}

/// Select the key string `caller` may retrieve for `photo`.
///
/// The owner gets the canonical key. A grantee gets their share, if the
/// grant carries one. Everyone else is unauthorized.
pub fn release_key<'a>(
    photo: &'a Photo,
    grant: Option<&'a AccessGrant>,
    caller: &Principal,
) -> Response<&'a KeyMaterial> {
    let canonical = photo
        .encryption_key()
        .ok_or(LedgerError::KeyNotFound(photo.id()))?;

    if photo.is_owned_by(caller) {
        return Ok(canonical);
    }

    grant
        .and_then(|g| g.key_share.as_ref())
        .ok_or_else(|| {
            LedgerError::Unauthorized(format!("caller holds no key share for {}", photo.id()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use safesnap_core::{Keypair, Limits, NewPhoto, PhotoRegistry};

    fn principal(seed: u8) -> Principal {
        Keypair::from_seed(&[seed; 32]).principal()
    }

    fn photo(new: NewPhoto) -> Photo {
        PhotoRegistry::new()
            .prepare(principal(1), new, &Limits::default())
            .unwrap()
    }

    #[test]
    fn test_share_requires_encryption_key() {
        let plain = photo(NewPhoto::private("QmA"));
        let share = KeyMaterial::new("s");
        assert_eq!(
            check_key_share(&plain, Some(&share)),
            Err(LedgerError::InvalidKeyShare(plain.id()))
        );
        assert!(check_key_share(&plain, None).is_ok());

        let encrypted = photo(NewPhoto::private("QmB").with_encryption_key("k"));
        assert!(check_key_share(&encrypted, Some(&share)).is_ok());
    }

    #[test]
    fn test_owner_gets_canonical_key() {
        let encrypted = photo(NewPhoto::private("QmB").with_encryption_key("k"));
        let key = release_key(&encrypted, None, &principal(1)).unwrap();
        assert_eq!(key.expose(), "k");
    }

    #[test]
    fn test_grantee_gets_share_not_canonical_key() {
        let encrypted = photo(NewPhoto::private("QmB").with_encryption_key("k"));
        let grant = AccessGrant::view_only(encrypted.id(), principal(2)).with_key_share("s2");
        let key = release_key(&encrypted, Some(&grant), &principal(2)).unwrap();
        assert_eq!(key.expose(), "s2");
    }

    #[test]
    fn test_grant_without_share_is_unauthorized() {
        let encrypted = photo(NewPhoto::private("QmB").with_encryption_key("k"));
        let grant = AccessGrant::view_only(encrypted.id(), principal(2));
        assert!(release_key(&encrypted, Some(&grant), &principal(2))
            .unwrap_err()
            .is_unauthorized());
    }

    #[test]
    fn test_missing_key_is_not_found_even_for_owner() {
        let plain = photo(NewPhoto::public("QmA"));
        assert_eq!(
            release_key(&plain, None, &principal(1)),
            Err(LedgerError::KeyNotFound(plain.id()))
        );
    }
}
