//! Proptest generators for property-based testing.

use proptest::prelude::*;
use proptest::sample::select;

use safesnap_core::{
    CollectionId, KeyMaterial, Keypair, LedgerCall, NewCollection, NewPhoto, PhotoId, Principal,
};

/// Generate a random principal.
pub fn principal() -> impl Strategy<Value = Principal> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed).principal())
}

/// Generate a content hash that passes the default limits.
pub fn content_hash() -> impl Strategy<Value = String> {
    "Qm[A-Za-z0-9]{1,44}".prop_map(String::from)
}

/// Generate printable ASCII key material, possibly empty.
pub fn key_material() -> impl Strategy<Value = KeyMaterial> {
    "[ -~]{0,48}".prop_map(KeyMaterial::new)
}

/// Generate a collection name and description.
pub fn new_collection() -> impl Strategy<Value = NewCollection> {
    ("[A-Za-z0-9 ]{0,32}", "[ -~]{0,64}")
        .prop_map(|(name, description)| NewCollection::new(name, description))
}

/// Generate a photo registration; ids up to `max_collection` may not exist.
pub fn new_photo(max_collection: u64) -> impl Strategy<Value = NewPhoto> {
    (
        content_hash(),
        any::<bool>(),
        proptest::option::of(key_material()),
        proptest::option::weighted(0.3, 1..=max_collection.max(1)),
    )
        .prop_map(|(hash, is_private, key, collection)| {
            let mut photo = if is_private {
                NewPhoto::private(hash)
            } else {
                NewPhoto::public(hash)
            };
            photo.encryption_key = key;
            photo.collection_id = collection.map(CollectionId);
            photo
        })
}

/// Generate one call issued by one of `parties`.
///
/// Photo and collection ids are drawn from small ranges so a sequence mixes
/// hits and misses.
pub fn ledger_call(parties: Vec<Principal>) -> BoxedStrategy<(Principal, LedgerCall)> {
    let photo_id = (1u64..=8).prop_map(PhotoId);

    let register = new_photo(4).prop_map(LedgerCall::RegisterPhoto);
    let create = new_collection().prop_map(LedgerCall::CreateCollection);
    let grant = (
        photo_id.clone(),
        select(parties.clone()),
        proptest::option::of(key_material()),
    )
        .prop_map(|(photo_id, grantee, key_share)| LedgerCall::GrantAccess {
            photo_id,
            grantee,
            key_share,
        });
    let revoke = (photo_id, select(parties.clone()))
        .prop_map(|(photo_id, grantee)| LedgerCall::RevokeAccess { photo_id, grantee });

    let call = prop_oneof![
        3 => register,
        1 => create,
        3 => grant,
        2 => revoke,
    ];

    (select(parties), call).boxed()
}

/// Generate a sequence of up to `max_len` calls among `parties`.
pub fn call_sequence(
    parties: Vec<Principal>,
    max_len: usize,
) -> impl Strategy<Value = Vec<(Principal, LedgerCall)>> {
    prop::collection::vec(ledger_call(parties), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use safesnap_core::Limits;

    proptest! {
        #[test]
        fn test_generated_hashes_pass_limits(hash in content_hash()) {
            prop_assert!(Limits::default().check_content_hash(&hash).is_ok());
        }

        #[test]
        fn test_generated_keys_pass_limits(key in key_material()) {
            prop_assert!(Limits::default().check_encryption_key(Some(&key)).is_ok());
            prop_assert!(Limits::default().check_key_share(Some(&key)).is_ok());
        }

        #[test]
        fn test_calls_use_given_parties(
            calls in call_sequence(vec![Keypair::from_seed(&[1; 32]).principal()], 8)
        ) {
            let only = Keypair::from_seed(&[1; 32]).principal();
            for (caller, _) in calls {
                prop_assert_eq!(caller, only);
            }
        }
    }
}
