//! Property tests over random call sequences.

use proptest::prelude::*;

use safesnap::store::{MemoryStore, Store};
use safesnap::{CallContext, CallOutcome, Ledger, LedgerConfig, LedgerState, PhotoId, Principal};
use safesnap_testkit::{call_sequence, Accounts};

fn parties() -> Vec<Principal> {
    Accounts::new().principals()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn photo_ids_are_dense(calls in call_sequence(parties(), 40)) {
        let mut state = LedgerState::default();
        let mut issued = Vec::new();

        for (caller, call) in &calls {
            if let Ok(CallOutcome::PhotoRegistered(id)) = state.execute(&CallContext::new(*caller), call) {
                issued.push(id);
            }
        }

        let expected: Vec<PhotoId> = (1..=issued.len() as u64).map(PhotoId).collect();
        prop_assert_eq!(issued, expected);
        prop_assert_eq!(state.photo_count(), state.photos().iter().count() as u64);
    }

    #[test]
    fn owner_is_registering_caller(calls in call_sequence(parties(), 40)) {
        let mut state = LedgerState::default();
        let mut owners = Vec::new();

        for (caller, call) in &calls {
            if let Ok(CallOutcome::PhotoRegistered(id)) = state.execute(&CallContext::new(*caller), call) {
                owners.push((id, *caller));
            }
        }

        for (id, owner) in owners {
            prop_assert_eq!(state.get_photo(id).unwrap().owner, owner);
        }
    }

    #[test]
    fn failed_calls_leave_state_unchanged(calls in call_sequence(parties(), 40)) {
        let mut state = LedgerState::default();

        for (caller, call) in &calls {
            let before = state.state_hash();
            if state.execute(&CallContext::new(*caller), call).is_err() {
                prop_assert_eq!(state.state_hash(), before);
            }
        }
    }

    #[test]
    fn visibility_rule_holds(calls in call_sequence(parties(), 40)) {
        let mut state = LedgerState::default();
        for (caller, call) in &calls {
            let _ = state.execute(&CallContext::new(*caller), call);
        }

        for photo in state.photos().iter() {
            for party in parties() {
                let expected = photo.is_owned_by(&party)
                    || !photo.is_private()
                    || state.has_grant(photo.id(), &party).unwrap();
                let actual = state.can_view_photo(&CallContext::new(party), photo.id()).unwrap();
                prop_assert_eq!(actual, expected);
            }
        }
    }

    #[test]
    fn shares_only_on_encrypted_photos(calls in call_sequence(parties(), 40)) {
        let mut state = LedgerState::default();
        for (caller, call) in &calls {
            let _ = state.execute(&CallContext::new(*caller), call);
        }

        for grant in state.access().iter() {
            let photo = state.photos().get(grant.photo_id).unwrap();
            prop_assert!(grant.key_share.is_none() || photo.is_encrypted());
        }
    }

    #[test]
    fn journal_replay_reproduces_state(calls in call_sequence(parties(), 30)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ledger = Ledger::open(MemoryStore::new(), LedgerConfig::default())
                .await
                .unwrap();
            for (caller, call) in calls {
                let _ = ledger.execute(&CallContext::new(caller), call).await;
            }
            let journal = ledger.journal().await.unwrap();

            // Copy the journal into a fresh store and reopen.
            let copy = MemoryStore::new();
            for event in &journal {
                let bytes = event.to_bytes().unwrap();
                copy.append_event(event, &bytes).await.unwrap();
            }
            let reopened = Ledger::open(copy, LedgerConfig::default()).await.unwrap();

            assert_eq!(reopened.state_hash().await, ledger.state_hash().await);
            assert_eq!(reopened.head_seq().await, journal.len() as u64);
        });
    }
}
