//! The Ledger: journaled, async API over the ledger state machine.
//!
//! Every successful mutating call is appended to the [`Store`] as a
//! [`LedgerEvent`] before it is committed to memory. Opening a ledger over an
//! existing store replays the journal to rebuild the tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use safesnap_core::{
    Blake3Hash, CallContext, Collection, CollectionId, KeyMaterial, LedgerCall, LedgerEvent,
    Limits, NewCollection, NewPhoto, PhotoId, PhotoMetadata, Principal, Response,
};
use safesnap_store::{AppendResult, Store, StoreExt};

use crate::error::{Result, SafeSnapError};
use crate::state::{CallOutcome, LedgerState};

/// Configuration for the Ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Fail `open` when a journaled call is rejected on replay or a
    /// checkpoint digest does not match. When false, such entries are
    /// skipped with a warning.
    pub verify_on_replay: bool,

    /// Record a state digest every N journal entries (0 disables).
    pub checkpoint_interval: u64,

    /// Input limits applied to every call.
    pub limits: Limits,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_on_replay: true,
            checkpoint_interval: 64,
            limits: Limits::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

struct Inner {
    state: LedgerState,
    /// Seq of the last journaled call.
    head_seq: u64,
}

/// The main Ledger struct.
///
/// Calls are totally ordered: one lock covers prepare, journal append and
/// commit, so a call either lands in both the journal and the tables or in
/// neither.
///
/// If another writer appended to the same store, the next mutating call
/// fails with [`SafeSnapError::JournalConflict`]. Before returning, the
/// ledger applies the foreign entries and moves its head past them, so
/// retrying the call appends after them.
pub struct Ledger<S: Store> {
    store: Arc<S>,
    config: LedgerConfig,
    inner: Mutex<Inner>,
}

impl<S: Store> Ledger<S> {
    /// Open a ledger over `store`, replaying any journaled calls.
    pub async fn open(store: S, config: LedgerConfig) -> Result<Self> {
        let store = Arc::new(store);
        let mut state = LedgerState::new(config.limits);

        let events = store.all_events().await?;
        let checkpoints: BTreeMap<u64, Blake3Hash> = store
            .checkpoints()
            .await?
            .into_iter()
            .map(|c| (c.seq, c.state_hash))
            .collect();

        let mut head_seq = 0;
        for event in events {
            replay_event(&mut state, &event, config.verify_on_replay)?;
            head_seq = event.seq;

            if let Some(expected) = checkpoints.get(&event.seq) {
                if state.state_hash() != *expected {
                    if config.verify_on_replay {
                        return Err(SafeSnapError::CheckpointMismatch { seq: event.seq });
                    }
                    tracing::warn!(seq = event.seq, "checkpoint digest mismatch on replay");
                }
            }
        }

        tracing::info!(
            events = head_seq,
            photos = state.photo_count(),
            collections = state.collection_count(),
            grants = state.access().len(),
            "ledger opened"
        );

        Ok(Self {
            store,
            config,
            inner: Mutex::new(Inner { state, head_seq }),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutating Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a photo owned by the caller.
    pub async fn register_photo(&self, ctx: &CallContext, new: NewPhoto) -> Result<PhotoId> {
        let call = LedgerCall::RegisterPhoto(new.clone());
        self.journaled(
            ctx,
            call,
            |state, ctx| state.prepare_photo(ctx, new),
            LedgerState::commit_photo,
        )
        .await
    }

    /// Create a collection owned by the caller.
    pub async fn create_collection(
        &self,
        ctx: &CallContext,
        new: NewCollection,
    ) -> Result<CollectionId> {
        let call = LedgerCall::CreateCollection(new.clone());
        self.journaled(
            ctx,
            call,
            |state, ctx| state.prepare_collection(ctx, new),
            LedgerState::commit_collection,
        )
        .await
    }

    /// Grant `grantee` access to a photo, optionally escrowing a key share.
    pub async fn grant_access(
        &self,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
        key_share: Option<KeyMaterial>,
    ) -> Result<()> {
        let call = LedgerCall::GrantAccess {
            photo_id,
            grantee,
            key_share: key_share.clone(),
        };
        self.journaled(
            ctx,
            call,
            |state, ctx| state.prepare_grant(ctx, photo_id, grantee, key_share),
            LedgerState::commit_grant,
        )
        .await
    }

    /// Revoke `grantee`'s access to a photo. Succeeds when no grant exists.
    pub async fn revoke_access(
        &self,
        ctx: &CallContext,
        photo_id: PhotoId,
        grantee: Principal,
    ) -> Result<()> {
        let call = LedgerCall::RevokeAccess { photo_id, grantee };
        self.journaled(
            ctx,
            call,
            |state, ctx| state.prepare_revoke(ctx, photo_id, grantee),
            LedgerState::commit_revoke,
        )
        .await
    }

    /// Run any mutating call.
    pub async fn execute(&self, ctx: &CallContext, call: LedgerCall) -> Result<CallOutcome> {
        let journal = call.clone();
        self.journaled(
            ctx,
            journal,
            |state, ctx| state.prepare(ctx, &call),
            LedgerState::commit,
        )
        .await
    }

    /// Prepare, journal, then commit one call under the ledger lock.
    async fn journaled<E, T>(
        &self,
        ctx: &CallContext,
        call: LedgerCall,
        prepare: impl FnOnce(&LedgerState, &CallContext) -> Response<E>,
        commit: impl FnOnce(&mut LedgerState, E) -> T,
    ) -> Result<T> {
        let mut inner = self.inner.lock().await;
        let kind = call.kind();

        let effect = match prepare(&inner.state, ctx) {
            Ok(effect) => effect,
            Err(e) => {
                tracing::debug!(?kind, caller = ?ctx.caller, error = %e, "call rejected");
                return Err(e.into());
            }
        };

        let seq = inner.head_seq + 1;
        let event = LedgerEvent::new(seq, ctx.caller, call);
        let bytes = event.to_bytes()?;

        match self.store.append_event(&event, &bytes).await? {
            AppendResult::Appended => {}
            AppendResult::AlreadyExists | AppendResult::Conflict { .. } => {
                tracing::warn!(seq, "journal seq already taken by another writer");
                self.catch_up(&mut inner).await?;
                return Err(SafeSnapError::JournalConflict { seq });
            }
        }

        inner.head_seq = seq;
        let output = commit(&mut inner.state, effect);
        tracing::debug!(seq, ?kind, caller = ?ctx.caller, "call committed");

        let interval = self.config.checkpoint_interval;
        if interval > 0 && seq % interval == 0 {
            let digest = inner.state.state_hash();
            // The call is already committed; a failed checkpoint only costs
            // replay verification for this seq.
            if let Err(e) = self.store.record_checkpoint(seq, &digest).await {
                tracing::warn!(seq, error = %e, "failed to record checkpoint");
            }
        }

        Ok(output)
    }

    /// Apply journal entries appended past our head by another writer.
    async fn catch_up(&self, inner: &mut Inner) -> Result<()> {
        let store_head = self.store.head_seq().await?;
        if store_head <= inner.head_seq {
            return Ok(());
        }

        let events = self
            .store
            .get_events_range(inner.head_seq + 1, store_head)
            .await?;
        for event in events {
            replay_event(&mut inner.state, &event, self.config.verify_on_replay)?;
            inner.head_seq = event.seq;
        }

        tracing::info!(head_seq = inner.head_seq, "caught up with journal");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Public metadata of a photo. Key material is never included.
    pub async fn get_photo(&self, photo_id: PhotoId) -> Result<PhotoMetadata> {
        Ok(self.inner.lock().await.state.get_photo(photo_id)?)
    }

    pub async fn can_view_photo(&self, ctx: &CallContext, photo_id: PhotoId) -> Result<bool> {
        Ok(self.inner.lock().await.state.can_view_photo(ctx, photo_id)?)
    }

    /// The key string the caller is entitled to: the canonical key for the
    /// owner, the escrowed share for a grantee.
    pub async fn get_encryption_key(
        &self,
        ctx: &CallContext,
        photo_id: PhotoId,
    ) -> Result<KeyMaterial> {
        Ok(self
            .inner
            .lock()
            .await
            .state
            .get_encryption_key(ctx, photo_id)?)
    }

    pub async fn has_grant(&self, photo_id: PhotoId, grantee: &Principal) -> Result<bool> {
        Ok(self.inner.lock().await.state.has_grant(photo_id, grantee)?)
    }

    /// Current grantees of a photo. Owner only.
    pub async fn grantees(&self, ctx: &CallContext, photo_id: PhotoId) -> Result<Vec<Principal>> {
        Ok(self.inner.lock().await.state.grantees(ctx, photo_id)?)
    }

    pub async fn get_collection(&self, collection_id: CollectionId) -> Result<Collection> {
        Ok(self.inner.lock().await.state.get_collection(collection_id)?)
    }

    /// Member photo ids in insertion order.
    pub async fn get_collection_photos(&self, collection_id: CollectionId) -> Result<Vec<PhotoId>> {
        Ok(self
            .inner
            .lock()
            .await
            .state
            .get_collection_photos(collection_id)?)
    }

    /// Photos `grantee` currently holds a grant on, in id order.
    pub async fn shared_with(&self, grantee: &Principal) -> Vec<PhotoId> {
        self.inner.lock().await.state.shared_with(grantee)
    }

    /// Public metadata of every photo `owner` registered, in id order.
    pub async fn photos_owned_by(&self, owner: &Principal) -> Vec<PhotoMetadata> {
        self.inner.lock().await.state.photos_owned_by(owner)
    }

    pub async fn photo_count(&self) -> u64 {
        self.inner.lock().await.state.photo_count()
    }

    pub async fn collection_count(&self) -> u64 {
        self.inner.lock().await.state.collection_count()
    }

    /// Digest of the current tables.
    pub async fn state_hash(&self) -> Blake3Hash {
        self.inner.lock().await.state.state_hash()
    }

    /// Seq of the last journaled call (0 when nothing has been journaled).
    pub async fn head_seq(&self) -> u64 {
        self.inner.lock().await.head_seq
    }

    /// Read the tables under the ledger lock.
    pub async fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.inner.lock().await.state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Journal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every journaled call, in order.
    pub async fn journal(&self) -> Result<Vec<LedgerEvent>> {
        Ok(self.store.all_events().await?)
    }

    /// Journaled calls issued by one principal, in order.
    pub async fn history(&self, caller: &Principal) -> Result<Vec<LedgerEvent>> {
        Ok(self.store.events_by_caller(caller).await?)
    }

    /// Record a digest of the current tables at the current head.
    pub async fn checkpoint(&self) -> Result<Option<Blake3Hash>> {
        let inner = self.inner.lock().await;
        if inner.head_seq == 0 {
            return Ok(None);
        }
        let digest = inner.state.state_hash();
        self.store.record_checkpoint(inner.head_seq, &digest).await?;
        Ok(Some(digest))
    }
}

fn replay_event(state: &mut LedgerState, event: &LedgerEvent, verify: bool) -> Result<()> {
    let ctx = CallContext::new(event.caller);
    match state.replay(&ctx, &event.call) {
        Ok(_) => Ok(()),
        Err(source) if verify => Err(SafeSnapError::Replay {
            seq: event.seq,
            source,
        }),
        Err(e) => {
            tracing::warn!(seq = event.seq, error = %e, "skipping rejected journal entry");
            Ok(())
        }
    }
}
