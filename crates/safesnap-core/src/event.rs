//! Journal events: the record of every committed mutating call.
//!
//! An event is immutable once appended. Replaying the events of a journal in
//! sequence order through the state machine rebuilds every table.

use serde::{Deserialize, Serialize};

use crate::collection::NewCollection;
use crate::crypto::{Blake3Hash, Principal};
use crate::error::CodecError;
use crate::key::KeyMaterial;
use crate::photo::NewPhoto;
use crate::types::{EventId, PhotoId};

/// The kind of call an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CallKind {
    RegisterPhoto = 0x0001,
    CreateCollection = 0x0002,
    GrantAccess = 0x0100,
    RevokeAccess = 0x0101,
}

impl CallKind {
    /// Convert to u16 for storage.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Try to parse from u16.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::RegisterPhoto),
            0x0002 => Some(Self::CreateCollection),
            0x0100 => Some(Self::GrantAccess),
            0x0101 => Some(Self::RevokeAccess),
            _ => None,
        }
    }
}

/// A mutating call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCall {
    RegisterPhoto(NewPhoto),
    CreateCollection(NewCollection),
    GrantAccess {
        photo_id: PhotoId,
        grantee: Principal,
        key_share: Option<KeyMaterial>,
    },
    RevokeAccess {
        photo_id: PhotoId,
        grantee: Principal,
    },
}

impl LedgerCall {
    pub fn kind(&self) -> CallKind {
        match self {
            LedgerCall::RegisterPhoto(_) => CallKind::RegisterPhoto,
            LedgerCall::CreateCollection(_) => CallKind::CreateCollection,
            LedgerCall::GrantAccess { .. } => CallKind::GrantAccess,
            LedgerCall::RevokeAccess { .. } => CallKind::RevokeAccess,
        }
    }
}

/// A committed call at a journal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the journal (1-indexed, dense).
    pub seq: u64,

    /// The principal that issued the call.
    pub caller: Principal,

    pub call: LedgerCall,
}

impl LedgerEvent {
    pub fn new(seq: u64, caller: Principal, call: LedgerCall) -> Self {
        Self { seq, caller, call }
    }

    pub fn kind(&self) -> CallKind {
        self.call.kind()
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CodecError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        ciborium::from_reader(bytes).map_err(|e| CodecError::Decoding(e.to_string()))
    }

    /// Content address of this event: Blake3 of its encoded bytes.
    pub fn compute_id(&self) -> Result<EventId, CodecError> {
        Ok(event_id_of(&self.to_bytes()?))
    }
}

/// Content address of already-encoded event bytes.
pub fn event_id_of(bytes: &[u8]) -> EventId {
    EventId(Blake3Hash::hash(bytes).0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn caller() -> Principal {
        Keypair::from_seed(&[3u8; 32]).principal()
    }

    #[test]
    fn test_event_bytes_roundtrip() {
        let event = LedgerEvent::new(
            1,
            caller(),
            LedgerCall::RegisterPhoto(NewPhoto::private("QmA").with_encryption_key("k")),
        );
        let bytes = event.to_bytes().unwrap();
        assert_eq!(LedgerEvent::from_bytes(&bytes).unwrap(), event);
    }

    #[test]
    fn test_event_id_deterministic() {
        let event = LedgerEvent::new(
            2,
            caller(),
            LedgerCall::RevokeAccess {
                photo_id: PhotoId(1),
                grantee: caller(),
            },
        );
        assert_eq!(event.compute_id().unwrap(), event.compute_id().unwrap());
    }

    #[test]
    fn test_seq_changes_id() {
        let call = LedgerCall::CreateCollection(NewCollection::new("a", "b"));
        let e1 = LedgerEvent::new(1, caller(), call.clone());
        let e2 = LedgerEvent::new(2, caller(), call);
        assert_ne!(e1.compute_id().unwrap(), e2.compute_id().unwrap());
    }

    #[test]
    fn test_kind_codes() {
        for kind in [
            CallKind::RegisterPhoto,
            CallKind::CreateCollection,
            CallKind::GrantAccess,
            CallKind::RevokeAccess,
        ] {
            assert_eq!(CallKind::from_u16(kind.to_u16()), Some(kind));
        }
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(LedgerEvent::from_bytes(&[0xff, 0x00]).is_err());
    }
}
