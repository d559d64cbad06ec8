//! Canonical CBOR encoding for deterministic state digests.
//!
//! Follows RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Records are encoded as maps with small integer keys so that two ledgers
//! holding the same tables produce identical bytes on every platform.

use ciborium::value::Value;

use crate::collection::Collection;
use crate::crypto::Principal;
use crate::key::KeyMaterial;
use crate::photo::Photo;
use crate::types::PhotoId;

/// Photo field keys (integer keys for compact encoding).
mod photo_keys {
    pub const ID: u64 = 0;
    pub const OWNER: u64 = 1;
    pub const CONTENT_HASH: u64 = 2;
    pub const IS_PRIVATE: u64 = 3;
    pub const ENCRYPTION_KEY: u64 = 4;
    pub const COLLECTION_ID: u64 = 5;
}

/// Collection field keys.
mod collection_keys {
    pub const ID: u64 = 0;
    pub const OWNER: u64 = 1;
    pub const NAME: u64 = 2;
    pub const DESCRIPTION: u64 = 3;
    pub const PHOTO_IDS: u64 = 4;
}

/// Grant field keys.
mod grant_keys {
    pub const PHOTO_ID: u64 = 0;
    pub const GRANTEE: u64 = 1;
    pub const KEY_SHARE: u64 = 2;
}

fn int(n: u64) -> Value {
    Value::Integer(n.into())
}

fn principal_value(principal: &Principal) -> Value {
    Value::Bytes(principal.0.to_vec())
}

fn optional_key_value(key: Option<&KeyMaterial>) -> Value {
    match key {
        Some(k) => Value::Text(k.expose().to_owned()),
        None => Value::Null,
    }
}

/// Convert a photo to a CBOR value.
pub fn photo_value(photo: &Photo) -> Value {
    let collection = match photo.collection_id() {
        Some(id) => int(id.0),
        None => Value::Null,
    };

    Value::Map(vec![
        (int(photo_keys::ID), int(photo.id().0)),
        (int(photo_keys::OWNER), principal_value(photo.owner())),
        (
            int(photo_keys::CONTENT_HASH),
            Value::Text(photo.content_hash().to_owned()),
        ),
        (int(photo_keys::IS_PRIVATE), Value::Bool(photo.is_private())),
        (
            int(photo_keys::ENCRYPTION_KEY),
            optional_key_value(photo.encryption_key()),
        ),
        (int(photo_keys::COLLECTION_ID), collection),
    ])
}

/// Convert a collection to a CBOR value.
pub fn collection_value(collection: &Collection) -> Value {
    let members = collection.photo_ids.iter().map(|id| int(id.0)).collect();

    Value::Map(vec![
        (int(collection_keys::ID), int(collection.id.0)),
        (int(collection_keys::OWNER), principal_value(&collection.owner)),
        (int(collection_keys::NAME), Value::Text(collection.name.clone())),
        (
            int(collection_keys::DESCRIPTION),
            Value::Text(collection.description.clone()),
        ),
        (int(collection_keys::PHOTO_IDS), Value::Array(members)),
    ])
}

/// Convert an access grant (by its parts) to a CBOR value.
pub fn grant_value(photo_id: PhotoId, grantee: &Principal, key_share: Option<&KeyMaterial>) -> Value {
    Value::Map(vec![
        (int(grant_keys::PHOTO_ID), int(photo_id.0)),
        (int(grant_keys::GRANTEE), principal_value(grantee)),
        (int(grant_keys::KEY_SHARE), optional_key_value(key_share)),
    ])
}

/// Encode a CBOR value to canonical bytes.
pub fn encode_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner);
        }
        Value::Float(f) => {
            buf.push(0xfb);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        // Records never contain other value kinds; encode as `undefined`.
        _ => buf.push(0xf7),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5), keys sorted by encoded bytes.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_integers_single_byte() {
        assert_eq!(encode_canonical(&int(0)), vec![0x00]);
        assert_eq!(encode_canonical(&int(23)), vec![0x17]);
        assert_eq!(encode_canonical(&int(24)), vec![0x18, 24]);
        assert_eq!(encode_canonical(&int(256)), vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_map_keys_sorted() {
        let unordered = Value::Map(vec![(int(2), Value::Null), (int(0), Value::Bool(true))]);
        let ordered = Value::Map(vec![(int(0), Value::Bool(true)), (int(2), Value::Null)]);
        assert_eq!(encode_canonical(&unordered), encode_canonical(&ordered));
        assert_eq!(encode_canonical(&ordered), vec![0xa2, 0x00, 0xf5, 0x02, 0xf6]);
    }

    #[test]
    fn test_absent_and_empty_share_encode_differently() {
        let grantee = Principal::from_bytes([1u8; 32]);
        let absent = encode_canonical(&grant_value(PhotoId(1), &grantee, None));
        let empty_share = KeyMaterial::new("");
        let empty = encode_canonical(&grant_value(PhotoId(1), &grantee, Some(&empty_share)));
        assert_ne!(absent, empty);
    }

    #[test]
    fn test_negative_integer() {
        let v = Value::Integer((-1i64).into());
        assert_eq!(encode_canonical(&v), vec![0x20]);
    }
}
