//! Canonical serialisation and content hashing shared by every entity.
//!
//! The spec requires every hash to be taken over a sorted-key JSON
//! encoding so independent implementations agree on bytes. `serde_json`'s
//! `Value::Object` is backed by a `BTreeMap` by default (the
//! `preserve_order` feature, which would switch it to an `IndexMap`, is
//! not enabled here), so routing everything through [`to_canonical_bytes`]
//! is sufficient to get deterministic, key-sorted output.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Encodes `value` as sorted-key JSON bytes.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    let as_value = serde_json::to_value(value).expect("entity should always be serialisable");
    serde_json::to_vec(&as_value).expect("serde_json::Value should always encode")
}

/// Hashes `value`'s canonical bytes with SHA-256, returning lowercase hex.
pub fn canonical_hash<T: Serialize>(value: &T) -> String {
    hex::encode(Sha256::digest(to_canonical_bytes(value)))
}

/// Hashes raw bytes with SHA-256, returning lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
