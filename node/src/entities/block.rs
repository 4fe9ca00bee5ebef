//! Blocks: the atomic, append-only unit of the chain.

use serde::{Deserialize, Serialize};

use crate::crypto::Wallet;
use crate::entities::SignedTransaction;
use crate::entities::canon::{canonical_hash, to_canonical_bytes};
use crate::entities::proof::Proof;

/// A block. `block_hash` is never stored as a field, it is always
/// recomputed from `{transactions, timestamp, previous_hash, miner_wallet,
/// proof}`, so there is no way to construct a block whose advertised hash
/// disagrees with its contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub transactions: Vec<SignedTransaction>,
    pub timestamp: f64,
    pub previous_hash: String,
    pub miner_wallet: Wallet,
    pub proof: Proof,
}

impl Block {
    pub fn new(
        transactions: Vec<SignedTransaction>,
        timestamp: f64,
        previous_hash: impl Into<String>,
        miner_wallet: Wallet,
        proof: Proof,
    ) -> Self {
        Self {
            transactions,
            timestamp,
            previous_hash: previous_hash.into(),
            miner_wallet,
            proof,
        }
    }

    /// Sorted-key JSON bytes of exactly the five hashed fields.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }

    /// `hex(SHA256(canonical_bytes))`.
    pub fn hash(&self) -> String {
        canonical_hash(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::model_ref::ModelRef;

    fn sample_block(previous_hash: &str, completion: f64) -> Block {
        Block::new(
            Vec::new(),
            1_700_000_000.0,
            previous_hash,
            Wallet::from_identity("aa"),
            Proof::new(completion, "mnist", "", "", "", ModelRef::new("h", "m")),
        )
    }

    #[test]
    fn hash_is_stable_across_serialisation_round_trip() {
        let block = sample_block("0", 94.24);
        let bytes = block.canonical_bytes();
        let decoded: Block = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(block.hash(), decoded.hash());
    }

    #[test]
    fn different_blocks_hash_differently() {
        let a = sample_block("0", 94.24);
        let b = sample_block("0", 95.0);
        assert_ne!(a.hash(), b.hash());
    }
}
