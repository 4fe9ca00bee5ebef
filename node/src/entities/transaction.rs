//! Unsigned value-transfer transactions.

use serde::{Deserialize, Serialize};

use crate::crypto::Wallet;
use crate::entities::MAX_STRING_LENGTH;
use crate::entities::canon::{canonical_hash, to_canonical_bytes};

/// A value transfer from `sender` to `recipient`.
///
/// Canonical form is the sorted-key JSON of all five fields; equality and
/// hashing follow the canonical bytes, not field-by-field comparison, so
/// two transactions are the same transaction iff they'd serialise
/// identically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Wallet,
    pub recipient: Wallet,
    pub value: f64,
    /// Seconds since the Unix epoch.
    pub time: f64,
    pub message: String,
    pub gas: f64,
}

impl Transaction {
    pub fn new(
        sender: Wallet,
        recipient: Wallet,
        value: f64,
        time: f64,
        message: impl Into<String>,
        gas: f64,
    ) -> Self {
        Self {
            sender,
            recipient,
            value,
            time,
            message: message.into(),
            gas,
        }
    }

    /// Structural validity: independent of signatures or chain state.
    pub fn valid(&self) -> bool {
        self.sender != self.recipient
            && self.message.len() < MAX_STRING_LENGTH
            && self.gas > 0.0
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }

    pub fn hash(&self) -> String {
        canonical_hash(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(id: &str) -> Wallet {
        Wallet::from_identity(id)
    }

    #[test]
    fn self_transfer_is_invalid() {
        let tx = Transaction::new(wallet("aa"), wallet("aa"), 1.0, 0.0, "", 0.1);
        assert!(!tx.valid());
    }

    #[test]
    fn zero_gas_is_invalid() {
        let tx = Transaction::new(wallet("aa"), wallet("bb"), 1.0, 0.0, "", 0.0);
        assert!(!tx.valid());
    }

    #[test]
    fn overlong_message_is_invalid() {
        let tx = Transaction::new(wallet("aa"), wallet("bb"), 1.0, 0.0, "x".repeat(1024), 0.1);
        assert!(!tx.valid());
    }

    #[test]
    fn hash_is_stable_across_round_trip() {
        let tx = Transaction::new(wallet("aa"), wallet("bb"), 30.0, 12345.0, "hi", 0.1);
        let bytes = tx.canonical_bytes();
        let decoded: Transaction = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(tx.hash(), decoded.hash());
        assert_eq!(tx, decoded);
    }
}
