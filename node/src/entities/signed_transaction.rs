//! A transaction bundled with the sender's signature over it.

use serde::{Deserialize, Serialize};

use crate::entities::Transaction;
use crate::entities::canon::{canonical_hash, to_canonical_bytes};

/// `Transaction` plus a hex signature over its canonical bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: String,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction, signature: impl Into<String>) -> Self {
        Self {
            transaction,
            signature: signature.into(),
        }
    }

    /// Verifies `signature` against `transaction.sender`'s identity.
    pub fn verify(&self) -> bool {
        self.transaction
            .sender
            .verify(&self.transaction.canonical_bytes(), &self.signature)
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }

    pub fn hash(&self) -> String {
        canonical_hash(self)
    }
}
