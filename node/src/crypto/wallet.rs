//! Wallet identity and the `sign`/`verify` contract.
//!
//! A [`Wallet`] is a public identity: the hex-encoded Ed25519 verifying
//! key. An [`OpenedWallet`] additionally holds the signing key and can
//! produce signatures over arbitrary byte strings (in practice, the
//! canonical bytes of an entity).

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

/// Errors produced while constructing or using a wallet.
#[derive(Debug)]
pub enum WalletError {
    /// `identity` was not valid lowercase hex of the expected length.
    MalformedIdentity,
    /// `identity` decoded to bytes that are not a valid Ed25519 point.
    InvalidKey,
    /// A signature string was not valid lowercase hex.
    MalformedSignature,
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::MalformedIdentity => write!(f, "malformed wallet identity"),
            WalletError::InvalidKey => write!(f, "identity is not a valid public key"),
            WalletError::MalformedSignature => write!(f, "malformed signature"),
        }
    }
}

impl std::error::Error for WalletError {}

/// A public wallet identity.
///
/// Equality and hashing are by `identity` alone, a wallet's identity is
/// its public key. The JSON form is the bare hex string, not an object,
/// so it nests directly into canonical entity serialisations.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wallet {
    identity: String,
}

impl Wallet {
    /// Wraps an already-known hex identity without validating the key.
    ///
    /// Used when decoding wallets embedded in untrusted wire data; callers
    /// that need to know the key is well-formed should go through
    /// [`Wallet::verifying_key`].
    pub fn from_identity(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }

    /// Returns the hex-encoded public key.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Decodes the identity into an Ed25519 verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, WalletError> {
        let bytes = hex::decode(&self.identity).map_err(|_| WalletError::MalformedIdentity)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| WalletError::MalformedIdentity)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| WalletError::InvalidKey)
    }

    /// Verifies a detached hex signature over `message` under this wallet's
    /// identity.
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(key) = self.verifying_key() else {
            return false;
        };
        let Ok(sig_bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(sig_bytes): Result<[u8; 64], _> = sig_bytes.try_into() else {
            return false;
        };
        let signature = Signature::from_bytes(&sig_bytes);
        key.verify(message, &signature).is_ok()
    }
}

/// A wallet that also holds its private signing key.
pub struct OpenedWallet {
    wallet: Wallet,
    signing_key: SigningKey,
}

impl OpenedWallet {
    /// Generates a fresh wallet using OS randomness.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let signing_key = SigningKey::generate(&mut rng);
        Self::from_signing_key(signing_key)
    }

    /// Builds an opened wallet from a 32-byte seed, for deterministic tests
    /// and the embedded genesis miner.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let identity = hex::encode(signing_key.verifying_key().to_bytes());
        Self {
            wallet: Wallet::from_identity(identity),
            signing_key,
        }
    }

    /// Returns the public [`Wallet`] view of this identity.
    pub fn public(&self) -> Wallet {
        self.wallet.clone()
    }

    /// Signs `message`, returning a lowercase-hex detached signature.
    pub fn sign(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        hex::encode(signature.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let wallet = OpenedWallet::from_seed(&[9u8; 32]);
        let message = b"hello sotamoon";
        let signature = wallet.sign(message);

        assert!(wallet.public().verify(message, &signature));
    }

    #[test]
    fn tampered_message_fails_verification() {
        let wallet = OpenedWallet::from_seed(&[3u8; 32]);
        let signature = wallet.sign(b"original");

        assert!(!wallet.public().verify(b"tampered", &signature));
    }

    #[test]
    fn deterministic_identity_from_seed() {
        let a = OpenedWallet::from_seed(&[1u8; 32]);
        let b = OpenedWallet::from_seed(&[1u8; 32]);
        assert_eq!(a.public(), b.public());
    }

    #[test]
    fn malformed_identity_fails_closed() {
        let bogus = Wallet::from_identity("not-hex");
        assert!(!bogus.verify(b"anything", "00"));
    }
}
