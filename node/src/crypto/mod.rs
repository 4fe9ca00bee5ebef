//! Identity and signing primitives.
//!
//! This module wraps Ed25519 (`ed25519-dalek`) behind the narrow `sign`/
//! `verify` contract the rest of the crate depends on. Nothing outside
//! this module should reach for `ed25519_dalek` directly.

pub mod wallet;

pub use wallet::{OpenedWallet, Wallet, WalletError};
