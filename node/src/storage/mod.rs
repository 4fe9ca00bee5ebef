//! Storage backends for the chain snapshot.
//!
//! Concrete implementations of [`crate::chain::ChainStore`]:
//!
//! - an in-memory store ([`mem::InMemoryChainStore`]) for tests and
//!   single-run devnets,
//! - a RocksDB-backed store ([`rocksdb::RocksDbChainStore`]) for nodes
//!   that persist across restarts.

pub mod mem;
pub mod rocksdb;

pub use mem::InMemoryChainStore;
pub use rocksdb::{RocksDbChainStore, RocksDbConfig, StorageError};
