//! Sotamoon node library crate.
//!
//! Core building blocks for a proof-of-useful-work node where block
//! production is gated by demonstrating an ML model that exceeds the
//! chain-recorded benchmark score, rather than a hash puzzle:
//!
//! - canonical domain types (`entities`),
//! - identity and signing (`crypto`),
//! - content-addressed storage and distribution (`provider`),
//! - the external ML training/evaluation contract (`benchmark`),
//! - the chain itself (`chain`),
//! - mining orchestration (`miner`),
//! - peer discovery (`discovery`),
//! - the gossip wire protocol (`protocol`),
//! - the tracker tying discovery and gossip together (`tracker`),
//! - persistence (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! The `sotamoon-node` binary composes these pieces into a single-threaded
//! I/O loop plus one dedicated worker thread per active mining task.

pub mod benchmark;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod discovery;
pub mod entities;
pub mod metrics;
pub mod miner;
pub mod protocol;
pub mod provider;
pub mod storage;
pub mod tracker;

// Re-export top-level configuration types.
pub use config::{BenchmarkConfig, DiscoveryConfig, MetricsConfig, NodeConfig, ProtocolConfig};

// Re-export the chain and its collaborators.
pub use chain::{Chain, ChainError, ChainStore};

// Re-export identity and signing.
pub use crypto::{OpenedWallet, Wallet, WalletError};

// Re-export the external benchmark contract and its HTTP client.
pub use benchmark::{Benchmark, BenchmarkError, BenchmarkFactory, HttpBenchmarkClient, Model, model_from_path};

// Re-export content-addressed storage.
pub use provider::{FileProvider, JointProvider, Node, Provider, ProviderError, SwarmProvider, SwarmSession};

// Re-export mining orchestration.
pub use miner::{MineOutcome, MineTask, MineTaskError, Miner};

// Re-export peer discovery.
pub use discovery::{DiscoveryError, NodeSource, discover_all};

// Re-export the gossip wire protocol.
pub use protocol::{
    DEFAULT_PORT, Envelope, MessageType, PeerAddr, Transport, TransportError, UdpTransport,
    WireError,
};

// Re-export the tracker.
pub use tracker::{Tracker, TrackerError};

// Re-export chain snapshot storage backends.
pub use storage::{InMemoryChainStore, RocksDbChainStore, RocksDbConfig, StorageError};

// Re-export metrics.
pub use metrics::{MetricsRegistry, NodeMetrics, run_prometheus_http_server};

// Re-export canonical domain types at the crate root for convenience.
pub use entities::{Block, MAX_STRING_LENGTH, ModelRef, Proof, SignedTransaction, Transaction};

/// Type alias for the provider stack a typical node runs: local cache
/// first, falling back to the swarm.
pub type DefaultProvider = JointProvider;

/// Type alias for the default chain snapshot store.
pub type DefaultChainStore = RocksDbChainStore;
