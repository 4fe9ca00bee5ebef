//! Top-level configuration for a sotamoon node.
//!
//! One struct per collaborator (benchmark service, discovery, gossip
//! listener, storage, metrics), composed into a single [`NodeConfig`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::protocol::DEFAULT_PORT;
use crate::storage::RocksDbConfig;

/// Configuration for the HTTP client to the external benchmark service.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    /// Base URL of the benchmark service, e.g. `"http://127.0.0.1:8090"`.
    pub base_url: String,
    /// Request timeout for `/mine` and `/evaluate` calls.
    pub timeout: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Which `NodeSource`s the tracker assembles at startup.
#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    pub static_addresses: Vec<String>,
    pub dns_hostnames: Vec<String>,
    pub mdns_enabled: bool,
    pub bluetooth_enabled: bool,
    /// How often the tracker re-runs discovery, in seconds.
    pub interval_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            static_addresses: Vec::new(),
            dns_hostnames: Vec::new(),
            mdns_enabled: false,
            bluetooth_enabled: false,
            interval_secs: 60,
        }
    }
}

/// Configuration for the UDP gossip listener.
#[derive(Clone, Debug)]
pub struct ProtocolConfig {
    /// Local address the `UdpTransport` binds to.
    pub listen_addr: SocketAddr,
    /// Port advertised to peers, usually equal to `listen_addr`'s port.
    pub advertised_port: u16,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{DEFAULT_PORT}")
                .parse()
                .expect("hard-coded listen address should parse"),
            advertised_port: DEFAULT_PORT,
        }
    }
}

/// Top-level configuration for a sotamoon node.
///
/// This aggregates all the sub-configs needed to wire up a typical node:
///
/// - the local content-addressed cache (`cache_dir`),
/// - the external benchmark service (`benchmark`),
/// - peer discovery (`discovery`),
/// - the gossip listener (`protocol`),
/// - persistent storage (`storage`),
/// - the Prometheus metrics exporter (`metrics`),
/// - and the chain length this node mines up to (`generate_blocks`).
#[derive(Clone, Debug)]
pub struct NodeConfig {
    pub cache_dir: PathBuf,
    pub benchmark: BenchmarkConfig,
    pub discovery: DiscoveryConfig,
    pub protocol: ProtocolConfig,
    pub storage: RocksDbConfig,
    pub metrics: MetricsConfig,
    /// Mine new blocks until the chain reaches this length, then stop.
    pub generate_blocks: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/cache"),
            benchmark: BenchmarkConfig::default(),
            discovery: DiscoveryConfig::default(),
            protocol: ProtocolConfig::default(),
            storage: RocksDbConfig::default(),
            metrics: MetricsConfig::default(),
            generate_blocks: 1,
        }
    }
}
