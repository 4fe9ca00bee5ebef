//! Peer discovery: a set of independent `NodeSource`s unioned by the
//! tracker, one source per mechanism (static list, DNS, mDNS, Bluetooth,
//! swarm peers), each degrading independently rather than failing the
//! whole union on one source's error.

pub mod bluetooth;
pub mod dns;
pub mod mdns;
pub mod random;
pub mod static_ip;

pub use bluetooth::BluetoothSource;
pub use dns::DnsSource;
pub use mdns::MdnsSource;
pub use random::RandomSource;
pub use static_ip::StaticIpSource;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::provider::{Node, Provider};

/// A source failed to discover peers. Never fatal to the union, the
/// tracker logs and continues with whatever other sources returned.
#[derive(Debug)]
pub struct DiscoveryError(pub String);

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "discovery error: {}", self.0)
    }
}

impl std::error::Error for DiscoveryError {}

/// One way of finding candidate peers advertising `port`.
pub trait NodeSource: Send + Sync {
    fn discover(&self, port: u16) -> Result<HashSet<Node>, DiscoveryError>;
}

/// Reports a provider's already-connected swarm peers as a discovery
/// source, so nodes already visible through content distribution count as
/// candidate gossip peers too.
pub struct ProviderNodeSource {
    provider: Arc<dyn Provider>,
}

impl ProviderNodeSource {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

impl NodeSource for ProviderNodeSource {
    fn discover(&self, port: u16) -> Result<HashSet<Node>, DiscoveryError> {
        Ok(self.provider.nodes(port))
    }
}

/// Unions every source's result, discarding individual failures.
pub fn discover_all(sources: &[Box<dyn NodeSource>], port: u16) -> HashSet<Node> {
    let mut nodes = HashSet::new();
    for source in sources {
        if let Ok(found) = source.discover(port) {
            nodes.extend(found);
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;
    impl NodeSource for Failing {
        fn discover(&self, _port: u16) -> Result<HashSet<Node>, DiscoveryError> {
            Err(DiscoveryError("boom".to_string()))
        }
    }

    #[test]
    fn one_failing_source_does_not_prevent_others_from_contributing() {
        let sources: Vec<Box<dyn NodeSource>> = vec![
            Box::new(Failing),
            Box::new(StaticIpSource::new(vec!["203.0.113.1".to_string()])),
        ];
        let nodes = discover_all(&sources, 29636);
        assert_eq!(nodes.len(), 1);
    }
}
