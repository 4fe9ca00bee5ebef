//! Seed-hostname A-record resolution.
//!
//! Uses `hickory-resolver`'s blocking `Resolver`. This source runs on
//! the I/O loop like the others, so lookups are expected to be quick
//! local-resolver hits, not a long-running suspension point.

use std::collections::HashSet;

use hickory_resolver::Resolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};

use super::{DiscoveryError, NodeSource};
use crate::provider::Node;

pub struct DnsSource {
    hostnames: Vec<String>,
    resolver: Resolver,
}

impl DnsSource {
    pub fn new(hostnames: Vec<String>) -> Result<Self, DiscoveryError> {
        let resolver = Resolver::new(ResolverConfig::default(), ResolverOpts::default())
            .map_err(|e| DiscoveryError(format!("failed to build resolver: {e}")))?;
        Ok(Self { hostnames, resolver })
    }
}

impl NodeSource for DnsSource {
    fn discover(&self, port: u16) -> Result<HashSet<Node>, DiscoveryError> {
        let mut nodes = HashSet::new();
        for hostname in &self.hostnames {
            let response = match self.resolver.lookup_ip(hostname.as_str()) {
                Ok(r) => r,
                // One seed hostname failing to resolve shouldn't sink the
                // whole source; skip it and keep going.
                Err(_) => continue,
            };
            for ip in response.iter() {
                nodes.insert(Node::new(ip.to_string(), port));
            }
        }
        Ok(nodes)
    }
}
