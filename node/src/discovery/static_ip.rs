//! Fixed seed-node list.

use std::collections::HashSet;

use super::{DiscoveryError, NodeSource};
use crate::provider::Node;

pub struct StaticIpSource {
    addresses: Vec<String>,
}

impl StaticIpSource {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }
}

impl NodeSource for StaticIpSource {
    fn discover(&self, port: u16) -> Result<HashSet<Node>, DiscoveryError> {
        Ok(self.addresses.iter().map(|addr| Node::new(addr.clone(), port)).collect())
    }
}
