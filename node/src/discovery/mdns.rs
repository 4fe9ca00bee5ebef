//! Zeroconf/mDNS peer browsing for the `_sotamoon._udp.local.` service.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use super::{DiscoveryError, NodeSource};
use crate::provider::Node;

const SERVICE_TYPE: &str = "_sotamoon._udp.local.";

pub struct MdnsSource {
    browse_window: Duration,
}

impl MdnsSource {
    pub fn new(browse_window: Duration) -> Self {
        Self { browse_window }
    }
}

impl Default for MdnsSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl NodeSource for MdnsSource {
    fn discover(&self, port: u16) -> Result<HashSet<Node>, DiscoveryError> {
        let daemon = ServiceDaemon::new().map_err(|e| DiscoveryError(format!("mdns daemon: {e}")))?;
        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| DiscoveryError(format!("mdns browse: {e}")))?;

        let mut nodes = HashSet::new();
        let deadline = Instant::now() + self.browse_window;

        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            match receiver.recv_timeout(remaining) {
                Ok(ServiceEvent::ServiceResolved(info)) => {
                    for addr in info.get_addresses() {
                        nodes.insert(Node::new(addr.to_string(), port));
                    }
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }

        let _ = daemon.shutdown();
        Ok(nodes)
    }
}
