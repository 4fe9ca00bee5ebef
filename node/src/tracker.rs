//! Owns peer discovery, the connected-node registry, and the listening
//! datagram endpoint.
//!
//! Binding, discovery scheduling, and connection bookkeeping live here;
//! the content of request/response payloads is produced by
//! [`dispatch::handle_request`] / [`dispatch::handle_response`], which
//! take the chain and miner directly rather than the tracker reaching
//! into them. Both stay owned by the single I/O-loop task that drives
//! this tracker.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::SocketAddr;

use serde::Serialize;
use uuid::Uuid;

use crate::discovery::NodeSource;
use crate::protocol::{Envelope, MessageType, PeerAddr, Transport, TransportError, UdpTransport, WireError, wire};
use crate::provider::Node;

#[derive(Debug)]
pub enum TrackerError {
    Transport(TransportError),
    Wire(WireError),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Transport(e) => write!(f, "{e}"),
            TrackerError::Wire(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<TransportError> for TrackerError {
    fn from(e: TransportError) -> Self {
        TrackerError::Transport(e)
    }
}

impl From<WireError> for TrackerError {
    fn from(e: WireError) -> Self {
        TrackerError::Wire(e)
    }
}

pub struct Tracker {
    transport: Box<dyn Transport>,
    sources: Vec<Box<dyn NodeSource>>,
    connected: HashSet<Node>,
    pending_requests: HashMap<Uuid, MessageType>,
    advertised_port: u16,
}

impl Tracker {
    pub async fn bind(listen_addr: SocketAddr, advertised_port: u16, sources: Vec<Box<dyn NodeSource>>) -> Result<Self, TrackerError> {
        let transport = UdpTransport::bind(listen_addr).await?;
        Ok(Self {
            transport: Box::new(transport),
            sources,
            connected: HashSet::new(),
            pending_requests: HashMap::new(),
            advertised_port,
        })
    }

    /// Runs every configured `NodeSource`, admitting newly discovered
    /// nodes into the connected registry. Returns the nodes that were
    /// newly admitted (duplicates of already-connected nodes are
    /// refused).
    pub fn discover(&mut self) -> HashSet<Node> {
        let found = crate::discovery::discover_all(&self.sources, self.advertised_port);
        let mut admitted = HashSet::new();
        for node in found {
            if self.connect(node.clone()) {
                admitted.insert(node);
            }
        }
        admitted
    }

    /// Admits `node`, refusing a duplicate of an already-connected node.
    /// Returns whether it was newly admitted.
    pub fn connect(&mut self, node: Node) -> bool {
        self.connected.insert(node)
    }

    pub fn disconnect(&mut self, node: &Node) {
        self.connected.remove(node);
    }

    pub fn connected_nodes(&self) -> &HashSet<Node> {
        &self.connected
    }

    /// Nodes eligible for the `NODES` response. Bluetooth peers are
    /// never advertised onward.
    pub fn broadcastable_nodes(&self) -> Vec<Node> {
        self.connected.iter().filter(|n| n.is_broadcastable()).cloned().collect()
    }

    /// Sends a new request, remembering its id so the matching response
    /// is recognised as such rather than as an unsolicited request.
    pub async fn send_request(&mut self, to: &PeerAddr, message_type: MessageType, payload: impl Serialize) -> Result<Uuid, TrackerError> {
        let envelope = Envelope::request(message_type, payload);
        self.pending_requests.insert(envelope.message.id, message_type);
        let datagram = wire::encode(&envelope)?;
        self.transport.send(to, &datagram).await?;
        Ok(envelope.message.id)
    }

    pub async fn send_response(&self, to: &PeerAddr, envelope: &Envelope) -> Result<(), TrackerError> {
        let datagram = wire::encode(envelope)?;
        self.transport.send(to, &datagram).await?;
        Ok(())
    }

    /// Receives and decodes the next datagram. The returned bool is
    /// `true` if its id matches an outstanding request of ours (i.e. it
    /// is a response), `false` if it is an unsolicited request.
    pub async fn recv(&mut self) -> Result<(PeerAddr, Envelope, bool), TrackerError> {
        let (from, datagram) = self.transport.recv().await?;
        let envelope = wire::decode(&datagram)?;
        let is_response = self.pending_requests.remove(&envelope.message.id).is_some();
        Ok((from, envelope, is_response))
    }

    pub fn advertised_addr(&self) -> Option<PeerAddr> {
        self.transport.advertised_addr()
    }
}

/// Builds response/callback logic for each message type. Kept separate
/// from `Tracker` so the chain and miner never need to be reachable
/// *through* the tracker, only alongside it on the I/O loop.
pub mod dispatch {
    use super::*;
    use crate::chain::Chain;
    use crate::miner::Miner;
    use crate::protocol::{AddTxRequest, AddTxResponse, ChainResponse, HandshakePayload, NodesResponse, TxResponse};

    /// Produces the response payload for an incoming request.
    pub fn handle_request(envelope: &Envelope, tracker: &Tracker, chain: &Chain, miner: &mut Miner, our_version: &str) -> serde_json::Value {
        match envelope.message.message_type {
            MessageType::Handshake => serde_json::to_value(HandshakePayload {
                version: our_version.to_string(),
            }),
            MessageType::Nodes => serde_json::to_value(NodesResponse {
                addresses: tracker.broadcastable_nodes(),
            }),
            MessageType::Chain => serde_json::to_value(ChainResponse {
                link: chain.magnet_link().ok().flatten().unwrap_or_default(),
            }),
            MessageType::AddTx => {
                let added = match serde_json::from_value::<AddTxRequest>(envelope.payload.clone()) {
                    Ok(request) => miner.add_new_transaction(request.tx, chain),
                    Err(_) => false,
                };
                serde_json::to_value(AddTxResponse { added })
            }
            MessageType::Tx => serde_json::to_value(TxResponse {
                txs: miner.mempool().to_vec(),
            }),
            MessageType::Ping => Ok(serde_json::json!({})),
        }
        .expect("response payload must serialise")
    }

    /// Applies the side effect of a response to one of our own requests.
    /// `NODES` merges into the tracker's set; `CHAIN` drives fork
    /// resolution; `TX` re-ingests every transaction through the miner.
    pub fn handle_response(envelope: &Envelope, tracker: &mut Tracker, chain: &mut Chain, miner: &mut Miner) {
        match envelope.message.message_type {
            MessageType::Nodes => {
                if let Ok(response) = serde_json::from_value::<NodesResponse>(envelope.payload.clone()) {
                    for node in response.addresses {
                        tracker.connect(node);
                    }
                }
            }
            MessageType::Chain => {
                if let Ok(response) = serde_json::from_value::<ChainResponse>(envelope.payload.clone()) {
                    let _ = chain.resolve_conflict(&response.link);
                }
            }
            MessageType::Tx => {
                if let Ok(response) = serde_json::from_value::<TxResponse>(envelope.payload.clone()) {
                    for tx in response.txs {
                        miner.add_new_transaction(tx, chain);
                    }
                }
            }
            MessageType::Handshake | MessageType::AddTx | MessageType::Ping => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticIpSource;

    #[tokio::test]
    async fn duplicate_connection_is_refused() {
        let mut tracker = Tracker::bind("127.0.0.1:0".parse().unwrap(), 29636, Vec::new()).await.unwrap();
        let node = Node::new("203.0.113.5", 29636);
        assert!(tracker.connect(node.clone()));
        assert!(!tracker.connect(node));
        assert_eq!(tracker.connected_nodes().len(), 1);
    }

    #[tokio::test]
    async fn discover_admits_nodes_from_every_source() {
        let sources: Vec<Box<dyn NodeSource>> = vec![Box::new(StaticIpSource::new(vec!["203.0.113.9".to_string()]))];
        let mut tracker = Tracker::bind("127.0.0.1:0".parse().unwrap(), 29636, sources).await.unwrap();
        let admitted = tracker.discover();
        assert_eq!(admitted.len(), 1);
        assert_eq!(tracker.connected_nodes().len(), 1);
    }

    #[tokio::test]
    async fn loopback_request_is_recognised_as_unsolicited_by_the_receiver() {
        let mut a = Tracker::bind("127.0.0.1:0".parse().unwrap(), 29636, Vec::new()).await.unwrap();
        let mut b = Tracker::bind("127.0.0.1:0".parse().unwrap(), 29636, Vec::new()).await.unwrap();
        let b_addr = b.advertised_addr().unwrap();

        let sent_id = a.send_request(&b_addr, MessageType::Ping, serde_json::json!({})).await.unwrap();

        let (_from, envelope, is_response) = b.recv().await.unwrap();
        assert_eq!(envelope.message.id, sent_id);
        assert!(!is_response);
    }

    #[tokio::test]
    async fn response_to_our_own_request_is_recognised_as_such() {
        let mut a = Tracker::bind("127.0.0.1:0".parse().unwrap(), 29636, Vec::new()).await.unwrap();
        let mut b = Tracker::bind("127.0.0.1:0".parse().unwrap(), 29636, Vec::new()).await.unwrap();
        let b_addr = b.advertised_addr().unwrap();

        a.send_request(&b_addr, MessageType::Ping, serde_json::json!({})).await.unwrap();
        let (from, request, is_response) = b.recv().await.unwrap();
        assert!(!is_response);

        b.send_response(&from, &request.response_to(serde_json::json!({}))).await.unwrap();
        let (_, _response, is_response) = a.recv().await.unwrap();
        assert!(is_response);
    }
}
