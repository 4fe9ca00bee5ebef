//! Gossip wire protocol: message shapes, Snappy framing, and transport.

pub mod message;
pub mod transport;
pub mod wire;

pub use message::{
    AddTxRequest, AddTxResponse, ChainResponse, Envelope, HandshakePayload, MessageHeader,
    MessageType, NodesResponse, TxResponse,
};
pub use transport::{PeerAddr, Transport, TransportError, UdpTransport};
pub use wire::WireError;

#[cfg(target_os = "linux")]
pub use transport::BluetoothTransport;

/// Default UDP port the tracker listens on.
pub const DEFAULT_PORT: u16 = 29636;
