//! Datagram transport abstraction.
//!
//! UDP is the primary transport; Bluetooth RFCOMM is the alternate
//! stream-oriented path for peers discovered over Bluetooth. Both speak
//! the same `Transport` contract so the tracker's dispatch loop does not
//! care which one carried a given envelope.

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::net::UdpSocket;

/// Where an envelope came from or is going to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PeerAddr {
    Udp(SocketAddr),
    Bluetooth(String),
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerAddr::Udp(addr) => write!(f, "udp://{addr}"),
            PeerAddr::Bluetooth(addr) => write!(f, "bt://{addr}"),
        }
    }
}

#[derive(Debug)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A datagram transport: send a framed message to a peer, or receive the
/// next one addressed to us.
pub trait Transport: Send + Sync {
    fn send<'a>(&'a self, to: &'a PeerAddr, datagram: &'a [u8]) -> BoxFuture<'a, Result<(), TransportError>>;

    fn recv<'a>(&'a self) -> BoxFuture<'a, Result<(PeerAddr, Vec<u8>), TransportError>>;

    /// Our own address as peers would dial it, where that is meaningful
    /// (UDP). Bluetooth's RFCOMM channel is negotiated per-connection, so
    /// it has none.
    fn advertised_addr(&self) -> Option<PeerAddr>;
}

const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

/// The default transport: a single bound UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| TransportError(format!("bind {addr}: {e}")))?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket
            .local_addr()
            .map_err(|e| TransportError(format!("local_addr: {e}")))
    }
}

impl Transport for UdpTransport {
    fn send<'a>(&'a self, to: &'a PeerAddr, datagram: &'a [u8]) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(async move {
            let PeerAddr::Udp(addr) = to else {
                return Err(TransportError("UdpTransport cannot address a non-UDP peer".to_string()));
            };
            self.socket
                .send_to(datagram, addr)
                .await
                .map_err(|e| TransportError(format!("send_to {addr}: {e}")))?;
            Ok(())
        })
    }

    fn recv<'a>(&'a self) -> BoxFuture<'a, Result<(PeerAddr, Vec<u8>), TransportError>> {
        Box::pin(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            let (len, from) = self
                .socket
                .recv_from(&mut buf)
                .await
                .map_err(|e| TransportError(format!("recv_from: {e}")))?;
            buf.truncate(len);
            Ok((PeerAddr::Udp(from), buf))
        })
    }

    fn advertised_addr(&self) -> Option<PeerAddr> {
        self.socket.local_addr().ok().map(PeerAddr::Udp)
    }
}

/// Bluetooth RFCOMM alternate transport, Linux-only. Since RFCOMM is a
/// byte stream rather than a datagram socket, each envelope is framed
/// with a 4-byte big-endian length prefix.
#[cfg(target_os = "linux")]
pub struct BluetoothTransport {
    address: String,
    stream: tokio::sync::Mutex<bluer::rfcomm::Stream>,
}

#[cfg(target_os = "linux")]
impl BluetoothTransport {
    pub fn new(address: String, stream: bluer::rfcomm::Stream) -> Self {
        Self {
            address,
            stream: tokio::sync::Mutex::new(stream),
        }
    }
}

#[cfg(target_os = "linux")]
impl Transport for BluetoothTransport {
    fn send<'a>(&'a self, _to: &'a PeerAddr, datagram: &'a [u8]) -> BoxFuture<'a, Result<(), TransportError>> {
        use tokio::io::AsyncWriteExt;
        Box::pin(async move {
            let len = u32::try_from(datagram.len())
                .map_err(|_| TransportError("datagram too large for RFCOMM frame".to_string()))?;
            let mut stream = self.stream.lock().await;
            stream
                .write_all(&len.to_be_bytes())
                .await
                .map_err(|e| TransportError(format!("rfcomm write: {e}")))?;
            stream
                .write_all(datagram)
                .await
                .map_err(|e| TransportError(format!("rfcomm write: {e}")))?;
            Ok(())
        })
    }

    fn recv<'a>(&'a self) -> BoxFuture<'a, Result<(PeerAddr, Vec<u8>), TransportError>> {
        use tokio::io::AsyncReadExt;
        Box::pin(async move {
            let mut stream = self.stream.lock().await;
            let mut len_buf = [0u8; 4];
            stream
                .read_exact(&mut len_buf)
                .await
                .map_err(|e| TransportError(format!("rfcomm read: {e}")))?;
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut buf = vec![0u8; len];
            stream
                .read_exact(&mut buf)
                .await
                .map_err(|e| TransportError(format!("rfcomm read: {e}")))?;
            Ok((PeerAddr::Bluetooth(self.address.clone()), buf))
        })
    }

    fn advertised_addr(&self) -> Option<PeerAddr> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loopback_send_then_recv_round_trips() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b_addr = PeerAddr::Udp(b.local_addr().unwrap());

        a.send(&b_addr, b"hello").await.unwrap();
        let (from, bytes) = b.recv().await.unwrap();

        assert_eq!(bytes, b"hello");
        assert_eq!(from, PeerAddr::Udp(a.local_addr().unwrap()));
    }
}
