//! Snappy-compressed JSON framing.

use std::fmt;

use super::message::Envelope;

#[derive(Debug)]
pub enum WireError {
    Json(serde_json::Error),
    Compression(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Json(e) => write!(f, "malformed envelope JSON: {e}"),
            WireError::Compression(msg) => write!(f, "snappy framing error: {msg}"),
        }
    }
}

impl std::error::Error for WireError {}

/// Serialises `envelope` to JSON and Snappy-compresses the result.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, WireError> {
    let json = serde_json::to_vec(envelope).map_err(WireError::Json)?;
    let mut encoder = snap::raw::Encoder::new();
    encoder
        .compress_vec(&json)
        .map_err(|e| WireError::Compression(e.to_string()))
}

/// Inverse of [`encode`].
pub fn decode(datagram: &[u8]) -> Result<Envelope, WireError> {
    let mut decoder = snap::raw::Decoder::new();
    let json = decoder
        .decompress_vec(datagram)
        .map_err(|e| WireError::Compression(e.to_string()))?;
    serde_json::from_slice(&json).map_err(WireError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::message::MessageType;

    #[test]
    fn encode_then_decode_round_trips_an_envelope() {
        let envelope = Envelope::request(MessageType::Ping, serde_json::json!({}));
        let datagram = encode(&envelope).unwrap();
        let decoded = decode(&datagram).unwrap();
        assert_eq!(envelope.message.id, decoded.message.id);
        assert_eq!(envelope.message.message_type, decoded.message.message_type);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"not a snappy frame").is_err());
    }
}
