//! Wire message shapes.
//!
//! An envelope carrying a correlation id and a type tag, wrapping a
//! type-specific payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::SignedTransaction;
use crate::provider::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Handshake,
    Nodes,
    Chain,
    AddTx,
    Tx,
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

/// `{ "message": { "id": ..., "type": ... }, "payload": ... }`.
///
/// Request/response correlation is by `id`: a peer that receives an id it
/// previously sent treats the payload as a response, otherwise as a
/// request needing a reply with the same id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message: MessageHeader,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn request(message_type: MessageType, payload: impl Serialize) -> Self {
        Self {
            message: MessageHeader {
                id: Uuid::new_v4(),
                message_type,
            },
            payload: serde_json::to_value(payload).expect("payload must serialise"),
        }
    }

    pub fn response_to(&self, payload: impl Serialize) -> Self {
        Self {
            message: self.message.clone(),
            payload: serde_json::to_value(payload).expect("payload must serialise"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesResponse {
    pub addresses: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTxRequest {
    pub tx: SignedTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTxResponse {
    pub added: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResponse {
    pub txs: Vec<SignedTransaction>,
}
