use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::membership::types::NodeId;
use crate::storage::types::Value;

/// A single framed message as it appears on the wire.
///
/// The body is kept as raw JSON so the runtime can route on `type` / `in_reply_to` before a
/// handler decides how to interpret the rest. Malformed bodies are therefore reported by the
/// handler that owns the type, not by the framing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub src: NodeId,
    pub dest: NodeId,
    pub body: serde_json::Value,
}

impl Message {
    /// Builds an outbound message, stamping the optional correlation ids into the body.
    pub fn new(
        src: NodeId,
        dest: NodeId,
        payload: &Payload,
        msg_id: Option<u64>,
        in_reply_to: Option<u64>,
    ) -> Result<Self> {
        let mut body = serde_json::to_value(payload)?;
        let fields = body
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("payload did not serialize to a JSON object"))?;

        if let Some(id) = msg_id {
            fields.insert("msg_id".to_string(), id.into());
        }
        if let Some(id) = in_reply_to {
            fields.insert("in_reply_to".to_string(), id.into());
        }

        Ok(Self { src, dest, body })
    }

    pub fn msg_type(&self) -> Option<&str> {
        self.body.get("type").and_then(|t| t.as_str())
    }

    pub fn msg_id(&self) -> Option<u64> {
        self.body.get("msg_id").and_then(|id| id.as_u64())
    }

    pub fn in_reply_to(&self) -> Option<u64> {
        self.body.get("in_reply_to").and_then(|id| id.as_u64())
    }

    /// Decodes the body into a typed payload.
    ///
    /// Failure is reported as a `malformed-request` [`RpcError`] so the runtime can answer
    /// the sender with the right code.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            anyhow::Error::new(RpcError::new(
                ErrorCode::MalformedRequest,
                format!("invalid {} body: {}", self.msg_type().unwrap_or("untyped"), e),
            ))
        })
    }
}

/// Every body shape this node sends or understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Init {
        node_id: NodeId,
        node_ids: Vec<NodeId>,
    },
    InitOk,
    Broadcast {
        message: Value,
    },
    BroadcastOk,
    Gossip {
        message: Value,
        sent_to: Vec<NodeId>,
    },
    GossipOk,
    Read,
    ReadOk {
        messages: Vec<Value>,
    },
    Topology {
        #[serde(default)]
        topology: HashMap<NodeId, Vec<NodeId>>,
    },
    TopologyOk,
    Error {
        code: u32,
        #[serde(default)]
        text: String,
    },
}

/// Error codes understood by clients of the messaging runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The node has not been initialised yet.
    TemporarilyUnavailable,
    NotSupported,
    MalformedRequest,
    Crash,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::NotSupported => 10,
            ErrorCode::TemporarilyUnavailable => 11,
            ErrorCode::MalformedRequest => 12,
            ErrorCode::Crash => 13,
        }
    }
}

/// A handler failure that should be reported to the requester with a specific code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: ErrorCode,
    pub text: String,
}

impl RpcError {
    pub fn new(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    /// Maps any handler error to a reply body; untyped errors become `crash`.
    pub fn payload_for(err: &anyhow::Error) -> Payload {
        match err.downcast_ref::<RpcError>() {
            Some(rpc) => Payload::Error {
                code: rpc.code.code(),
                text: rpc.text.clone(),
            },
            None => Payload::Error {
                code: ErrorCode::Crash.code(),
                text: format!("{:#}", err),
            },
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error {}: {}", self.code.code(), self.text)
    }
}

impl std::error::Error for RpcError {}
