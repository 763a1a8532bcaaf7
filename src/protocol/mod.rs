//! Wire Protocol Module
//!
//! Defines the envelope and body shapes exchanged between nodes and clients. Every message is
//! a single JSON object `{ "src", "dest", "body" }`; the body carries a `type` tag, an optional
//! `msg_id`, an optional `in_reply_to`, and the type-specific fields.
//!
//! ## Submodules
//! - **`message`**: The envelope, the typed `Payload` enum and the error codes.

pub mod message;

/// Client request to inject a value.
pub const MSG_BROADCAST: &str = "broadcast";
/// Peer-to-peer dissemination of a value and its provenance list.
pub const MSG_GOSSIP: &str = "gossip";
/// Client request for every value this node holds.
pub const MSG_READ: &str = "read";
/// Client-supplied neighbour map (ignored: the cluster is a complete graph).
pub const MSG_TOPOLOGY: &str = "topology";
/// Runtime bootstrap carrying the node's id and the full member list.
pub const MSG_INIT: &str = "init";
/// Error reply.
pub const MSG_ERROR: &str = "error";
