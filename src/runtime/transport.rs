use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::membership::types::NodeId;
use crate::protocol::message::{Message, Payload};

/// Outbound half of the messaging runtime.
///
/// Implementations must be cheap to share across tasks; the dissemination worker issues many
/// concurrent `request`s against the same transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Fire-and-forget delivery of `payload` to `dest`.
    async fn send(&self, dest: &NodeId, payload: Payload) -> Result<()>;

    /// Sends `payload` to `dest` and waits up to `timeout` for the reply.
    ///
    /// Resolves to an error on timeout, on a transport failure, or when the peer answers with
    /// an `error` body.
    async fn request(&self, dest: &NodeId, payload: Payload, timeout: Duration)
    -> Result<Message>;

    /// Answers `request` with `payload`, correlated through its `msg_id`.
    async fn reply(&self, request: &Message, payload: Payload) -> Result<()>;
}
