use anyhow::Result;
use std::sync::Arc;

use crate::membership::directory::PeerDirectory;
use crate::protocol::message::{ErrorCode, Message, Payload, RpcError};
use crate::protocol::{MSG_BROADCAST, MSG_GOSSIP, MSG_READ, MSG_TOPOLOGY};
use crate::runtime::registry::HandlerRegistry;
use crate::runtime::transport::Transport;
use crate::storage::pending::PendingTable;
use crate::storage::types::GossipRecord;
use crate::storage::values::ValueStore;

/// Per-node broadcast state and the handlers that mutate it.
pub struct BroadcastNode {
    directory: Arc<PeerDirectory>,
    values: Arc<ValueStore>,
    pending: Arc<PendingTable>,
    transport: Arc<dyn Transport>,
}

impl BroadcastNode {
    pub fn new(directory: Arc<PeerDirectory>, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            directory,
            values: Arc::new(ValueStore::new()),
            pending: Arc::new(PendingTable::new()),
            transport,
        })
    }

    pub fn directory(&self) -> &Arc<PeerDirectory> {
        &self.directory
    }

    pub fn values(&self) -> &Arc<ValueStore> {
        &self.values
    }

    pub fn pending(&self) -> &Arc<PendingTable> {
        &self.pending
    }

    /// Registry binding every message type this node serves to its handler.
    pub fn handlers(self: &Arc<Self>) -> HandlerRegistry {
        let registry = HandlerRegistry::new();

        let node = self.clone();
        registry.register(MSG_BROADCAST, move |msg| {
            let node = node.clone();
            async move { node.handle_broadcast(msg).await }
        });

        let node = self.clone();
        registry.register(MSG_GOSSIP, move |msg| {
            let node = node.clone();
            async move { node.handle_gossip(msg).await }
        });

        let node = self.clone();
        registry.register(MSG_READ, move |msg| {
            let node = node.clone();
            async move { node.handle_read(msg).await }
        });

        let node = self.clone();
        registry.register(MSG_TOPOLOGY, move |msg| {
            let node = node.clone();
            async move { node.handle_topology(msg).await }
        });

        registry
    }

    /// Stores a client value, queues it for gossip and confirms local acceptance.
    pub async fn handle_broadcast(&self, msg: Message) -> Result<()> {
        let value = match msg.payload::<Payload>()? {
            Payload::Broadcast { message } => message,
            other => return Err(unexpected(MSG_BROADCAST, &other)),
        };

        self.values.insert(value);
        self.pending
            .push(GossipRecord::originated(value, self.directory.local_id()))
            .await;

        tracing::debug!("Accepted broadcast {} from {}", value, msg.src);

        self.transport.reply(&msg, Payload::BroadcastOk).await
    }

    /// Applies a value relayed by a peer and queues it for onward gossip.
    ///
    /// The reply only tells the sender the value was applied; it is what lets the sender's
    /// exchange succeed and its pending entry be acknowledged.
    pub async fn handle_gossip(&self, msg: Message) -> Result<()> {
        let (value, sent_to) = match msg.payload::<Payload>()? {
            Payload::Gossip { message, sent_to } => (message, sent_to),
            other => return Err(unexpected(MSG_GOSSIP, &other)),
        };

        let fresh = self.values.insert(value);
        self.pending
            .push(GossipRecord::relayed(value, sent_to, self.directory.local_id()))
            .await;

        tracing::trace!("Applied gossip {} from {} (new: {})", value, msg.src, fresh);

        if msg.msg_id().is_some() {
            self.transport.reply(&msg, Payload::GossipOk).await?;
        }

        Ok(())
    }

    pub async fn handle_read(&self, msg: Message) -> Result<()> {
        match msg.payload::<Payload>()? {
            Payload::Read => {}
            other => return Err(unexpected(MSG_READ, &other)),
        }

        let messages = self.values.snapshot();
        tracing::debug!("Read by {}: {} values", msg.src, messages.len());

        self.transport
            .reply(&msg, Payload::ReadOk { messages })
            .await
    }

    /// The cluster is treated as a complete graph, so the supplied neighbour map is ignored.
    pub async fn handle_topology(&self, msg: Message) -> Result<()> {
        match msg.payload::<Payload>()? {
            Payload::Topology { topology } => {
                tracing::debug!(
                    "Ignoring topology with {} entries; gossiping to all {} peers",
                    topology.len(),
                    self.directory.peers().len()
                );
            }
            other => return Err(unexpected(MSG_TOPOLOGY, &other)),
        }

        self.transport.reply(&msg, Payload::TopologyOk).await
    }
}

fn unexpected(expected: &str, got: &Payload) -> anyhow::Error {
    anyhow::Error::new(RpcError::new(
        ErrorCode::MalformedRequest,
        format!("expected {} body, got {:?}", expected, got),
    ))
}
