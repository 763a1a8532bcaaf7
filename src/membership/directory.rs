use anyhow::Result;

use super::types::NodeId;

/// Static view of the cluster, built once from the `init` exchange.
///
/// `peers` never contains the local node and never changes after construction.
/// The directory is shared by reference (`Arc`) between the runtime, the request
/// handlers and the dissemination worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDirectory {
    local_id: NodeId,
    peers: Vec<NodeId>,
}

impl PeerDirectory {
    /// Builds the directory from the init snapshot.
    ///
    /// The local id is dropped from `node_ids` and duplicates are collapsed, keeping
    /// the first occurrence so the peer order stays stable.
    pub fn from_init(node_id: NodeId, node_ids: Vec<NodeId>) -> Result<Self> {
        if node_id.as_str().is_empty() {
            return Err(anyhow::anyhow!("init carried an empty node id"));
        }

        let mut peers: Vec<NodeId> = Vec::with_capacity(node_ids.len());
        for id in node_ids {
            if id != node_id && !peers.contains(&id) {
                peers.push(id);
            }
        }

        tracing::info!(
            "Peer directory ready: self={} peers={}",
            node_id,
            peers.len()
        );

        Ok(Self {
            local_id: node_id,
            peers,
        })
    }

    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    pub fn peers(&self) -> &[NodeId] {
        &self.peers
    }

    pub fn is_peer(&self, id: &NodeId) -> bool {
        self.peers.contains(id)
    }

    /// Peers that are not yet known to hold a value.
    ///
    /// This is the only outbound deduplication: anything listed in `known_by` is skipped.
    pub fn targets(&self, known_by: &[NodeId]) -> Vec<NodeId> {
        self.peers
            .iter()
            .filter(|peer| !known_by.contains(peer))
            .cloned()
            .collect()
    }
}
