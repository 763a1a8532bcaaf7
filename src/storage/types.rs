use serde::{Deserialize, Serialize};

use crate::membership::types::NodeId;

/// A broadcast value. Opaque: only compared for equality.
pub type Value = u64;

/// Dissemination state of a single value.
///
/// `known_by` is the provenance list: every node the value is known to have passed through.
/// It is append-only and exists purely to avoid resending to those nodes. It carries no
/// ordering guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipRecord {
    pub value: Value,
    pub known_by: Vec<NodeId>,
}

impl GossipRecord {
    /// Record for a value injected locally by a client `broadcast`.
    pub fn originated(value: Value, local_id: &NodeId) -> Self {
        Self {
            value,
            known_by: vec![local_id.clone()],
        }
    }

    /// Record for a value received from a peer: the incoming provenance plus this node.
    pub fn relayed(value: Value, sent_to: Vec<NodeId>, local_id: &NodeId) -> Self {
        let mut record = Self {
            value,
            known_by: sent_to,
        };
        record.mark_known_by(local_id);
        record
    }

    /// Appends `node` unless it is already listed.
    pub fn mark_known_by(&mut self, node: &NodeId) {
        if !self.known_by.contains(node) {
            self.known_by.push(node.clone());
        }
    }

    /// Set-union of both provenance lists. Existing order is kept; new ids are appended in
    /// the order `other` lists them.
    pub fn merge(&mut self, other: GossipRecord) {
        for node in other.known_by {
            if !self.known_by.contains(&node) {
                self.known_by.push(node);
            }
        }
    }
}
