use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a cluster member (e.g. `"n1"`) or an external client (e.g. `"c3"`).
///
/// Serialized as a bare JSON string so it can be embedded directly in message envelopes
/// and in `sent_to` provenance lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
