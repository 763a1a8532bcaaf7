use dashmap::DashSet;

use super::types::Value;

/// Deduplicated, grow-only set of received values.
pub struct ValueStore {
    values: DashSet<Value>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self {
            values: DashSet::new(),
        }
    }

    /// Adds `value` if absent. Returns `true` when the value was not seen before.
    pub fn insert(&self, value: Value) -> bool {
        let fresh = self.values.insert(value);
        if fresh {
            tracing::debug!("Stored new value {}", value);
        }
        fresh
    }

    #[cfg(test)]
    pub fn contains(&self, value: Value) -> bool {
        self.values.contains(&value)
    }

    /// Owned copy of every stored value, in no particular order.
    pub fn snapshot(&self) -> Vec<Value> {
        self.values.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}
