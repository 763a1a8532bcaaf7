//! Storage Module Tests
//!
//! Validates the local state a node keeps for dissemination.
//!
//! ## Test Scopes
//! - **ValueStore**: Idempotent inserts, snapshots, and concurrent inserts of the same value.
//! - **GossipRecord**: Provenance construction and the union merge.
//! - **PendingTable**: Upsert/merge, acknowledgement, snapshots and wake-ups.

#[cfg(test)]
mod tests {
    use crate::membership::types::NodeId;
    use crate::storage::pending::PendingTable;
    use crate::storage::types::GossipRecord;
    use crate::storage::values::ValueStore;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|id| NodeId::from(*id)).collect()
    }

    // ============================================================
    // VALUE STORE TESTS
    // ============================================================

    #[test]
    fn test_value_store_insert_is_idempotent() {
        let store = ValueStore::new();

        assert!(store.insert(42), "First insert should report a new value");
        assert!(!store.insert(42), "Second insert should be a no-op");
        assert!(!store.insert(42));

        assert_eq!(store.len(), 1);
        assert!(store.contains(42));
        assert_eq!(store.snapshot(), vec![42]);
    }

    #[test]
    fn test_value_store_snapshot_is_a_copy() {
        let store = ValueStore::new();
        store.insert(1);
        store.insert(2);

        let snapshot = store.snapshot();
        store.insert(3);

        // Snapshot taken before the third insert must not see it
        let seen: HashSet<u64> = snapshot.into_iter().collect();
        assert_eq!(seen, HashSet::from([1, 2]));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_value_store_starts_empty() {
        let store = ValueStore::default();

        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
        assert!(!store.contains(0));
    }

    #[tokio::test]
    async fn test_value_store_concurrent_inserts_of_same_value() {
        let store = Arc::new(ValueStore::new());
        let mut handles = Vec::new();

        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.insert(7);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot(), vec![7]);
    }

    #[tokio::test]
    async fn test_value_store_concurrent_distinct_values() {
        let store = Arc::new(ValueStore::new());
        let mut handles = Vec::new();

        for worker in 0..8u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50u64 {
                    store.insert(worker * 1000 + i);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 400);
    }

    // ============================================================
    // GOSSIP RECORD TESTS
    // ============================================================

    #[test]
    fn test_originated_record_lists_only_self() {
        let record = GossipRecord::originated(42, &NodeId::from("A"));

        assert_eq!(record.value, 42);
        assert_eq!(record.known_by, ids(&["A"]));
    }

    #[test]
    fn test_relayed_record_appends_self_once() {
        let record = GossipRecord::relayed(7, ids(&["A"]), &NodeId::from("B"));
        assert_eq!(record.known_by, ids(&["A", "B"]));

        // Already listed: not appended a second time
        let record = GossipRecord::relayed(7, ids(&["A", "B"]), &NodeId::from("B"));
        assert_eq!(record.known_by, ids(&["A", "B"]));
    }

    #[test]
    fn test_merge_is_set_union_preserving_order() {
        let mut record = GossipRecord {
            value: 1,
            known_by: ids(&["A", "B", "C"]),
        };

        record.merge(GossipRecord {
            value: 1,
            known_by: ids(&["D", "B", "E"]),
        });

        assert_eq!(record.known_by, ids(&["A", "B", "C", "D", "E"]));
    }

    #[test]
    fn test_record_json_shape() {
        let record = GossipRecord::relayed(9, ids(&["n1"]), &NodeId::from("n2"));

        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["value"], 9);
        assert_eq!(json["known_by"], serde_json::json!(["n1", "n2"]));
    }

    // ============================================================
    // PENDING TABLE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_pending_push_and_snapshot() {
        let table = PendingTable::new();

        table.push(GossipRecord::originated(42, &NodeId::from("A"))).await;
        table.push(GossipRecord::originated(43, &NodeId::from("A"))).await;

        let snapshot = table.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[&42].known_by, ids(&["A"]));
        assert_eq!(table.len().await, 2);
    }

    #[tokio::test]
    async fn test_pending_push_merges_existing_record() {
        let table = PendingTable::new();

        table
            .push(GossipRecord {
                value: 5,
                known_by: ids(&["A", "C", "B"]),
            })
            .await;
        // A shorter provenance list must not shrink what is already known
        table
            .push(GossipRecord {
                value: 5,
                known_by: ids(&["D", "B"]),
            })
            .await;

        let record = table.get(5).await.expect("record should still be pending");
        assert_eq!(record.known_by, ids(&["A", "C", "B", "D"]));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_pending_acknowledge_is_idempotent() {
        let table = PendingTable::new();
        table.push(GossipRecord::originated(1, &NodeId::from("A"))).await;
        table.push(GossipRecord::originated(2, &NodeId::from("A"))).await;

        table.acknowledge(1).await;
        table.acknowledge(1).await;
        table.acknowledge(99).await; // never pushed

        assert!(table.get(1).await.is_none());
        assert!(table.get(2).await.is_some());
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_pending_snapshot_is_detached() {
        let table = PendingTable::new();
        table.push(GossipRecord::originated(1, &NodeId::from("A"))).await;

        let snapshot = table.snapshot().await;
        table.acknowledge(1).await;

        assert!(snapshot.contains_key(&1));
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn test_pending_concurrent_pushes_merge_all_provenance() {
        let table = Arc::new(PendingTable::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let table = table.clone();
            handles.push(tokio::spawn(async move {
                let node = NodeId(format!("n{}", i));
                table.push(GossipRecord::originated(77, &node)).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        let record = table.get(77).await.unwrap();
        let known: HashSet<NodeId> = record.known_by.iter().cloned().collect();

        // Whatever the interleaving, the union of every push is kept exactly once
        assert_eq!(record.known_by.len(), 16);
        assert_eq!(known.len(), 16);
    }

    #[tokio::test]
    async fn test_pending_push_wakes_waiter() {
        let table = Arc::new(PendingTable::new());

        let waiter = {
            let table = table.clone();
            tokio::spawn(async move {
                table.wait_for_push().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        table.push(GossipRecord::originated(3, &NodeId::from("A"))).await;

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken by push")
            .unwrap();
    }
}
