//! Membership Module Tests
//!
//! Validates node identifiers and the static peer directory.
//!
//! ## Test Scopes
//! - **Data Structures**: Equality, hashing and wire format of `NodeId`.
//! - **Directory Construction**: Self-exclusion and duplicate handling of the init snapshot.
//! - **Target Selection**: Peers already listed in a provenance list are never targeted.

#[cfg(test)]
mod tests {
    use crate::membership::directory::PeerDirectory;
    use crate::membership::types::NodeId;

    fn ids(raw: &[&str]) -> Vec<NodeId> {
        raw.iter().map(|id| NodeId::from(*id)).collect()
    }

    // ============================================================
    // NODE ID TESTS
    // ============================================================

    #[test]
    fn test_node_id_equality() {
        let id1 = NodeId("n1".to_string());
        let id2 = NodeId::new("n1");
        let id3 = NodeId::from("n2");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_node_id_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(NodeId::from("n1"));
        set.insert(NodeId::from("n1")); // duplicate
        set.insert(NodeId::from("n2"));

        assert_eq!(set.len(), 2, "HashSet should have 2 unique NodeIds");
    }

    #[test]
    fn test_node_id_serializes_as_plain_string() {
        let id = NodeId::from("n7");

        let json = serde_json::to_string(&id).expect("Serialization failed");
        assert_eq!(json, "\"n7\"");

        let restored: NodeId = serde_json::from_str("\"c12\"").expect("Deserialization failed");
        assert_eq!(restored.as_str(), "c12");
        assert_eq!(restored.to_string(), "c12");
    }

    // ============================================================
    // DIRECTORY CONSTRUCTION TESTS
    // ============================================================

    #[test]
    fn test_directory_excludes_self() {
        let directory =
            PeerDirectory::from_init(NodeId::from("n1"), ids(&["n1", "n2", "n3"])).unwrap();

        assert_eq!(directory.local_id().as_str(), "n1");
        assert_eq!(directory.peers(), ids(&["n2", "n3"]).as_slice());
        assert!(!directory.is_peer(&NodeId::from("n1")));
        assert!(directory.is_peer(&NodeId::from("n3")));
    }

    #[test]
    fn test_directory_collapses_duplicates_in_order() {
        let directory =
            PeerDirectory::from_init(NodeId::from("n2"), ids(&["n3", "n1", "n3", "n2", "n1"]))
                .unwrap();

        assert_eq!(directory.peers(), ids(&["n3", "n1"]).as_slice());
    }

    #[test]
    fn test_single_node_cluster_has_no_peers() {
        let directory = PeerDirectory::from_init(NodeId::from("n1"), ids(&["n1"])).unwrap();

        assert!(directory.peers().is_empty());
        assert!(directory.targets(&[]).is_empty());
    }

    #[test]
    fn test_directory_rejects_empty_node_id() {
        let result = PeerDirectory::from_init(NodeId::from(""), ids(&["n1"]));

        assert!(result.is_err());
    }

    // ============================================================
    // TARGET SELECTION TESTS
    // ============================================================

    #[test]
    fn test_targets_skip_known_nodes() {
        let directory =
            PeerDirectory::from_init(NodeId::from("B"), ids(&["A", "B", "C", "D"])).unwrap();

        // B received a value from A; A must not be targeted again
        let targets = directory.targets(&ids(&["A", "B"]));

        assert_eq!(targets, ids(&["C", "D"]));
    }

    #[test]
    fn test_targets_ignore_unknown_ids_in_provenance() {
        let directory = PeerDirectory::from_init(NodeId::from("A"), ids(&["A", "B"])).unwrap();

        let targets = directory.targets(&ids(&["A", "Z"]));

        assert_eq!(targets, ids(&["B"]));
    }

    #[test]
    fn test_targets_empty_when_everyone_knows() {
        let directory =
            PeerDirectory::from_init(NodeId::from("A"), ids(&["A", "B", "C"])).unwrap();

        let targets = directory.targets(&ids(&["C", "A", "B"]));

        assert!(targets.is_empty());
    }
}
