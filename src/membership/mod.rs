//! Membership & Peer Directory Module
//!
//! The cluster in this system is a fixed, complete graph: every node talks to every other
//! node, and the member set never changes after start-up.
//!
//! ## Core Mechanisms
//! - **Init Snapshot**: The messaging runtime receives a single `init` message carrying this
//!   node's id and the full id list. It is turned into a `PeerDirectory` exactly once.
//! - **Target Selection**: The directory computes which peers still need a value, given the
//!   provenance list of nodes already known to hold it.

pub mod directory;
pub mod types;

#[cfg(test)]
mod tests;
