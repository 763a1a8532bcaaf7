//! Local Storage Module
//!
//! Holds the two pieces of shared mutable state a node owns.
//!
//! ## Core Concepts
//! - **Value Store**: A deduplicated set of every value this node has seen. It only grows and
//!   is the source of truth for `read`.
//! - **Pending Gossip Table**: Values that still have to be confirmed by some peer, together
//!   with the provenance list of nodes already known to hold them.
//! - **Snapshots**: Neither structure hands out references into its internals; every read
//!   returns an owned copy, so no lock is ever held across a network call.

pub mod pending;
pub mod types;
pub mod values;

#[cfg(test)]
mod tests;
