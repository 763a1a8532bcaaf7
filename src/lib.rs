//! Broadcast Node Library
//!
//! This library crate defines the modules that make up a single node of the broadcast cluster.
//! It serves as the foundation for the binary executable (`main.rs`), which runs one node over
//! standard I/O.
//!
//! ## Architecture Modules
//! The node is composed of six loosely coupled subsystems:
//!
//! - **`broadcast`**: The dissemination engine. Accepts values, relays gossip, and retries
//!   every value until each peer has confirmed it.
//! - **`config`**: Environment-driven runtime knobs (timeouts, backoff, log level).
//! - **`membership`**: Node identities and the fixed peer directory built from `init`.
//! - **`protocol`**: The JSON envelope, typed message bodies and error codes.
//! - **`runtime`**: Line-delimited request/reply messaging with reply correlation and
//!   handler dispatch.
//! - **`storage`**: The local value store and the pending gossip table.

pub mod broadcast;
pub mod config;
pub mod membership;
pub mod protocol;
pub mod runtime;
pub mod storage;
