//! Messaging Runtime Module
//!
//! The request/reply layer the broadcast engine talks through. Messages are JSON objects, one
//! per line, read from an input stream and written to an output stream (standard I/O when the
//! node runs as a process).
//!
//! ## Submodules
//! - **`transport`**: The `Transport` trait: the only surface the broadcast engine depends on.
//! - **`registry`**: Maps message type names (e.g. "broadcast") to async handler closures.
//! - **`node`**: `NodeRuntime`, which frames messages, assigns ids, correlates replies with
//!   outstanding requests, answers `init`, and dispatches everything else to the registry.

pub mod node;
pub mod registry;
pub mod transport;
