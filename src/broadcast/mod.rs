//! Broadcast Dissemination Module
//!
//! Accepts values from clients, stores each exactly once, and pushes them to every other node
//! until each peer has confirmed receipt.
//!
//! ## Architecture Overview
//! 1. **Acceptance**: A `broadcast` is stored locally and queued in the pending gossip table,
//!    then acknowledged to the client immediately. Propagation is best-effort and never
//!    delays the reply.
//! 2. **Dissemination**: A single background worker repeatedly snapshots the pending table
//!    and fans every entry out to the peers not yet known to hold it, one task per value
//!    and one nested task per peer.
//! 3. **Acknowledgement**: An entry leaves the table only when every exchange of its round
//!    succeeded. Any failure keeps it for the next round (at-least-once, retried forever).
//! 4. **Relay**: A node receiving `gossip` stores the value, extends the provenance list with
//!    itself, and queues it for its own fan-out.
//!
//! ## Submodules
//! - **`handlers`**: Request handlers for `broadcast`, `gossip`, `read` and `topology`.
//! - **`worker`**: The dissemination control loop.
//! - **`service`**: Wires runtime, handlers and worker together and owns the shutdown drain.

pub mod handlers;
pub mod service;
pub mod worker;
