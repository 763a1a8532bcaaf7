//! Dissemination Worker
//!
//! The single control loop that turns the pending gossip table into outbound traffic.
//!
//! ## Cycle
//! 1. **Snapshot** the pending table.
//! 2. **Terminate** if shutdown was requested and the snapshot is empty.
//! 3. **Fan out** every entry concurrently. Each value gets its own task, and each target
//!    peer of that value gets a nested task issuing one bounded request/response exchange.
//! 4. **Resolve** each value once all of its exchanges finish: all succeeded means the entry
//!    is acknowledged (removed); any failure leaves it for the next cycle.
//! 5. **Barrier**: the next cycle starts only after every fan-out of this one has finished.
//!
//! When the table is empty the worker parks until a push or shutdown instead of spinning.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::NodeConfig;
use crate::membership::directory::PeerDirectory;
use crate::membership::types::NodeId;
use crate::protocol::message::Payload;
use crate::runtime::transport::Transport;
use crate::storage::pending::PendingTable;
use crate::storage::types::{GossipRecord, Value};

/// Result of one fan-out cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Values removed from the table because every target confirmed them.
    pub acknowledged: usize,
    /// Values kept for another round because some exchange failed.
    pub retained: usize,
}

pub struct DisseminationWorker {
    directory: Arc<PeerDirectory>,
    pending: Arc<PendingTable>,
    transport: Arc<dyn Transport>,
    rpc_timeout: Duration,
    retry_backoff: Duration,
    shutdown: watch::Receiver<bool>,
}

impl DisseminationWorker {
    pub fn new(
        directory: Arc<PeerDirectory>,
        pending: Arc<PendingTable>,
        transport: Arc<dyn Transport>,
        config: &NodeConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            directory,
            pending,
            transport,
            rpc_timeout: config.rpc_timeout,
            retry_backoff: config.retry_backoff,
            shutdown,
        }
    }

    /// Runs cycles until shutdown has been requested and the pending table is empty.
    pub async fn run(mut self) {
        tracing::info!(
            "Dissemination worker started ({} peers, timeout {:?})",
            self.directory.peers().len(),
            self.rpc_timeout
        );

        let mut shutting_down = false;
        let mut cycles: u64 = 0;

        loop {
            let pending = self.pending.snapshot().await;

            shutting_down = shutting_down || *self.shutdown.borrow_and_update();

            if pending.is_empty() {
                if shutting_down {
                    break;
                }

                tokio::select! {
                    _ = self.pending.wait_for_push() => {}
                    changed = self.shutdown.changed() => {
                        // A dropped sender can never un-request shutdown
                        if changed.is_err() {
                            shutting_down = true;
                        }
                    }
                }
                continue;
            }

            cycles += 1;
            let report = self.run_cycle(pending).await;

            tracing::debug!(
                "Cycle {}: {} acknowledged, {} retained",
                cycles,
                report.acknowledged,
                report.retained
            );

            if report.retained > 0 && !self.retry_backoff.is_zero() {
                tokio::time::sleep(retry_pause(self.retry_backoff)).await;
            }
        }

        tracing::info!("Dissemination worker drained after {} cycles", cycles);
    }

    /// Fans out every entry of `pending` and waits for all of them.
    pub async fn run_cycle(&self, pending: HashMap<Value, GossipRecord>) -> CycleReport {
        let mut fan_outs = JoinSet::new();

        for (value, mut record) in pending {
            let targets = self.directory.targets(&record.known_by);
            record.mark_known_by(self.directory.local_id());

            let payload = Payload::Gossip {
                message: value,
                sent_to: record.known_by,
            };
            let transport = self.transport.clone();
            let table = self.pending.clone();
            let timeout = self.rpc_timeout;

            fan_outs.spawn(async move {
                let delivered = fan_out(transport, value, targets, payload, timeout).await;
                if delivered {
                    table.acknowledge(value).await;
                }
                delivered
            });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = fan_outs.join_next().await {
            match joined {
                Ok(true) => report.acknowledged += 1,
                Ok(false) => report.retained += 1,
                Err(e) => {
                    tracing::error!("Fan-out task aborted: {}", e);
                    report.retained += 1;
                }
            }
        }

        report
    }
}

/// Uniformly random pause in `0..=bound`, so nodes that failed together do not retry in
/// lockstep.
pub(crate) fn retry_pause(bound: Duration) -> Duration {
    use rand::Rng;
    let bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::thread_rng().gen_range(0..=bound_ms))
}

/// Sends `payload` to every target concurrently. Returns `true` only if every exchange
/// succeeded; an empty target set is trivially delivered.
async fn fan_out(
    transport: Arc<dyn Transport>,
    value: Value,
    targets: Vec<NodeId>,
    payload: Payload,
    timeout: Duration,
) -> bool {
    let mut exchanges = JoinSet::new();

    for peer in targets {
        let transport = transport.clone();
        let payload = payload.clone();
        exchanges.spawn(async move {
            let result = transport.request(&peer, payload, timeout).await;
            (peer, result)
        });
    }

    let mut delivered = true;
    while let Some(joined) = exchanges.join_next().await {
        match joined {
            Ok((peer, Ok(_))) => {
                tracing::trace!("Peer {} confirmed value {}", peer, value);
            }
            Ok((peer, Err(e))) => {
                tracing::warn!("Gossip of {} to {} failed, will retry: {:#}", value, peer, e);
                delivered = false;
            }
            Err(e) => {
                tracing::error!("Gossip exchange task aborted: {}", e);
                delivered = false;
            }
        }
    }

    delivered
}
