//! Node Lifecycle
//!
//! Wires the messaging runtime to the broadcast engine and owns the shutdown sequence:
//! 1. Run the runtime until its input ends (or fails).
//! 2. Raise the shutdown signal.
//! 3. Wait for the dissemination worker to drain the pending table.
//! 4. Flush every queued message and close the output.
//!
//! A fatal runtime error skips the drain and is returned to the caller.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::handlers::BroadcastNode;
use super::worker::DisseminationWorker;
use crate::config::NodeConfig;
use crate::membership::directory::PeerDirectory;
use crate::runtime::node::NodeRuntime;
use crate::runtime::registry::HandlerRegistry;
use crate::runtime::transport::Transport;

/// Serves the broadcast protocol over `input`/`output` until `input` ends, then drains.
pub async fn serve<R, W>(config: NodeConfig, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let runtime = NodeRuntime::new();
    let transport: Arc<dyn Transport> = runtime.clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (worker_tx, worker_rx) = oneshot::channel::<JoinHandle<()>>();

    let worker_config = config.clone();
    let on_init = move |directory: Arc<PeerDirectory>| -> Result<HandlerRegistry> {
        let node = BroadcastNode::new(directory.clone(), transport.clone());
        let worker = DisseminationWorker::new(
            directory,
            node.pending().clone(),
            transport,
            &worker_config,
            shutdown_rx,
        );

        if worker_tx.send(tokio::spawn(worker.run())).is_err() {
            return Err(anyhow::anyhow!("node lifecycle stopped before init"));
        }

        Ok(node.handlers())
    };

    if let Err(e) = runtime.clone().run(input, output, on_init).await {
        runtime.close().await;
        return Err(e);
    }

    shutdown_tx.send_replace(true);

    let drained = match worker_rx.await {
        Ok(worker) => drain(worker, &config).await,
        Err(_) => {
            tracing::info!("Input closed before init; nothing to drain");
            Ok(())
        }
    };

    runtime.close().await;
    drained
}

async fn drain(worker: JoinHandle<()>, config: &NodeConfig) -> Result<()> {
    tracing::info!("Draining pending gossip before exit");

    match config.drain_timeout {
        Some(limit) => match tokio::time::timeout(limit, worker).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::warn!("Drain deadline of {:?} reached with gossip still pending", limit);
            }
        },
        None => worker.await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
