//! Line-Delimited JSON Runtime
//!
//! Drives a node from an input stream of JSON messages and writes its own messages to an
//! output stream.
//!
//! ## Responsibilities
//! - **Framing**: One JSON envelope per line in both directions. A single writer task owns the
//!   output so concurrent handlers never interleave partial lines.
//! - **Correlation**: Every outbound message gets a fresh `msg_id`. Replies (`in_reply_to`) are
//!   routed to the pending `request` waiting on that id.
//! - **Bootstrap**: `init` is answered here. It yields the `PeerDirectory` and the handlers for
//!   every other message type.
//! - **Dispatch**: Each inbound request runs on its own task. Handler failures are answered
//!   with an `error` body.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};

use super::registry::HandlerRegistry;
use super::transport::Transport;
use crate::membership::directory::PeerDirectory;
use crate::membership::types::NodeId;
use crate::protocol::message::{ErrorCode, Message, Payload, RpcError};
use crate::protocol::{MSG_ERROR, MSG_INIT};

/// Item on the writer's queue.
enum Outbound {
    Message(Message),
    /// Stop writing once everything queued before it is on the wire.
    Close,
}

pub struct NodeRuntime {
    /// Set exactly once, by the first `init`.
    directory: OnceLock<Arc<PeerDirectory>>,
    next_msg_id: AtomicU64,
    /// Requests waiting for a reply, keyed by the `msg_id` they were sent with.
    callbacks: DashMap<u64, oneshot::Sender<Message>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Taken by `run` to start the writer task.
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl NodeRuntime {
    pub fn new() -> Arc<Self> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            directory: OnceLock::new(),
            next_msg_id: AtomicU64::new(1),
            callbacks: DashMap::new(),
            outbound,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            writer: Mutex::new(None),
        })
    }

    pub fn directory(&self) -> Option<Arc<PeerDirectory>> {
        self.directory.get().cloned()
    }

    /// Number of requests still waiting for a reply.
    #[cfg(test)]
    pub fn outstanding_requests(&self) -> usize {
        self.callbacks.len()
    }

    /// Writes out every message queued so far, then stops the writer and closes the output.
    /// Anything sent afterwards fails with "output stream closed".
    pub async fn close(&self) {
        let writer = self.writer.lock().await.take();
        let Some(writer) = writer else {
            return;
        };

        if self.outbound.send(Outbound::Close).is_err() {
            tracing::debug!("Writer already stopped");
        }
        if let Err(e) = writer.await {
            tracing::error!("Writer task aborted: {}", e);
        }
    }

    /// Reads `input` until it ends, answering and dispatching every message.
    ///
    /// `on_init` is invoked once, with the directory built from the first `init`, and returns
    /// the handlers for every other message type. Returns `Ok(())` when `input` reaches EOF and
    /// all in-flight handlers have finished. Any framing or I/O failure is returned as an
    /// error and should be treated as fatal.
    pub async fn run<R, W, F>(self: Arc<Self>, input: R, output: W, on_init: F) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
        F: FnOnce(Arc<PeerDirectory>) -> Result<HandlerRegistry> + Send,
    {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow::anyhow!("runtime is already running"))?;
        *self.writer.lock().await = Some(tokio::spawn(write_loop(outbound_rx, output)));

        let mut on_init = Some(on_init);
        let mut handlers: Option<Arc<HandlerRegistry>> = None;
        let mut in_flight = JoinSet::new();
        let mut lines = input.lines();

        tracing::info!("Runtime started, waiting for messages");

        while let Some(line) = lines
            .next_line()
            .await
            .context("failed to read from input")?
        {
            if self.outbound.is_closed() {
                return Err(anyhow::anyhow!("output stream closed"));
            }

            // Reap finished handlers so the set does not grow without bound
            while in_flight.try_join_next().is_some() {}

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let msg: Message = serde_json::from_str(line)
                .with_context(|| format!("malformed message envelope: {}", line))?;

            tracing::trace!("Received {}", line);

            if let Some(reply_to) = msg.in_reply_to() {
                self.complete_request(reply_to, msg);
                continue;
            }

            let msg_type = msg.msg_type().map(str::to_owned);
            match msg_type.as_deref() {
                Some(MSG_INIT) => {
                    if let Some(registry) = self.handle_init(&msg, &mut on_init).await? {
                        tracing::info!(
                            "Node initialised with {} message handlers",
                            registry.handler_count()
                        );
                        handlers = Some(Arc::new(registry));
                    }
                }
                Some(msg_type) => {
                    let Some(registry) = handlers.as_ref() else {
                        tracing::warn!(
                            "Rejecting {} from {}: node not initialised",
                            msg_type,
                            msg.src
                        );
                        let err = RpcError::new(
                            ErrorCode::TemporarilyUnavailable,
                            "node has not received init yet",
                        );
                        self.reply_error(&msg, &anyhow::Error::new(err)).await;
                        continue;
                    };

                    match registry.get(msg_type) {
                        Some(handler) => {
                            let runtime = self.clone();
                            in_flight.spawn(async move {
                                if let Err(e) = handler(msg.clone()).await {
                                    tracing::warn!(
                                        "Handler for {} from {} failed: {:#}",
                                        msg.msg_type().unwrap_or("?"),
                                        msg.src,
                                        e
                                    );
                                    runtime.reply_error(&msg, &e).await;
                                }
                            });
                        }
                        None => {
                            tracing::warn!("No handler for message type {}", msg_type);
                            let err = RpcError::new(
                                ErrorCode::NotSupported,
                                format!("unsupported message type: {}", msg_type),
                            );
                            self.reply_error(&msg, &anyhow::Error::new(err)).await;
                        }
                    }
                }
                None => {
                    let err =
                        RpcError::new(ErrorCode::MalformedRequest, "message body has no type");
                    self.reply_error(&msg, &anyhow::Error::new(err)).await;
                }
            }
        }

        tracing::info!(
            "Input closed, waiting for {} in-flight handlers",
            in_flight.len()
        );
        while in_flight.join_next().await.is_some() {}

        Ok(())
    }

    async fn handle_init<F>(
        &self,
        msg: &Message,
        on_init: &mut Option<F>,
    ) -> Result<Option<HandlerRegistry>>
    where
        F: FnOnce(Arc<PeerDirectory>) -> Result<HandlerRegistry>,
    {
        let (node_id, node_ids) = match msg.payload::<Payload>() {
            Ok(Payload::Init { node_id, node_ids }) => (node_id, node_ids),
            _ => {
                let err = RpcError::new(ErrorCode::MalformedRequest, "invalid init body");
                self.reply_error(msg, &anyhow::Error::new(err)).await;
                return Ok(None);
            }
        };

        let Some(start) = on_init.take() else {
            tracing::warn!("Ignoring repeated init from {}", msg.src);
            self.reply(msg, Payload::InitOk).await?;
            return Ok(None);
        };

        let directory = match PeerDirectory::from_init(node_id, node_ids) {
            Ok(directory) => Arc::new(directory),
            Err(e) => {
                // Still uninitialised: a later valid init may succeed
                *on_init = Some(start);
                tracing::warn!("Rejecting init from {}: {:#}", msg.src, e);
                let err =
                    RpcError::new(ErrorCode::MalformedRequest, format!("invalid init: {:#}", e));
                self.reply_error(msg, &anyhow::Error::new(err)).await;
                return Ok(None);
            }
        };

        if self.directory.set(directory.clone()).is_err() {
            return Err(anyhow::anyhow!("peer directory initialised twice"));
        }

        let registry = start(directory)?;
        self.reply(msg, Payload::InitOk).await?;

        Ok(Some(registry))
    }

    fn complete_request(&self, reply_to: u64, msg: Message) {
        match self.callbacks.remove(&reply_to) {
            Some((_, waiter)) => {
                // The requester may have timed out in the meantime
                if waiter.send(msg).is_err() {
                    tracing::debug!("Reply to {} arrived after its request gave up", reply_to);
                }
            }
            None => {
                tracing::debug!("Ignoring reply to unknown or expired request {}", reply_to);
            }
        }
    }

    /// Best-effort error answer. Messages without a `msg_id` expect no reply.
    async fn reply_error(&self, request: &Message, err: &anyhow::Error) {
        if request.msg_id().is_none() {
            return;
        }
        if let Err(e) = self.reply(request, RpcError::payload_for(err)).await {
            tracing::error!("Failed to send error reply to {}: {:#}", request.src, e);
        }
    }

    fn local_id_or(&self, fallback: &NodeId) -> NodeId {
        match self.directory.get() {
            Some(directory) => directory.local_id().clone(),
            None => fallback.clone(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_msg_id.fetch_add(1, Ordering::Relaxed)
    }

    fn enqueue(&self, msg: Message) -> Result<()> {
        self.outbound
            .send(Outbound::Message(msg))
            .map_err(|_| anyhow::anyhow!("output stream closed"))
    }

    fn local_id(&self) -> Result<NodeId> {
        self.directory
            .get()
            .map(|directory| directory.local_id().clone())
            .ok_or_else(|| anyhow::anyhow!("node has not been initialised"))
    }
}

#[async_trait]
impl Transport for NodeRuntime {
    async fn send(&self, dest: &NodeId, payload: Payload) -> Result<()> {
        let msg = Message::new(
            self.local_id()?,
            dest.clone(),
            &payload,
            Some(self.next_id()),
            None,
        )?;
        self.enqueue(msg)
    }

    async fn request(
        &self,
        dest: &NodeId,
        payload: Payload,
        timeout: Duration,
    ) -> Result<Message> {
        let msg_id = self.next_id();
        let msg = Message::new(self.local_id()?, dest.clone(), &payload, Some(msg_id), None)?;

        let (waiter, response) = oneshot::channel();
        self.callbacks.insert(msg_id, waiter);

        if let Err(e) = self.enqueue(msg) {
            self.callbacks.remove(&msg_id);
            return Err(e);
        }

        let response = match tokio::time::timeout(timeout, response).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(anyhow::anyhow!("request {} to {} was dropped", msg_id, dest));
            }
            Err(_) => {
                self.callbacks.remove(&msg_id);
                return Err(anyhow::anyhow!(
                    "request {} to {} timed out after {:?}",
                    msg_id,
                    dest,
                    timeout
                ));
            }
        };

        if response.msg_type() == Some(MSG_ERROR) {
            return Err(anyhow::anyhow!(
                "{} answered request {} with error: {}",
                dest,
                msg_id,
                response.body
            ));
        }

        Ok(response)
    }

    async fn reply(&self, request: &Message, payload: Payload) -> Result<()> {
        let msg = Message::new(
            self.local_id_or(&request.dest),
            request.src.clone(),
            &payload,
            Some(self.next_id()),
            request.msg_id(),
        )?;
        self.enqueue(msg)
    }
}

/// Serialises outbound messages onto `output`, one per line, until `Close`, until every
/// sender is gone, or until the output fails. `output` is dropped on return.
async fn write_loop<W>(mut outbound: mpsc::UnboundedReceiver<Outbound>, mut output: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = outbound.recv().await {
        let msg = match item {
            Outbound::Message(msg) => msg,
            Outbound::Close => break,
        };
        let mut line = match serde_json::to_string(&msg) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize message to {}: {}", msg.dest, e);
                continue;
            }
        };
        line.push('\n');

        tracing::trace!("Sending {}", line.trim_end());

        if let Err(e) = output.write_all(line.as_bytes()).await {
            tracing::error!("Failed to write to output: {}", e);
            break;
        }
        if let Err(e) = output.flush().await {
            tracing::error!("Failed to flush output: {}", e);
            break;
        }
    }

    tracing::debug!("Writer stopped");
}
