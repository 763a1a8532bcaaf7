//! Message Handler Registry
//!
//! Maps message type names (e.g. "broadcast") to async closures. The runtime stays generic
//! over what a node does; the broadcast engine registers its handlers once the node has been
//! initialised.

use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::protocol::message::Message;

/// Type-erased async handler for one inbound message.
pub type HandlerFn =
    Arc<dyn Fn(Message) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

pub struct HandlerRegistry {
    handlers: DashMap<String, HandlerFn>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    /// Registers `handler` for messages whose body `type` equals `msg_type`.
    ///
    /// Registering the same type twice replaces the earlier handler.
    pub fn register<F, Fut>(&self, msg_type: &str, handler: F)
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler_fn: HandlerFn = Arc::new(move |msg: Message| {
            Box::pin(handler(msg)) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
        });

        self.handlers.insert(msg_type.to_string(), handler_fn);

        tracing::debug!("Registered message handler: {}", msg_type);
    }

    /// Returns a clone of the handler so the map guard is not held while it runs.
    pub fn get(&self, msg_type: &str) -> Option<HandlerFn> {
        self.handlers
            .get(msg_type)
            .map(|entry| entry.value().clone())
    }

    #[cfg(test)]
    pub fn has_handler(&self, msg_type: &str) -> bool {
        self.handlers.contains_key(msg_type)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
