//! Node Configuration
//!
//! Runtime knobs for the dissemination engine, read once at start-up from the environment.
//! Defaults reproduce the reference policy: one second per peer exchange, back-to-back
//! cycles, and an unbounded shutdown drain.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::ZERO;
pub const DEFAULT_LOG_LEVEL: Level = Level::INFO;
/// Largest accepted retry pause bound.
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(60);

pub const ENV_RPC_TIMEOUT_MS: &str = "BROADCAST_RPC_TIMEOUT_MS";
pub const ENV_RETRY_BACKOFF_MS: &str = "BROADCAST_RETRY_BACKOFF_MS";
pub const ENV_DRAIN_TIMEOUT_MS: &str = "BROADCAST_DRAIN_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "BROADCAST_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    /// Upper bound on a single gossip exchange with one peer.
    pub rpc_timeout: Duration,
    /// Upper bound of the random pause after a cycle in which some exchange failed.
    /// Zero disables the pause.
    pub retry_backoff: Duration,
    /// How long shutdown waits for pending gossip to drain. `None` waits indefinitely.
    pub drain_timeout: Option<Duration>,
    pub log_level: Level,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unset keys fall back to the defaults;
    /// set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_millis(&lookup, ENV_RPC_TIMEOUT_MS)? {
            if ms.is_zero() {
                return Err(anyhow::anyhow!("{} must be greater than zero", ENV_RPC_TIMEOUT_MS));
            }
            config.rpc_timeout = ms;
        }
        if let Some(ms) = parse_millis(&lookup, ENV_RETRY_BACKOFF_MS)? {
            if ms > MAX_RETRY_BACKOFF {
                return Err(anyhow::anyhow!(
                    "{} must be at most {} ms",
                    ENV_RETRY_BACKOFF_MS,
                    MAX_RETRY_BACKOFF.as_millis()
                ));
            }
            config.retry_backoff = ms;
        }
        config.drain_timeout = parse_millis(&lookup, ENV_DRAIN_TIMEOUT_MS)?;
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.log_level = level
                .trim()
                .parse()
                .with_context(|| format!("invalid {}: {:?}", ENV_LOG_LEVEL, level))?;
        }

        Ok(config)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            drain_timeout: None,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid {}: {:?}", key, raw))?;
            Ok(Some(Duration::from_millis(ms)))
        }
        None => Ok(None),
    }
}
