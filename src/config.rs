//! Node configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for a [`Node`](crate::net::Node) and its outbound RPC client.
///
/// Every field has a default, so a partial JSON document deserializes:
///
/// ```
/// let config: netbus::NodeConfig =
///     serde_json::from_str(r#"{ "request_timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.request_timeout_ms, 250);
/// assert_eq!(config.worker_threads, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Upper bound on one RPC round trip (connect + request + reply).
    pub request_timeout_ms: u64,
    /// Upper bound on establishing the TCP connection.
    pub connect_timeout_ms: u64,
    /// Worker threads of the node's tokio runtime.
    pub worker_threads: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            worker_threads: 2,
        }
    }
}

impl NodeConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = millis(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = millis(timeout);
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// Saturates instead of truncating absurdly long timeouts.
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
