//! Page bridge delivery settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Deadline for one delivery attempt, reply included.
    pub request_timeout_ms: u64,
    /// Delivery attempts for idempotent requests.
    pub attempts: u32,
    pub retry_backoff_ms: u64,
    /// Pending requests a tab mailbox holds before senders wait.
    pub mailbox_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            attempts: 3,
            retry_backoff_ms: 1_000,
            mailbox_capacity: 32,
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
