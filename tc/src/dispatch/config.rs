//! Dispatcher configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Throttle intervals and burst limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Minimum spacing between two sends
    #[serde(rename = "fast-interval-ms", default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,

    /// Pause after a burst of `fast_limit` sends
    #[serde(rename = "medium-interval-ms", default = "default_medium_interval_ms")]
    pub medium_interval_ms: u64,

    /// Pause after `slow_limit` bursts
    #[serde(rename = "slow-interval-ms", default = "default_slow_interval_ms")]
    pub slow_interval_ms: u64,

    /// Sends allowed per burst
    #[serde(rename = "fast-limit", default = "default_fast_limit")]
    pub fast_limit: u32,

    /// Bursts allowed before the long pause
    #[serde(rename = "slow-limit", default = "default_slow_limit")]
    pub slow_limit: u32,

    /// Queue capacity; the lowest-ranked message is dropped beyond it
    #[serde(rename = "max-queue", default = "default_max_queue")]
    pub max_queue: usize,
}

fn default_fast_interval_ms() -> u64 {
    300
}

fn default_medium_interval_ms() -> u64 {
    3_500
}

fn default_slow_interval_ms() -> u64 {
    10_000
}

fn default_fast_limit() -> u32 {
    6
}

fn default_slow_limit() -> u32 {
    3
}

fn default_max_queue() -> usize {
    256
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            fast_interval_ms: default_fast_interval_ms(),
            medium_interval_ms: default_medium_interval_ms(),
            slow_interval_ms: default_slow_interval_ms(),
            fast_limit: default_fast_limit(),
            slow_limit: default_slow_limit(),
            max_queue: default_max_queue(),
        }
    }
}

impl DispatcherConfig {
    pub fn fast_interval(&self) -> Duration {
        Duration::from_millis(self.fast_interval_ms)
    }

    pub fn medium_interval(&self) -> Duration {
        Duration::from_millis(self.medium_interval_ms)
    }

    pub fn slow_interval(&self) -> Duration {
        Duration::from_millis(self.slow_interval_ms)
    }
}
