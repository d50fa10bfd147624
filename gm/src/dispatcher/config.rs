//! Dispatcher configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the poll loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Seconds between the end of one cycle and the start of the next
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,

    /// Repositories fetched at the same time (1 = sequential)
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Record the first successful poll of each repository without notifying
    #[serde(rename = "baseline-first-poll", default = "default_baseline_first_poll")]
    pub baseline_first_poll: bool,
}

fn default_poll_interval_secs() -> f64 {
    30.0
}

fn default_max_concurrent_fetches() -> usize {
    1
}

fn default_baseline_first_poll() -> bool {
    true
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30.0,
            max_concurrent_fetches: 1,
            baseline_first_poll: true,
        }
    }
}

impl DispatcherConfig {
    /// Get the poll interval as a Duration
    ///
    /// Non-finite or negative values collapse to zero; `Config::validate`
    /// rejects them before a dispatcher is built.
    pub fn poll_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.poll_interval_secs).unwrap_or(Duration::ZERO)
    }
}
