//! Configuration for the async receiver's polling behavior.

use std::time::Duration;

/// Configuration for the receiver's hybrid polling strategy.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Poll interval for the timer safety net.
    ///
    /// The receiver is primarily event-driven (woken by the sender's data
    /// notification); the interval catches missed notifications and keeps
    /// worst-case delivery latency bounded.
    ///
    /// Default: 10ms
    pub poll_interval: Duration,

    /// Target number of tokens to drain per wakeup.
    ///
    /// Draining in batches amortizes the wakeup cost; the receiver still
    /// yields items one at a time to its stream consumer.
    ///
    /// Default: 64
    pub batch_hint: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            batch_hint: 64,
        }
    }
}

impl StreamConfig {
    /// Creates a low-latency configuration with a shorter poll interval.
    pub fn low_latency() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            batch_hint: 16,
        }
    }

    /// Creates a high-throughput configuration with larger batches.
    pub fn high_throughput() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            batch_hint: 256,
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the batch hint.
    pub fn with_batch_hint(mut self, hint: usize) -> Self {
        self.batch_hint = hint.max(1);
        self
    }
}
