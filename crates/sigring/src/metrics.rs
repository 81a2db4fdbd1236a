use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for monitoring buffer traffic.
///
/// Recording is gated by `Config::enable_metrics`; when disabled the buffer
/// never touches these counters and `snapshot()` returns zeros.
#[derive(Debug, Default)]
pub struct Metrics {
    values_published: AtomicU64,
    signals_polled: AtomicU64,
    terminal_published: AtomicU64,
    backpressure_rejections: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_value_published(&self) {
        self.values_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_signal_polled(&self) {
        self.signals_polled.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_terminal_published(&self) {
        self.terminal_published.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_backpressure_rejection(&self) {
        self.backpressure_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            values_published: self.values_published.load(Ordering::Relaxed),
            signals_polled: self.signals_polled.load(Ordering::Relaxed),
            terminal_published: self.terminal_published.load(Ordering::Relaxed),
            backpressure_rejections: self.backpressure_rejections.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Value tokens accepted by `publish_value`.
    pub values_published: u64,
    /// Tokens (value or terminal) handed out by `poll`.
    pub signals_polled: u64,
    /// Terminal publishes that won the first-terminal race.
    pub terminal_published: u64,
    /// `publish_value` calls rejected because the backend was full.
    pub backpressure_rejections: u64,
}
