/// Configuration for a signal buffer and the pools that feed it.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Buffer capacity as power of 2 (default: 10 = 1024 slots)
    pub capacity_bits: u8,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity_bits: u8, enable_metrics: bool) -> Self {
        Self {
            capacity_bits,
            enable_metrics,
        }
    }

    /// Returns the number of value slots in the backing queue.
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.capacity_bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity_bits: 10, // 1024 slots
            enable_metrics: false,
        }
    }
}

/// Default number of value slots per buffer.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Compact configuration (128 slots) for memory-constrained pipelines that
/// hold many buffers alive at once.
pub const COMPACT_CONFIG: Config = Config::new(7, false);
