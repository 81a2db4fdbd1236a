//! sigring - Bounded, Pooled Signal Buffer with Backpressure Enforcement
//!
//! The hand-off point in a reactive pipeline: a producer of value /
//! completion / error events on one side, a possibly-slower consumer on the
//! other. Events are encoded into one uniform token type, values are stored
//! in a fixed-capacity lock-free queue, and the single terminal event is
//! kept out-of-band so it is delivered strictly after every buffered value.
//!
//! # Key Features
//!
//! - Hard capacity contract: publishing into a full buffer is reported as a
//!   backpressure violation, never blocked on or silently dropped
//! - Terminal ordering: completion/error is observable only after the queue
//!   has drained, exactly once, with first-terminal-wins semantics
//! - Interchangeable backends (SPSC, SPMC, mutex fallback) chosen once at
//!   construction by a platform capability check
//! - Backend pooling to keep slot-array allocation off the per-stream path
//!
//! # Example
//!
//! ```
//! use sigring::{Config, Signal, SignalPools};
//!
//! let pools = SignalPools::<u64>::new(Config::default());
//! let buffer = pools.spsc_buffer();
//!
//! buffer.publish_value(1).unwrap();
//! buffer.publish_value(2).unwrap();
//! buffer.publish_completed();
//!
//! assert!(matches!(buffer.poll(), Some(Signal::Value(1))));
//! assert!(matches!(buffer.poll(), Some(Signal::Value(2))));
//! assert!(matches!(buffer.poll(), Some(Signal::Completed)));
//! assert!(buffer.poll().is_none());
//!
//! buffer.release(); // backend goes back to the pool
//! ```

mod buffer;
mod config;
mod invariants;
mod metrics;
mod pool;
mod queue;
mod signal;

pub use buffer::{PublishError, SignalBuffer, SignalPools};
pub use config::{Config, COMPACT_CONFIG, DEFAULT_CAPACITY};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pool::{QueuePool, DEFAULT_POOL_SIZE};
pub use queue::{fast_path_available, BackendKind, QueueBackend, SpmcQueue, SpscQueue, SyncQueue};
pub use signal::{Fault, Observer, Signal};
