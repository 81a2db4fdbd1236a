//! Error types for stream adapter operations.

use thiserror::Error;

/// Errors that can occur when driving a signal buffer asynchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The buffer is full and cannot accept more values right now.
    #[error("signal buffer is full")]
    Full,

    /// A terminal signal (completion or error) was already published; the
    /// stream accepts no further values.
    #[error("stream has already terminated")]
    Terminated,

    /// The buffer has been released and is permanently unusable.
    #[error("signal buffer has been released")]
    Released,
}

impl StreamError {
    /// Returns `true` if this error is recoverable by waiting (e.g., `Full`).
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full)
    }

    /// Returns `true` if this error means the pipeline is permanently done.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Released)
    }
}
