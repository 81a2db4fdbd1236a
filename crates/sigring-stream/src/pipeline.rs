//! Pipeline construction: wiring a signal buffer to its async endpoints.

use crate::config::StreamConfig;
use crate::receiver::SignalReceiver;
use crate::sender::SignalSender;
use sigring::{fast_path_available, Config, QueueBackend, SignalBuffer, SignalPools};
use std::sync::Arc;
use tokio::sync::Notify;

/// State shared by the two endpoints of one pipeline.
pub(crate) struct Shared<T> {
    /// The buffer itself; released when the receiver goes away.
    pub(crate) buffer: SignalBuffer<T>,
    /// Sender -> receiver: a token was published.
    pub(crate) data_notify: Notify,
    /// Receiver -> sender: space was freed (or the buffer was released).
    pub(crate) space_notify: Notify,
}

/// Creates an async pipeline over a private signal buffer.
///
/// The buffer uses the lock-free single-consumer backend when the platform
/// supports it and the universally safe fallback otherwise. For pooled
/// backends use [`pipeline_from`].
///
/// # Example
///
/// ```ignore
/// use sigring::Config;
/// use sigring_stream::{pipeline, StreamExt};
///
/// let (tx, mut rx) = pipeline::<u64>(Config::default());
/// tx.try_send(42).unwrap();
/// tx.complete();
/// ```
pub fn pipeline<T: Send + 'static>(config: Config) -> (SignalSender<T>, SignalReceiver<T>) {
    pipeline_with_stream_config(config, StreamConfig::default())
}

/// Creates an async pipeline with custom receiver polling behavior.
pub fn pipeline_with_stream_config<T: Send + 'static>(
    config: Config,
    stream_config: StreamConfig,
) -> (SignalSender<T>, SignalReceiver<T>) {
    let backend = if fast_path_available() {
        QueueBackend::spsc(config.capacity())
    } else {
        QueueBackend::fallback(config.capacity())
    };
    wire(SignalBuffer::with_backend(backend, config), stream_config)
}

/// Creates an async pipeline over a pooled buffer.
///
/// The backend comes from (and is recycled to) `pools`, amortizing slot
/// allocation across many short-lived pipelines.
pub fn pipeline_from<T: Send + 'static>(
    pools: &SignalPools<T>,
    stream_config: StreamConfig,
) -> (SignalSender<T>, SignalReceiver<T>) {
    wire(pools.spsc_buffer(), stream_config)
}

fn wire<T: Send + 'static>(
    buffer: SignalBuffer<T>,
    stream_config: StreamConfig,
) -> (SignalSender<T>, SignalReceiver<T>) {
    let shared = Arc::new(Shared {
        buffer,
        data_notify: Notify::new(),
        space_notify: Notify::new(),
    });
    let sender = SignalSender::new(Arc::clone(&shared));
    let receiver = SignalReceiver::new(shared, stream_config);
    (sender, receiver)
}
