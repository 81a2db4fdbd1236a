//! Async Stream/Sink adapters for sigring
//!
//! This crate turns a [`sigring::SignalBuffer`] into an async pipeline:
//! a [`SignalSender`] publishing values with awaited backpressure and a
//! [`SignalReceiver`] implementing [`futures::Stream`].
//!
//! # Features
//!
//! - **Hybrid polling**: event-driven via `Notify` + configurable poll
//!   interval as safety net
//! - **Backpressure**: senders await when the buffer is full, woken when
//!   space is freed
//! - **Terminal semantics**: completion ends the stream, an error terminal
//!   yields one final `Err(cause)`; both strictly after all values, exactly
//!   once
//! - **Pooling**: [`pipeline_from`] draws pooled buffers so short-lived
//!   pipelines skip the slot-array allocation
//!
//! # Example
//!
//! ```ignore
//! use sigring::Config;
//! use sigring_stream::{pipeline, StreamExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = pipeline::<u64>(Config::default());
//!
//!     tokio::spawn(async move {
//!         tx.send(1).await.unwrap();
//!         tx.send(2).await.unwrap();
//!         tx.complete();
//!     });
//!
//!     while let Some(item) = rx.next().await {
//!         println!("received: {:?}", item);
//!     }
//! }
//! ```

mod config;
mod error;
mod pipeline;
mod receiver;
mod sender;

pub use config::StreamConfig;
pub use error::StreamError;
pub use pipeline::{pipeline, pipeline_from, pipeline_with_stream_config};
pub use receiver::SignalReceiver;
pub use sender::SignalSender;

// Re-export useful stream combinators
pub use tokio_stream::StreamExt;
