//! Demonstration of sigring-stream features.
//!
//! Run with: `cargo run -p sigring-stream --bin demo`

use futures_util::SinkExt;
use sigring::{Config, SignalPools};
use sigring_stream::{pipeline, pipeline_from, StreamConfig, StreamExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("=== sigring-stream Demo ===\n");

    demo_basic_usage().await?;
    demo_backpressure().await?;
    demo_error_terminal().await?;
    demo_sink_trait().await?;
    demo_pooled_pipelines().await?;

    println!("\n=== All demos completed successfully! ===");
    Ok(())
}

/// Demo 1: Basic pipeline with completion
async fn demo_basic_usage() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("--- Demo 1: Basic Usage ---");

    let (tx, mut rx) = pipeline::<u64>(Config::default());

    let producer = tokio::spawn(async move {
        for i in 0..5 {
            tx.send(i).await.expect("send failed");
            println!("  Sent: {}", i);
        }
        tx.complete();
    });

    while let Some(item) = rx.next().await {
        println!("  Received: {}", item?);
    }
    println!("  Stream completed");

    producer.await?;
    Ok(())
}

/// Demo 2: Senders wait when the buffer is full
async fn demo_backpressure() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("\n--- Demo 2: Backpressure ---");

    // 4-slot buffer, 64 items: the sender is paused 60 times
    let (tx, mut rx) = pipeline::<u64>(Config::new(2, false));

    let producer = tokio::spawn(async move {
        for i in 0..64 {
            tx.send(i).await.expect("send failed");
        }
        tx.complete();
    });

    let mut received = 0u64;
    while let Some(item) = rx.next().await {
        item?;
        received += 1;
    }
    println!("  Received all {} items through a 4-slot buffer", received);

    producer.await?;
    Ok(())
}

/// Demo 3: An error terminal ends the stream with one final Err
async fn demo_error_terminal() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("\n--- Demo 3: Error Terminal ---");

    let (tx, mut rx) = pipeline::<u64>(Config::default());

    tx.send(1).await?;
    tx.send(2).await?;
    tx.fail("sensor went offline");

    while let Some(item) = rx.next().await {
        match item {
            Ok(v) => println!("  Received: {}", v),
            Err(cause) => println!("  Stream failed: {}", cause),
        }
    }

    Ok(())
}

/// Demo 4: The futures::Sink interface; close() publishes completion
async fn demo_sink_trait() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("\n--- Demo 4: Sink Trait ---");

    let (mut tx, mut rx) = pipeline::<u64>(Config::default());

    SinkExt::send(&mut tx, 42).await?;
    tx.flush().await?;
    tx.close().await?; // ends the stream

    while let Some(item) = rx.next().await {
        println!("  Received via Sink: {}", item?);
    }
    println!("  Stream closed");

    Ok(())
}

/// Demo 5: Pooled pipelines reuse queue storage
async fn demo_pooled_pipelines() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("\n--- Demo 5: Pooled Pipelines ---");

    let pools = SignalPools::<u64>::new(Config::default());

    for round in 0..3 {
        let (tx, mut rx) = pipeline_from(&pools, StreamConfig::low_latency());
        tx.send(round).await?;
        tx.complete();
        while let Some(item) = rx.next().await {
            println!("  Round {}: received {}", round, item?);
        }
        drop(rx);
        println!("  Idle backends pooled: {}", pools.spsc_idle_count());
    }

    Ok(())
}
