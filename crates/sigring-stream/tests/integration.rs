//! Integration tests for sigring-stream.

use futures::SinkExt;
use sigring::{Config, SignalPools};
use sigring_stream::{pipeline, pipeline_from, StreamConfig, StreamError, StreamExt};

#[tokio::test]
async fn test_values_then_completion() {
    let (tx, mut rx) = pipeline::<u64>(Config::default());

    tx.send(1).await.expect("send failed");
    tx.send(2).await.expect("send failed");
    tx.send(3).await.expect("send failed");
    tx.complete();

    let mut received = Vec::new();
    while let Some(item) = rx.next().await {
        received.push(item.expect("unexpected error token"));
    }
    assert_eq!(received, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_error_terminal_yields_final_err() {
    let (tx, mut rx) = pipeline::<u64>(Config::default());

    tx.send(10).await.expect("send failed");
    tx.fail("upstream broke");

    assert_eq!(rx.next().await.unwrap().unwrap(), 10);
    let fault = rx.next().await.unwrap().unwrap_err();
    assert_eq!(fault.to_string(), "upstream broke");
    assert!(rx.next().await.is_none(), "stream must end after the error");
}

#[tokio::test]
async fn test_first_terminal_wins_over_later_failure() {
    let (tx, mut rx) = pipeline::<u64>(Config::default());

    tx.complete();
    tx.fail("too late");

    assert!(rx.next().await.is_none());
}

#[tokio::test]
async fn test_try_send_hands_item_back_when_full() {
    let config = Config::new(2, false); // 4 slots
    let (tx, _rx) = pipeline::<u64>(config);

    for i in 0..4 {
        tx.try_send(i).expect("should fit");
    }
    assert_eq!(tx.try_send(100), Err(100), "item must be preserved");
}

#[tokio::test]
async fn test_backpressure_send_waits_for_space() {
    let config = Config::new(2, false); // 4 slots, far fewer than the items
    let (tx, mut rx) = pipeline::<u64>(config);

    let producer = tokio::spawn(async move {
        for i in 0..100u64 {
            tx.send(i).await.expect("send failed");
        }
        tx.complete();
    });

    let mut received = Vec::new();
    while let Some(item) = rx.next().await {
        received.push(item.expect("unexpected error token"));
    }
    producer.await.unwrap();

    assert_eq!(received, (0..100).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_dropping_sender_ends_stream() {
    let (tx, mut rx) = pipeline::<u64>(Config::default());

    tx.try_send(7).expect("send failed");
    drop(tx); // implicit completion

    assert_eq!(rx.next().await.unwrap().unwrap(), 7);
    assert!(rx.next().await.is_none());
}

#[tokio::test]
async fn test_release_fails_senders() {
    let (tx, mut rx) = pipeline::<u64>(Config::default());

    rx.release();
    assert!(rx.next().await.is_none());

    assert_eq!(tx.send(1).await, Err(StreamError::Released));
    assert_eq!(tx.try_send(2), Err(2));
    assert!(tx.is_released());
}

#[tokio::test]
async fn test_sink_trait_close_completes_stream() {
    let (mut tx, mut rx) = pipeline::<u64>(Config::default());

    tx.send(41).await.expect("sink send failed");
    SinkExt::send(&mut tx, 42).await.expect("sink send failed");
    tx.flush().await.expect("flush failed");
    tx.close().await.expect("close failed");

    assert_eq!(rx.next().await.unwrap().unwrap(), 41);
    assert_eq!(rx.next().await.unwrap().unwrap(), 42);
    assert!(rx.next().await.is_none(), "close() must publish completion");
}

#[tokio::test]
async fn test_pooled_pipeline_recycles_on_drop() {
    let pools = SignalPools::<u64>::new(Config::new(4, false));

    {
        let (tx, mut rx) = pipeline_from(&pools, StreamConfig::low_latency());
        tx.send(1).await.expect("send failed");
        tx.complete();
        assert_eq!(rx.next().await.unwrap().unwrap(), 1);
        assert!(rx.next().await.is_none());
    }

    assert_eq!(
        pools.spsc_idle_count(),
        1,
        "backend must return to the pool when the pipeline is dropped"
    );

    // A second pipeline reuses the recycled backend and starts clean
    let (tx, mut rx) = pipeline_from(&pools, StreamConfig::low_latency());
    assert_eq!(pools.spsc_idle_count(), 0);
    tx.send(9).await.expect("send failed");
    tx.complete();
    assert_eq!(rx.next().await.unwrap().unwrap(), 9);
    assert!(rx.next().await.is_none());
}

#[tokio::test]
async fn test_batch_hint_bounds_drain() {
    let stream_config = StreamConfig::default().with_batch_hint(8);
    let (tx, mut rx) = sigring_stream::pipeline_with_stream_config::<u64>(
        Config::default(),
        stream_config,
    );

    for i in 0..32 {
        tx.try_send(i).expect("send failed");
    }
    tx.complete();

    let mut received = Vec::new();
    while let Some(item) = rx.next().await {
        received.push(item.expect("unexpected error token"));
        assert!(rx.buffered_count() <= 8, "drain must respect the batch hint");
    }
    assert_eq!(received, (0..32).collect::<Vec<_>>());
}
