//! Integration tests: scripted buffer scenarios and real-thread runs over
//! the pooled backends.

use sigring::{
    Config, Fault, Observer, PublishError, Signal, SignalBuffer, SignalPools,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

// ---------------------------------------------------------------------
// Scripted scenarios
// ---------------------------------------------------------------------

#[test]
fn scenario_capacity_two_backpressure_then_completion() {
    let buffer = SignalBuffer::unpooled(Config::new(1, false)); // 2 slots

    buffer.publish_value('A').unwrap();
    buffer.publish_value('B').unwrap();
    match buffer.publish_value('C') {
        Err(PublishError::MissingBackpressure('C')) => {}
        other => panic!("expected backpressure rejection, got {other:?}"),
    }

    assert!(matches!(buffer.poll(), Some(Signal::Value('A'))));
    assert!(matches!(buffer.poll(), Some(Signal::Value('B'))));

    buffer.publish_completed();
    assert!(matches!(buffer.poll(), Some(Signal::Completed)));
    assert!(buffer.poll().is_none());
}

#[test]
fn scenario_immediate_error_with_no_values() {
    let buffer = SignalBuffer::<u64>::unpooled(Config::new(2, false)); // 4 slots

    buffer.publish_error("upstream exploded");
    match buffer.poll() {
        Some(Signal::Error(cause)) => assert_eq!(cause.to_string(), "upstream exploded"),
        other => panic!("expected error token, got {other:?}"),
    }
    assert!(buffer.poll().is_none());
    assert!(buffer.poll().is_none());
}

#[test]
fn scenario_poll_never_returns_terminal_while_values_remain() {
    let buffer = SignalBuffer::unpooled(Config::new(3, false));
    for i in 0..5u64 {
        buffer.publish_value(i).unwrap();
    }
    buffer.publish_completed();

    while buffer.count() > 0 {
        let token = buffer.poll().expect("values still buffered");
        assert!(
            token.is_value(),
            "terminal surfaced while count() was nonzero"
        );
    }
    assert!(matches!(buffer.poll(), Some(Signal::Completed)));
}

// ---------------------------------------------------------------------
// Threaded runs
// ---------------------------------------------------------------------

#[test]
fn spsc_pipeline_delivers_everything_in_order_then_terminal() {
    const TOTAL: u64 = 50_000;

    let pools = SignalPools::new(Config::default());
    let buffer = Arc::new(pools.spsc_buffer());
    let producer_buffer = Arc::clone(&buffer);

    let producer = thread::spawn(move || {
        let mut next = 0u64;
        while next < TOTAL {
            match producer_buffer.publish_value(next) {
                Ok(()) => next += 1,
                // Consumer is behind; demand accounting in a real pipeline
                // would prevent this, here we just retry.
                Err(PublishError::MissingBackpressure(_)) => thread::yield_now(),
                Err(PublishError::Released(_)) => panic!("buffer released mid-run"),
            }
        }
        producer_buffer.publish_completed();
    });

    let mut expected = 0u64;
    loop {
        match buffer.poll() {
            Some(Signal::Value(v)) => {
                assert_eq!(v, expected, "value out of order or duplicated");
                expected += 1;
            }
            Some(Signal::Completed) => break,
            Some(Signal::Error(cause)) => panic!("unexpected error: {cause}"),
            None => thread::yield_now(),
        }
    }
    assert_eq!(expected, TOTAL, "values lost before terminal");
    assert!(buffer.poll().is_none());

    producer.join().unwrap();
}

#[test]
fn spmc_consumers_split_values_and_see_one_terminal() {
    const TOTAL: u64 = 20_000;
    const CONSUMERS: usize = 4;

    let pools = SignalPools::new(Config::default());
    let buffer = Arc::new(pools.spmc_buffer());
    let terminal_seen = Arc::new(AtomicUsize::new(0));

    let mut consumers = Vec::new();
    for _ in 0..CONSUMERS {
        let buffer = Arc::clone(&buffer);
        let terminal_seen = Arc::clone(&terminal_seen);
        consumers.push(thread::spawn(move || {
            let mut taken = Vec::new();
            loop {
                match buffer.poll() {
                    Some(Signal::Value(v)) => taken.push(v),
                    Some(Signal::Completed) => {
                        terminal_seen.fetch_add(1, Ordering::SeqCst);
                        break;
                    }
                    Some(Signal::Error(cause)) => panic!("unexpected error: {cause}"),
                    None => {
                        // Sibling consumers race for the terminal; once one
                        // of them takes it the rest only ever see None.
                        if terminal_seen.load(Ordering::SeqCst) > 0 {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            }
            taken
        }));
    }

    let producer_buffer = Arc::clone(&buffer);
    let producer = thread::spawn(move || {
        let mut next = 0u64;
        while next < TOTAL {
            if producer_buffer.publish_value(next).is_ok() {
                next += 1;
            } else {
                thread::yield_now();
            }
        }
        producer_buffer.publish_completed();
    });

    producer.join().unwrap();

    let mut all: Vec<u64> = Vec::new();
    for consumer in consumers {
        all.extend(consumer.join().unwrap());
    }
    all.sort_unstable();
    assert_eq!(all.len() as u64, TOTAL, "values lost or duplicated");
    for (i, v) in all.iter().enumerate() {
        assert_eq!(*v, i as u64);
    }
    assert_eq!(
        terminal_seen.load(Ordering::SeqCst),
        1,
        "terminal must be observed exactly once"
    );
}

#[test]
fn release_from_another_thread_leaves_pollers_inert() {
    let pools = SignalPools::new(Config::default());
    let buffer = Arc::new(pools.spsc_buffer());
    for i in 0..100u64 {
        buffer.publish_value(i).unwrap();
    }

    let releaser_buffer = Arc::clone(&buffer);
    let releaser = thread::spawn(move || {
        releaser_buffer.release();
    });

    // Racing polls must either see live tokens or inert emptiness, never
    // panic or wedge.
    let mut drained = 0usize;
    for _ in 0..1_000 {
        if buffer.poll().is_some() {
            drained += 1;
        }
    }
    releaser.join().unwrap();

    assert!(drained <= 100);
    assert!(buffer.is_released());
    assert_eq!(buffer.count(), 0);
    assert!(buffer.poll().is_none());
}

// ---------------------------------------------------------------------
// Pool reuse across buffer lifetimes
// ---------------------------------------------------------------------

#[test]
fn pool_reuses_backends_across_generations() {
    let pools = SignalPools::<u64>::new(Config::new(4, false));

    for generation in 0..5 {
        let buffer = pools.spsc_buffer();
        for i in 0..10 {
            buffer.publish_value(generation * 100 + i).unwrap();
        }
        // Release with tokens still buffered: the pool must get a clean
        // backend regardless.
        buffer.release();
        assert_eq!(pools.spsc_idle_count(), 1);
    }

    let fresh = pools.spsc_buffer();
    assert_eq!(fresh.count(), 0);
    assert!(fresh.poll().is_none());
}

// ---------------------------------------------------------------------
// Dispatch loop over the observer capability
// ---------------------------------------------------------------------

struct Collecting {
    values: Vec<u64>,
    completed: bool,
    failures: Vec<String>,
}

impl Observer<u64> for Collecting {
    fn on_value(&mut self, value: u64) {
        self.values.push(value);
    }
    fn on_completed(&mut self) {
        self.completed = true;
    }
    fn on_error(&mut self, cause: Fault) {
        self.failures.push(cause.to_string());
    }
}

#[test]
fn dispatch_loop_stops_on_terminal() {
    let buffer = SignalBuffer::unpooled(Config::new(4, false));
    for i in 0..6u64 {
        buffer.publish_value(i).unwrap();
    }
    buffer.publish_error("halfway failure");

    let mut observer = Collecting {
        values: Vec::new(),
        completed: false,
        failures: Vec::new(),
    };

    while let Some(token) = buffer.poll() {
        if buffer.dispatch(token, &mut observer) {
            break;
        }
    }

    assert_eq!(observer.values, (0..6).collect::<Vec<_>>());
    assert!(!observer.completed);
    assert_eq!(observer.failures, vec!["halfway failure"]);
    assert!(buffer.poll().is_none());
}
