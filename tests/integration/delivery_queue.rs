//! Integration tests for the delivery queue
//!
//! Tests cover:
//! - FIFO batching
//! - Concurrency ramp after the first successful batch
//! - Failed batches staying queued
//! - Run re-entrancy guard
//! - Flush and idle waiting

use super::test_utils::{events, rejected, CollectingObserver, RecordingTransport};
use eventline::observer::Diagnostic;
use eventline::store::MemoryStore;
use eventline::{QueueConfig, SharedTransport, TrackerQueue};
use std::sync::Arc;
use std::time::Duration;

fn config(batch_size: usize, batch_delay: Duration, concurrency: usize) -> QueueConfig {
    QueueConfig {
        batch_size,
        batch_delay,
        concurrency,
    }
}

#[tokio::test]
async fn seven_events_drain_in_batches_of_three() {
    let queue = TrackerQueue::new(config(3, Duration::ZERO, 1)).unwrap();
    let transport = RecordingTransport::new("recorder");
    queue.bind_transport(transport.clone());

    queue.store().write(events(7)).unwrap();
    assert!(queue.run().await.unwrap());

    assert_eq!(transport.batch_sizes(), vec![3, 3, 1]);
    assert_eq!(
        transport.delivered_ids(),
        (0..7).map(|i| format!("e-{i}")).collect::<Vec<_>>()
    );
    assert!(queue.store().is_empty());
    assert_eq!(queue.stats().in_flight, 0);
    assert!(queue.is_idle());
}

#[tokio::test]
async fn seven_events_drain_in_batches_of_three_with_concurrency_three() {
    let queue = TrackerQueue::new(config(3, Duration::ZERO, 3)).unwrap();
    let transport = RecordingTransport::new("recorder");
    queue.bind_transport(transport.clone());

    queue.store().write(events(7)).unwrap();
    assert!(queue.run().await.unwrap());

    let mut sizes = transport.batch_sizes();
    sizes.sort_unstable_by(|a, b| b.cmp(a));
    assert_eq!(sizes, vec![3, 3, 1]);
    assert_eq!(transport.batches()[0][0].id(), "e-0");
    assert!(queue.store().is_empty());
    assert_eq!(queue.stats().in_flight, 0);
    assert!(queue.is_idle());
}

#[tokio::test(start_paused = true)]
async fn concurrency_ramps_up_after_first_success() {
    let queue = TrackerQueue::new(config(1, Duration::ZERO, 3)).unwrap();
    let transport = RecordingTransport::slow("slow", Duration::from_millis(10));
    queue.bind_transport(transport.clone());
    assert_eq!(queue.effective_concurrency(), 1);

    queue.store().write(events(7)).unwrap();
    queue.run().await.unwrap();

    assert_eq!(queue.effective_concurrency(), 3);
    assert_eq!(transport.calls(), 7);
    assert_eq!(transport.max_active(), 3);
    assert_eq!(transport.batches()[0][0].id(), "e-0");
}

#[tokio::test(start_paused = true)]
async fn first_batch_runs_alone_until_it_succeeds() {
    let queue = TrackerQueue::new(config(1, Duration::from_millis(50), 4)).unwrap();
    let transport = RecordingTransport::slow_scripted(
        "flaky",
        Duration::from_millis(10),
        vec![Err(rejected("flaky")), Err(rejected("flaky"))],
    );
    queue.bind_transport(transport.clone());

    queue.store().write(events(3)).unwrap();
    queue.run().await.unwrap();

    // Two failed rounds of one batch each before concurrency opens up.
    let ids: Vec<Vec<String>> = transport
        .batches()
        .iter()
        .map(|batch| batch.iter().map(|e| e.id().to_string()).collect())
        .collect();
    assert_eq!(ids[0], vec!["e-0"]);
    assert_eq!(ids[1], vec!["e-0"]);
    assert_eq!(ids[2], vec!["e-0"]);
    assert_eq!(transport.calls(), 5);
    assert!(queue.is_idle());
}

#[tokio::test(start_paused = true)]
async fn failed_batches_stay_queued_and_are_reported() {
    let observer = CollectingObserver::new();
    let queue = TrackerQueue::with_observer(
        Arc::new(MemoryStore::new()),
        config(10, Duration::from_millis(100), 1),
        observer.clone(),
    )
    .unwrap();
    let transport = RecordingTransport::scripted("flaky", vec![Err(rejected("flaky"))]);
    queue.bind_transport(transport.clone());

    queue.store().write(events(2)).unwrap();
    queue.run().await.unwrap();

    assert_eq!(transport.batch_sizes(), vec![2, 2]);
    let stats = queue.stats();
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.delivered_batches, 1);
    assert_eq!(stats.pending, 0);

    let diagnostics = observer.diagnostics();
    assert!(matches!(diagnostics[0], Diagnostic::BatchFailed { size: 2, .. }));
    assert!(matches!(diagnostics[1], Diagnostic::BatchDelivered { size: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn batch_delay_separates_runs() {
    let queue = TrackerQueue::new(config(1, Duration::from_millis(500), 1)).unwrap();
    let transport = RecordingTransport::new("recorder");
    queue.bind_transport(transport.clone());

    let started = tokio::time::Instant::now();
    queue.store().write(events(3)).unwrap();
    queue.run().await.unwrap();

    // First round runs immediately, then one delay per following round.
    assert_eq!(transport.calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(1000));
    assert!(started.elapsed() < Duration::from_millis(1500));
}

#[tokio::test]
async fn push_schedules_a_run() {
    let queue = TrackerQueue::new(config(10, Duration::ZERO, 1)).unwrap();
    let transport = RecordingTransport::new("recorder");
    queue.bind_transport(transport.clone());

    queue.push(events(2)).unwrap();
    assert!(
        queue
            .wait_until_idle(Duration::from_millis(5), Duration::from_secs(1))
            .await
    );
    assert_eq!(transport.delivered_ids(), vec!["e-0", "e-1"]);
}

#[tokio::test(start_paused = true)]
async fn concurrent_run_is_a_noop() {
    let queue = TrackerQueue::new(config(10, Duration::ZERO, 1)).unwrap();
    let transport = RecordingTransport::slow("slow", Duration::from_millis(100));
    queue.bind_transport(transport.clone());
    queue.store().write(events(2)).unwrap();

    let background = queue.clone();
    let handle = tokio::spawn(async move { background.run().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(queue.is_running());
    assert_eq!(queue.stats().in_flight, 2);
    assert!(!queue.run().await.unwrap());

    assert!(handle.await.unwrap().unwrap());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_until_idle_times_out_without_processor() {
    let queue = TrackerQueue::new(config(10, Duration::ZERO, 1)).unwrap();
    queue.push(events(1)).unwrap();

    let idle = queue
        .wait_until_idle(Duration::from_millis(10), Duration::from_millis(50))
        .await;
    assert!(!idle);
    assert_eq!(queue.stats().pending, 1);
}

#[tokio::test]
async fn flush_drops_pending_events() {
    let queue = TrackerQueue::new(config(10, Duration::ZERO, 1)).unwrap();
    queue.push(events(4)).unwrap();
    assert!(!queue.is_idle());

    queue.flush().unwrap();
    assert!(queue.is_idle());

    let transport: SharedTransport = RecordingTransport::new("late");
    queue.bind_transport(transport);
    assert!(!queue.run().await.unwrap());
}
