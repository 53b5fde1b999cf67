//! Integration tests for the tracker pipeline
//!
//! Tests cover:
//! - Context merge order through track_event
//! - Active/inactive state and queue binding
//! - Background transport delivery without a queue
//! - Plugin failures and plugin management
//! - wait_for_queue / flush_queue options
//! - Recorder transports

use super::test_utils::{rejected, retryable, CollectingObserver, RecordingTransport};
use eventline::error::PluginError;
use eventline::event::{Contexts, SequentialIdGenerator};
use eventline::observer::{Diagnostic, NullObserver};
use eventline::plugin::{
    ApplicationContextPlugin, Enrich, Plugin, PluginHost, SharedPlugin, UniqueGlobalContextPlugin,
};
use eventline::transport::RetryTransport;
use eventline::{
    Context, EventAttributes, FlushQueue, QueueConfig, RetryPolicy, TrackEventOptions, Tracker,
    TrackerError, TrackerQueue, WaitForQueueOptions,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn fast_queue() -> TrackerQueue {
    TrackerQueue::new(QueueConfig {
        batch_size: 10,
        batch_delay: Duration::ZERO,
        concurrency: 1,
    })
    .unwrap()
}

fn wait(timeout_ms: u64) -> WaitForQueueOptions {
    WaitForQueueOptions {
        interval: Duration::from_millis(5),
        timeout: Some(Duration::from_millis(timeout_ms)),
    }
}

/// Let background deliveries run.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

struct FailingEnricher;

impl Plugin for FailingEnricher {
    fn name(&self) -> &str {
        "FailingEnricher"
    }

    fn as_enricher(&self) -> Option<&dyn Enrich> {
        Some(self)
    }
}

impl Enrich for FailingEnricher {
    fn enrich(&self, _contexts: &mut Contexts, _host: &PluginHost) -> Result<(), PluginError> {
        Err(PluginError::Enrich {
            plugin: "FailingEnricher".to_string(),
            message: "context service offline".to_string(),
        })
    }
}

#[tokio::test]
async fn events_are_enriched_and_delivered_through_the_queue() {
    let transport = RecordingTransport::new("recorder");
    let tracker = Tracker::builder("shop")
        .queue(fast_queue())
        .transport(transport.clone())
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    for _ in 0..2 {
        tracker
            .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
            .await
            .unwrap();
    }
    let last = tracker
        .track_event(
            EventAttributes::new("VisibleEvent"),
            TrackEventOptions::default().wait_for_queue(wait(1000)),
        )
        .await
        .unwrap();

    assert!(tracker.queue().unwrap().is_idle());
    let delivered = transport.delivered_ids();
    assert_eq!(delivered.len(), 3);
    assert_eq!(delivered.last().map(String::as_str), Some(last.id()));

    for batch in transport.batches() {
        for event in batch {
            let application: Vec<&Context> = event
                .global_contexts()
                .iter()
                .filter(|c| c.context_type() == "ApplicationContext")
                .collect();
            assert_eq!(application.len(), 1);
            assert_eq!(application[0].id(), "shop");
        }
    }
}

#[tokio::test]
async fn owner_locations_come_first_and_owner_globals_last() {
    let tracker = Tracker::builder("shop")
        .location_stack(vec![Context::location("RootLocation", "home")])
        .global_contexts(vec![Context::global("DeviceContext", "owner")])
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    let event = tracker
        .track_event(
            EventAttributes::new("PressEvent")
                .with_location(Context::location("Section", "hero"))
                .with_global(Context::global("PathContext", "/home")),
            TrackEventOptions::default(),
        )
        .await
        .unwrap();

    let locations: Vec<&str> = event.location_stack().iter().map(|c| c.id()).collect();
    assert_eq!(locations, vec!["home", "hero"]);

    let globals: Vec<&str> = event
        .global_contexts()
        .iter()
        .map(|c| c.context_type())
        .collect();
    assert_eq!(globals, vec!["PathContext", "DeviceContext", "ApplicationContext"]);
}

#[tokio::test]
async fn inactive_tracker_skips_delivery_until_activated() {
    let transport = RecordingTransport::new("recorder");
    let queue = fast_queue();
    let tracker = Tracker::builder("shop")
        .queue(queue.clone())
        .transport(transport.clone())
        .observer(Arc::new(NullObserver))
        .active(false)
        .build()
        .unwrap();
    assert!(!queue.has_processor());

    let skipped = tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await
        .unwrap();
    assert!(skipped.global_contexts().is_empty());
    assert!(queue.is_idle());

    tracker.set_active(true);
    assert!(tracker.is_active());
    assert!(queue.has_processor());

    tracker
        .track_event(
            EventAttributes::new("PressEvent"),
            TrackEventOptions::default().wait_for_queue(wait(1000)),
        )
        .await
        .unwrap();
    assert_eq!(transport.calls(), 1);
    assert_ne!(transport.delivered_ids()[0], skipped.id());
}

#[tokio::test]
async fn unusable_transport_is_never_bound() {
    let queue = fast_queue();
    let tracker = Tracker::builder("shop")
        .queue(queue.clone())
        .transport(RecordingTransport::unusable("offline"))
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await
        .unwrap();
    assert!(!queue.has_processor());
    assert!(queue.is_idle());
}

#[tokio::test]
async fn direct_delivery_failures_are_observed_not_returned() {
    let observer = CollectingObserver::new();
    let transport = RecordingTransport::scripted("direct", vec![Err(rejected("direct"))]);
    let tracker = Tracker::builder("shop")
        .transport(transport.clone())
        .observer(observer.clone())
        .build()
        .unwrap();

    let event = tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await
        .unwrap();
    settle().await;

    assert_eq!(transport.calls(), 1);
    assert!(observer.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::DeliveryFailed { transport, event_id, .. }
            if transport == "direct" && event_id == event.id()
    )));
}

#[tokio::test(start_paused = true)]
async fn direct_delivery_does_not_wait_for_retry_backoff() {
    let observer = CollectingObserver::new();
    let script = (0..10).map(|_| Err(retryable("flaky"))).collect();
    let inner = RecordingTransport::scripted("flaky", script);
    let retry = RetryTransport::new(inner.clone(), RetryPolicy::default()).unwrap();
    let tracker = Tracker::builder("shop")
        .transport(Arc::new(retry))
        .observer(observer.clone())
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let event = tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(1000));

    // First call fails, the retry is now sleeping in the background.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(inner.calls(), 1);

    tokio::time::sleep(Duration::from_secs(2000)).await;
    assert_eq!(inner.calls(), 10);
    assert!(observer.diagnostics().iter().any(|d| matches!(
        d,
        Diagnostic::DeliveryFailed { event_id, .. } if event_id == event.id()
    )));
}

#[tokio::test]
async fn plugin_failures_abort_tracking() {
    let transport = RecordingTransport::new("recorder");
    let tracker = Tracker::builder("shop")
        .transport(transport.clone())
        .plugins(vec![Arc::new(FailingEnricher) as SharedPlugin])
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    let result = tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await;
    assert!(matches!(result, Err(TrackerError::Plugin(PluginError::Enrich { .. }))));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn plugins_are_unique_by_name() {
    let tracker = Tracker::builder("shop")
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    let duplicate = tracker.add_plugin(Arc::new(ApplicationContextPlugin), None);
    assert!(matches!(duplicate, Err(TrackerError::PluginAlreadyExists(_))));

    tracker
        .add_plugin(Arc::new(UniqueGlobalContextPlugin), Some(0))
        .unwrap();
    assert_eq!(
        tracker.plugin_names(),
        vec![UniqueGlobalContextPlugin::NAME, ApplicationContextPlugin::NAME]
    );

    tracker.replace_plugin(Arc::new(UniqueGlobalContextPlugin), Some(1)).unwrap();
    assert_eq!(
        tracker.plugin_names(),
        vec![ApplicationContextPlugin::NAME, UniqueGlobalContextPlugin::NAME]
    );

    tracker.remove_plugin(ApplicationContextPlugin::NAME).unwrap();
    assert!(!tracker.has_plugin(ApplicationContextPlugin::NAME));
    assert!(matches!(
        tracker.remove_plugin(ApplicationContextPlugin::NAME),
        Err(TrackerError::PluginNotFound(_))
    ));
}

#[tokio::test]
async fn flush_always_drops_queued_events() {
    let transport = RecordingTransport::new("recorder");
    let queue = fast_queue();
    let tracker = Tracker::builder("shop")
        .queue(queue.clone())
        .transport(transport.clone())
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    tracker
        .track_event(
            EventAttributes::new("PressEvent"),
            TrackEventOptions::default().flush_queue(FlushQueue::Always),
        )
        .await
        .unwrap();

    assert!(queue.is_idle());
    assert!(tracker.wait_for_queue(&wait(100)).await);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn flush_on_timeout_only_after_a_timed_out_wait() {
    let transport = RecordingTransport::slow("slow", Duration::from_secs(10));
    let queue = fast_queue();
    let tracker = Tracker::builder("shop")
        .queue(queue.clone())
        .transport(transport.clone())
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    // First event goes in flight and stays there for 10s.
    tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(queue.stats().in_flight, 1);

    tracker
        .track_event(
            EventAttributes::new("PressEvent"),
            TrackEventOptions::default()
                .wait_for_queue(wait(100))
                .flush_queue(FlushQueue::OnTimeout),
        )
        .await
        .unwrap();
    assert_eq!(queue.stats().pending, 0);

    assert!(tracker.wait_for_queue(&wait(20_000)).await);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn flush_on_timeout_keeps_events_when_wait_succeeds() {
    let transport = RecordingTransport::new("recorder");
    let tracker = Tracker::builder("shop")
        .queue(fast_queue())
        .transport(transport.clone())
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    tracker
        .track_event(
            EventAttributes::new("PressEvent"),
            TrackEventOptions::default()
                .wait_for_queue(wait(1000))
                .flush_queue(FlushQueue::OnTimeout),
        )
        .await
        .unwrap();
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn recorder_receives_a_copy_of_every_event() {
    let transport = RecordingTransport::new("primary");
    let recorder = RecordingTransport::new("recorder");
    let tracker = Tracker::builder("shop")
        .transport(transport.clone())
        .recorder(recorder.clone())
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    let event = tracker
        .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
        .await
        .unwrap();
    settle().await;

    assert_eq!(transport.delivered_ids(), vec![event.id().to_string()]);
    assert_eq!(recorder.delivered_ids(), vec![event.id().to_string()]);
}

#[tokio::test]
async fn id_generator_is_used_for_every_event() {
    let tracker = Tracker::builder("shop")
        .id_generator(Arc::new(SequentialIdGenerator::new()))
        .observer(Arc::new(NullObserver))
        .build()
        .unwrap();

    let mut ids = HashSet::new();
    for _ in 0..50 {
        let event = tracker
            .track_event(EventAttributes::new("PressEvent"), TrackEventOptions::default())
            .await
            .unwrap();
        assert!(event.id().starts_with("evt-"));
        ids.insert(event.id().to_string());
    }
    assert_eq!(ids.len(), 50);
}
