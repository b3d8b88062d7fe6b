// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use mesa_core::{DocumentQuery, MesaError};
use mesa_sync::{
    FailurePolicy, QueryResync, ResyncFn, StalenessTracker, TopicState, Watchdog, WatchdogConfig,
};
use mesa_test_utils::helpers::{advance_and_settle, ms, settle};
use mesa_test_utils::test_data::open_orders;
use mesa_test_utils::MockDocumentSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::pause;

const SECOND: Duration = Duration::from_secs(1);
// Timer deadlines round up to the next millisecond
const SLACK: Duration = Duration::from_millis(10);

struct Fixture {
    tracker: StalenessTracker,
    source: MockDocumentSource,
    resync: Arc<QueryResync<MockDocumentSource>>,
}

fn fixture(topics: &[&str], threshold: Duration) -> Fixture {
    let tracker = StalenessTracker::new();
    let source = MockDocumentSource::new();
    let resync = Arc::new(QueryResync::new(source.clone()));
    for topic in topics {
        source.set_collection(topic, open_orders());
        tracker.register(*topic, threshold);
        resync.bind(
            *topic,
            DocumentQuery::collection(*topic),
            FailurePolicy::KeepLastKnown,
            |_| {},
        );
    }
    Fixture {
        tracker,
        source,
        resync,
    }
}

#[tokio::test]
async fn test_silent_topic_is_resynced_on_next_check() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders"], 60 * SECOND);
    f.tracker.activate("orders")?;
    let _watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;
    settle().await;

    advance_and_settle(60 * SECOND).await;
    assert_eq!(f.source.fetch_count(), 0);

    advance_and_settle(30 * SECOND + SLACK).await;
    assert_eq!(f.source.fetches_of("orders"), 1);
    assert_eq!(f.tracker.state("orders"), Some(TopicState::Active));
    Ok(())
}

#[tokio::test]
async fn test_events_keep_topic_from_being_resynced() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders"], 60 * SECOND);
    f.tracker.activate("orders")?;
    let record = f.tracker.recorder::<()>("orders");
    let _watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;
    settle().await;

    for _ in 0..8 {
        advance_and_settle(20 * SECOND).await;
        record(());
    }

    assert_eq!(f.source.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_failed_resync_stays_stale_and_retries_next_tick() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders"], 10 * SECOND);
    f.tracker.activate("orders")?;
    f.source.set_offline(true);
    let _watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;
    settle().await;

    advance_and_settle(30 * SECOND + SLACK).await;
    assert_eq!(f.source.fetch_count(), 1);
    assert_eq!(f.tracker.state("orders"), Some(TopicState::StaleDetected));

    f.source.set_offline(false);
    advance_and_settle(30 * SECOND + SLACK).await;

    assert_eq!(f.source.fetch_count(), 2);
    assert_eq!(f.tracker.state("orders"), Some(TopicState::Active));
    Ok(())
}

#[tokio::test]
async fn test_backstop_resyncs_every_active_topic() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders", "tables", "stock"], 3_600 * SECOND);
    f.tracker.activate("orders")?;
    f.tracker.activate("tables")?;
    let config = WatchdogConfig::default().with_backstop_interval(90 * SECOND);
    let _watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), config)?;
    settle().await;

    advance_and_settle(60 * SECOND).await;
    assert_eq!(f.source.fetch_count(), 0);

    advance_and_settle(30 * SECOND + SLACK).await;

    assert_eq!(f.source.fetches_of("orders"), 1);
    assert_eq!(f.source.fetches_of("tables"), 1);
    assert_eq!(f.source.fetches_of("stock"), 0);
    Ok(())
}

#[tokio::test]
async fn test_deactivated_topic_is_left_alone() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders"], SECOND);
    f.tracker.activate("orders")?;
    f.tracker.deactivate("orders")?;
    let config = WatchdogConfig::default().with_backstop_interval(60 * SECOND);
    let _watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), config)?;
    settle().await;

    advance_and_settle(120 * SECOND).await;

    assert_eq!(f.source.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_check_now_runs_inline() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders", "tables"], SECOND);
    f.tracker.activate("orders")?;
    f.tracker.activate("tables")?;
    f.source.set_collection("tables", vec![]);
    let watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;
    advance_and_settle(ms(1_500)).await;
    f.tracker.record_event("tables")?;

    let report = watchdog.check_now().await;

    assert_eq!(report.resynced, vec!["orders".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(f.source.fetches_of("tables"), 0);
    Ok(())
}

#[tokio::test]
async fn test_resync_all_reports_failures() -> anyhow::Result<()> {
    let f = fixture(&["orders"], 60 * SECOND);
    f.tracker.activate("orders")?;
    f.source.set_offline(true);
    let watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;

    let report = watchdog.resync_all().await;

    assert_eq!(report.failed, vec!["orders".to_string()]);
    assert!(report.resynced.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_hung_resync_times_out() -> anyhow::Result<()> {
    pause();
    let tracker = StalenessTracker::new();
    tracker.register("orders", SECOND);
    tracker.activate("orders")?;
    let hung = ResyncFn::new(|_topic: String| std::future::pending::<Result<(), MesaError>>());
    let config = WatchdogConfig::default().with_resync_timeout(5 * SECOND);
    let watchdog = Watchdog::spawn(tracker.clone(), hung, config)?;
    advance_and_settle(2 * SECOND).await;

    let report = watchdog.check_now().await;

    assert_eq!(report.failed, vec!["orders".to_string()]);
    assert_eq!(tracker.state("orders"), Some(TopicState::StaleDetected));
    Ok(())
}

#[tokio::test]
async fn test_panicking_sink_does_not_end_the_loop() -> anyhow::Result<()> {
    pause();
    let tracker = StalenessTracker::new();
    let source = MockDocumentSource::new();
    source.set_collection("orders", open_orders());
    let resync = Arc::new(QueryResync::new(source.clone()));
    tracker.register("orders", 10 * SECOND);
    tracker.activate("orders")?;
    resync.bind(
        "orders",
        DocumentQuery::collection("orders"),
        FailurePolicy::KeepLastKnown,
        |_| panic!("view unmounted"),
    );
    let watchdog = Watchdog::spawn(tracker.clone(), resync.clone(), WatchdogConfig::default())?;
    settle().await;

    advance_and_settle(30 * SECOND + SLACK).await;
    advance_and_settle(30 * SECOND + SLACK).await;

    assert!(watchdog.is_running());
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(tracker.state("orders"), Some(TopicState::StaleDetected));
    Ok(())
}

#[tokio::test]
async fn test_stopped_watchdog_no_longer_ticks() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders"], SECOND);
    f.tracker.activate("orders")?;
    let watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;
    settle().await;

    watchdog.stop();
    advance_and_settle(120 * SECOND).await;

    assert!(!watchdog.is_running());
    assert_eq!(f.source.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_dropped_watchdog_no_longer_ticks() -> anyhow::Result<()> {
    pause();
    let f = fixture(&["orders"], SECOND);
    f.tracker.activate("orders")?;
    let watchdog = Watchdog::spawn(f.tracker.clone(), f.resync.clone(), WatchdogConfig::default())?;
    settle().await;

    drop(watchdog);
    advance_and_settle(120 * SECOND).await;

    assert_eq!(f.source.fetch_count(), 0);
    Ok(())
}

#[test]
fn test_spawn_outside_runtime_fails() {
    let f = fixture(&["orders"], SECOND);

    let result = Watchdog::spawn(f.tracker, f.resync, WatchdogConfig::default());

    assert!(result.is_err());
}

#[test]
fn test_config_defaults_and_millisecond_fields() -> anyhow::Result<()> {
    let defaults = WatchdogConfig::default();
    assert_eq!(defaults.check_interval, 30 * SECOND);
    assert_eq!(defaults.backstop_interval, 300 * SECOND);
    assert_eq!(defaults.resync_timeout, 10 * SECOND);

    let config: WatchdogConfig = serde_json::from_str(r#"{"check_interval_ms": 5000}"#)?;

    assert_eq!(config.check_interval, 5 * SECOND);
    assert_eq!(config.backstop_interval, 300 * SECOND);
    Ok(())
}
