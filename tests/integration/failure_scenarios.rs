//! Failure tests for the agent loop
//!
//! These tests verify that the system handles failures gracefully:
//! - Source failures are retried after the error backoff
//! - Malformed readings never reach the history
//! - Unreadable partitions and processes are dropped, not fatal

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use hostwatch::{
    actors::{agent::Schedule, messages::AgentState},
    error::PartialDataLoss,
    monitors::source::DiskReading,
};
use tokio_test::{assert_err, assert_ok};

use crate::helpers::*;

#[tokio::test]
async fn test_failed_cycle_is_retried_after_backoff() {
    let source = Arc::new(MockSource::new(20.0, 30.0));
    source.fail_next(1);

    let (handle, history) =
        spawn_system_agent(source.clone(), Schedule::new(LONG, Duration::from_millis(50)), 10);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.failed_cycles, 1);
    assert_matches!(stats.last_error.as_deref(), Some(msg) if msg.contains("mock failure"));
    assert!(history.is_empty().await);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.completed_cycles, 1);
    assert_eq!(history.len().await, 1);
    assert_eq!(handle.state(), AgentState::Running);

    handle.stop().await;
    handle.stopped().await;
}

#[tokio::test]
async fn test_failed_cycle_leaves_history_unchanged() {
    let source = Arc::new(MockSource::new(20.0, 30.0));
    let (handle, history) = spawn_system_agent(source.clone(), Schedule::new(LONG, LONG), 10);

    assert_ok!(handle.collect_now().await);
    let before = history.snapshot(10).await;

    source.fail_next(2);
    assert_err!(handle.collect_now().await);
    assert_err!(handle.collect_now().await);

    assert_eq!(history.snapshot(10).await, before);

    assert_ok!(handle.collect_now().await);
    assert_eq!(history.len().await, before.len() + 1);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.failed_cycles, 2);

    handle.stop().await;
    handle.stopped().await;
}

#[tokio::test]
async fn test_malformed_reading_is_rejected() {
    let source = Arc::new(MockSource::new(20.0, 30.0));
    let (handle, history) = spawn_system_agent(source.clone(), Schedule::new(LONG, LONG), 10);
    handle.stats().await.unwrap();

    source.set_cpu(f64::NAN);
    assert_err!(handle.collect_now().await);
    assert_eq!(history.len().await, 1);

    source.set_cpu(25.0);
    assert_ok!(handle.collect_now().await);
    assert_eq!(history.latest().await.unwrap().sample.cpu_percent, 25.0);

    handle.stop().await;
    handle.stopped().await;
}

#[tokio::test]
async fn test_unreadable_partitions_are_skipped() {
    let source = Arc::new(MockSource::new(20.0, 30.0));

    let mut partial = reading(20.0, 30.0, &[("/", 1000, 100), ("/proc", 0, 0)]);
    partial.disks.push(DiskReading {
        mount_path: "/mnt/locked".to_string(),
        usage: Err(PartialDataLoss::new("/mnt/locked", "permission denied")),
    });
    source.set_reading(partial);

    let (handle, history) = spawn_system_agent(source, Schedule::new(LONG, LONG), 10);
    handle.stats().await.unwrap();

    let latest = history.latest().await.unwrap();
    let mounts: Vec<&str> = latest.sample.disk_usage.keys().map(String::as_str).collect();
    assert_eq!(mounts, vec!["/"]);

    handle.stop().await;
    handle.stopped().await;
}

#[tokio::test]
async fn test_stop_during_wait_is_prompt() {
    let source = Arc::new(MockSource::new(20.0, 30.0));
    let (handle, _history) = spawn_system_agent(source.clone(), Schedule::new(LONG, LONG), 10);

    handle.stats().await.unwrap();
    handle.stop().await;

    assert!(handle.wait_stopped(Duration::from_secs(1)).await);
    assert_eq!(source.calls(), 1);
}
