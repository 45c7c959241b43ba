//! Watcher lifecycle tests.
//!
//! # Test Strategy
//!
//! The supervisor is driven through its public control surface with a
//! scripted provider. Intervals are either long (to observe only the initial
//! scan) or a few milliseconds (to observe scheduled scans), and timing
//! assertions use a polling deadline rather than fixed sleeps where possible.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cardano_watcher::error::WatcherError;
use cardano_watcher::provider::ProviderClient;
use cardano_watcher::watcher::WatcherSupervisor;
use common::{eventually, summary, Harness, ADDR_A, ADDR_B, TX_ABC, TX_DEF};

const LONG: Duration = Duration::from_secs(3600);
const SHORT: Duration = Duration::from_millis(20);
const DEADLINE: Duration = Duration::from_secs(5);

/// Starting runs one scan of each enabled path before returning.
#[tokio::test]
async fn test_start_runs_initial_scans() {
    let h = Harness::new(5003, LONG).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1001, 4002));
    h.track(TX_ABC).await;
    h.provider.put_transaction(summary(TX_ABC, 5000, 3));

    let supervisor = h.supervisor();
    supervisor.start().await.unwrap();

    assert!(supervisor.is_running());
    assert_eq!(h.event_count().await, 2);
    assert_eq!(h.sink.received().len(), 2);

    let status = supervisor.status().await.unwrap();
    assert!(status.address_polling.active);
    assert!(status.transaction_polling.active);

    supervisor.stop().await;
    assert!(!supervisor.is_running());
}

/// A second start while running does nothing.
#[tokio::test]
async fn test_start_twice_is_a_noop() {
    let h = Harness::new(1010, LONG).await;
    h.watch(ADDR_A, Some(1000)).await;

    let supervisor = h.supervisor();
    supervisor.start().await.unwrap();
    let calls = h.provider.activity_calls.load(Ordering::SeqCst);
    assert_eq!(calls, 1);

    supervisor.start().await.unwrap();
    assert!(supervisor.is_running());
    assert_eq!(h.provider.activity_calls.load(Ordering::SeqCst), calls);

    supervisor.stop().await;
}

/// Without provider credentials start fails and nothing runs.
#[tokio::test]
async fn test_start_without_credentials_fails() {
    let h = Harness::new(1010, LONG).await;
    let client = Arc::new(ProviderClient::new(h.config.provider().clone()));
    let supervisor = WatcherSupervisor::new(&h.config, h.repository.clone(), client, h.sink.clone());

    let result = supervisor.start().await;
    assert!(matches!(result, Err(WatcherError::ConfigError { .. })));
    assert!(!supervisor.is_running());

    let status = supervisor.status().await.unwrap();
    assert!(!status.provider_available);
    assert!(!status.address_polling.active);
    assert!(!status.transaction_polling.active);

    assert!(supervisor.start_address_polling().await.is_err());
    assert!(supervisor.manual_poll().await.is_err());
}

/// The two paths start and stop independently.
#[tokio::test]
async fn test_paths_are_independent() {
    let h = Harness::new(1010, LONG).await;
    let supervisor = h.supervisor();

    assert!(supervisor.start_address_polling().await.unwrap());
    assert!(!supervisor.start_address_polling().await.unwrap());
    assert!(supervisor.is_running());

    let status = supervisor.status().await.unwrap();
    assert!(status.address_polling.active);
    assert!(!status.transaction_polling.active);

    assert!(supervisor.start_transaction_polling().await.unwrap());
    assert!(supervisor.stop_address_polling().await);
    assert!(!supervisor.stop_address_polling().await);
    assert!(supervisor.is_running());

    let status = supervisor.status().await.unwrap();
    assert!(!status.address_polling.active);
    assert!(status.transaction_polling.active);

    assert!(supervisor.stop_transaction_polling().await);
    assert!(!supervisor.is_running());
}

/// A path disabled in configuration is skipped by start but can still be
/// started explicitly.
#[tokio::test]
async fn test_disabled_path_is_not_started() {
    let h = Harness::new(1010, LONG).await;
    let config = h.config.clone().with_address_polling(false, LONG);
    let supervisor =
        WatcherSupervisor::new(&config, h.repository.clone(), Arc::clone(&h.client), h.sink.clone());

    supervisor.start().await.unwrap();
    let status = supervisor.status().await.unwrap();
    assert!(!status.address_polling.active);
    assert!(!status.address_polling.enabled);
    assert!(status.transaction_polling.active);

    assert!(supervisor.start_address_polling().await.unwrap());
    assert!(supervisor.status().await.unwrap().address_polling.active);

    supervisor.stop().await;
}

/// Scheduled scans keep picking up new activity until the path is stopped.
#[tokio::test]
async fn test_scheduled_scans_until_stopped() {
    let h = Harness::new(1010, SHORT).await;
    h.watch(ADDR_A, Some(1000)).await;

    let supervisor = h.supervisor();
    assert!(supervisor.start_address_polling().await.unwrap());

    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));
    let harness = &h;
    assert!(eventually(DEADLINE, || async move { harness.event_count().await == 1 }).await);

    assert!(supervisor.stop_address_polling().await);
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1002, 8));
    tokio::time::sleep(SHORT * 10).await;

    assert_eq!(h.event_count().await, 1);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1001));
}

/// A manual poll scans both paths and reports the combined count.
#[tokio::test]
async fn test_manual_poll_reports_totals() {
    let h = Harness::new(5003, LONG).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.watch(ADDR_B, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1001, 4002));
    h.provider.add_activity(ADDR_B, summary(TX_DEF, 1001, 4002));
    h.track(TX_ABC).await;
    h.provider.put_transaction(summary(TX_ABC, 5000, 3));

    let supervisor = h.supervisor();
    let summary = supervisor.manual_poll().await.unwrap();

    assert_eq!(summary.new_transactions, 2);
    assert_eq!(summary.confirmed_transactions, 1);
    assert_eq!(summary.total, 3);
    assert!(!supervisor.is_running());

    let again = supervisor.manual_poll().await.unwrap();
    assert_eq!(again.total, 0);
}

/// Status reports live counts of active rows.
#[tokio::test]
async fn test_status_counts() {
    let h = Harness::new(1010, LONG).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.watch(ADDR_B, Some(1000)).await;
    h.track(TX_ABC).await;
    h.repository.deactivate_watched_address(ADDR_B).await.unwrap();

    let supervisor = h.supervisor();
    let status = supervisor.status().await.unwrap();

    assert!(!status.running);
    assert!(status.provider_available);
    assert_eq!(status.active_addresses, 1);
    assert_eq!(status.active_submissions, 1);
    assert_eq!(status.address_polling.interval_secs, 3600.0);
}

/// Stopping is safe in any state and any number of times.
#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = Harness::new(1010, LONG).await;
    let supervisor = h.supervisor();

    supervisor.stop().await;
    supervisor.start().await.unwrap();
    supervisor.stop().await;
    supervisor.stop().await;

    assert!(!supervisor.is_running());
    assert!(!supervisor.stop_address_polling().await);
    assert!(!supervisor.stop_transaction_polling().await);
}

/// The process-wide shutdown hook is installed only once.
#[tokio::test]
async fn test_shutdown_hook_installs_once() {
    let h = Harness::new(1010, LONG).await;
    let first = h.supervisor();
    let second = h.supervisor();

    assert!(first.install_shutdown_hook());
    assert!(!first.install_shutdown_hook());
    assert!(!second.install_shutdown_hook());
}

/// Stopping one path leaves the other path's scheduled scans running.
#[tokio::test]
async fn test_stopping_one_path_keeps_the_other_scanning() {
    let h = Harness::new(5003, SHORT).await;
    h.watch(ADDR_A, Some(1000)).await;

    let supervisor = h.supervisor();
    supervisor.start().await.unwrap();
    assert!(supervisor.stop_transaction_polling().await);
    assert!(supervisor.is_running());

    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1001, 4002));
    let harness = &h;
    assert!(eventually(DEADLINE, || async move { harness.event_count().await == 1 }).await);

    let status = supervisor.status().await.unwrap();
    assert!(status.address_polling.active);
    assert!(!status.transaction_polling.active);

    supervisor.stop().await;
}

/// A slow scan makes later ticks skip instead of stacking up scans.
#[tokio::test]
async fn test_slow_scan_skips_ticks() {
    let scan_time = Duration::from_millis(200);
    let h = Harness::new(1010, Duration::from_millis(10)).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.set_delay(scan_time);

    let supervisor = h.supervisor();
    let started = tokio::time::Instant::now();
    assert!(supervisor.start_address_polling().await.unwrap());

    tokio::time::sleep(Duration::from_millis(650)).await;
    assert!(supervisor.stop_address_polling().await);
    let elapsed = started.elapsed();

    // Scans run back to back at most, never side by side.
    let calls = h.provider.activity_calls.load(Ordering::SeqCst);
    let bound = usize::try_from(elapsed.as_millis() / scan_time.as_millis()).unwrap() + 1;
    assert!(calls >= 2, "expected scheduled scans, got {calls}");
    assert!(calls <= bound, "{calls} provider calls in {elapsed:?}");
}
