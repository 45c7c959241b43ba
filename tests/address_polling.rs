//! Address path scenarios against a scripted provider and a real database.
//!
//! # Test Strategy
//!
//! Each test seeds watched addresses with explicit checkpoints, scripts the
//! provider's activity, runs [`Poller::scan`] directly and then inspects the
//! persisted events, the checkpoints and the notifications that were emitted.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cardano_watcher::db::models::EVENT_TRANSACTION;
use cardano_watcher::config::Network;
use cardano_watcher::notification::Notification;
use cardano_watcher::provider::{ProviderError, MAX_ACTIVITY_PAGE};
use cardano_watcher::watcher::Poller;
use common::{summary, FailingSink, Harness, ADDR_A, ADDR_B, ADDR_C, TX_ABC, TX_DEF};

const INTERVAL: Duration = Duration::from_secs(60);

/// Two new transactions after the checkpoint produce two events, advance the
/// checkpoint to the highest block and emit exactly one notification.
#[tokio::test]
async fn test_new_activity_is_recorded_once() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1003, 7));

    let recorded = h.address_poller().scan().await.unwrap();
    assert_eq!(recorded, 2);

    let events = h.repository.events_for_address(ADDR_A).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event_type == EVENT_TRANSACTION));
    assert!(events.iter().all(|e| e.submission_hash.is_none()));
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1003));

    let received = h.sink.received();
    assert_eq!(received.len(), 1);
    match &received[0] {
        Notification::NewTransactions {
            address,
            count,
            transactions,
        } => {
            assert_eq!(address, ADDR_A);
            assert_eq!(*count, 2);
            assert_eq!(transactions, &vec![TX_ABC.to_string(), TX_DEF.to_string()]);
        }
        other => panic!("unexpected notification: {other:?}"),
    }
}

/// Scanning again without new activity changes nothing.
#[tokio::test]
async fn test_repeat_scan_is_a_noop() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1003, 7));

    let poller = h.address_poller();
    assert_eq!(poller.scan().await.unwrap(), 2);
    assert_eq!(poller.scan().await.unwrap(), 0);

    assert_eq!(h.event_count().await, 2);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1003));
    assert_eq!(h.sink.received().len(), 1);
}

/// An address with no activity keeps its checkpoint and emits nothing.
#[tokio::test]
async fn test_no_activity_keeps_checkpoint() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;

    assert_eq!(h.address_poller().scan().await.unwrap(), 0);

    assert_eq!(h.event_count().await, 0);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1000));
    assert!(h.sink.received().is_empty());
}

/// An address added without a start block is seeded from the chain tip, so
/// history before it was first scanned is never reported.
#[tokio::test]
async fn test_unseeded_address_starts_at_tip() {
    let h = Harness::new(2000, INTERVAL).await;
    h.watch(ADDR_A, None).await;
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1500, 500));

    let poller = h.address_poller();
    assert_eq!(poller.scan().await.unwrap(), 0);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(2000));
    assert_eq!(h.provider.activity_calls.load(Ordering::SeqCst), 0);

    h.provider.set_tip(2500);
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 2001, 499));
    assert_eq!(poller.scan().await.unwrap(), 1);

    let events = h.repository.events_for_address(ADDR_A).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].tx_hash, TX_DEF);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(2001));
}

/// A provider failure for one address does not stop the others.
#[tokio::test]
async fn test_address_failure_is_isolated() {
    let h = Harness::new(1010, INTERVAL).await;
    for address in [ADDR_A, ADDR_B, ADDR_C] {
        h.watch(address, Some(1000)).await;
    }
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));
    h.provider.add_activity(ADDR_C, summary(TX_DEF, 1002, 8));
    h.provider
        .fail_address(ADDR_B, ProviderError::unavailable("bad gateway"));

    let recorded = h.address_poller().scan().await.unwrap();
    assert_eq!(recorded, 2);

    assert_eq!(h.checkpoint(ADDR_A).await, Some(1001));
    assert_eq!(h.checkpoint(ADDR_B).await, Some(1000));
    assert_eq!(h.checkpoint(ADDR_C).await, Some(1002));
    assert_eq!(h.sink.received().len(), 2);
}

/// Stale provider data never moves a checkpoint backwards.
#[tokio::test]
async fn test_checkpoint_never_decreases() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.set_unfiltered(true);
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 900, 110));

    h.address_poller().scan().await.unwrap();

    assert_eq!(h.checkpoint(ADDR_A).await, Some(1000));
}

/// A failing notification sink does not roll back recorded events.
#[tokio::test]
async fn test_notification_failure_keeps_events() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));

    let poller = h.address_poller_with(Arc::new(FailingSink));
    assert_eq!(poller.scan().await.unwrap(), 1);

    assert_eq!(h.event_count().await, 1);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1001));
}

/// Overlapping scans over the same address record each transaction once.
#[tokio::test]
async fn test_overlapping_scans_are_idempotent() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1003, 7));

    let first = h.address_poller();
    let second = h.address_poller();
    let (a, b) = tokio::join!(first.scan(), second.scan());

    assert_eq!(a.unwrap() + b.unwrap(), 2);
    assert_eq!(h.event_count().await, 2);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1003));

    let notified: usize = h
        .sink
        .received()
        .iter()
        .map(|n| match n {
            Notification::NewTransactions { count, .. } => *count,
            Notification::TransactionConfirmed { .. } => 0,
        })
        .sum();
    assert_eq!(notified, 2);
}

/// Deactivated addresses are skipped.
#[tokio::test]
async fn test_inactive_address_is_not_scanned() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1001, 9));
    assert!(h.repository.deactivate_watched_address(ADDR_A).await.unwrap());

    assert_eq!(h.address_poller().scan().await.unwrap(), 0);
    assert_eq!(h.provider.activity_calls.load(Ordering::SeqCst), 0);
}

/// A full page that ends partway through a block leaves that block for the
/// next scan, so no transaction in it is skipped.
#[tokio::test]
async fn test_full_page_split_block_is_not_lost() {
    let h = Harness::new(1010, INTERVAL).await;
    h.watch(ADDR_A, Some(1000)).await;
    for i in 0..MAX_ACTIVITY_PAGE - 1 {
        h.provider
            .add_activity(ADDR_A, summary(&format!("{i:064x}"), 1001, 9));
    }
    h.provider.add_activity(ADDR_A, summary(TX_ABC, 1002, 8));
    h.provider.add_activity(ADDR_A, summary(TX_DEF, 1002, 8));

    let poller = h.address_poller();
    assert_eq!(poller.scan().await.unwrap(), MAX_ACTIVITY_PAGE - 1);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1001));

    assert_eq!(poller.scan().await.unwrap(), 2);
    assert_eq!(h.checkpoint(ADDR_A).await, Some(1002));
    assert_eq!(poller.scan().await.unwrap(), 0);

    assert_eq!(h.event_count().await, MAX_ACTIVITY_PAGE + 1);
}

/// Addresses recorded under another network are not scanned.
#[tokio::test]
async fn test_other_network_address_is_skipped() {
    let h = Harness::new(1010, INTERVAL).await;
    h.repository
        .add_watched_address(ADDR_B, None, Some(1000), Network::Preview)
        .await
        .unwrap();
    h.provider.add_activity(ADDR_B, summary(TX_ABC, 1001, 9));

    assert_eq!(h.address_poller().scan().await.unwrap(), 0);
    assert_eq!(h.provider.activity_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.checkpoint(ADDR_B).await, Some(1000));
}
