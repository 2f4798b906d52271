//! Background sweeps and graceful shutdown.

#![cfg(feature = "async")]

use discovery_throttle::infrastructure::mocks::{MockAuthenticator, MockClock};
use discovery_throttle::{DiscoveryService, Identifier, JsonCodec, SyncRequest, ThrottleConfig};
use std::sync::Arc;
use std::time::Duration;

fn body(user: &str) -> Vec<u8> {
    let request = SyncRequest::new(user, "t", vec![Identifier::from("A")]);
    JsonCodec.encode_request(&request).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_background_sweeps_reclaim_state() {
    let clock = MockClock::starting_now();
    let service = DiscoveryService::builder()
        .with_config(ThrottleConfig::new(
            10,
            Duration::from_secs(1),
            Duration::from_secs(10),
        ))
        .with_authenticator(Arc::new(MockAuthenticator::allow_all()))
        .with_clock(Arc::new(clock.clone()))
        .with_sweep_interval(Duration::from_millis(100))
        .with_background_sweeps(true)
        .build()
        .unwrap();

    service.register_user("A");
    for user in ["alice", "bob", "carol"] {
        assert!(service.incremental_sync(Some(&body(user)[..])).is_success());
    }
    assert_eq!(service.registry().len(), 3);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(service.registry().len(), 3);

    clock.advance_secs(10);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(service.registry().is_empty());
    assert!(service.changes().is_empty());
    assert!(service.users().contains(&"A".into()));
    assert_eq!(service.metrics().buckets_evicted(), 3);
    assert_eq!(service.metrics().changes_pruned(), 1);

    service.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let service = DiscoveryService::builder()
        .with_authenticator(Arc::new(MockAuthenticator::allow_all()))
        .with_sweep_interval(Duration::from_millis(10))
        .with_background_sweeps(true)
        .build()
        .unwrap();

    service.shutdown().await.expect("first shutdown failed");
    service.shutdown().await.expect("second shutdown failed");
}

#[tokio::test]
async fn test_service_usable_after_shutdown() {
    let service = DiscoveryService::builder()
        .with_authenticator(Arc::new(MockAuthenticator::allow_all()))
        .with_background_sweeps(true)
        .build()
        .unwrap();

    service.shutdown().await.expect("shutdown failed");

    assert!(service.full_sync(Some(&body("alice")[..])).is_success());
    assert_eq!(service.sweep().buckets_evicted, 0);
}
