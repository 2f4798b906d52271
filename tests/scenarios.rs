use discovery_throttle::infrastructure::mocks::{MockAuthenticator, MockClock};
use discovery_throttle::{
    BucketLimit, Clock, DiscoveryService, Identifier, JsonCodec, LeakyBucket, Pool, SyncRequest,
    SyncResult, ThrottleConfig,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn service(max: u32, period_secs: u64, delta_secs: u64) -> (DiscoveryService, MockClock) {
    let clock = MockClock::starting_now();
    let service = DiscoveryService::builder()
        .with_config(ThrottleConfig::new(
            max,
            Duration::from_secs(period_secs),
            Duration::from_secs(delta_secs),
        ))
        .with_authenticator(Arc::new(MockAuthenticator::allow_all()))
        .with_clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (service, clock)
}

fn body(user: &str, ids: &[&str]) -> Vec<u8> {
    let request = SyncRequest::new(user, "token", ids.iter().map(|id| (*id).into()).collect());
    JsonCodec.encode_request(&request).unwrap()
}

fn ids(names: &[&str]) -> Vec<Identifier> {
    names.iter().map(|name| Identifier::from(*name)).collect()
}

#[test]
fn test_incremental_quota_recovers_after_drain_period() {
    let (service, clock) = service(3, 1, 10);
    let request = body("alice", &["A"]);

    for _ in 0..3 {
        assert_eq!(
            service.incremental_sync(Some(&request[..])).result,
            SyncResult::Success
        );
    }
    assert_eq!(service.quota_level(&"alice".into(), Pool::Incremental), 3.0);

    assert_eq!(
        service.incremental_sync(Some(&request[..])).result,
        SyncResult::RateLimitExceeded
    );

    clock.advance_secs(1);
    assert_eq!(
        service.incremental_sync(Some(&request[..])).result,
        SyncResult::Success
    );
}

#[test]
fn test_later_removal_wins_in_incremental_sync() {
    let (service, clock) = service(10, 1, 10);

    service.register_user("A");
    clock.advance_secs(1);
    service.remove_user(&"A".into());
    clock.advance_secs(1);

    let outcome = service.incremental_sync(Some(&body("alice", &["A"])[..]));
    assert_eq!(outcome.result, SyncResult::Success);
    assert!(outcome.added.is_empty());
    assert_eq!(outcome.removed, ids(&["A"]));
}

#[test]
fn test_oversized_request_always_rejected() {
    let (service, _clock) = service(3, 1, 10);
    let request = body("alice", &["A", "B", "C", "D"]);

    for _ in 0..3 {
        assert_eq!(
            service.full_sync(Some(&request[..])).result,
            SyncResult::RateLimitExceeded
        );
        assert_eq!(
            service.incremental_sync(Some(&request[..])).result,
            SyncResult::RateLimitExceeded
        );
    }
    assert!(service.registry().is_empty());
}

#[test]
fn test_repeated_full_sync_within_period() {
    let (service, _clock) = service(4, 1, 10);
    service.register_user("A");
    let request = body("alice", &["A", "B", "C"]);

    let first = service.full_sync(Some(&request[..]));
    assert_eq!(first.result, SyncResult::Success);
    assert_eq!(first.added, ids(&["A"]));

    let second = service.full_sync(Some(&request[..]));
    assert_eq!(second.result, SyncResult::RateLimitExceeded);
    assert!(second.added.is_empty());
    assert!(second.removed.is_empty());
}

#[test]
fn test_full_and_incremental_pools_are_independent() {
    let (service, _clock) = service(2, 1, 10);
    let request = body("alice", &["A", "B"]);

    assert!(service.full_sync(Some(&request[..])).is_success());
    assert!(service.incremental_sync(Some(&request[..])).is_success());

    assert!(!service.full_sync(Some(&request[..])).is_success());
    assert!(!service.incremental_sync(Some(&request[..])).is_success());
}

#[test]
fn test_full_sync_removed_set_is_always_empty() {
    let (service, _clock) = service(10, 1, 10);
    service.register_user("A");
    service.register_user("B");
    service.remove_user(&"B".into());

    let outcome = service.full_sync(Some(&body("alice", &["A", "B"])[..]));
    assert_eq!(outcome.added, ids(&["A"]));
    assert!(outcome.removed.is_empty());
}

#[test]
fn test_matches_return_exactly_the_registered_subset() {
    let (service, _clock) = service(1000, 1, 10);
    let registered: Vec<String> = (0..50).filter(|i| i % 3 == 0).map(|i| format!("u{i}")).collect();
    for name in &registered {
        service.register_user(name.as_str());
    }

    let candidates: Vec<String> = (0..50).map(|i| format!("u{i}")).collect();
    let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
    let outcome = service.full_sync(Some(&body("alice", &refs)[..]));

    let mut got: Vec<String> = outcome.added.iter().map(|id| id.to_string()).collect();
    let mut expected: Vec<String> = registered
        .iter()
        .map(|name| Identifier::from(name.as_str()).to_string())
        .collect();
    got.sort();
    expected.sort();
    assert_eq!(got, expected);
}

#[test]
fn test_change_visible_exactly_within_window() {
    let (service, clock) = service(1000, 1, 10);
    service.register_user("A");
    let t0 = clock.now();

    for offset_ms in [0u64, 1, 5_000, 9_999] {
        clock.set(t0 + Duration::from_millis(offset_ms));
        let outcome = service.incremental_sync(Some(&body("alice", &["A"])[..]));
        assert_eq!(outcome.added, ids(&["A"]), "offset {offset_ms}ms");
    }

    for offset_ms in [10_000u64, 10_001, 60_000] {
        clock.set(t0 + Duration::from_millis(offset_ms));
        let outcome = service.incremental_sync(Some(&body("alice", &["A"])[..]));
        assert!(outcome.is_success());
        assert!(outcome.added.is_empty(), "offset {offset_ms}ms");
    }
}

#[test]
fn test_bucket_level_stays_within_capacity() {
    let limit = BucketLimit::new(5, Duration::from_secs(10));
    let t0 = Instant::now();
    let mut bucket = LeakyBucket::new(limit, t0);

    // Deterministic mix of costs and gaps
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut now = t0;
    for _ in 0..500 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        now += Duration::from_millis(seed % 3_000);
        bucket.try_consume((seed % 7) as usize, now);

        let level = bucket.effective_level(now);
        assert!((0.0..=5.0).contains(&level), "level {level}");
    }
}

#[test]
fn test_idle_bucket_fully_recovers() {
    let limit = BucketLimit::new(5, Duration::from_secs(10));
    let t0 = Instant::now();
    let mut bucket = LeakyBucket::new(limit, t0);
    assert!(bucket.try_consume(5, t0));

    assert_eq!(bucket.effective_level(t0 + Duration::from_secs(10)), 0.0);
    assert_eq!(bucket.effective_level(t0 + Duration::from_secs(1_000)), 0.0);
}

#[test]
fn test_rejections_leave_bucket_unchanged() {
    let limit = BucketLimit::new(5, Duration::from_secs(10));
    let t0 = Instant::now();
    let mut bucket = LeakyBucket::new(limit, t0);
    assert!(bucket.try_consume(4, t0));

    let later = t0 + Duration::from_secs(1);
    assert!(!bucket.try_consume(3, later));
    let after_first = bucket.clone();
    assert!(!bucket.try_consume(3, later));
    assert_eq!(bucket, after_first);
    assert_eq!(bucket.last_update(), t0);
}
