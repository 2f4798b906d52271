//! Time-windowed log of registration changes.
//!
//! Incremental syncs are answered from here: a requester learns about every
//! candidate whose registration state changed within the retention window.
//! History is kept per identifier so a diff only touches the candidates it
//! asks about.

use crate::application::ports::{ChangeIndex, Clock, Storage};
use crate::domain::change::{ChangeDiff, ChangeEvent, ChangeHistory, ChangeKind};
use crate::domain::identifier::Identifier;
use crate::infrastructure::storage::ShardedStorage;
use ahash::AHashSet;
use std::time::{Duration, Instant};

/// Concurrent log of registration changes, bounded by a retention window.
///
/// Expired events never influence a diff, whether or not they have been
/// pruned yet. Pruning only reclaims memory.
#[derive(Debug)]
pub struct ChangeLog<S = ShardedStorage<Identifier, ChangeHistory>>
where
    S: Storage<Identifier, ChangeHistory>,
{
    storage: S,
    retention_window: Duration,
}

impl ChangeLog {
    /// Create a change log backed by a fresh sharded map.
    pub fn with_window(retention_window: Duration) -> Self {
        Self::new(ShardedStorage::new(), retention_window)
    }
}

impl<S> ChangeLog<S>
where
    S: Storage<Identifier, ChangeHistory>,
{
    /// Create a change log over `storage`.
    pub fn new(storage: S, retention_window: Duration) -> Self {
        Self {
            storage,
            retention_window,
        }
    }

    /// Record that `identifier` was added or removed at `now`.
    ///
    /// Expired events for the same identifier are dropped on the way in.
    pub fn record(&self, identifier: Identifier, kind: ChangeKind, now: Instant) {
        let window = self.retention_window;
        self.storage.with_entry_mut(identifier, ChangeHistory::new, |history| {
            history.prune(now, window);
            history.push(now, kind);
        });
    }

    /// Apply a membership change and record it as one step.
    ///
    /// `apply` runs while the identifier's history is locked. Only when it
    /// reports a change is the clock read and the event appended, so changes
    /// to one identifier are logged in the order they took effect. Returns
    /// what `apply` returned.
    pub fn record_with(
        &self,
        identifier: Identifier,
        kind: ChangeKind,
        clock: &dyn Clock,
        apply: impl FnOnce() -> bool,
    ) -> bool {
        let window = self.retention_window;
        let changed = self
            .storage
            .with_entry_mut(identifier.clone(), ChangeHistory::new, |history| {
                if !apply() {
                    return false;
                }
                let now = clock.now();
                history.prune(now, window);
                history.push(now, kind);
                true
            });

        if !changed {
            // Drop the placeholder created for the lock, unless someone filled it
            self.storage.remove_if(&identifier, ChangeHistory::is_empty);
        }
        changed
    }

    /// Partition `candidates` by their latest in-window change at `now`.
    ///
    /// Duplicate candidates are reported once, at their first position.
    pub fn diff_against(&self, candidates: &[Identifier], now: Instant) -> ChangeDiff {
        let window = self.retention_window;
        let mut seen = AHashSet::with_capacity(candidates.len());
        let mut diff = ChangeDiff::default();

        for candidate in candidates {
            if !seen.insert(candidate) {
                continue;
            }
            let latest = self
                .storage
                .with_entry(candidate, |history| history.latest_within(now, window))
                .flatten();
            match latest {
                Some(ChangeKind::Added) => diff.added.push(candidate.clone()),
                Some(ChangeKind::Removed) => diff.removed.push(candidate.clone()),
                None => {}
            }
        }

        diff
    }

    /// In-window events for one identifier, oldest first.
    pub fn events_for(&self, identifier: &Identifier, now: Instant) -> Vec<ChangeEvent> {
        let window = self.retention_window;
        self.storage
            .with_entry(identifier, |history| {
                history
                    .within(now, window)
                    .map(|(timestamp, kind)| ChangeEvent {
                        timestamp,
                        identifier: identifier.clone(),
                        kind,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every event that has left the window at `now`.
    ///
    /// Identifiers left with no events are forgotten. Returns the number of
    /// events dropped.
    pub fn prune(&self, now: Instant) -> usize {
        let window = self.retention_window;
        let mut dropped = 0;
        self.storage.retain(|_, history| {
            dropped += history.prune(now, window);
            !history.is_empty()
        });
        dropped
    }

    /// How long events stay visible to diffs.
    pub fn retention_window(&self) -> Duration {
        self.retention_window
    }

    /// Number of identifiers with retained history.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether no identifier has retained history.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Total number of retained events, expired or not.
    pub fn event_count(&self) -> usize {
        let mut total = 0;
        self.storage.for_each(|_, history| total += history.len());
        total
    }

    /// Forget all history.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

impl<S> ChangeIndex for ChangeLog<S>
where
    S: Storage<Identifier, ChangeHistory>,
{
    fn diff_against(&self, candidates: &[Identifier], now: Instant) -> ChangeDiff {
        ChangeLog::diff_against(self, candidates, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    fn ids(names: &[&str]) -> Vec<Identifier> {
        names.iter().map(|name| Identifier::from(*name)).collect()
    }

    #[test]
    fn test_diff_partitions_by_latest_change() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();

        log.record("A".into(), ChangeKind::Added, t0);
        log.record("B".into(), ChangeKind::Added, t0);
        log.record("C".into(), ChangeKind::Removed, t0);

        let diff = log.diff_against(&ids(&["A", "B", "C", "D"]), t0 + Duration::from_secs(1));
        assert_eq!(diff.added, ids(&["A", "B"]));
        assert_eq!(diff.removed, ids(&["C"]));
    }

    #[test]
    fn test_expired_events_are_invisible() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();
        log.record("A".into(), ChangeKind::Added, t0);

        let almost = t0 + WINDOW - Duration::from_millis(1);
        assert_eq!(log.diff_against(&ids(&["A"]), almost).added, ids(&["A"]));
        assert!(log.diff_against(&ids(&["A"]), t0 + WINDOW).is_empty());
    }

    #[test]
    fn test_later_change_wins() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();

        log.record("A".into(), ChangeKind::Added, t0);
        log.record("A".into(), ChangeKind::Removed, t0 + Duration::from_secs(2));

        let diff = log.diff_against(&ids(&["A"]), t0 + Duration::from_secs(3));
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, ids(&["A"]));
        assert_eq!(log.events_for(&"A".into(), t0 + Duration::from_secs(3)).len(), 2);
    }

    #[test]
    fn test_duplicate_candidates_reported_once() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();
        log.record("A".into(), ChangeKind::Added, t0);

        let diff = log.diff_against(&ids(&["A", "A", "A"]), t0);
        assert_eq!(diff.added, ids(&["A"]));
    }

    #[test]
    fn test_prune_has_no_observable_effect() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();

        log.record("old".into(), ChangeKind::Added, t0);
        log.record("new".into(), ChangeKind::Removed, t0 + Duration::from_secs(8));

        let query = t0 + Duration::from_secs(12);
        let candidates = ids(&["old", "new"]);
        let before = log.diff_against(&candidates, query);

        assert_eq!(log.prune(query), 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.event_count(), 1);
        assert_eq!(log.diff_against(&candidates, query), before);
    }

    #[test]
    fn test_record_drops_expired_history() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();

        log.record("A".into(), ChangeKind::Added, t0);
        log.record("A".into(), ChangeKind::Removed, t0 + Duration::from_secs(20));

        assert_eq!(log.event_count(), 1);
    }

    #[test]
    fn test_events_for_unknown_identifier() {
        let log = ChangeLog::with_window(WINDOW);
        assert!(log.events_for(&"nobody".into(), Instant::now()).is_empty());
    }

    #[test]
    fn test_change_index_port() {
        let log = ChangeLog::with_window(WINDOW);
        let t0 = Instant::now();
        log.record("A".into(), ChangeKind::Added, t0);

        let index: &dyn ChangeIndex = &log;
        assert_eq!(index.diff_against(&ids(&["A"]), t0).added, ids(&["A"]));
    }

    #[test]
    fn test_concurrent_record_and_diff() {
        use std::sync::Arc;
        use std::thread;

        let log = Arc::new(ChangeLog::with_window(Duration::from_secs(3600)));
        let t0 = Instant::now();
        let mut handles = vec![];

        for i in 0..8 {
            let log_clone = Arc::clone(&log);
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    let id = Identifier::from(format!("id_{}_{}", i, j).as_str());
                    log_clone.record(id, ChangeKind::Added, t0);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(log.len(), 400);
        let candidates: Vec<Identifier> = (0..50)
            .map(|j| Identifier::from(format!("id_0_{}", j).as_str()))
            .collect();
        assert_eq!(log.diff_against(&candidates, t0).added.len(), 50);
    }
}
