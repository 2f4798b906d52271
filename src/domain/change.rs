//! Registration change events and their per-identifier history.

use crate::domain::identifier::Identifier;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Direction of a registration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The identifier became registered
    Added,
    /// The identifier stopped being registered
    Removed,
}

/// A single registration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// When the change happened
    pub timestamp: Instant,
    /// Which identifier changed
    pub identifier: Identifier,
    /// Whether it was added or removed
    pub kind: ChangeKind,
}

/// Whether an event recorded at `timestamp` still counts at `now`.
///
/// Events stamped after `now` (a writer racing a reader) count as fresh.
pub fn within_window(timestamp: Instant, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(timestamp) < window
}

/// Time-ordered changes for one identifier.
///
/// Entries are kept sorted by timestamp; events recorded with equal timestamps
/// keep their recording order, so the later recording wins.
#[derive(Debug, Clone, Default)]
pub struct ChangeHistory {
    entries: VecDeque<(Instant, ChangeKind)>,
}

impl ChangeHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a change at its chronological position.
    pub fn push(&mut self, timestamp: Instant, kind: ChangeKind) {
        let position = self
            .entries
            .iter()
            .rposition(|(existing, _)| *existing <= timestamp)
            .map_or(0, |i| i + 1);
        self.entries.insert(position, (timestamp, kind));
    }

    /// The most recent change that is still inside the window at `now`.
    ///
    /// Since entries are sorted, the newest entry is the only candidate: if it
    /// has expired, every older one has too.
    pub fn latest_within(&self, now: Instant, window: Duration) -> Option<ChangeKind> {
        self.entries
            .back()
            .filter(|(timestamp, _)| within_window(*timestamp, now, window))
            .map(|(_, kind)| *kind)
    }

    /// All changes inside the window at `now`, oldest first.
    pub fn within(
        &self,
        now: Instant,
        window: Duration,
    ) -> impl Iterator<Item = (Instant, ChangeKind)> + '_ {
        self.entries
            .iter()
            .filter(move |(timestamp, _)| within_window(*timestamp, now, window))
            .copied()
    }

    /// Drop changes that have left the window. Returns how many were dropped.
    pub fn prune(&mut self, now: Instant, window: Duration) -> usize {
        let mut dropped = 0;
        while let Some((timestamp, _)) = self.entries.front() {
            if within_window(*timestamp, now, window) {
                break;
            }
            self.entries.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Number of retained changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no changes are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Candidates partitioned by their most recent in-window change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeDiff {
    /// Candidates whose latest change was an addition
    pub added: Vec<Identifier>,
    /// Candidates whose latest change was a removal
    pub removed: Vec<Identifier>,
}

impl ChangeDiff {
    /// Whether neither side matched anything.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
