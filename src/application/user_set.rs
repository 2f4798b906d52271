//! The set of currently registered identifiers.

use crate::application::ports::{MembershipIndex, Storage};
use crate::domain::identifier::Identifier;
use crate::infrastructure::storage::ShardedStorage;
use ahash::AHashSet;

/// Concurrent membership set answering full syncs.
#[derive(Debug)]
pub struct UserSet<S = ShardedStorage<Identifier, ()>>
where
    S: Storage<Identifier, ()>,
{
    storage: S,
}

impl UserSet {
    /// Create an empty set backed by a fresh sharded map.
    pub fn new() -> Self {
        Self::with_storage(ShardedStorage::new())
    }
}

impl Default for UserSet {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> UserSet<S>
where
    S: Storage<Identifier, ()>,
{
    /// Create an empty set over `storage`.
    pub fn with_storage(storage: S) -> Self {
        Self { storage }
    }

    /// Add an identifier. Returns `true` if it was not already present.
    pub fn insert(&self, identifier: Identifier) -> bool {
        self.storage.insert(identifier, ()).is_none()
    }

    /// Remove an identifier. Returns `true` if it was present.
    pub fn remove(&self, identifier: &Identifier) -> bool {
        self.storage.remove(identifier).is_some()
    }

    /// Whether `identifier` is registered.
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.storage.contains_key(identifier)
    }

    /// The candidates that are registered, deduplicated, in first-occurrence
    /// order.
    pub fn matches(&self, candidates: &[Identifier]) -> Vec<Identifier> {
        let mut seen = AHashSet::with_capacity(candidates.len());
        candidates
            .iter()
            .filter(|candidate| seen.insert(*candidate) && self.contains(candidate))
            .cloned()
            .collect()
    }

    /// Number of registered identifiers.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Deregister everything without recording changes.
    pub fn clear(&self) {
        self.storage.clear();
    }
}

impl<S> MembershipIndex for UserSet<S>
where
    S: Storage<Identifier, ()>,
{
    fn matches(&self, candidates: &[Identifier]) -> Vec<Identifier> {
        UserSet::matches(self, candidates)
    }
}
