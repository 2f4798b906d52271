//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports, and the
//! surrounding service plugs in its own authentication and wire format.

use crate::domain::change::ChangeDiff;
use crate::domain::identifier::Identifier;
use crate::domain::sync::SyncRequest;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;
use thiserror::Error;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// Implementations must serialize `with_entry_mut` per key: while the accessor
/// runs, no other access to the same key may observe or modify the value.
/// Accesses to different keys should not block each other beyond whatever the
/// map needs for its own structural changes.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Read an existing entry without creating it.
    fn with_entry<F, R>(&self, key: &K, accessor: F) -> Option<R>
    where
        F: FnOnce(&V) -> R;

    /// Check whether a key is present.
    fn contains_key(&self, key: &K) -> bool;

    /// Insert a value, returning the previous one.
    fn insert(&self, key: K, value: V) -> Option<V>;

    /// Remove a key, returning its value.
    fn remove(&self, key: &K) -> Option<V>;

    /// Remove a key only if `predicate` holds for its value, checked under
    /// the entry's lock.
    fn remove_if<F>(&self, key: &K, predicate: F) -> Option<V>
    where
        F: FnOnce(&V) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries, providing access to both key and value.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Port for the external credential check.
///
/// The core never issues or stores credentials; it only asks whether a
/// `(user, auth_token)` pair is acceptable.
pub trait Authenticator: Send + Sync {
    /// Whether `auth_token` is valid for `user`.
    fn verify(&self, user: &Identifier, auth_token: &[u8]) -> bool;
}

/// Read port onto the set of currently registered identifiers.
pub trait MembershipIndex: Send + Sync + Debug {
    /// The candidates that are currently registered.
    ///
    /// Returned without duplicates, in first-occurrence order.
    fn matches(&self, candidates: &[Identifier]) -> Vec<Identifier>;
}

/// Read port onto recent registration changes.
pub trait ChangeIndex: Send + Sync + Debug {
    /// Partition the candidates by their latest change inside the retention
    /// window at `now`. Candidates without such a change appear in neither set.
    fn diff_against(&self, candidates: &[Identifier], now: Instant) -> ChangeDiff;
}

/// Error produced when a request body cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request body could not be decoded: {reason}")]
pub struct DecodeError {
    /// Human-readable cause, for logs only
    pub reason: String,
}

impl DecodeError {
    /// Create a decode error.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Port for turning a raw request body into a [`SyncRequest`].
pub trait RequestDecoder: Send + Sync + Debug {
    /// Decode a non-empty request body.
    ///
    /// # Errors
    /// Returns `DecodeError` if the body is not a valid request.
    fn decode(&self, body: &[u8]) -> Result<SyncRequest, DecodeError>;
}
