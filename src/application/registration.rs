//! Registration feed.
//!
//! The single writer path for membership: every effective registration or
//! deregistration updates the user set and appends a change event, so full
//! and incremental syncs stay consistent with each other.

use crate::application::changelog::ChangeLog;
use crate::application::ports::Clock;
use crate::application::user_set::UserSet;
use crate::domain::{change::ChangeKind, identifier::Identifier};
use std::sync::Arc;
use tracing::debug;

/// Applies registrations to the user set and the change log together.
#[derive(Debug, Clone)]
pub struct RegistrationFeed {
    users: Arc<UserSet>,
    changes: Arc<ChangeLog>,
    clock: Arc<dyn Clock>,
}

impl RegistrationFeed {
    /// Create a feed writing to `users` and `changes`, stamped by `clock`.
    pub fn new(users: Arc<UserSet>, changes: Arc<ChangeLog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            changes,
            clock,
        }
    }

    /// Register an identifier.
    ///
    /// Returns `false`, and records nothing, if it was already registered.
    pub fn register(&self, identifier: Identifier) -> bool {
        let added = self.changes.record_with(
            identifier.clone(),
            ChangeKind::Added,
            self.clock.as_ref(),
            || self.users.insert(identifier.clone()),
        );
        if added {
            debug!(identifier = %identifier.fingerprint(), "identifier registered");
        }
        added
    }

    /// Deregister an identifier.
    ///
    /// Returns `false`, and records nothing, if it was not registered.
    pub fn deregister(&self, identifier: &Identifier) -> bool {
        let removed = self.changes.record_with(
            identifier.clone(),
            ChangeKind::Removed,
            self.clock.as_ref(),
            || self.users.remove(identifier),
        );
        if removed {
            debug!(identifier = %identifier.fingerprint(), "identifier deregistered");
        }
        removed
    }

    /// Membership written by this feed.
    pub fn users(&self) -> &Arc<UserSet> {
        &self.users
    }

    /// Change log written by this feed.
    pub fn changes(&self) -> &Arc<ChangeLog> {
        &self.changes
    }
}
