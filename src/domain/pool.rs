//! Quota pools and sync kinds.

use std::fmt;

/// One of the two independent quota tracks every user is limited against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pool {
    /// Quota for checks against the full registered population
    Full,
    /// Quota for checks against recent changes only
    Incremental,
}

impl Pool {
    /// Both pools, in a fixed order.
    pub const ALL: [Pool; 2] = [Pool::Full, Pool::Incremental];

    /// Stable lowercase name, used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Full => "full",
            Pool::Incremental => "incremental",
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of discovery request.
///
/// The kind is chosen by the entry point that receives a request; it is never
/// read from the request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    /// Match candidates against every registered user
    Full,
    /// Match candidates against users added or removed within the retention window
    Incremental,
}

impl SyncKind {
    /// The pool charged for a request of this kind.
    ///
    /// Pools are independent: a full sync never touches the incremental quota
    /// and vice versa.
    pub fn pool(&self) -> Pool {
        match self {
            SyncKind::Full => Pool::Full,
            SyncKind::Incremental => Pool::Incremental,
        }
    }

    /// Stable lowercase name, used in log fields.
    pub fn as_str(&self) -> &'static str {
        self.pool().as_str()
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
