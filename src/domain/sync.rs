//! Request and outcome types for a single discovery sync.

use crate::domain::identifier::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// The requesting user
    pub user: Identifier,
    /// Credential checked by the external authenticator
    pub auth_token: Vec<u8>,
    /// Candidate identifiers the user wants to check
    pub identifiers: Vec<Identifier>,
}

impl SyncRequest {
    /// Create a request.
    pub fn new(
        user: impl Into<Identifier>,
        auth_token: impl Into<Vec<u8>>,
        identifiers: Vec<Identifier>,
    ) -> Self {
        Self {
            user: user.into(),
            auth_token: auth_token.into(),
            identifiers,
        }
    }

    /// Quota charged for this request: one unit per submitted candidate.
    ///
    /// Duplicates are charged too; the quota bounds probing, not matches.
    pub fn cost(&self) -> usize {
        self.identifiers.len()
    }
}

/// Terminal result of a sync, with stable wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncResult {
    /// The request was served
    Success = 0,
    /// The external authenticator refused the credentials
    AuthenticationInvalid = 1,
    /// The user's quota for this pool is exhausted
    RateLimitExceeded = 2,
    /// The request carried no body
    RequestDataMissing = 3,
    /// The body could not be decoded
    RequestDataInvalid = 4,
}

impl SyncResult {
    /// Numeric wire code.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Look up a result by wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SyncResult::Success),
            1 => Some(SyncResult::AuthenticationInvalid),
            2 => Some(SyncResult::RateLimitExceeded),
            3 => Some(SyncResult::RequestDataMissing),
            4 => Some(SyncResult::RequestDataInvalid),
            _ => None,
        }
    }

    /// Whether this is [`SyncResult::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, SyncResult::Success)
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncResult::Success => "SUCCESS",
            SyncResult::AuthenticationInvalid => "AUTHENTICATION_INVALID",
            SyncResult::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            SyncResult::RequestDataMissing => "REQUEST_DATA_MISSING",
            SyncResult::RequestDataInvalid => "REQUEST_DATA_INVALID",
        };
        f.write_str(name)
    }
}

/// Structured outcome of a sync.
///
/// Every outcome carries both result sets. They are empty for every result
/// other than [`SyncResult::Success`], and `removed` is always empty for a
/// full sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Terminal result
    pub result: SyncResult,
    /// Matched identifiers that are registered (full) or were added (incremental)
    pub added: Vec<Identifier>,
    /// Matched identifiers that were removed (incremental only)
    pub removed: Vec<Identifier>,
}

impl SyncOutcome {
    /// A successful outcome carrying the given sets.
    pub fn success(added: Vec<Identifier>, removed: Vec<Identifier>) -> Self {
        Self {
            result: SyncResult::Success,
            added,
            removed,
        }
    }

    /// A rejection with empty result sets.
    pub fn rejected(result: SyncResult) -> Self {
        Self {
            result,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Whether the sync succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}
