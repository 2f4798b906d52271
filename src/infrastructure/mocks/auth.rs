//! Configurable stand-in for the external authenticator.

use crate::application::ports::Authenticator;
use crate::domain::identifier::Identifier;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    AllowAll,
    DenyAll,
    Tokens,
}

/// Authenticator for tests.
///
/// Either accepts everything, rejects everything, or checks tokens against a
/// table the test fills in. Clones share the table and the call counter.
#[derive(Debug, Clone)]
pub struct MockAuthenticator {
    mode: Mode,
    tokens: Arc<DashMap<Identifier, Vec<u8>>>,
    calls: Arc<AtomicU64>,
}

impl MockAuthenticator {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            tokens: Arc::new(DashMap::new()),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Accept every credential.
    pub fn allow_all() -> Self {
        Self::with_mode(Mode::AllowAll)
    }

    /// Reject every credential.
    pub fn deny_all() -> Self {
        Self::with_mode(Mode::DenyAll)
    }

    /// Accept only tokens registered with [`MockAuthenticator::grant`].
    pub fn with_tokens() -> Self {
        Self::with_mode(Mode::Tokens)
    }

    /// Register `token` as valid for `user`.
    pub fn grant(&self, user: impl Into<Identifier>, token: impl Into<Vec<u8>>) -> &Self {
        self.tokens.insert(user.into(), token.into());
        self
    }

    /// Number of times `verify` was called.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Authenticator for MockAuthenticator {
    fn verify(&self, user: &Identifier, auth_token: &[u8]) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.mode {
            Mode::AllowAll => true,
            Mode::DenyAll => false,
            Mode::Tokens => self
                .tokens
                .get(user)
                .map(|stored| stored.value().as_slice() == auth_token)
                .unwrap_or(false),
        }
    }
}
