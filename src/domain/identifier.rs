//! Opaque user identifiers.
//!
//! An identifier is whatever byte string the surrounding service uses to name
//! a user (typically a hash of a phone number). Only byte-exact equality is
//! meaningful; no ordering or structure is assumed.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Number of leading bytes shown by [`Identifier::fingerprint`].
const FINGERPRINT_BYTES: usize = 4;

/// An opaque, cheaply clonable user identifier.
///
/// Cloning shares the underlying bytes, so identifiers can be used as keys in
/// several concurrent maps without copying.
///
/// # Example
/// ```
/// use discovery_throttle::Identifier;
///
/// let a = Identifier::from(vec![0xde, 0xad, 0xbe, 0xef, 0x01]);
/// let b = Identifier::from(&[0xde, 0xad, 0xbe, 0xef, 0x01][..]);
///
/// assert_eq!(a, b);
/// assert_eq!(a.fingerprint(), "deadbeef..");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Arc<[u8]>);

impl Identifier {
    /// Create an identifier from raw bytes.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Identifier(bytes.into())
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the identifier has no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short hex prefix suitable for log lines.
    ///
    /// Identifiers are sensitive, so logs only ever carry this prefix.
    pub fn fingerprint(&self) -> String {
        let shown = &self.0[..self.0.len().min(FINGERPRINT_BYTES)];
        let mut out = String::with_capacity(shown.len() * 2 + 2);
        for byte in shown {
            out.push_str(&format!("{:02x}", byte));
        }
        if self.0.len() > FINGERPRINT_BYTES {
            out.push_str("..");
        }
        out
    }
}

impl From<Vec<u8>> for Identifier {
    fn from(bytes: Vec<u8>) -> Self {
        Identifier(bytes.into())
    }
}

impl From<&[u8]> for Identifier {
    fn from(bytes: &[u8]) -> Self {
        Identifier(bytes.into())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier(value.as_bytes().into())
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Identifier {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.fingerprint())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
