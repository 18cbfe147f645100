//! Session identifiers.

use std::fmt;

/// An opaque session identifier: the configured prefix followed by a
/// random hyphenated UUIDv4.
///
/// The same string is the cookie value and the backend key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh identifier.
    ///
    /// Randomness comes from the operating system CSPRNG (through `uuid`'s
    /// `getrandom` backend), which is process-wide and safe to call from any
    /// thread.  Generation cannot fail.
    pub fn generate(prefix: &str) -> Self {
        let uuid = uuid::Uuid::new_v4();
        Self(format!("{prefix}{}", uuid.hyphenated()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
