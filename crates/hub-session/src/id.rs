//! Session identifiers.

use std::fmt;

use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

/// Length of a generated session id (about 190 bits of entropy).
pub const SESSION_ID_LENGTH: usize = 32;

/// Opaque session token handed to the user agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        Self(Alphanumeric.sample_string(&mut rng, SESSION_ID_LENGTH))
    }

    /// Wraps an id received from a client.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
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
