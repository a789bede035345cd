//! Session record.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::SessionId;

/// State type stored in a session.
pub trait SessionState: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name of the current variant, used in wrong-state errors and logs.
    fn name(&self) -> &'static str;
}

/// A federation session.
///
/// `version` increases by one on every successful compare-and-set, so a
/// record that returns to an earlier state is still distinguishable from the
/// one a stale caller read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "S: SessionState")]
pub struct Session<S> {
    /// Session id.
    pub id: SessionId,
    /// Current state.
    pub state: S,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session stops accepting protocol events.
    pub expires_at: DateTime<Utc>,
    /// Write counter.
    pub version: u64,
    /// The stored text this record was read from.
    #[serde(skip)]
    pub(crate) snapshot: Option<String>,
}

impl<S: SessionState> Session<S> {
    /// Creates a first-version session.
    #[must_use]
    pub fn new(
        id: SessionId,
        state: S,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            state,
            created_at,
            expires_at,
            version: 0,
            snapshot: None,
        }
    }

    /// Checks if the session has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Name of the current state.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Returns the record that replaces this one with `state`.
    pub(crate) fn successor(&self, state: S) -> Self {
        Self {
            id: self.id.clone(),
            state,
            created_at: self.created_at,
            expires_at: self.expires_at,
            version: self.version + 1,
            snapshot: None,
        }
    }
}
