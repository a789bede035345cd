//! Session store.

use std::marker::PhantomData;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hub_cache::SharedStoreRef;
use hub_core::SharedClock;
use tracing::{debug, warn};

use crate::error::{SessionError, SessionResult};
use crate::id::SessionId;
use crate::session::{Session, SessionState};

/// How long a record outlives its expiry, so late requests still find the
/// session and can be answered with a timeout.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(15 * 60);

/// Session store over a shared key-value store.
pub struct SessionStore<S> {
    store: SharedStoreRef,
    clock: SharedClock,
    retention: Duration,
    _state: PhantomData<fn() -> S>,
}

impl<S> std::fmt::Debug for SessionStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl<S: SessionState> SessionStore<S> {
    /// Creates a session store.
    #[must_use]
    pub fn new(store: SharedStoreRef, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            retention: DEFAULT_RETENTION,
            _state: PhantomData,
        }
    }

    /// Sets how long records are kept past their expiry.
    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    fn key(id: &SessionId) -> String {
        format!("session:{id}")
    }

    fn ttl(&self, expires_at: DateTime<Utc>) -> Duration {
        let remaining = (expires_at - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        remaining + self.retention
    }

    /// Creates a session under a freshly generated id.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::AlreadyExisting`] on an id collision.
    pub async fn create_session(
        &self,
        state: S,
        expires_at: DateTime<Utc>,
    ) -> SessionResult<Session<S>> {
        self.create_session_with_id(SessionId::generate(), state, expires_at)
            .await
    }

    /// Creates a session under the given id.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::AlreadyExisting`] if a live record already
    /// uses the id.
    pub async fn create_session_with_id(
        &self,
        id: SessionId,
        state: S,
        expires_at: DateTime<Utc>,
    ) -> SessionResult<Session<S>> {
        let mut session = Session::new(id, state, self.clock.now(), expires_at);
        let encoded = serde_json::to_string(&session)?;

        let created = self
            .store
            .set_if_absent(&Self::key(&session.id), &encoded, self.ttl(expires_at))
            .await?;
        if !created {
            warn!(session_id = %session.id, "session id collision");
            return Err(SessionError::AlreadyExisting(session.id));
        }

        debug!(session_id = %session.id, state = session.state_name(), "session created");
        session.snapshot = Some(encoded);
        Ok(session)
    }

    /// Loads a session.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::NotFound`] if no record exists.
    pub async fn get_session(&self, id: &SessionId) -> SessionResult<Session<S>> {
        let encoded = self
            .store
            .get(&Self::key(id))
            .await?
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        let mut session: Session<S> = serde_json::from_str(&encoded)?;
        session.snapshot = Some(encoded);
        Ok(session)
    }

    /// Loads a session's state, requiring it to be the named variant.
    ///
    /// ## Errors
    ///
    /// Returns [`SessionError::NotFound`] or [`SessionError::WrongState`].
    pub async fn get_state(&self, id: &SessionId, expected: &str) -> SessionResult<S> {
        let session = self.get_session(id).await?;
        if session.state_name() != expected {
            return Err(SessionError::WrongState {
                id: id.clone(),
                expected: expected.to_string(),
                actual: session.state_name().to_string(),
            });
        }
        Ok(session.state)
    }

    /// Replaces the session's state if the stored record is still `current`.
    ///
    /// Returns the new record, or `None` when another writer got there first.
    ///
    /// ## Errors
    ///
    /// Returns an error if the store fails or the record cannot be encoded.
    pub async fn compare_and_set_state(
        &self,
        current: &Session<S>,
        next: S,
    ) -> SessionResult<Option<Session<S>>> {
        let expected = match &current.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => serde_json::to_string(current)?,
        };
        let mut updated = current.successor(next);
        let encoded = serde_json::to_string(&updated)?;

        let swapped = self
            .store
            .compare_and_swap(
                &Self::key(&current.id),
                &expected,
                &encoded,
                self.ttl(current.expires_at),
            )
            .await?;
        if !swapped {
            debug!(
                session_id = %current.id,
                version = current.version,
                "session compare-and-set lost"
            );
            return Ok(None);
        }

        updated.snapshot = Some(encoded);
        Ok(Some(updated))
    }
}
