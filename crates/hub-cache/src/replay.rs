//! Replay detection.
//!
//! RP request ids and asserted assertion ids are each remembered for a
//! window. A second sighting inside the window is a duplicate. Acceptance is
//! one atomic set-if-absent in the shared store, never a read followed by a
//! write, so two instances racing on the same id see exactly one `true`.
//! Once an entry expires the id is accepted again; replaying a message older
//! than the window is a bounded, accepted risk since freshness checks reject
//! such messages anyway.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::CacheResult;
use crate::store::SharedStoreRef;

/// Duplicate detection cache.
#[async_trait]
pub trait ReplayCache: Send + Sync {
    /// Records `id` and returns `true` if it was not already seen within the window.
    async fn accept(&self, id: &str) -> CacheResult<bool>;

    /// Forgets `id`, so a message rejected after its id was accepted does
    /// not keep that id blocked.
    async fn release(&self, id: &str) -> CacheResult<()>;
}

/// Replay cache over a [`SharedStore`](crate::SharedStore).
///
/// The namespace keeps request ids and assertion ids apart so that each can
/// carry its own window.
pub struct StoreReplayCache {
    store: SharedStoreRef,
    namespace: String,
    window: Duration,
}

impl StoreReplayCache {
    /// Creates a replay cache with the given namespace and window.
    #[must_use]
    pub fn new(store: SharedStoreRef, namespace: impl Into<String>, window: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            window,
        }
    }

    /// The replay window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    fn key(&self, id: &str) -> String {
        format!("replay:{}:{id}", self.namespace)
    }
}

impl std::fmt::Debug for StoreReplayCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReplayCache")
            .field("namespace", &self.namespace)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReplayCache for StoreReplayCache {
    async fn accept(&self, id: &str) -> CacheResult<bool> {
        let fresh = self.store.set_if_absent(&self.key(id), "1", self.window).await?;
        if !fresh {
            debug!(namespace = %self.namespace, id, "replay cache rejected duplicate id");
        }
        Ok(fresh)
    }

    async fn release(&self, id: &str) -> CacheResult<()> {
        debug!(namespace = %self.namespace, id, "replay cache released id");
        self.store.delete(&self.key(id)).await
    }
}
