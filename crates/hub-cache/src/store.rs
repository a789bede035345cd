//! Shared store contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Key-value store shared by every hub instance.
///
/// Values are opaque strings; callers own their encoding. Every mutating
/// operation is a single atomic step in the backend so that racing callers
/// on different instances observe exactly one winner.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Gets a value.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Sets a value only if the key doesn't exist or has expired.
    ///
    /// Returns `true` if the value was set, `false` if a live value already existed.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;

    /// Replaces the value only if it currently equals `expected`.
    ///
    /// The TTL is reset to `ttl` on success. Returns `false` if the value
    /// differs or the key is absent.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl: Duration,
    ) -> CacheResult<bool>;

    /// Deletes a value.
    ///
    /// Returns `Ok(())` even if the key doesn't exist.
    async fn delete(&self, key: &str) -> CacheResult<()>;
}

/// Shared handle to a store.
pub type SharedStoreRef = Arc<dyn SharedStore>;
