//! In-process store.
//!
//! Atomicity comes from the shard lock DashMap holds for the lifetime of an
//! entry guard, so check-and-set never interleaves with another writer on
//! the same key. Only suitable for a single hub instance.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hub_core::{SharedClock, SystemClock};

use crate::error::{CacheError, CacheResult};
use crate::store::SharedStore;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory [`SharedStore`] with clock-driven expiry.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    clock: SharedClock,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock::shared())
    }

    /// Creates a store that reads time from `clock`.
    #[must_use]
    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    fn expiry(&self, ttl: Duration) -> CacheResult<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| CacheError::Configuration(format!("ttl out of range: {e}")))?;
        Ok(self.clock.now() + ttl)
    }
}

#[async_trait]
impl SharedStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.value.clone()))
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl)?;
        let fresh = StoredValue {
            value: value.to_string(),
            expires_at,
        };

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().expires_at > now {
                    return Ok(false);
                }
                occupied.insert(fresh);
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl)?;

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                if current.expires_at <= now || current.value != expected {
                    return Ok(false);
                }
                occupied.insert(StoredValue {
                    value: new.to_string(),
                    expires_at,
                });
                Ok(true)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use hub_core::FixedClock;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn set_if_absent_only_once_while_live() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", "a", TTL).await.unwrap());
        assert!(!store.set_if_absent("k", "b", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_replaceable() {
        let clock = FixedClock::at_now();
        let store = MemoryStore::with_clock(clock.clone());
        assert!(store.set_if_absent("k", "a", TTL).await.unwrap());

        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.set_if_absent("k", "b", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn compare_and_swap_requires_expected_value() {
        let store = MemoryStore::new();
        assert!(!store.compare_and_swap("k", "a", "b", TTL).await.unwrap());

        store.set_if_absent("k", "a", TTL).await.unwrap();
        assert!(!store.compare_and_swap("k", "x", "b", TTL).await.unwrap());
        assert!(store.compare_and_swap("k", "a", "b", TTL).await.unwrap());
        assert!(!store.compare_and_swap("k", "a", "c", TTL).await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn concurrent_set_if_absent_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set_if_absent("race", &i.to_string(), TTL).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let clock = FixedClock::at_now();
        let store = MemoryStore::with_clock(clock.clone());
        store.set_if_absent("short", "v", Duration::from_secs(10)).await.unwrap();
        store.set_if_absent("long", "v", Duration::from_secs(100)).await.unwrap();

        clock.advance(chrono::Duration::seconds(11));
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        store.delete("long").await.unwrap();
        assert!(store.is_empty());
    }
}
