//! Redis shared store.

use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;
use hub_cache::{CacheError, CacheResult, SharedStore};
use tracing::info;

use crate::config::RedisConfig;
use crate::error::from_redis_error;

/// Replaces the value only if it still equals the expected one.
const COMPARE_AND_SWAP: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
  return 1
end
return 0
";

/// Redis-backed [`SharedStore`].
pub struct RedisStore {
    client: Client,
    config: RedisConfig,
}

impl RedisStore {
    /// Connects to Redis.
    ///
    /// ## Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn new(config: RedisConfig) -> CacheResult<Self> {
        let redis_config = Config::from_url(&config.url)
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        let client = Client::new(
            redis_config,
            None,
            None,
            Some(ReconnectPolicy::new_exponential(0, 1000, 30_000, 2)),
        );

        client.init().await.map_err(from_redis_error)?;
        info!(prefix = %config.key_prefix, "connected to redis shared store");

        Ok(Self { client, config })
    }

    /// Returns the underlying Redis client.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    fn key(&self, key: &str) -> String {
        self.config.prefixed_key(key)
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.config.key_prefix)
            .finish_non_exhaustive()
    }
}

/// Milliseconds for `PX`, never zero since Redis rejects a zero expiry.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn ttl_millis(ttl: Duration) -> i64 {
    ttl.as_millis().clamp(1, i64::MAX as u128) as i64
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = self.key(key);
        self.client.get(&key).await.map_err(from_redis_error)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let key = self.key(key);
        let result: Option<String> = self
            .client
            .set(
                &key,
                value,
                Some(Expiration::PX(ttl_millis(ttl))),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(from_redis_error)?;

        Ok(result.is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &str,
        new: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let key = self.key(key);
        let swapped: i64 = self
            .client
            .eval(
                COMPARE_AND_SWAP,
                vec![key],
                vec![
                    expected.to_string(),
                    new.to_string(),
                    ttl_millis(ttl).to_string(),
                ],
            )
            .await
            .map_err(from_redis_error)?;

        Ok(swapped == 1)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = self.key(key);
        self.client
            .del::<(), _>(&key)
            .await
            .map_err(from_redis_error)
    }
}
