//! Redis connection configuration.

use serde::{Deserialize, Serialize};

/// Where the shared store lives and how its keys are namespaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// `redis://` or `rediss://` URL, including database and credentials.
    pub url: String,
    /// Prefix for every key, so several hub deployments can share one Redis.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl RedisConfig {
    /// Creates a configuration from a connection URL with the default `hub` prefix.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: default_key_prefix(),
        }
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Namespaces a store key, e.g. `session:abc` becomes `hub:session:abc`.
    #[must_use]
    pub fn prefixed_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}

fn default_key_prefix() -> String {
    "hub".to_string()
}
