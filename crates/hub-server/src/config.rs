//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.
//! A `.env` file in the working directory is honoured.

use std::path::PathBuf;
use std::time::Duration;

use hub_core::{HealthCheckSettings, HubConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind the operations endpoint to.
    pub host: String,

    /// Port of the operations endpoint.
    pub port: u16,

    /// Redis URL. Without one, state lives in process memory.
    pub redis_url: Option<String>,

    /// Prefix for every Redis key.
    pub redis_key_prefix: String,

    /// JSON file with RP, IdP, country, key and matching service settings.
    pub federation_file: Option<PathBuf>,

    /// Base64 AES-256 keys the hub decrypts assertions with, newest first.
    pub encryption_keys: Vec<String>,

    /// Per-request timeout for MSA health checks, in seconds.
    pub health_request_timeout_secs: u64,

    /// Protocol configuration.
    pub hub: HubConfig,

    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = HubConfig::default();
        let parsed = |key: &str, default: u64| -> u64 {
            lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
        };

        let host = lookup("HUB_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("HUB_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(50_110);

        let hub = HubConfig {
            hub_entity_id: lookup("HUB_ENTITY_ID").unwrap_or(defaults.hub_entity_id),
            sso_endpoint: lookup("HUB_SSO_ENDPOINT").unwrap_or(defaults.sso_endpoint),
            assertion_consumer_endpoint: lookup("HUB_ASSERTION_CONSUMER_ENDPOINT")
                .unwrap_or(defaults.assertion_consumer_endpoint),
            authn_request_validity_secs: parsed(
                "HUB_AUTHN_REQUEST_VALIDITY_SECS",
                defaults.authn_request_validity_secs,
            ),
            clock_skew_secs: parsed("HUB_CLOCK_SKEW_SECS", defaults.clock_skew_secs),
            request_replay_window_secs: parsed(
                "HUB_REQUEST_REPLAY_WINDOW_SECS",
                defaults.request_replay_window_secs,
            ),
            assertion_replay_window_secs: parsed(
                "HUB_ASSERTION_REPLAY_WINDOW_SECS",
                defaults.assertion_replay_window_secs,
            ),
            session_lifetime_secs: parsed("HUB_SESSION_LIFETIME_SECS", defaults.session_lifetime_secs),
            health_check: HealthCheckSettings {
                max_concurrency: lookup("HUB_HEALTH_CHECK_CONCURRENCY")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.health_check.max_concurrency),
                overall_timeout_ms: parsed(
                    "HUB_HEALTH_CHECK_TIMEOUT_MS",
                    defaults.health_check.overall_timeout_ms,
                ),
                interval_secs: parsed("HUB_HEALTH_CHECK_INTERVAL_SECS", defaults.health_check.interval_secs),
            },
        };
        hub.validate()
            .map_err(|e| anyhow::anyhow!("invalid hub configuration: {e}"))?;

        let encryption_keys = lookup("HUB_ENCRYPTION_KEYS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            redis_key_prefix: lookup("HUB_REDIS_KEY_PREFIX").unwrap_or_else(|| "hub".to_string()),
            federation_file: lookup("HUB_FEDERATION_FILE").map(PathBuf::from),
            encryption_keys,
            health_request_timeout_secs: parsed("HUB_HEALTH_REQUEST_TIMEOUT_SECS", 5),
            hub,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            redis_url: None,
            redis_key_prefix: "hub-test".to_string(),
            federation_file: None,
            encryption_keys: Vec::new(),
            health_request_timeout_secs: 1,
            hub: HubConfig::default(),
            log_level: "debug".to_string(),
        }
    }

    /// Returns the per-request health check timeout.
    #[must_use]
    pub const fn health_request_timeout(&self) -> Duration {
        Duration::from_secs(self.health_request_timeout_secs)
    }
}
