//! Hub configuration.
//!
//! Protocol-level settings shared by the validation pipeline, the replay
//! caches, the session store and the MSA health checker. Durations are held as
//! plain integer seconds / milliseconds so the structure maps directly onto
//! environment variables and configuration files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hub-wide protocol configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// The hub's own SAML entity id, used as issuer on outbound messages.
    pub hub_entity_id: String,

    /// Endpoint RP AuthnRequests must be addressed to (Destination).
    pub sso_endpoint: String,

    /// Endpoint IdP and country responses are posted to (Destination and
    /// SubjectConfirmation Recipient).
    pub assertion_consumer_endpoint: String,

    /// How long after its IssueInstant an AuthnRequest is still accepted, in seconds.
    #[serde(default = "default_authn_request_validity")]
    pub authn_request_validity_secs: u64,

    /// Allowance for clock drift between parties, in seconds.
    #[serde(default = "default_clock_skew")]
    pub clock_skew_secs: u64,

    /// Replay window for RP AuthnRequest ids, in seconds.
    #[serde(default = "default_request_replay_window")]
    pub request_replay_window_secs: u64,

    /// Replay window for IdP, country and MSA assertion ids, in seconds.
    #[serde(default = "default_assertion_replay_window")]
    pub assertion_replay_window_secs: u64,

    /// Lifetime of a federation session, in seconds.
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_secs: u64,

    /// MSA health-check settings.
    #[serde(default)]
    pub health_check: HealthCheckSettings,
}

/// MSA health-check fan-out settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckSettings {
    /// Maximum number of adapters checked concurrently.
    #[serde(default = "default_health_concurrency")]
    pub max_concurrency: usize,

    /// Overall deadline for one fan-out round, in milliseconds.
    #[serde(default = "default_health_timeout")]
    pub overall_timeout_ms: u64,

    /// Pause between rounds, in seconds.
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_health_concurrency(),
            overall_timeout_ms: default_health_timeout(),
            interval_secs: default_health_interval(),
        }
    }
}

impl HealthCheckSettings {
    /// Returns the overall fan-out deadline.
    #[must_use]
    pub const fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    /// Returns the pause between rounds.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hub_entity_id: "https://signin.service.gov.uk".to_string(),
            sso_endpoint: "https://www.signin.service.gov.uk/SAML2/SSO".to_string(),
            assertion_consumer_endpoint: "https://www.signin.service.gov.uk/SAML2/SSO/Response/POST"
                .to_string(),
            authn_request_validity_secs: default_authn_request_validity(),
            clock_skew_secs: default_clock_skew(),
            request_replay_window_secs: default_request_replay_window(),
            assertion_replay_window_secs: default_assertion_replay_window(),
            session_lifetime_secs: default_session_lifetime(),
            health_check: HealthCheckSettings::default(),
        }
    }
}

impl HubConfig {
    /// Checks that the configuration is usable.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.hub_entity_id.trim().is_empty() {
            return Err(Error::Config("hub_entity_id must be set".to_string()));
        }
        if self.sso_endpoint.trim().is_empty() {
            return Err(Error::Config("sso_endpoint must be set".to_string()));
        }
        if self.assertion_consumer_endpoint.trim().is_empty() {
            return Err(Error::Config(
                "assertion_consumer_endpoint must be set".to_string(),
            ));
        }
        if self.request_replay_window_secs < self.authn_request_validity_secs {
            // A request must stay in the replay cache for as long as it is fresh.
            return Err(Error::Config(
                "request_replay_window_secs must cover authn_request_validity_secs".to_string(),
            ));
        }
        if self.session_lifetime_secs == 0 {
            return Err(Error::Config("session_lifetime_secs must be positive".to_string()));
        }
        if self.health_check.max_concurrency == 0 {
            return Err(Error::Config(
                "health_check.max_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the AuthnRequest validity window.
    #[must_use]
    pub fn authn_request_validity(&self) -> chrono::Duration {
        seconds(self.authn_request_validity_secs)
    }

    /// Returns the clock-skew allowance.
    #[must_use]
    pub fn clock_skew(&self) -> chrono::Duration {
        seconds(self.clock_skew_secs)
    }

    /// Returns the RP request replay window.
    #[must_use]
    pub fn request_replay_window(&self) -> chrono::Duration {
        seconds(self.request_replay_window_secs)
    }

    /// Returns the assertion replay window.
    #[must_use]
    pub fn assertion_replay_window(&self) -> chrono::Duration {
        seconds(self.assertion_replay_window_secs)
    }

    /// Returns the session lifetime.
    #[must_use]
    pub fn session_lifetime(&self) -> chrono::Duration {
        seconds(self.session_lifetime_secs)
    }
}

#[allow(clippy::cast_possible_wrap)]
fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(i64::MAX as u64) as i64)
}

const fn default_authn_request_validity() -> u64 {
    300
}

const fn default_clock_skew() -> u64 {
    60
}

const fn default_request_replay_window() -> u64 {
    3600
}

const fn default_assertion_replay_window() -> u64 {
    3600
}

const fn default_session_lifetime() -> u64 {
    5400
}

const fn default_health_concurrency() -> usize {
    8
}

const fn default_health_timeout() -> u64 {
    10_000
}

const fn default_health_interval() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session_lifetime(), chrono::Duration::minutes(90));
        assert_eq!(config.health_check.overall_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn replay_window_must_cover_request_validity() {
        let config = HubConfig {
            authn_request_validity_secs: 600,
            request_replay_window_secs: 300,
            ..HubConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("request_replay_window_secs"));
    }

    #[test]
    fn missing_fields_take_defaults_when_deserialized() {
        let config: HubConfig = serde_json::from_str(
            r#"{
                "hub_entity_id": "https://hub.example",
                "sso_endpoint": "https://hub.example/SSO",
                "assertion_consumer_endpoint": "https://hub.example/ACS"
            }"#,
        )
        .unwrap();

        assert_eq!(config.clock_skew_secs, 60);
        assert_eq!(config.health_check, HealthCheckSettings::default());
        assert!(config.validate().is_ok());
    }
}
