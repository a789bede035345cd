//! Federation configuration.
//!
//! Per-RP transaction settings, identity provider settings and eIDAS country
//! settings are owned by a separate configuration service. The state machine
//! reads them through [`ConfigService`] on every decision so that disabling
//! an IdP takes effect for sessions already in flight.

use async_trait::async_trait;
use dashmap::DashMap;
use hub_core::LevelOfAssurance;
use serde::{Deserialize, Serialize};

/// Settings for one relying party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Relying party entity id.
    pub entity_id: String,
    /// Accepted levels of assurance, in the RP's order of preference.
    pub levels_of_assurance: Vec<LevelOfAssurance>,
    /// Matching service; `None` for RPs that take identities without matching.
    pub matching_service_entity_id: Option<String>,
    /// Attribute asked from the user when cycle 0/1 finds no match.
    pub cycle3_attribute: Option<String>,
    /// Attributes returned when the matching service creates an account.
    /// Empty disables account creation.
    pub user_account_creation_attributes: Vec<String>,
    /// The RP accepts eIDAS identities.
    pub eidas_enabled: bool,
}

impl TransactionConfig {
    /// Creates a matching transaction accepting `levels`.
    #[must_use]
    pub fn new(
        entity_id: impl Into<String>,
        levels_of_assurance: Vec<LevelOfAssurance>,
        matching_service_entity_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            levels_of_assurance,
            matching_service_entity_id: Some(matching_service_entity_id.into()),
            cycle3_attribute: None,
            user_account_creation_attributes: Vec::new(),
            eidas_enabled: false,
        }
    }

    /// Checks if `level` is accepted. Never true for `LEVEL_X`.
    #[must_use]
    pub fn accepts(&self, level: LevelOfAssurance) -> bool {
        !level.is_fraud_sentinel() && self.levels_of_assurance.contains(&level)
    }
}

/// Settings for one identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpConfig {
    /// Identity provider entity id.
    pub entity_id: String,
    /// The IdP is offered at all.
    pub enabled: bool,
    /// The IdP may register new users.
    pub enabled_for_registration: bool,
    /// Levels of assurance the IdP can assert.
    pub supported_levels_of_assurance: Vec<LevelOfAssurance>,
    /// When non-empty, the IdP is only offered to these RPs.
    pub onboarding_transactions: Vec<String>,
}

impl IdpConfig {
    /// Creates an enabled IdP supporting `levels` for sign-in and registration.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, levels: Vec<LevelOfAssurance>) -> Self {
        Self {
            entity_id: entity_id.into(),
            enabled: true,
            enabled_for_registration: true,
            supported_levels_of_assurance: levels,
            onboarding_transactions: Vec::new(),
        }
    }

    /// Checks if the IdP can be offered to `rp_entity_id` at `level`.
    #[must_use]
    pub fn is_available(&self, rp_entity_id: &str, is_registration: bool, level: LevelOfAssurance) -> bool {
        self.enabled
            && (!is_registration || self.enabled_for_registration)
            && (self.onboarding_transactions.is_empty()
                || self.onboarding_transactions.iter().any(|rp| rp == rp_entity_id))
            && self.supported_levels_of_assurance.contains(&level)
    }
}

/// Settings for one eIDAS country node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryConfig {
    /// Country node entity id.
    pub entity_id: String,
    /// Two-letter country code.
    pub country_code: String,
    /// The country is offered.
    pub enabled: bool,
}

/// Read access to federation configuration.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Settings of a relying party.
    async fn transaction(&self, entity_id: &str) -> Option<TransactionConfig>;

    /// Settings of an identity provider.
    async fn identity_provider(&self, entity_id: &str) -> Option<IdpConfig>;

    /// Settings of a country node.
    async fn country(&self, entity_id: &str) -> Option<CountryConfig>;
}

/// Configuration held in memory.
#[derive(Debug, Default)]
pub struct InMemoryConfigService {
    transactions: DashMap<String, TransactionConfig>,
    identity_providers: DashMap<String, IdpConfig>,
    countries: DashMap<String, CountryConfig>,
}

impl InMemoryConfigService {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a transaction.
    pub fn put_transaction(&self, config: TransactionConfig) {
        self.transactions.insert(config.entity_id.clone(), config);
    }

    /// Adds or replaces an identity provider.
    pub fn put_identity_provider(&self, config: IdpConfig) {
        self.identity_providers.insert(config.entity_id.clone(), config);
    }

    /// Adds or replaces a country.
    pub fn put_country(&self, config: CountryConfig) {
        self.countries.insert(config.entity_id.clone(), config);
    }

    /// Enables or disables an identity provider.
    pub fn set_identity_provider_enabled(&self, entity_id: &str, enabled: bool) {
        if let Some(mut idp) = self.identity_providers.get_mut(entity_id) {
            idp.enabled = enabled;
        }
    }

    /// Applies `update` to a stored transaction.
    pub fn update_transaction(&self, entity_id: &str, update: impl FnOnce(&mut TransactionConfig)) {
        if let Some(mut transaction) = self.transactions.get_mut(entity_id) {
            update(&mut transaction);
        }
    }
}

#[async_trait]
impl ConfigService for InMemoryConfigService {
    async fn transaction(&self, entity_id: &str) -> Option<TransactionConfig> {
        self.transactions.get(entity_id).map(|t| t.clone())
    }

    async fn identity_provider(&self, entity_id: &str) -> Option<IdpConfig> {
        self.identity_providers.get(entity_id).map(|i| i.clone())
    }

    async fn country(&self, entity_id: &str) -> Option<CountryConfig> {
        self.countries.get(entity_id).map(|c| c.clone())
    }
}
