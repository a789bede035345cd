//! Federation file.
//!
//! Relying parties, identity providers, countries, trusted signing keys and
//! matching service endpoints, read once at startup from a JSON document.

use std::path::Path;

use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hub_crypto::{EncryptionKey, VerificationKey};
use hub_health::MatchingServiceEndpoint;
use hub_policy::{CountryConfig, IdpConfig, InMemoryConfigService, TransactionConfig};
use hub_saml::metadata::InMemoryMetadata;
use serde::Deserialize;

/// Signing keys trusted for one entity.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityKeys {
    /// Entity id.
    pub entity_id: String,
    /// Base64 uncompressed P-384 public points, newest first.
    pub signing_keys: Vec<String>,
}

/// Parsed federation file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FederationFile {
    /// Relying party settings.
    pub transactions: Vec<TransactionConfig>,
    /// Identity provider settings.
    pub identity_providers: Vec<IdpConfig>,
    /// eIDAS country settings.
    pub countries: Vec<CountryConfig>,
    /// Trusted signing keys.
    pub entities: Vec<EntityKeys>,
    /// Matching services to health check.
    pub matching_services: Vec<MatchingServiceEndpoint>,
}

impl FederationFile {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading federation file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing federation file {}", path.display()))
    }

    /// Parses a federation document.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Configuration service holding the RP, IdP and country settings.
    #[must_use]
    pub fn config_service(&self) -> InMemoryConfigService {
        let service = InMemoryConfigService::new();
        for transaction in &self.transactions {
            service.put_transaction(transaction.clone());
        }
        for idp in &self.identity_providers {
            service.put_identity_provider(idp.clone());
        }
        for country in &self.countries {
            service.put_country(country.clone());
        }
        service
    }

    /// Metadata holding every trusted signing key.
    pub fn metadata(&self) -> anyhow::Result<InMemoryMetadata> {
        let metadata = InMemoryMetadata::new();
        for entity in &self.entities {
            // Keys are added oldest first so the newest ends up in front.
            for encoded in entity.signing_keys.iter().rev() {
                let public_key = STANDARD
                    .decode(encoded.trim())
                    .with_context(|| format!("signing key of {} is not base64", entity.entity_id))?;
                metadata.add_signing_key(entity.entity_id.clone(), VerificationKey::from_public_key(public_key));
            }
        }
        Ok(metadata)
    }
}

/// Decodes the hub's assertion decryption keys.
pub fn decryption_keys(encoded: &[String]) -> anyhow::Result<Vec<EncryptionKey>> {
    encoded
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let bytes = STANDARD
                .decode(key)
                .with_context(|| format!("encryption key {i} is not base64"))?;
            EncryptionKey::from_bytes(&bytes).with_context(|| format!("encryption key {i} is unusable"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hub_crypto::SigningKey;
    use hub_policy::ConfigService;
    use hub_saml::metadata::MetadataKeyService;

    use super::*;

    const DOCUMENT: &str = r#"{
        "transactions": [{
            "entity_id": "https://rp.example.gov.uk",
            "levels_of_assurance": ["LEVEL_2"],
            "matching_service_entity_id": "https://msa.example.gov.uk",
            "cycle3_attribute": null,
            "user_account_creation_attributes": [],
            "eidas_enabled": false
        }],
        "identity_providers": [{
            "entity_id": "https://idp.example.com",
            "enabled": true,
            "enabled_for_registration": false,
            "supported_levels_of_assurance": ["LEVEL_1", "LEVEL_2"],
            "onboarding_transactions": []
        }],
        "matching_services": [
            {"entity_id": "https://msa.example.gov.uk", "uri": "https://msa.example.gov.uk/health"}
        ]
    }"#;

    #[tokio::test]
    async fn document_populates_configuration() {
        let file = FederationFile::from_json(DOCUMENT).unwrap();
        let service = file.config_service();

        let transaction = service.transaction("https://rp.example.gov.uk").await.unwrap();
        assert_eq!(
            transaction.matching_service_entity_id.as_deref(),
            Some("https://msa.example.gov.uk")
        );
        let idp = service.identity_provider("https://idp.example.com").await.unwrap();
        assert!(!idp.enabled_for_registration);
        assert!(service.country("https://nl.example.eu").await.is_none());
        assert_eq!(file.matching_services.len(), 1);
    }

    #[test]
    fn signing_keys_keep_document_order() {
        let newest = SigningKey::generate().unwrap().verification_key();
        let oldest = SigningKey::generate().unwrap().verification_key();
        let file = FederationFile {
            entities: vec![EntityKeys {
                entity_id: "https://msa.example.gov.uk".to_string(),
                signing_keys: vec![STANDARD.encode(&newest.public_key), STANDARD.encode(&oldest.public_key)],
            }],
            ..FederationFile::default()
        };

        let keys = file.metadata().unwrap().signing_keys("https://msa.example.gov.uk").unwrap();

        assert_eq!(keys, vec![newest, oldest]);
    }

    #[test]
    fn malformed_keys_are_rejected() {
        let file = FederationFile {
            entities: vec![EntityKeys {
                entity_id: "https://msa.example.gov.uk".to_string(),
                signing_keys: vec!["not base64!".to_string()],
            }],
            ..FederationFile::default()
        };
        assert!(file.metadata().is_err());

        assert!(decryption_keys(&[STANDARD.encode([7u8; 32])]).is_ok());
        assert!(decryption_keys(&[STANDARD.encode([7u8; 16])]).is_err());
    }
}
