//! Issuer and Name ID types.

use serde::{Deserialize, Serialize};

use super::name_id_formats;

/// Issuer of a SAML message or assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// The issuing entity id.
    pub value: String,

    /// Optional format; when present the hub requires the entity format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Issuer {
    /// Creates an issuer without an explicit format.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
        }
    }

    /// Creates an issuer with the entity format.
    #[must_use]
    pub fn entity(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: Some(name_id_formats::ENTITY.to_string()),
        }
    }

    /// Returns true if the format is absent or the entity format.
    #[must_use]
    pub fn has_entity_format(&self) -> bool {
        self.format
            .as_deref()
            .map_or(true, |f| f == name_id_formats::ENTITY)
    }
}

/// SAML Name ID, the subject identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameId {
    /// The identifier value.
    pub value: String,

    /// The format of the identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl NameId {
    /// Creates a persistent name ID.
    #[must_use]
    pub fn persistent(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: Some(name_id_formats::PERSISTENT.to_string()),
        }
    }
}

/// Name ID policy of an AuthnRequest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// Requested name ID format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Whether the identity provider may create a new identifier.
    #[serde(default)]
    pub allow_create: bool,
}
