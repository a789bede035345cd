//! SAML Assertion types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{level_of_assurance_for, Issuer, NameId};
use crate::signature::{SignedMessage, XmlSignature};
use hub_core::LevelOfAssurance;

/// SAML Assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The asserting entity.
    pub issuer: Issuer,

    /// The subject of the assertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,

    /// Authentication statements.
    #[serde(default)]
    pub authn_statements: Vec<AuthnStatement>,

    /// Attribute statements.
    #[serde(default)]
    pub attribute_statements: Vec<AttributeStatement>,

    /// Enveloped signatures.
    #[serde(default)]
    pub signatures: Vec<XmlSignature>,
}

impl Assertion {
    /// Creates an unsigned assertion with no statements.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            version: super::SAML_VERSION.to_string(),
            issue_instant,
            issuer: Issuer::entity(issuer),
            subject: None,
            authn_statements: Vec::new(),
            attribute_statements: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Adds an authn statement for the given context.
    #[must_use]
    pub fn with_authn_context(mut self, class_ref: impl Into<String>, instant: DateTime<Utc>) -> Self {
        self.authn_statements.push(AuthnStatement {
            authn_instant: instant,
            authn_context_class_ref: Some(class_ref.into()),
        });
        self
    }

    /// Adds an attribute, creating the attribute statement if needed.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let attribute = Attribute {
            name: name.into(),
            values: vec![value.into()],
        };
        match self.attribute_statements.first_mut() {
            Some(statement) => statement.attributes.push(attribute),
            None => self.attribute_statements.push(AttributeStatement {
                attributes: vec![attribute],
            }),
        }
        self
    }

    /// True if this assertion carries an authn statement.
    #[must_use]
    pub fn is_authn_assertion(&self) -> bool {
        !self.authn_statements.is_empty()
    }

    /// True if this assertion is a matching dataset: attributes and no authn statement.
    #[must_use]
    pub fn is_matching_dataset(&self) -> bool {
        self.authn_statements.is_empty() && !self.attribute_statements.is_empty()
    }

    /// The first populated authn context class reference.
    #[must_use]
    pub fn authn_context(&self) -> Option<&str> {
        self.authn_statements
            .iter()
            .find_map(|s| s.authn_context_class_ref.as_deref())
            .filter(|c| !c.is_empty())
    }

    /// The level of assurance asserted by the authn context, if recognised.
    #[must_use]
    pub fn level_of_assurance(&self) -> Option<LevelOfAssurance> {
        self.authn_context().and_then(level_of_assurance_for)
    }

    /// Values of the named attribute across all statements.
    pub fn attribute_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.attribute_statements
            .iter()
            .flat_map(|s| s.attributes.iter())
            .filter(move |a| a.name == name)
            .flat_map(|a| a.values.iter().map(String::as_str))
    }

    /// First non-empty value of the named attribute.
    #[must_use]
    pub fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attribute_statements
            .iter()
            .flat_map(|s| s.attributes.iter())
            .filter(|a| a.name == name)
            .flat_map(|a| a.values.iter())
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    /// The subject name id value.
    #[must_use]
    pub fn subject_name_id(&self) -> Option<&str> {
        self.subject
            .as_ref()
            .and_then(|s| s.name_id.as_ref())
            .map(|n| n.value.as_str())
    }
}

impl SignedMessage for Assertion {
    fn signatures(&self) -> &[XmlSignature] {
        &self.signatures
    }

    fn signatures_mut(&mut self) -> &mut Vec<XmlSignature> {
        &mut self.signatures
    }
}

/// Subject of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// The subject identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id: Option<NameId>,

    /// Subject confirmations.
    #[serde(default)]
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// Creates a bearer-confirmed subject.
    #[must_use]
    pub fn bearer(name_id: NameId, data: SubjectConfirmationData) -> Self {
        Self {
            name_id: Some(name_id),
            subject_confirmations: vec![SubjectConfirmation {
                method: super::BEARER_CONFIRMATION_METHOD.to_string(),
                data: Some(data),
            }],
        }
    }
}

/// Subject confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmation {
    /// Confirmation method URI.
    pub method: String,

    /// Confirmation data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SubjectConfirmationData>,
}

/// Subject confirmation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConfirmationData {
    /// Endpoint the assertion may be presented to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Request id the assertion answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// Instant after which the assertion may no longer be presented.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// NotBefore. Forbidden by the hub profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// Client address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthnStatement {
    /// When the user authenticated.
    pub authn_instant: DateTime<Utc>,

    /// Authentication context class reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authn_context_class_ref: Option<String>,
}

/// Attribute statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStatement {
    /// Attributes.
    pub attributes: Vec<Attribute>,
}

/// A named, multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name.
    pub name: String,

    /// Attribute values.
    #[serde(default)]
    pub values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{attribute_names, authn_contexts};

    #[test]
    fn classifies_assertions() {
        let now = Utc::now();
        let mds = Assertion::new("_mds", "https://idp.example", now)
            .with_attribute(attribute_names::MDS_SURNAME, "Smith");
        assert!(mds.is_matching_dataset());
        assert!(!mds.is_authn_assertion());

        let authn = Assertion::new("_authn", "https://idp.example", now)
            .with_authn_context(authn_contexts::LEVEL_2, now);
        assert!(authn.is_authn_assertion());
        assert_eq!(authn.level_of_assurance(), Some(LevelOfAssurance::Level2));
    }

    #[test]
    fn empty_authn_context_is_not_populated() {
        let now = Utc::now();
        let authn = Assertion::new("_authn", "https://idp.example", now).with_authn_context("", now);
        assert!(authn.authn_context().is_none());
    }

    #[test]
    fn attribute_lookup() {
        let a = Assertion::new("_a", "https://idp.example", Utc::now())
            .with_attribute("a", "")
            .with_attribute("a", "x")
            .with_attribute("b", "y");
        assert_eq!(a.first_attribute("a"), Some("x"));
        assert_eq!(a.attribute_values("b").collect::<Vec<_>>(), vec!["y"]);
        assert_eq!(a.first_attribute("c"), None);
    }
}
