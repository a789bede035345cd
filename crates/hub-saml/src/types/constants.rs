//! SAML 2.0 constants and URIs used by the hub profile.

use hub_core::LevelOfAssurance;

/// The only SAML version the hub accepts.
pub const SAML_VERSION: &str = "2.0";

/// HTTP POST binding URI.
pub const HTTP_POST_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

/// Bearer subject confirmation method.
pub const BEARER_CONFIRMATION_METHOD: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";

// ============================================================================
// Name ID Formats
// ============================================================================

/// Name ID format URIs.
pub mod name_id_formats {
    /// Entity identifier format, the only format allowed on issuers.
    pub const ENTITY: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity";

    /// Persistent identifier format, the only NameIDPolicy the hub honours.
    pub const PERSISTENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent";

    /// Transient identifier format.
    pub const TRANSIENT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:transient";
}

// ============================================================================
// Status Codes
// ============================================================================

/// Status code URIs.
pub mod status_codes {
    /// Success status code.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    /// Requester error status code.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

    /// Responder error status code.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";

    /// Version mismatch status code.
    pub const VERSION_MISMATCH: &str = "urn:oasis:names:tc:SAML:2.0:status:VersionMismatch";

    /// Authentication failed.
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";

    /// No authentication context could satisfy the request.
    pub const NO_AUTHN_CONTEXT: &str = "urn:oasis:names:tc:SAML:2.0:status:NoAuthnContext";

    /// Request denied; identity providers use it to signal suspected fraud.
    pub const REQUEST_DENIED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestDenied";

    /// Matching service found exactly one record.
    pub const MATCH: &str = "urn:uk:gov:cabinet-office:tc:saml:statuscode:match";

    /// Matching service found no record.
    pub const NO_MATCH: &str = "urn:uk:gov:cabinet-office:tc:saml:statuscode:no-match";

    /// Matching service found more than one record.
    pub const MULTI_MATCH: &str = "urn:uk:gov:cabinet-office:tc:saml:statuscode:multi-match";

    /// Matching service created a user account.
    pub const CREATED: &str = "urn:uk:gov:cabinet-office:tc:saml:statuscode:created";

    /// Matching service failed to create a user account.
    pub const CREATE_FAILURE: &str = "urn:uk:gov:cabinet-office:tc:saml:statuscode:create-failure";

    /// Matching service answered a health check.
    pub const HEALTHY: &str = "urn:uk:gov:cabinet-office:tc:saml:statuscode:healthy";
}

/// Status detail values identity providers attach to NoAuthnContext.
pub mod status_details {
    /// The user cancelled at the identity provider.
    pub const AUTHN_CANCEL: &str = "authn-cancel";

    /// Identity proofing is still pending.
    pub const LOA_PENDING: &str = "loa-pending";

    /// Uplift to a higher level of assurance failed.
    pub const UPLIFT_FAILED: &str = "uplift-failed";
}

// ============================================================================
// Authentication Contexts
// ============================================================================

/// Authentication context class references for levels of assurance.
pub mod authn_contexts {
    /// Level 1.
    pub const LEVEL_1: &str = "urn:uk:gov:cabinet-office:tc:saml:authn-context:level1";
    /// Level 2.
    pub const LEVEL_2: &str = "urn:uk:gov:cabinet-office:tc:saml:authn-context:level2";
    /// Fraud sentinel.
    pub const LEVEL_X: &str = "urn:uk:gov:cabinet-office:tc:saml:authn-context:levelx";
    /// eIDAS substantial.
    pub const EIDAS_SUBSTANTIAL: &str = "http://eidas.europa.eu/LoA/substantial";
    /// eIDAS high.
    pub const EIDAS_HIGH: &str = "http://eidas.europa.eu/LoA/high";
}

/// Maps an authentication context class reference to a level of assurance.
#[must_use]
pub fn level_of_assurance_for(authn_context_class_ref: &str) -> Option<LevelOfAssurance> {
    match authn_context_class_ref {
        authn_contexts::LEVEL_1 => Some(LevelOfAssurance::Level1),
        authn_contexts::LEVEL_2 => Some(LevelOfAssurance::Level2),
        authn_contexts::LEVEL_X => Some(LevelOfAssurance::LevelX),
        authn_contexts::EIDAS_SUBSTANTIAL => Some(LevelOfAssurance::Substantial),
        authn_contexts::EIDAS_HIGH => Some(LevelOfAssurance::High),
        _ => None,
    }
}

/// Returns the authentication context class reference for a level.
#[must_use]
pub const fn authn_context_for(level: LevelOfAssurance) -> &'static str {
    match level {
        LevelOfAssurance::Level1 => authn_contexts::LEVEL_1,
        LevelOfAssurance::Level2 => authn_contexts::LEVEL_2,
        LevelOfAssurance::Substantial => authn_contexts::EIDAS_SUBSTANTIAL,
        LevelOfAssurance::High => authn_contexts::EIDAS_HIGH,
        LevelOfAssurance::LevelX => authn_contexts::LEVEL_X,
    }
}

// ============================================================================
// Attribute Names
// ============================================================================

/// Attribute names carried in matching dataset and authn assertions.
pub mod attribute_names {
    /// Identity provider fraud event id, carried alongside LEVEL_X.
    pub const IDP_FRAUD_EVENT_ID: &str = "IdpFraudEventId";
    /// Fraud indicator code.
    pub const GPG45_STATUS: &str = "Gpg45Status";
    /// Matching dataset first name.
    pub const MDS_FIRST_NAME: &str = "MDS_firstname";
    /// Matching dataset surname.
    pub const MDS_SURNAME: &str = "MDS_surname";
    /// Matching dataset date of birth.
    pub const MDS_DATE_OF_BIRTH: &str = "MDS_dateofbirth";
    /// eIDAS current given name.
    pub const EIDAS_FIRST_NAME: &str =
        "http://eidas.europa.eu/attributes/naturalperson/CurrentGivenName";
    /// eIDAS current family name.
    pub const EIDAS_FAMILY_NAME: &str =
        "http://eidas.europa.eu/attributes/naturalperson/CurrentFamilyName";
    /// eIDAS date of birth.
    pub const EIDAS_DATE_OF_BIRTH: &str =
        "http://eidas.europa.eu/attributes/naturalperson/DateOfBirth";
    /// eIDAS person identifier.
    pub const EIDAS_PERSON_IDENTIFIER: &str =
        "http://eidas.europa.eu/attributes/naturalperson/PersonIdentifier";
}
