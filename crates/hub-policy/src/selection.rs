//! Identity provider and country selection guards.

use hub_core::LevelOfAssurance;

use crate::config::{CountryConfig, IdpConfig, TransactionConfig};
use crate::error::SelectionFailure;

/// Checks an IdP choice and returns the levels to request from it.
///
/// The requested level must be one the transaction accepts and the IdP must
/// be offered to the RP at that level. The result keeps the transaction's
/// order of preference, restricted to levels the IdP supports.
///
/// ## Errors
///
/// Returns the [`SelectionFailure`] naming the guard that refused.
pub fn idp_levels_of_assurance(
    transaction: &TransactionConfig,
    idp: Option<&IdpConfig>,
    idp_entity_id: &str,
    is_registration: bool,
    requested: LevelOfAssurance,
) -> Result<Vec<LevelOfAssurance>, SelectionFailure> {
    if !transaction.accepts(requested) {
        return Err(SelectionFailure::RequestedLevelOfAssuranceUnsupportedByTransactionEntity(
            requested,
        ));
    }

    let idp = idp
        .filter(|idp| idp.is_available(&transaction.entity_id, is_registration, requested))
        .ok_or_else(|| SelectionFailure::UnavailableIdp(idp_entity_id.to_string()))?;

    let levels: Vec<_> = transaction
        .levels_of_assurance
        .iter()
        .copied()
        .filter(|level| !level.is_fraud_sentinel())
        .filter(|level| idp.supported_levels_of_assurance.contains(level))
        .collect();
    if levels.is_empty() {
        return Err(SelectionFailure::TransactionLevelsOfAssuranceUnsupportedByIdp(
            idp_entity_id.to_string(),
        ));
    }
    Ok(levels)
}

/// Checks a country choice and returns the levels to request from it.
///
/// ## Errors
///
/// Returns [`SelectionFailure::EidasNotSupported`] if the session or the
/// transaction cannot use eIDAS, or [`SelectionFailure::UnavailableCountry`]
/// for an unknown or disabled country.
pub fn country_levels_of_assurance(
    transaction: &TransactionConfig,
    session_supports_eidas: bool,
    country: Option<&CountryConfig>,
    country_entity_id: &str,
) -> Result<Vec<LevelOfAssurance>, SelectionFailure> {
    if !session_supports_eidas || !transaction.eidas_enabled {
        return Err(SelectionFailure::EidasNotSupported);
    }
    if !country.is_some_and(|c| c.enabled) {
        return Err(SelectionFailure::UnavailableCountry(country_entity_id.to_string()));
    }

    let levels: Vec<_> = transaction
        .levels_of_assurance
        .iter()
        .copied()
        .filter(|level| level.is_eidas_level())
        .collect();
    if levels.is_empty() {
        return Err(SelectionFailure::EidasNotSupported);
    }
    Ok(levels)
}
