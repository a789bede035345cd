//! Transition table.
//!
//! One exhaustive match over (state, event). Handlers read configuration but
//! perform no other I/O; they return the next state and any outbound effect.

use chrono::{DateTime, Utc};
use hub_core::LevelOfAssurance;
use hub_saml::{
    CountryStatus, IdpStatus, InboundCountryResponse, InboundIdpResponse,
    InboundMatchingServiceResponse, MatchingServiceStatus,
};
use hub_session::SessionId;
use tracing::warn;

use crate::config::{ConfigService, TransactionConfig};
use crate::context::RequestContext;
use crate::effect::{MatchRequestKind, OutboundEffect, RpResponseStatus};
use crate::error::{PolicyError, PolicyResult, StateProcessingFailure};
use crate::event::PolicyEvent;
use crate::selection::{country_levels_of_assurance, idp_levels_of_assurance};
use crate::state::{
    AwaitingCycle3DataState, CountrySelectedState, Cycle3Dataset, FraudEventDetectedState,
    IdpAuthentication, IdpOutcomeState, IdpSelectionState, JourneyState, MatchRequestSentState,
    MatchedState, NonMatchingJourneySuccessState, PreparedResponseState, State,
};

/// Result of a legal transition.
#[derive(Debug)]
pub(crate) struct Step {
    pub state: State,
    pub effect: Option<OutboundEffect>,
}

impl Step {
    fn to(state: State) -> Self {
        Self {
            state,
            effect: None,
        }
    }

    fn with_effect(state: State, effect: OutboundEffect) -> Self {
        Self {
            state,
            effect: Some(effect),
        }
    }
}

/// Inputs a transition may consult.
pub(crate) struct Transitions<'a> {
    pub config: &'a dyn ConfigService,
    pub session_id: &'a SessionId,
    pub now: DateTime<Utc>,
}

impl Transitions<'_> {
    /// Computes the successor of `state` under `event`.
    pub async fn next(&self, state: &State, event: PolicyEvent) -> PolicyResult<Step> {
        use PolicyEvent as E;
        use State as S;

        match (state, event) {
            (
                S::SessionStarted(s) | S::RestartJourney(s),
                E::SelectIdp {
                    idp_entity_id,
                    is_registration,
                    requested_loa,
                },
            ) => {
                self.select_idp(&s.context, idp_entity_id, is_registration, requested_loa)
                    .await
            }
            (
                S::IdpSelecting(s) | S::IdpSelected(s),
                E::SelectIdp {
                    idp_entity_id,
                    is_registration,
                    requested_loa,
                },
            ) => {
                self.select_idp(&s.context, idp_entity_id, is_registration, requested_loa)
                    .await
            }
            (S::IdpSelecting(s) | S::IdpSelected(s), E::IssueIdpAuthnRequest) => {
                Ok(issue_idp_authn_request(s))
            }
            (S::IdpSelecting(s) | S::IdpSelected(s), E::IdpAuthnResponse(response)) => {
                self.idp_response(s, response).await
            }
            (S::IdpSelecting(s) | S::IdpSelected(s), E::Restart) => {
                Ok(Step::to(S::RestartJourney(journey(&s.context))))
            }

            (S::SessionStarted(s) | S::RestartJourney(s), E::SelectCountry { country_entity_id }) => {
                self.select_country(&s.context, country_entity_id).await
            }
            (S::EidasCountrySelected(s), E::SelectCountry { country_entity_id }) => {
                self.select_country(&s.context, country_entity_id).await
            }
            (S::EidasCountrySelected(s), E::CountryAuthnResponse(response)) => {
                self.country_response(s, response).await
            }
            (S::EidasCountrySelected(s), E::Restart) => {
                Ok(Step::to(S::RestartJourney(journey(&s.context))))
            }

            (S::Cycle0And1MatchRequestSent(s), E::MatchResponse(response)) => {
                self.cycle0_and_1_response(s, response).await
            }
            (S::Cycle3MatchRequestSent(s), E::MatchResponse(response)) => {
                self.cycle3_response(s, response).await
            }
            (S::UserAccountCreationRequestSent(s), E::MatchResponse(response)) => {
                user_account_creation_response(s, response)
            }
            (
                S::Cycle0And1MatchRequestSent(s)
                | S::Cycle3MatchRequestSent(s)
                | S::UserAccountCreationRequestSent(s),
                E::MatchingServiceRequestFailed | E::MatchResponseWaitExceeded,
            ) => Ok(Step::to(S::MatchingServiceRequestError(outcome(
                &s.context,
                &s.authentication.authenticating_entity_id,
            )))),

            (S::AwaitingCycle3Data(s), E::Cycle3DataSubmitted(data)) => self.cycle3_submitted(s, data),
            (S::AwaitingCycle3Data(s), E::Cycle3Cancelled) => Ok(Step::to(S::Cycle3DataInputCancelled(
                outcome(&s.context, &s.authentication.authenticating_entity_id),
            ))),

            (S::AuthnFailedError(s), E::TryAnotherIdp) => {
                Ok(Step::to(S::SessionStarted(journey(&s.context))))
            }

            (state, E::PrepareResponse) if accepts_response(state) => {
                Ok(prepare(state, RpResponsePrepared::Final))
            }
            (state, E::PrepareErrorResponse) if accepts_error_response(state) => {
                Ok(prepare(state, RpResponsePrepared::Error))
            }

            (state, event) => Err(PolicyError::IllegalStateTransition {
                session_id: self.session_id.clone(),
                state: state.name(),
                event: event.name(),
            }),
        }
    }

    async fn transaction(&self, context: &RequestContext) -> PolicyResult<TransactionConfig> {
        self.config
            .transaction(&context.request_issuer_entity_id)
            .await
            .ok_or_else(|| PolicyError::UnknownTransaction(context.request_issuer_entity_id.clone()))
    }

    async fn select_idp(
        &self,
        context: &RequestContext,
        idp_entity_id: String,
        is_registration: bool,
        requested: LevelOfAssurance,
    ) -> PolicyResult<Step> {
        let transaction = self.transaction(context).await?;
        let idp = self.config.identity_provider(&idp_entity_id).await;
        let levels = idp_levels_of_assurance(
            &transaction,
            idp.as_ref(),
            &idp_entity_id,
            is_registration,
            requested,
        )?;

        Ok(Step::to(State::IdpSelecting(IdpSelectionState {
            context: context.clone(),
            idp_entity_id,
            is_registration,
            requested_level_of_assurance: requested,
            levels_of_assurance: levels,
        })))
    }

    async fn select_country(
        &self,
        context: &RequestContext,
        country_entity_id: String,
    ) -> PolicyResult<Step> {
        let transaction = self.transaction(context).await?;
        let country = self.config.country(&country_entity_id).await;
        let levels = country_levels_of_assurance(
            &transaction,
            context.transaction_supports_eidas,
            country.as_ref(),
            &country_entity_id,
        )?;

        let effect = OutboundEffect::AuthnRequestToCountry {
            request_id: context.request_id.clone(),
            country_entity_id: country_entity_id.clone(),
            levels_of_assurance: levels.clone(),
        };
        Ok(Step::with_effect(
            State::EidasCountrySelected(CountrySelectedState {
                context: context.clone(),
                country_entity_id,
                levels_of_assurance: levels,
            }),
            effect,
        ))
    }

    async fn idp_response(
        &self,
        selection: &IdpSelectionState,
        response: InboundIdpResponse,
    ) -> PolicyResult<Step> {
        let context = &selection.context;
        check_in_response_to(context, &response.in_response_to)?;
        check_issuer(&selection.idp_entity_id, &response.issuer)?;
        let idp = self
            .config
            .identity_provider(&response.issuer)
            .await
            .filter(|idp| idp.enabled)
            .ok_or_else(|| StateProcessingFailure::IdpDisabled(response.issuer.clone()))?;

        let failed = || State::AuthnFailedError(outcome(context, &selection.idp_entity_id));
        let next = match response.status {
            IdpStatus::Success => {
                let level = response
                    .level_of_assurance
                    .ok_or(StateProcessingFailure::MissingLevelOfAssurance)?;
                if level.is_fraud_sentinel() {
                    return Ok(Step::to(fraud(selection, response)));
                }
                if !idp.supported_levels_of_assurance.contains(&level) {
                    return Err(StateProcessingFailure::IdpReturnedUnsupportedLevelOfAssurance {
                        idp: response.issuer,
                        level,
                    }
                    .into());
                }

                let transaction = self.transaction(context).await?;
                if !transaction.accepts(level) {
                    warn!(
                        session_id = %self.session_id,
                        idp = %response.issuer,
                        level = %level,
                        "identity provider returned a level the transaction does not accept"
                    );
                    return Ok(Step::to(State::RequesterError(journey(context))));
                }

                return Ok(authenticated(
                    context,
                    &transaction,
                    response.issuer,
                    selection.is_registration,
                    level,
                    response.persistent_id,
                    response.matching_dataset,
                    self.now,
                ));
            }
            IdpStatus::FraudDetected => fraud(selection, response),
            IdpStatus::NoAuthenticationContext | IdpStatus::AuthenticationCancelled => {
                if selection.is_registration {
                    failed()
                } else {
                    State::SessionStarted(journey(context))
                }
            }
            IdpStatus::AuthenticationPending
            | IdpStatus::UpliftFailed
            | IdpStatus::AuthenticationFailed
            | IdpStatus::ResponderError => failed(),
            IdpStatus::RequesterError => State::RequesterError(journey(context)),
        };
        Ok(Step::to(next))
    }

    async fn country_response(
        &self,
        selection: &CountrySelectedState,
        response: InboundCountryResponse,
    ) -> PolicyResult<Step> {
        let context = &selection.context;
        check_in_response_to(context, &response.in_response_to)?;
        check_issuer(&selection.country_entity_id, &response.issuer)?;
        if !self
            .config
            .country(&response.issuer)
            .await
            .is_some_and(|country| country.enabled)
        {
            return Err(StateProcessingFailure::IdpDisabled(response.issuer).into());
        }

        match response.status {
            CountryStatus::Success => {
                let level = response
                    .level_of_assurance
                    .ok_or(StateProcessingFailure::MissingLevelOfAssurance)?;
                let transaction = self.transaction(context).await?;
                if !selection.levels_of_assurance.contains(&level) || !transaction.accepts(level) {
                    return Ok(Step::to(State::RequesterError(journey(context))));
                }
                Ok(authenticated(
                    context,
                    &transaction,
                    response.issuer,
                    false,
                    level,
                    response.person_identifier,
                    response.attributes,
                    self.now,
                ))
            }
            CountryStatus::Failure => Ok(Step::to(State::AuthnFailedError(outcome(
                context,
                &selection.country_entity_id,
            )))),
        }
    }

    async fn cycle0_and_1_response(
        &self,
        sent: &MatchRequestSentState,
        response: InboundMatchingServiceResponse,
    ) -> PolicyResult<Step> {
        check_matching_service_response(sent, &response)?;
        match response.status {
            MatchingServiceStatus::Match => Ok(Step::to(State::SuccessfulMatch(matched(sent, response)))),
            MatchingServiceStatus::NoMatch | MatchingServiceStatus::MultiMatch => {
                let transaction = self.transaction(&sent.context).await?;
                Ok(self.after_no_match(sent, &transaction, true))
            }
            MatchingServiceStatus::RequesterError | MatchingServiceStatus::ResponderError => {
                Ok(Step::to(matching_service_error(sent)))
            }
            other @ (MatchingServiceStatus::Created
            | MatchingServiceStatus::CreateFailure
            | MatchingServiceStatus::Healthy) => Err(unexpected_status(other)),
        }
    }

    async fn cycle3_response(
        &self,
        sent: &MatchRequestSentState,
        response: InboundMatchingServiceResponse,
    ) -> PolicyResult<Step> {
        check_matching_service_response(sent, &response)?;
        match response.status {
            MatchingServiceStatus::Match => Ok(Step::to(State::SuccessfulMatch(matched(sent, response)))),
            MatchingServiceStatus::NoMatch | MatchingServiceStatus::MultiMatch => {
                let transaction = self.transaction(&sent.context).await?;
                Ok(self.after_no_match(sent, &transaction, false))
            }
            MatchingServiceStatus::RequesterError | MatchingServiceStatus::ResponderError => {
                Ok(Step::to(matching_service_error(sent)))
            }
            other @ (MatchingServiceStatus::Created
            | MatchingServiceStatus::CreateFailure
            | MatchingServiceStatus::Healthy) => Err(unexpected_status(other)),
        }
    }

    /// Cycle 3 first, then account creation, then a plain no-match.
    fn after_no_match(
        &self,
        sent: &MatchRequestSentState,
        transaction: &TransactionConfig,
        cycle3_allowed: bool,
    ) -> Step {
        if cycle3_allowed {
            if let Some(attribute) = &transaction.cycle3_attribute {
                return Step::to(State::AwaitingCycle3Data(AwaitingCycle3DataState {
                    context: sent.context.clone(),
                    authentication: sent.authentication.clone(),
                    cycle3_attribute: attribute.clone(),
                }));
            }
        }

        if !transaction.user_account_creation_attributes.is_empty() {
            return match_request(
                &sent.context,
                sent.authentication.clone(),
                MatchRequestKind::UserAccountCreation,
                None,
                transaction.user_account_creation_attributes.clone(),
                self.now,
            );
        }

        Step::to(State::NoMatch(outcome(
            &sent.context,
            &sent.authentication.authenticating_entity_id,
        )))
    }

    fn cycle3_submitted(
        &self,
        awaiting: &AwaitingCycle3DataState,
        data: Cycle3Dataset,
    ) -> PolicyResult<Step> {
        if !data
            .get(&awaiting.cycle3_attribute)
            .is_some_and(|value| !value.trim().is_empty())
        {
            return Err(
                StateProcessingFailure::MissingCycle3Attribute(awaiting.cycle3_attribute.clone()).into(),
            );
        }

        Ok(match_request(
            &awaiting.context,
            awaiting.authentication.clone(),
            MatchRequestKind::Cycle3,
            Some(data),
            Vec::new(),
            self.now,
        ))
    }
}

fn user_account_creation_response(
    sent: &MatchRequestSentState,
    response: InboundMatchingServiceResponse,
) -> PolicyResult<Step> {
    check_matching_service_response(sent, &response)?;
    match response.status {
        MatchingServiceStatus::Created => Ok(Step::to(State::UserAccountCreated(matched(sent, response)))),
        MatchingServiceStatus::CreateFailure => Ok(Step::to(State::UserAccountCreationFailed(outcome(
            &sent.context,
            &sent.authentication.authenticating_entity_id,
        )))),
        MatchingServiceStatus::RequesterError | MatchingServiceStatus::ResponderError => {
            Ok(Step::to(matching_service_error(sent)))
        }
        other @ (MatchingServiceStatus::Match
        | MatchingServiceStatus::NoMatch
        | MatchingServiceStatus::MultiMatch
        | MatchingServiceStatus::Healthy) => Err(unexpected_status(other)),
    }
}

fn journey(context: &RequestContext) -> JourneyState {
    JourneyState {
        context: context.clone(),
    }
}

fn outcome(context: &RequestContext, idp_entity_id: &str) -> IdpOutcomeState {
    IdpOutcomeState {
        context: context.clone(),
        idp_entity_id: idp_entity_id.to_string(),
    }
}

fn issue_idp_authn_request(selection: &IdpSelectionState) -> Step {
    let effect = OutboundEffect::AuthnRequestToIdp {
        request_id: selection.context.request_id.clone(),
        idp_entity_id: selection.idp_entity_id.clone(),
        levels_of_assurance: selection.levels_of_assurance.clone(),
        force_authn: selection.context.force_authn,
        is_registration: selection.is_registration,
    };
    Step::with_effect(State::IdpSelected(selection.clone()), effect)
}

fn fraud(selection: &IdpSelectionState, response: InboundIdpResponse) -> State {
    State::FraudEventDetected(FraudEventDetectedState {
        context: selection.context.clone(),
        idp_entity_id: selection.idp_entity_id.clone(),
        fraud_event_id: response.fraud_event_id,
        persistent_id: response.persistent_id,
    })
}

/// Next step after a successful authentication: matching or, for RPs without
/// a matching service, straight to success.
#[allow(clippy::too_many_arguments)]
fn authenticated(
    context: &RequestContext,
    transaction: &TransactionConfig,
    entity_id: String,
    is_registration: bool,
    level: LevelOfAssurance,
    persistent_id: Option<String>,
    attributes: crate::state::AttributeMap,
    now: DateTime<Utc>,
) -> Step {
    match &transaction.matching_service_entity_id {
        Some(matching_service) => match_request(
            context,
            IdpAuthentication {
                authenticating_entity_id: entity_id,
                is_registration,
                level_of_assurance: level,
                persistent_id,
                matching_dataset: attributes,
                matching_service_entity_id: matching_service.clone(),
            },
            MatchRequestKind::Cycle0And1,
            None,
            Vec::new(),
            now,
        ),
        None => Step::to(State::NonMatchingJourneySuccess(NonMatchingJourneySuccessState {
            context: context.clone(),
            entity_id,
            level_of_assurance: level,
            persistent_id,
            attributes,
        })),
    }
}

fn match_request(
    context: &RequestContext,
    authentication: IdpAuthentication,
    kind: MatchRequestKind,
    cycle3_data: Option<Cycle3Dataset>,
    user_account_creation_attributes: Vec<String>,
    now: DateTime<Utc>,
) -> Step {
    let effect = OutboundEffect::MatchRequest {
        request_id: context.request_id.clone(),
        kind,
        matching_service_entity_id: authentication.matching_service_entity_id.clone(),
        level_of_assurance: authentication.level_of_assurance,
        persistent_id: authentication.persistent_id.clone(),
        matching_dataset: authentication.matching_dataset.clone(),
        cycle3_data: cycle3_data.clone(),
        user_account_creation_attributes,
    };
    let sent = MatchRequestSentState {
        context: context.clone(),
        authentication,
        request_sent_at: now,
        cycle3_data,
    };
    let state = match kind {
        MatchRequestKind::Cycle0And1 => State::Cycle0And1MatchRequestSent(sent),
        MatchRequestKind::Cycle3 => State::Cycle3MatchRequestSent(sent),
        MatchRequestKind::UserAccountCreation => State::UserAccountCreationRequestSent(sent),
    };
    Step::with_effect(state, effect)
}

fn matched(sent: &MatchRequestSentState, response: InboundMatchingServiceResponse) -> MatchedState {
    MatchedState {
        context: sent.context.clone(),
        idp_entity_id: sent.authentication.authenticating_entity_id.clone(),
        level_of_assurance: sent.authentication.level_of_assurance,
        persistent_id: response
            .persistent_id
            .or_else(|| sent.authentication.persistent_id.clone()),
        is_registration: sent.authentication.is_registration,
    }
}

fn matching_service_error(sent: &MatchRequestSentState) -> State {
    State::MatchingServiceRequestError(outcome(
        &sent.context,
        &sent.authentication.authenticating_entity_id,
    ))
}

fn unexpected_status(status: MatchingServiceStatus) -> PolicyError {
    StateProcessingFailure::UnexpectedMatchingServiceStatus(format!("{status:?}")).into()
}

fn check_in_response_to(context: &RequestContext, in_response_to: &str) -> PolicyResult<()> {
    if context.request_id != in_response_to {
        return Err(StateProcessingFailure::WrongInResponseTo {
            expected: context.request_id.clone(),
            actual: in_response_to.to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_issuer(expected: &str, actual: &str) -> PolicyResult<()> {
    if expected != actual {
        return Err(StateProcessingFailure::WrongResponseIssuer {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into());
    }
    Ok(())
}

fn check_matching_service_response(
    sent: &MatchRequestSentState,
    response: &InboundMatchingServiceResponse,
) -> PolicyResult<()> {
    check_issuer(&sent.authentication.matching_service_entity_id, &response.issuer)?;
    check_in_response_to(&sent.context, &response.in_response_to)
}

#[derive(Debug, Clone, Copy)]
enum RpResponsePrepared {
    Final,
    Error,
}

/// Terminal states, plus AuthnFailedError which the user may also leave.
fn accepts_response(state: &State) -> bool {
    state.is_terminal() || matches!(state, State::AuthnFailedError(_))
}

/// Anything not yet answered that has no positive outcome to report.
fn accepts_error_response(state: &State) -> bool {
    !state.is_answered()
        && !matches!(
            state,
            State::SuccessfulMatch(_)
                | State::UserAccountCreated(_)
                | State::NonMatchingJourneySuccess(_)
                | State::NoMatch(_)
        )
}

fn prepare(state: &State, kind: RpResponsePrepared) -> Step {
    let (status, persistent_id, level) = match (kind, state) {
        (RpResponsePrepared::Final, State::SuccessfulMatch(m) | State::UserAccountCreated(m)) => (
            RpResponseStatus::Success,
            m.persistent_id.clone(),
            Some(m.level_of_assurance),
        ),
        (RpResponsePrepared::Final, State::NonMatchingJourneySuccess(s)) => (
            RpResponseStatus::Success,
            s.persistent_id.clone(),
            Some(s.level_of_assurance),
        ),
        (RpResponsePrepared::Final, State::NoMatch(_)) => (RpResponseStatus::NoMatch, None, None),
        (_, State::RequesterError(_)) => (RpResponseStatus::RequesterError, None, None),
        (
            _,
            State::AuthnFailedError(_)
            | State::UserAccountCreationFailed(_)
            | State::FraudEventDetected(_),
        ) => (RpResponseStatus::AuthnFailed, None, None),
        _ => (RpResponseStatus::NoAuthnContext, None, None),
    };

    let context = state.context().clone();
    let effect = OutboundEffect::ResponseToRp {
        in_response_to: context.request_id.clone(),
        rp_entity_id: context.request_issuer_entity_id.clone(),
        assertion_consumer_service_uri: context.assertion_consumer_service_uri.clone(),
        relay_state: context.relay_state.clone(),
        status,
        persistent_id,
        level_of_assurance: level,
    };
    let prepared = PreparedResponseState { context, status };
    let next = match kind {
        RpResponsePrepared::Final => State::ResponsePrepared(prepared),
        RpResponsePrepared::Error => State::ErrorResponsePrepared(prepared),
    };
    Step::with_effect(next, effect)
}
