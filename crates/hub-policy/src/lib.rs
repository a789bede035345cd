//! # hub-policy
//!
//! The federation session state machine.
//!
//! A session is one [`State`] value stored through [`hub_session`]. Events
//! arrive as [`PolicyEvent`]s carrying only validated messages; the machine
//! picks the handler for the current state, stores the successor with
//! compare-and-set and hands back an [`OutboundEffect`] describing any
//! message the caller must send. The machine itself never talks to IdPs,
//! matching services or relying parties.
//!
//! ## Example
//!
//! ```ignore
//! use hub_policy::{PolicyEvent, PolicyStateMachine, SessionParams};
//!
//! let session_id = machine
//!     .start(&pipeline, authn_request, SessionParams::new(acs_url))
//!     .await?;
//! let transition = machine
//!     .transition(&session_id, PolicyEvent::SelectIdp {
//!         idp_entity_id: idp.into(),
//!         is_registration: false,
//!         requested_loa: LevelOfAssurance::Level2,
//!     })
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod effect;
pub mod error;
pub mod event;
pub mod machine;
pub mod selection;
pub mod state;

pub use config::{ConfigService, CountryConfig, IdpConfig, InMemoryConfigService, TransactionConfig};
pub use context::RequestContext;
pub use effect::{MatchRequestKind, OutboundEffect, RpResponseStatus};
pub use error::{PolicyError, PolicyResult, SelectionFailure, StateProcessingFailure};
pub use event::PolicyEvent;
pub use machine::{PolicyStateMachine, SessionParams, Transition};
pub use state::State;
