//! # hub-core
//!
//! Core types shared by every crate of the identity federation hub.
//!
//! ## Contents
//!
//! - [`LevelOfAssurance`] - identity-proofing strength with partial ordering
//! - [`Clock`] - time source used for freshness, replay and expiry checks
//! - [`HubConfig`] - hub-wide protocol configuration
//! - [`event`] - audit event model and the [`EventSink`] emission seam
//! - [`Error`] - configuration and parsing errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod loa;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::{HealthCheckSettings, HubConfig};
pub use error::{Error, Result};
pub use event::{EventSink, EventType, HubEvent, MemoryEventSink, TracingEventSink};
pub use loa::LevelOfAssurance;
