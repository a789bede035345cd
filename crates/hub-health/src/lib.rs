//! # hub-health
//!
//! Periodic health checks of the matching service adapters.
//!
//! Every MSA known to the hub is sent a health-check request on its own task,
//! with at most `max_concurrency` requests in flight and one deadline for the
//! whole round. Answers go through the same envelope validation as any other
//! MSA response. An adapter that has not answered correctly by the deadline
//! counts as unhealthy, so the aggregate is healthy only when every adapter
//! positively said so.
//!
//! Transport is a seam: [`MatchingServiceHealthClient`] delivers the request
//! and returns the parsed response.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checker;
pub mod client;
pub mod error;

pub use checker::{HealthChecker, HealthReport, HealthStatus, MsaHealth};
pub use client::{HealthCheckRequest, MatchingServiceEndpoint, MatchingServiceHealthClient};
pub use error::{HealthCheckError, HealthResult};
