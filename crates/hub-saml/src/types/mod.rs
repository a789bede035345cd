//! Parsed SAML object model.
//!
//! The codec turns wire messages into these types. Nothing here is trusted
//! until it has passed the [`validation`](crate::validation) pipeline.

mod assertion;
mod authn_request;
mod constants;
mod issuer;
mod response;
mod status;

pub use assertion::*;
pub use authn_request::*;
pub use constants::*;
pub use issuer::*;
pub use response::*;
pub use status::*;
