//! # hub-session
//!
//! Federation session storage.
//!
//! A session is one record per [`SessionId`] held in the cluster-wide
//! [`SharedStore`](hub_cache::SharedStore). It is created once when an RP
//! AuthnRequest is accepted and then only ever replaced by compare-and-set,
//! so two hub instances racing to advance the same session cannot both win.
//!
//! The store is generic over the state type; the policy crate supplies the
//! tagged state union.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod session;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use id::SessionId;
pub use session::{Session, SessionState};
pub use store::SessionStore;
