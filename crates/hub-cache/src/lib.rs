//! # hub-cache
//!
//! Shared state abstractions for the identity federation hub.
//!
//! Hub instances are stateless per request: any instance may serve any step
//! of a session, so sessions and replay entries live in a store shared by the
//! whole cluster. This crate defines that store's contract and the replay
//! cache built on it. The production implementation is Redis-based (see
//! `hub-cache-redis`).
//!
//! ## Contents
//!
//! - [`SharedStore`] - key-value store with atomic set-if-absent and compare-and-swap
//! - [`MemoryStore`] - single-process implementation for tests and development
//! - [`ReplayCache`] - duplicate detection over a shared store
//!
//! ## Example
//!
//! ```ignore
//! use hub_cache::{ReplayCache, StoreReplayCache};
//!
//! async fn check(cache: &StoreReplayCache, request_id: &str) -> bool {
//!     cache.accept(request_id).await.unwrap_or(false)
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod replay;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryStore;
pub use replay::{ReplayCache, StoreReplayCache};
pub use store::{SharedStore, SharedStoreRef};
