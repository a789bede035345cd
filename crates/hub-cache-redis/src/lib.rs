//! # hub-cache-redis
//!
//! Redis implementation of the hub's shared store, using the `fred` crate.
//!
//! Every hub instance points at the same Redis, which makes session state
//! and replay entries visible cluster-wide. Set-if-absent maps to
//! `SET NX PX`; compare-and-swap runs as a Lua script so the comparison and
//! the write are one atomic step on the server.
//!
//! ## Example
//!
//! ```ignore
//! use hub_cache_redis::{RedisConfig, RedisStore};
//!
//! let store = RedisStore::new(RedisConfig::from_url("redis://localhost:6379/0")).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod store;

pub use config::RedisConfig;
pub use store::RedisStore;
