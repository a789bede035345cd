//! End-to-end integration tests.
//!
//! Journeys run against in-memory stores with real signatures and real
//! encryption. The Redis tests use testcontainers and are ignored by default.

mod common;
mod concurrency;
mod journeys;
mod redis_store;
mod server;
