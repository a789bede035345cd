//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use hub_health::HealthChecker;
use hub_policy::PolicyStateMachine;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Federation session state machine.
    pub machine: Arc<PolicyStateMachine>,

    /// Matching service health checker.
    pub health: Arc<HealthChecker>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(machine: Arc<PolicyStateMachine>, health: Arc<HealthChecker>) -> Self {
        Self { machine, health }
    }
}
