//! Application state shared across handlers

use std::sync::{Arc, OnceLock};

use axum::extract::FromRef;

use crate::ledger::LedgerGateway;
use crate::models::Address;
use crate::services::FlightBoard;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub flights: FlightBoard,
    pub ledger: Arc<dyn LedgerGateway>,
    /// Account that raises status requests; known once accounts are loaded.
    pub requester: Arc<OnceLock<Address>>,
}

impl AppState {
    pub fn new(flights: FlightBoard, ledger: Arc<dyn LedgerGateway>) -> Self {
        Self {
            flights,
            ledger,
            requester: Arc::new(OnceLock::new()),
        }
    }
}

impl FromRef<AppState> for FlightBoard {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.flights.clone()
    }
}
