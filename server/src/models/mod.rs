//! Data models for the flight oracle server

use serde::{Deserialize, Serialize};

pub mod account;
pub mod flight;
pub mod oracle;

pub use account::{AccountPool, Address, Wei, ETHER};
pub use flight::{Flight, FlightStatusRequest, ScheduledFlight, FLIGHT_SCHEDULE};
pub use oracle::{
    FlightStatusInfo, OracleIdentity, StatusCode, StatusRequestEvent, StatusResponseSubmission,
};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Body of `GET /api/flights`
#[derive(Debug, Serialize, Deserialize)]
pub struct FlightList {
    pub data: Vec<Flight>,
}
