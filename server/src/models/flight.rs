use serde::{Deserialize, Serialize};
use validator::Validate;

use super::account::Address;

/// A scheduled flight as registered with the ledger and served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
}

/// Schedule entry before airline accounts are known.
#[derive(Debug, Clone, Copy)]
pub struct ScheduledFlight {
    pub airline_position: usize,
    pub code: &'static str,
}

/// Flights registered on every bootstrap, keyed to airline positions.
pub const FLIGHT_SCHEDULE: [ScheduledFlight; 5] = [
    ScheduledFlight { airline_position: 0, code: "OS341" },
    ScheduledFlight { airline_position: 1, code: "OS125" },
    ScheduledFlight { airline_position: 2, code: "OS912" },
    ScheduledFlight { airline_position: 3, code: "OS001" },
    ScheduledFlight { airline_position: 4, code: "OS200" },
];

/// Request body for asking the ledger to fetch a flight's status
#[derive(Debug, Deserialize, Validate)]
pub struct FlightStatusRequest {
    pub airline: Address,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
    #[validate(range(min = 1))]
    pub timestamp: u64,
}

impl FlightStatusRequest {
    pub fn matches(&self, flight: &Flight) -> bool {
        self.airline == flight.airline
            && self.flight == flight.flight
            && self.timestamp == flight.timestamp
    }
}
