use std::fmt;

use serde::{Deserialize, Serialize};

use super::account::Address;
use crate::error::LedgerError;

/// Number of indices the ledger assigns to every registered oracle.
pub const INDICES_PER_ORACLE: usize = 3;

/// Outcome an oracle reports for a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StatusCode {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl StatusCode {
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusCode::Unknown => "unknown",
            StatusCode::OnTime => "on time",
            StatusCode::LateAirline => "late: airline",
            StatusCode::LateWeather => "late: weather",
            StatusCode::LateTechnical => "late: technical",
            StatusCode::LateOther => "late: other",
        }
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = LedgerError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        StatusCode::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or_else(|| LedgerError::Decode(format!("unknown status code {code}")))
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.label())
    }
}

/// A registered oracle and the request indices it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleIdentity {
    pub address: Address,
    indices: [u8; INDICES_PER_ORACLE],
}

impl OracleIdentity {
    /// Build an identity from the ledger's index answer, which must hold
    /// exactly three distinct entries.
    pub fn new(address: Address, indices: Vec<u8>) -> Result<Self, LedgerError> {
        let indices: [u8; INDICES_PER_ORACLE] = indices.try_into().map_err(|got: Vec<u8>| {
            LedgerError::Decode(format!(
                "expected {INDICES_PER_ORACLE} indices for {address}, got {}",
                got.len()
            ))
        })?;

        let [a, b, c] = indices;
        if a == b || a == c || b == c {
            return Err(LedgerError::Decode(format!(
                "indices for {address} repeat an entry: {indices:?}"
            )));
        }

        Ok(Self { address, indices })
    }

    pub fn indices(&self) -> &[u8; INDICES_PER_ORACLE] {
        &self.indices
    }

    pub fn answers(&self, index: u8) -> bool {
        self.indices.contains(&index)
    }
}

/// `OracleRequest` event: the ledger asks oracles holding `index` to vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequestEvent {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
}

/// One oracle's vote on a status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponseSubmission {
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
    #[serde(rename = "statusCode")]
    pub status_code: StatusCode,
}

impl StatusResponseSubmission {
    pub fn answer(request: &StatusRequestEvent, status_code: StatusCode) -> Self {
        Self {
            index: request.index,
            airline: request.airline.clone(),
            flight: request.flight.clone(),
            timestamp: request.timestamp,
            status_code,
        }
    }
}

/// `FlightStatusInfo` event emitted once the ledger finalizes a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightStatusInfo {
    pub airline: Address,
    pub requester: Address,
    pub flight: String,
    pub timestamp: u64,
    pub status: u8,
}
