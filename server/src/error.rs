//! Error types shared by the ledger gateway and the services driving it

use thiserror::Error;

/// JSON-RPC error code the gateway uses when quorum was already reached.
pub const QUORUM_REACHED_CODE: i64 = -32010;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger already finalized this request with enough matching responses.
    #[error("Ledger: quorum already reached for this request")]
    QuorumReached,
    #[error("Ledger: call rejected ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("Ledger: transport error: {0}")]
    Transport(String),
    #[error("Ledger: malformed response: {0}")]
    Decode(String),
    #[error("Ledger: invalid address {0:?}")]
    InvalidAddress(String),
}

impl LedgerError {
    pub fn is_quorum_reached(&self) -> bool {
        matches!(self, LedgerError::QuorumReached)
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Decode(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config: {key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}
