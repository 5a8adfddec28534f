//! Ledger account identities and the positional role layout used at bootstrap

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Value unit used by the ledger for stakes and fees.
pub type Wei = u128;

/// One ether expressed in wei.
pub const ETHER: Wei = 1_000_000_000_000_000_000;

/// A ledger account, `0x` followed by 20 hex-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| LedgerError::InvalidAddress(raw.to_string()))?;

        let bytes = hex::decode(body).map_err(|_| LedgerError::InvalidAddress(raw.to_string()))?;
        if bytes.len() != 20 {
            return Err(LedgerError::InvalidAddress(raw.to_string()));
        }

        // Checksummed and lowercase spellings name the same account.
        Ok(Self(format!("0x{}", body.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Roles resolved from the ledger's account list.
///
/// Account 0 owns the contracts, account 1 is the founding airline that
/// sponsors every other registration, then come the airline candidates and
/// the oracle candidates.
#[derive(Debug, Clone)]
pub struct AccountPool {
    pub owner: Address,
    pub founding_airline: Address,
    pub airlines: Vec<Address>,
    pub oracles: Vec<Address>,
}

impl AccountPool {
    pub const OWNER_SLOT: usize = 0;
    pub const FOUNDING_AIRLINE_SLOT: usize = 1;
    pub const FIRST_AIRLINE_SLOT: usize = 2;

    /// Lay out roles over `accounts`. Roles that do not fit are truncated.
    /// Returns `None` when there is not even an owner and a founding airline.
    pub fn from_accounts(
        accounts: &[Address],
        airline_count: usize,
        oracle_count: usize,
    ) -> Option<Self> {
        let owner = accounts.get(Self::OWNER_SLOT)?.clone();
        let founding_airline = accounts.get(Self::FOUNDING_AIRLINE_SLOT)?.clone();

        let airlines: Vec<Address> = accounts
            .iter()
            .skip(Self::FIRST_AIRLINE_SLOT)
            .take(airline_count)
            .cloned()
            .collect();

        let oracles: Vec<Address> = accounts
            .iter()
            .skip(Self::FIRST_AIRLINE_SLOT + airline_count)
            .take(oracle_count)
            .cloned()
            .collect();

        if airlines.len() < airline_count || oracles.len() < oracle_count {
            tracing::warn!(
                available = accounts.len(),
                airlines = airlines.len(),
                oracles = oracles.len(),
                "ledger exposes fewer accounts than configured; roles truncated"
            );
        }

        Some(Self {
            owner,
            founding_airline,
            airlines,
            oracles,
        })
    }

    /// Resolve a schedule's positional airline reference.
    pub fn airline(&self, position: usize) -> Option<&Address> {
        self.airlines.get(position)
    }
}
