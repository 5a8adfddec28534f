//! Runtime configuration read from the environment (`.env` is honoured)

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::{Wei, ETHER};

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub ledger_rpc_url: String,
    pub ledger_ws_url: String,
    pub ledger_request_timeout: Duration,
    pub gas_limit: u64,
    pub airline_count: usize,
    pub oracle_count: usize,
    pub airline_funding: Wei,
    pub departure_offset_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests need not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ip: IpAddr = parse_or(&lookup, "BIND_ADDR", "an IP address", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port: u16 = parse_or(&lookup, "PORT", "a port number", 3001)?;

        let ledger_rpc_url =
            lookup("LEDGER_RPC_URL").unwrap_or_else(|| "http://127.0.0.1:9545".to_string());
        // Same endpoint over WebSocket unless told otherwise.
        let ledger_ws_url = lookup("LEDGER_WS_URL")
            .unwrap_or_else(|| ledger_rpc_url.replacen("http", "ws", 1));

        let timeout_secs: u64 =
            parse_or(&lookup, "LEDGER_REQUEST_TIMEOUT_SECS", "a number of seconds", 30)?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map(|raw| {
            raw.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        });

        Ok(Self {
            bind_addr: SocketAddr::new(ip, port),
            ledger_rpc_url,
            ledger_ws_url,
            ledger_request_timeout: Duration::from_secs(timeout_secs),
            gas_limit: parse_or(&lookup, "GAS_LIMIT", "a gas amount", 2_506_540)?,
            airline_count: parse_or(&lookup, "AIRLINE_COUNT", "a count", 10)?,
            oracle_count: parse_or(&lookup, "ORACLE_COUNT", "a count", 19)?,
            airline_funding: parse_or(&lookup, "AIRLINE_FUNDING_WEI", "an amount in wei", 10 * ETHER)?,
            departure_offset_secs: parse_or(&lookup, "DEPARTURE_OFFSET_SECS", "a number of seconds", 120)?,
            cors_allowed_origins,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, expected: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value,
        }),
        None => Ok(default),
    }
}
