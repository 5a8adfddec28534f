use serde_json::Value;

use super::LedgerEvent;
use crate::models::{Address, FlightStatusInfo, StatusRequestEvent};

/// Turn one subscription notification into a [`LedgerEvent`].
///
/// Returns `None` for frames that are not notifications of an event we act
/// on (subscription acks, pings, other contract events). Known event frames
/// that cannot be read become `StreamError`.
pub fn parse_notification(raw: &Value) -> Option<LedgerEvent> {
    if raw.pointer("/method").and_then(Value::as_str) != Some("event") {
        return None;
    }

    let name = raw
        .pointer("/params/event")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let values = raw
        .pointer("/params/returnValues")
        .cloned()
        .unwrap_or(Value::Null);

    let parsed = match name {
        "OracleRequest" => parse_oracle_request(&values).map(LedgerEvent::OracleRequest),
        "FlightStatusInfo" => parse_status_info(&values).map(LedgerEvent::FlightStatusInfo),
        _ => return None,
    };

    Some(parsed.unwrap_or_else(|reason| LedgerEvent::StreamError(format!("{name}: {reason}"))))
}

fn parse_oracle_request(values: &Value) -> Result<StatusRequestEvent, String> {
    let index = number(values, "index")?;
    Ok(StatusRequestEvent {
        index: u8::try_from(index).map_err(|_| format!("index {index} out of range"))?,
        airline: address(values, "airline")?,
        flight: text(values, "flight")?,
        timestamp: number(values, "timestamp")?,
    })
}

fn parse_status_info(values: &Value) -> Result<FlightStatusInfo, String> {
    let status = number(values, "status")?;
    Ok(FlightStatusInfo {
        airline: address(values, "airline")?,
        requester: address(values, "requester")?,
        flight: text(values, "flight")?,
        timestamp: number(values, "timestamp")?,
        status: u8::try_from(status).map_err(|_| format!("status {status} out of range"))?,
    })
}

// Node clients report uint fields either as JSON numbers or decimal strings.
fn number(values: &Value, key: &str) -> Result<u64, String> {
    match values.get(key) {
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| format!("{key} is not a u64")),
        Some(Value::String(s)) => s.parse().map_err(|_| format!("{key} is not a number")),
        _ => Err(format!("missing {key}")),
    }
}

fn text(values: &Value, key: &str) -> Result<String, String> {
    values
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| format!("missing {key}"))
}

fn address(values: &Value, key: &str) -> Result<Address, String> {
    Address::parse(&text(values, key)?).map_err(|err| err.to_string())
}
