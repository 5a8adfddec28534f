//! JSON-RPC binding of [`LedgerGateway`]
//!
//! Calls go over HTTP to the gateway node; events arrive over a WebSocket
//! subscription that reconnects on its own a few times before giving up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{parse_notification, EventSubscription, LedgerEvent, LedgerGateway};
use crate::config::Config;
use crate::error::{LedgerError, QUORUM_REACHED_CODE};
use crate::models::{Address, StatusResponseSubmission, Wei};

const EVENT_BUFFER: usize = 256;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const RECONNECT_MAX_ATTEMPTS: u32 = 5;

type EventSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct RpcLedger {
    rpc_url: String,
    ws_url: String,
    gas_limit: u64,
    reconnect_delay: Duration,
    http: Client,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(
        rpc_url: String,
        ws_url: String,
        gas_limit: u64,
        request_timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            rpc_url,
            ws_url,
            gas_limit,
            reconnect_delay: RECONNECT_DELAY,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    /// Pause between event stream reconnect attempts.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, LedgerError> {
        Self::new(
            config.ledger_rpc_url.clone(),
            config.ledger_ws_url.clone(),
            config.gas_limit,
            config.ledger_request_timeout,
        )
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "ledger call");

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        // Nodes may attach a JSON-RPC error to a non-2xx reply; the error
        // object decides the outcome whenever one is present.
        match serde_json::from_slice::<Value>(&body) {
            Ok(reply) if reply.get("error").is_some() || reply.get("result").is_some() => {
                decode_response(reply)
            }
            _ if !status.is_success() => Err(LedgerError::Transport(format!(
                "ledger node answered HTTP {status}"
            ))),
            Ok(reply) => decode_response(reply),
            Err(err) => Err(err.into()),
        }
    }

    /// State-changing call sent from `from`, optionally carrying value.
    async fn transact(
        &self,
        method: &str,
        from: &Address,
        value: Option<Wei>,
        args: Value,
    ) -> Result<(), LedgerError> {
        let mut params = json!({
            "from": from,
            "gas": self.gas_limit,
            "args": args,
        });
        if let Some(value) = value {
            params["value"] = Value::String(value.to_string());
        }

        self.rpc_call(method, params).await.map(|_| ())
    }
}

#[async_trait]
impl LedgerGateway for RpcLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        let result = self.rpc_call("accounts", json!({})).await?;
        result
            .as_array()
            .ok_or_else(|| LedgerError::Decode("accounts is not an array".to_string()))?
            .iter()
            .map(|raw| {
                raw.as_str()
                    .ok_or_else(|| LedgerError::Decode(format!("account {raw} is not a string")))
                    .and_then(Address::parse)
            })
            .collect()
    }

    async fn authorize_app_contract(&self, owner: &Address) -> Result<(), LedgerError> {
        self.transact("authorizeAppContract", owner, None, json!({})).await
    }

    async fn register_airline(&self, sponsor: &Address, airline: &Address) -> Result<(), LedgerError> {
        self.transact("registerAirline", sponsor, None, json!({ "airline": airline }))
            .await
    }

    async fn fund_airline(&self, airline: &Address, stake: Wei) -> Result<(), LedgerError> {
        self.transact("fundAirline", airline, Some(stake), json!({})).await
    }

    async fn register_flight(
        &self,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<(), LedgerError> {
        self.transact(
            "registerFlight",
            airline,
            None,
            json!({ "flight": flight, "timestamp": timestamp }),
        )
        .await
    }

    async fn fetch_flight_status(
        &self,
        requester: &Address,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<(), LedgerError> {
        self.transact(
            "fetchFlightStatus",
            requester,
            None,
            json!({ "airline": airline, "flight": flight, "timestamp": timestamp }),
        )
        .await
    }

    async fn registration_fee(&self) -> Result<Wei, LedgerError> {
        let result = self.rpc_call("REGISTRATION_FEE", json!({})).await?;
        parse_wei(&result)
    }

    async fn register_oracle(&self, oracle: &Address, fee: Wei) -> Result<(), LedgerError> {
        self.transact("registerOracle", oracle, Some(fee), json!({})).await
    }

    async fn my_indices(&self, oracle: &Address) -> Result<Vec<u8>, LedgerError> {
        let result = self.rpc_call("getMyIndices", json!({ "from": oracle })).await?;
        result
            .as_array()
            .ok_or_else(|| LedgerError::Decode("indices is not an array".to_string()))?
            .iter()
            .map(|raw| {
                parse_wei(raw).and_then(|n| {
                    u8::try_from(n).map_err(|_| LedgerError::Decode(format!("index {n} out of range")))
                })
            })
            .collect()
    }

    async fn submit_oracle_response(
        &self,
        oracle: &Address,
        response: &StatusResponseSubmission,
    ) -> Result<(), LedgerError> {
        self.transact("submitOracleResponse", oracle, None, serde_json::to_value(response)?)
            .await
    }

    async fn subscribe(&self) -> Result<EventSubscription, LedgerError> {
        let socket = open_event_socket(&self.ws_url).await?;
        info!(url = %self.ws_url, "subscribed to ledger events");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let feeder = tokio::spawn(forward_events(
            self.ws_url.clone(),
            self.reconnect_delay,
            socket,
            tx,
        ));
        Ok(EventSubscription::new(rx, feeder))
    }
}

fn decode_response(response: Value) -> Result<Value, LedgerError> {
    if let Some(error) = response.get("error") {
        return Err(classify_error(error));
    }

    response
        .get("result")
        .cloned()
        .ok_or_else(|| LedgerError::Decode("response carries neither result nor error".to_string()))
}

/// Map a JSON-RPC error object onto [`LedgerError`] by code and structured
/// data only.
fn classify_error(error: &Value) -> LedgerError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let reason = error.pointer("/data/reason").and_then(Value::as_str);

    if code == QUORUM_REACHED_CODE || reason == Some("quorum_reached") {
        return LedgerError::QuorumReached;
    }

    LedgerError::Rejected {
        code,
        message: error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unspecified ledger error")
            .to_string(),
    }
}

/// uint values come back as numbers, decimal strings or `0x` hex strings.
fn parse_wei(raw: &Value) -> Result<Wei, LedgerError> {
    match raw {
        Value::Number(n) => n
            .as_u64()
            .map(Wei::from)
            .ok_or_else(|| LedgerError::Decode(format!("{n} is not an unsigned integer"))),
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x") {
                Some(hex) => Wei::from_str_radix(hex, 16),
                None => s.parse::<Wei>(),
            };
            parsed.map_err(|_| LedgerError::Decode(format!("{s:?} is not an unsigned integer")))
        }
        other => Err(LedgerError::Decode(format!("{other} is not an unsigned integer"))),
    }
}

async fn open_event_socket(ws_url: &str) -> Result<EventSocket, LedgerError> {
    let (mut socket, _) = connect_async(ws_url)
        .await
        .map_err(|err| LedgerError::Transport(err.to_string()))?;

    let request = json!({
        "jsonrpc": "2.0",
        "id": "oracle-events",
        "method": "subscribe",
        "params": {
            "events": ["OracleRequest", "FlightStatusInfo"],
            "fromBlock": 0,
        },
    });
    socket
        .send(Message::Text(request.to_string()))
        .await
        .map_err(|err| LedgerError::Transport(err.to_string()))?;

    Ok(socket)
}

async fn forward_events(
    ws_url: String,
    reconnect_delay: Duration,
    mut socket: EventSocket,
    events: mpsc::Sender<LedgerEvent>,
) {
    loop {
        while let Some(frame) = socket.next().await {
            let event = match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                    Ok(raw) => parse_notification(&raw),
                    Err(err) => Some(LedgerEvent::StreamError(format!("unreadable frame: {err}"))),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => None,
                Err(err) => {
                    let _ = events.send(LedgerEvent::StreamError(err.to_string())).await;
                    break;
                }
            };

            if let Some(event) = event {
                if events.send(event).await.is_err() {
                    // Subscriber went away.
                    return;
                }
            }
        }

        match reconnect(&ws_url, reconnect_delay, &events).await {
            Some(fresh) => socket = fresh,
            None => return,
        }
    }
}

async fn reconnect(
    ws_url: &str,
    delay: Duration,
    events: &mpsc::Sender<LedgerEvent>,
) -> Option<EventSocket> {
    for attempt in 1..=RECONNECT_MAX_ATTEMPTS {
        sleep(delay).await;
        if events.is_closed() {
            return None;
        }

        match open_event_socket(ws_url).await {
            Ok(socket) => {
                info!(attempt, "ledger event stream reconnected");
                return Some(socket);
            }
            Err(err) => warn!(attempt, error = %err, "ledger event stream reconnect failed"),
        }
    }

    let _ = events
        .send(LedgerEvent::StreamError(format!(
            "gave up reconnecting after {RECONNECT_MAX_ATTEMPTS} attempts"
        )))
        .await;
    None
}
