//! API handlers for the flight oracle server

use axum::Json;
use serde_json::{json, Value};

pub mod flights;

pub use flights::{list_flights, request_flight_status};

pub async fn root() -> &'static str {
    "Flight Oracle Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn api_index() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!",
    }))
}
