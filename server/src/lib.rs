//! Flight Oracle Server Library
//!
//! Bootstraps airline, flight and oracle state on the flight insurance ledger,
//! answers its oracle requests from a simulated oracle pool and serves the
//! registered flights over HTTP.

pub mod app_state;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod services;
