//! Narrow interface to the external flight insurance ledger
//!
//! The ledger owns airline registration, escrow and the oracle quorum. This
//! crate only drives it through [`LedgerGateway`] and reacts to the events it
//! emits, so every call is fallible and nothing about its internal voting is
//! assumed beyond the distinguished [`LedgerError::QuorumReached`] answer.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::LedgerError;
use crate::models::{Address, FlightStatusInfo, StatusRequestEvent, StatusResponseSubmission, Wei};

mod events;
pub mod rpc;

pub use events::parse_notification;
pub use rpc::RpcLedger;

/// Everything a ledger subscription can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    OracleRequest(StatusRequestEvent),
    FlightStatusInfo(FlightStatusInfo),
    /// A notification that could not be read, or a transport hiccup. The
    /// subscription stays open.
    StreamError(String),
}

#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Accounts the ledger node manages, in its canonical order.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Allow the app contract to write into the data contract.
    async fn authorize_app_contract(&self, owner: &Address) -> Result<(), LedgerError>;

    async fn register_airline(&self, sponsor: &Address, airline: &Address) -> Result<(), LedgerError>;

    async fn fund_airline(&self, airline: &Address, stake: Wei) -> Result<(), LedgerError>;

    async fn register_flight(
        &self,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<(), LedgerError>;

    /// Ask the ledger to raise an `OracleRequest` for this flight.
    async fn fetch_flight_status(
        &self,
        requester: &Address,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<(), LedgerError>;

    async fn registration_fee(&self) -> Result<Wei, LedgerError>;

    async fn register_oracle(&self, oracle: &Address, fee: Wei) -> Result<(), LedgerError>;

    async fn my_indices(&self, oracle: &Address) -> Result<Vec<u8>, LedgerError>;

    async fn submit_oracle_response(
        &self,
        oracle: &Address,
        response: &StatusResponseSubmission,
    ) -> Result<(), LedgerError>;

    async fn subscribe(&self) -> Result<EventSubscription, LedgerError>;
}

/// A live event feed. Dropping it cancels the task feeding it.
pub struct EventSubscription {
    events: mpsc::Receiver<LedgerEvent>,
    feeder: Option<JoinHandle<()>>,
}

impl EventSubscription {
    pub fn new(events: mpsc::Receiver<LedgerEvent>, feeder: JoinHandle<()>) -> Self {
        Self {
            events,
            feeder: Some(feeder),
        }
    }

    /// Subscription over a channel whose sender is driven elsewhere.
    pub fn from_receiver(events: mpsc::Receiver<LedgerEvent>) -> Self {
        Self { events, feeder: None }
    }

    /// Wait for the next event; `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<LedgerEvent> {
        self.events.recv().await
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.events.close();
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}
