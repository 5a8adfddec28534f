//! Sequential ledger setup run once at startup
//!
//! Phases run strictly in order and every item in a phase is attempted before
//! the next phase starts. Individual failures are recorded and skipped; later
//! phases tolerate whatever partial state earlier ones left behind.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::flight_board::FlightBoard;
use super::oracle_pool::{OraclePoolManager, OracleRegistry};
use super::phase::{Phase, PhaseSummary};
use crate::config::Config;
use crate::error::LedgerError;
use crate::ledger::LedgerGateway;
use crate::models::{AccountPool, Flight, ScheduledFlight, Wei, FLIGHT_SCHEDULE};

#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub airline_count: usize,
    pub oracle_count: usize,
    pub airline_funding: Wei,
    pub departure_offset_secs: u64,
}

impl From<&Config> for BootstrapSettings {
    fn from(config: &Config) -> Self {
        Self {
            airline_count: config.airline_count,
            oracle_count: config.oracle_count,
            airline_funding: config.airline_funding,
            departure_offset_secs: config.departure_offset_secs,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapResult {
    pub started_at: u64,
    pub phases: Vec<PhaseSummary>,
    pub flights: Vec<Flight>,
    pub registry: OracleRegistry,
}

impl BootstrapResult {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseSummary> {
        self.phases.iter().find(|summary| summary.phase == phase)
    }
}

pub struct FlightRegistryBootstrapper {
    ledger: Arc<dyn LedgerGateway>,
    board: FlightBoard,
    pool: OraclePoolManager,
    settings: BootstrapSettings,
    schedule: Vec<ScheduledFlight>,
}

impl FlightRegistryBootstrapper {
    pub fn new(ledger: Arc<dyn LedgerGateway>, board: FlightBoard, settings: BootstrapSettings) -> Self {
        Self {
            pool: OraclePoolManager::new(ledger.clone()),
            ledger,
            board,
            settings,
            schedule: FLIGHT_SCHEDULE.to_vec(),
        }
    }

    pub fn with_schedule(mut self, schedule: Vec<ScheduledFlight>) -> Self {
        self.schedule = schedule;
        self
    }

    /// Ask the ledger for its accounts and lay roles out over them.
    pub async fn load_accounts(&self) -> Result<AccountPool, LedgerError> {
        let accounts = self.ledger.accounts().await?;
        AccountPool::from_accounts(&accounts, self.settings.airline_count, self.settings.oracle_count)
            .ok_or_else(|| {
                LedgerError::Decode(format!(
                    "ledger exposes {} accounts; need at least an owner and a founding airline",
                    accounts.len()
                ))
            })
    }

    pub async fn bootstrap(&self, accounts: &AccountPool) -> BootstrapResult {
        let started_at = unix_now();
        info!(
            airlines = accounts.airlines.len(),
            oracles = accounts.oracles.len(),
            flights = self.schedule.len(),
            "bootstrapping ledger state"
        );

        let mut phases = Vec::with_capacity(5);

        phases.push(self.authorize_app_contract(accounts).await);
        phases.push(self.register_airlines(accounts).await);
        phases.push(self.fund_airlines(accounts).await);

        let departs_at = started_at + self.settings.departure_offset_secs;
        let (flights, summary) = self.register_flights(accounts, departs_at).await;
        phases.push(summary);
        if !self.board.publish(flights.clone()) {
            tracing::warn!("flight list was already published; keeping the earlier list");
        }

        let (registry, summary) = self.pool.register_pool(&accounts.oracles).await;
        summary.log();
        phases.push(summary);

        info!(flights = flights.len(), oracles = registry.len(), "bootstrap complete");

        BootstrapResult {
            started_at,
            phases,
            flights,
            registry,
        }
    }

    async fn authorize_app_contract(&self, accounts: &AccountPool) -> PhaseSummary {
        let mut summary = PhaseSummary::new(Phase::AuthorizeContract);
        let result = self.ledger.authorize_app_contract(&accounts.owner).await;
        summary.record(accounts.owner.to_string(), result);
        summary.log();
        summary
    }

    async fn register_airlines(&self, accounts: &AccountPool) -> PhaseSummary {
        let mut summary = PhaseSummary::new(Phase::RegisterAirlines);
        for airline in &accounts.airlines {
            let result = self
                .ledger
                .register_airline(&accounts.founding_airline, airline)
                .await;
            summary.record(airline.to_string(), result);
        }
        summary.log();
        summary
    }

    async fn fund_airlines(&self, accounts: &AccountPool) -> PhaseSummary {
        let mut summary = PhaseSummary::new(Phase::FundAirlines);
        for airline in &accounts.airlines {
            let result = self
                .ledger
                .fund_airline(airline, self.settings.airline_funding)
                .await;
            summary.record(airline.to_string(), result);
        }
        summary.log();
        summary
    }

    async fn register_flights(
        &self,
        accounts: &AccountPool,
        departs_at: u64,
    ) -> (Vec<Flight>, PhaseSummary) {
        let mut summary = PhaseSummary::new(Phase::RegisterFlights);
        let mut flights = Vec::with_capacity(self.schedule.len());

        for scheduled in &self.schedule {
            let Some(airline) = accounts.airline(scheduled.airline_position) else {
                summary.skip(
                    scheduled.code,
                    format!("no airline account at position {}", scheduled.airline_position),
                );
                continue;
            };

            let flight = Flight {
                airline: airline.clone(),
                flight: scheduled.code.to_string(),
                timestamp: departs_at,
            };
            let result = self
                .ledger
                .register_flight(&flight.airline, &flight.flight, flight.timestamp)
                .await;
            summary.record(scheduled.code, result);
            flights.push(flight);
        }

        summary.log();
        (flights, summary)
    }
}

fn unix_now() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
