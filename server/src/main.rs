//! Flight Oracle Server
//!
//! Serves the registered flight list over HTTP while, in the background,
//! bootstrapping ledger state and answering the ledger's oracle requests from
//! a simulated oracle pool.

use std::sync::{Arc, OnceLock};

use anyhow::Context;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flight_oracle_server::app_state::AppState;
use flight_oracle_server::config::Config;
use flight_oracle_server::ledger::{LedgerGateway, RpcLedger};
use flight_oracle_server::models::{AccountPool, Address};
use flight_oracle_server::routes;
use flight_oracle_server::services::{
    BootstrapSettings, FlightBoard, FlightRegistryBootstrapper, OracleResponder,
};

const SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let ledger: Arc<dyn LedgerGateway> =
        Arc::new(RpcLedger::from_config(&config).context("could not build ledger client")?);

    let board = FlightBoard::new();
    let state = AppState::new(board.clone(), ledger.clone());

    // Bootstrap the ledger, then answer oracle requests for the life of the process.
    tokio::spawn(run_oracles(
        ledger,
        board,
        state.requester.clone(),
        BootstrapSettings::from(&config),
    ));

    let app = routes::app(state, config.cors_allowed_origins.as_deref());

    info!("Server starting on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", config.bind_addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn run_oracles(
    ledger: Arc<dyn LedgerGateway>,
    board: FlightBoard,
    requester: Arc<OnceLock<Address>>,
    settings: BootstrapSettings,
) {
    let bootstrapper = FlightRegistryBootstrapper::new(ledger.clone(), board, settings);
    let accounts = load_accounts(&bootstrapper).await;
    if requester.set(accounts.owner.clone()).is_err() {
        warn!("status requester was already set; keeping the earlier account");
    }

    let result = bootstrapper.bootstrap(&accounts).await;
    let responder = Arc::new(OracleResponder::new(ledger, result.registry));

    let mut restart_count: u32 = 0;
    loop {
        let task = responder.clone();
        let handle = tokio::spawn(async move { task.run().await });

        match handle.await {
            Ok(()) => warn!("oracle responder returned; restarting"),
            Err(join_error) => {
                if join_error.is_panic() {
                    error!("oracle responder panicked; restarting");
                } else {
                    error!(error = %join_error, "oracle responder task failed; restarting");
                }
            }
        }

        restart_count = restart_count.saturating_add(1);
        let backoff_seconds = backoff_seconds(restart_count);
        warn!(restart_count, backoff_seconds, "oracle responder restart backoff");
        sleep(Duration::from_secs(backoff_seconds)).await;
    }
}

/// Keep asking until the ledger answers; nothing can be bootstrapped without accounts.
async fn load_accounts(bootstrapper: &FlightRegistryBootstrapper) -> AccountPool {
    let mut attempts: u32 = 0;
    loop {
        match bootstrapper.load_accounts().await {
            Ok(accounts) => return accounts,
            Err(err) => {
                attempts = attempts.saturating_add(1);
                let backoff_seconds = backoff_seconds(attempts);
                error!(error = %err, attempts, backoff_seconds, "could not load ledger accounts");
                sleep(Duration::from_secs(backoff_seconds)).await;
            }
        }
    }
}

fn backoff_seconds(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt.min(5))
        .min(SUPERVISOR_MAX_BACKOFF_SECONDS)
}
