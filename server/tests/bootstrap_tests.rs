mod common;

use std::sync::Arc;

use common::{account, rejected, Call, MockLedger};
use flight_oracle_server::error::LedgerError;
use flight_oracle_server::ledger::LedgerGateway;
use flight_oracle_server::models::{AccountPool, ETHER};
use flight_oracle_server::services::{
    BootstrapSettings, FlightBoard, FlightRegistryBootstrapper, ItemOutcome, OraclePoolManager,
    Phase,
};

fn settings(airline_count: usize, oracle_count: usize) -> BootstrapSettings {
    BootstrapSettings {
        airline_count,
        oracle_count,
        airline_funding: 10 * ETHER,
        departure_offset_secs: 120,
    }
}

async fn bootstrapper(
    ledger: Arc<MockLedger>,
    settings: BootstrapSettings,
) -> (FlightRegistryBootstrapper, AccountPool, FlightBoard) {
    let board = FlightBoard::new();
    let gateway: Arc<dyn LedgerGateway> = ledger;
    let bootstrapper = FlightRegistryBootstrapper::new(gateway, board.clone(), settings);
    let accounts = bootstrapper.load_accounts().await.unwrap();
    (bootstrapper, accounts, board)
}

#[tokio::test]
async fn test_phases_run_in_order() {
    let ledger = Arc::new(MockLedger::new(31));
    let (bootstrapper, accounts, _) = bootstrapper(ledger.clone(), settings(10, 19)).await;

    bootstrapper.bootstrap(&accounts).await;

    let methods: Vec<&str> = ledger
        .calls()
        .iter()
        .map(Call::method)
        .filter(|method| *method != "accounts")
        .collect();

    assert_eq!(methods[0], "authorizeAppContract");
    let last_airline_call = methods
        .iter()
        .rposition(|m| *m == "registerAirline" || *m == "fundAirline")
        .unwrap();
    let first_flight_call = methods.iter().position(|m| *m == "registerFlight").unwrap();
    let last_flight_call = methods.iter().rposition(|m| *m == "registerFlight").unwrap();
    let first_fund_call = methods.iter().position(|m| *m == "fundAirline").unwrap();
    let last_register_call = methods.iter().rposition(|m| *m == "registerAirline").unwrap();
    let first_oracle_call = methods.iter().position(|m| *m == "REGISTRATION_FEE").unwrap();

    assert!(last_register_call < first_fund_call);
    assert!(last_airline_call < first_flight_call);
    assert!(last_flight_call < first_oracle_call);

    assert_eq!(ledger.calls_to("registerAirline").len(), 10);
    assert_eq!(ledger.calls_to("fundAirline").len(), 10);
    assert_eq!(ledger.calls_to("registerFlight").len(), 5);
}

#[tokio::test]
async fn test_airlines_are_sponsored_and_funded() {
    let ledger = Arc::new(MockLedger::new(31));
    let (bootstrapper, accounts, _) = bootstrapper(ledger.clone(), settings(10, 19)).await;

    bootstrapper.bootstrap(&accounts).await;

    for call in ledger.calls_to("registerAirline") {
        let Call::RegisterAirline { sponsor, .. } = call else { unreachable!() };
        assert_eq!(sponsor, account(1));
    }
    for call in ledger.calls_to("fundAirline") {
        let Call::FundAirline { stake, .. } = call else { unreachable!() };
        assert_eq!(stake, 10 * ETHER);
    }
    assert_eq!(ledger.calls_to("authorizeAppContract"), vec![Call::Authorize(account(0))]);
}

#[tokio::test]
async fn test_flights_depart_two_minutes_after_bootstrap() {
    let ledger = Arc::new(MockLedger::new(31));
    let (bootstrapper, accounts, board) = bootstrapper(ledger.clone(), settings(10, 19)).await;

    let result = bootstrapper.bootstrap(&accounts).await;

    assert_eq!(result.flights.len(), 5);
    for flight in &result.flights {
        assert!(flight.timestamp > result.started_at);
        assert!(flight.timestamp.abs_diff(result.started_at + 120) <= 1);
    }

    let codes: Vec<&str> = board.list().iter().map(|f| f.flight.as_str()).collect();
    assert_eq!(codes, vec!["OS341", "OS125", "OS912", "OS001", "OS200"]);
    assert_eq!(board.list()[0].airline, account(2));
    assert_eq!(board.list()[4].airline, account(6));
}

#[tokio::test]
async fn test_item_failures_do_not_abort_phases() {
    let unlucky = account(3);
    let ledger = Arc::new(
        MockLedger::new(31)
            .failing("authorizeAppContract", &account(0), rejected("already authorized"))
            .failing("registerAirline", &unlucky, rejected("needs more votes"))
            .failing("fundAirline", &unlucky, rejected("airline not registered"))
            .failing("registerFlight", &unlucky, rejected("airline not funded")),
    );
    let (bootstrapper, accounts, board) = bootstrapper(ledger.clone(), settings(10, 19)).await;

    let result = bootstrapper.bootstrap(&accounts).await;

    let airlines = result.phase(Phase::RegisterAirlines).unwrap();
    assert_eq!(airlines.completed(), 9);
    assert_eq!(airlines.failed(), 1);
    assert!(matches!(
        airlines.outcome_of(unlucky.as_str()),
        Some(ItemOutcome::Failed { .. })
    ));

    let funding = result.phase(Phase::FundAirlines).unwrap();
    assert_eq!(funding.failed(), 1);
    assert_eq!(ledger.calls_to("fundAirline").len(), 10);

    // The unlucky airline still gets its flight attempted, and rejected.
    let flights = result.phase(Phase::RegisterFlights).unwrap();
    assert_eq!(flights.completed(), 4);
    assert!(matches!(flights.outcome_of("OS125"), Some(ItemOutcome::Failed { .. })));
    assert_eq!(board.list().len(), 5);

    assert_eq!(result.registry.len(), 19);
}

#[tokio::test]
async fn test_flights_without_airline_accounts_are_skipped() {
    let ledger = Arc::new(MockLedger::new(31));
    let (bootstrapper, accounts, board) = bootstrapper(ledger.clone(), settings(3, 19)).await;

    let result = bootstrapper.bootstrap(&accounts).await;

    let flights = result.phase(Phase::RegisterFlights).unwrap();
    assert_eq!(flights.completed(), 3);
    assert_eq!(flights.skipped(), 2);
    assert!(matches!(flights.outcome_of("OS001"), Some(ItemOutcome::Skipped { .. })));
    assert_eq!(ledger.calls_to("registerFlight").len(), 3);
    assert_eq!(board.list().len(), 3);
    assert_eq!(result.registry.len(), 19);
}

#[tokio::test]
async fn test_query_list_empty_before_flights_registered() {
    let ledger = Arc::new(MockLedger::new(31));
    let (bootstrapper, accounts, board) = bootstrapper(ledger.clone(), settings(10, 19)).await;

    assert!(board.list().is_empty());
    bootstrapper.bootstrap(&accounts).await;
    assert_eq!(board.list().len(), 5);
}

#[tokio::test]
async fn test_too_few_accounts() {
    let ledger = Arc::new(MockLedger::new(1));
    let gateway: Arc<dyn LedgerGateway> = ledger;
    let bootstrapper = FlightRegistryBootstrapper::new(gateway, FlightBoard::new(), settings(10, 19));

    assert!(matches!(
        bootstrapper.load_accounts().await,
        Err(LedgerError::Decode(_))
    ));
}

#[tokio::test]
async fn test_pool_pays_fee_once_per_identity() {
    let fee = 3 * ETHER / 2;
    let ledger = Arc::new(MockLedger::new(31).with_fee(Ok(fee)));
    let oracles: Vec<_> = (12..31).map(account).collect();
    let manager = OraclePoolManager::new(ledger.clone());

    let (registry, summary) = manager.register_pool(&oracles).await;

    let payments = ledger.calls_to("registerOracle");
    assert_eq!(payments.len(), 19);
    for payment in payments {
        let Call::RegisterOracle { fee: paid, .. } = payment else { unreachable!() };
        assert_eq!(paid, fee);
    }
    assert_eq!(ledger.calls_to("REGISTRATION_FEE").len(), 1);
    assert_eq!(summary.completed(), 19);
    assert_eq!(registry.len(), 19);
    assert!(registry.iter().all(|identity| identity.indices().len() == 3));
}

#[tokio::test]
async fn test_pool_excludes_failed_identities() {
    let unpaid = account(13);
    let short = account(14);
    let repeated = account(15);
    let ledger = Arc::new(
        MockLedger::new(31)
            .failing("registerOracle", &unpaid, rejected("registration fee is required"))
            .with_indices(&short, vec![1, 2])
            .with_indices(&repeated, vec![4, 4, 4]),
    );
    let oracles: Vec<_> = (12..17).map(account).collect();
    let manager = OraclePoolManager::new(ledger.clone());

    let (registry, summary) = manager.register_pool(&oracles).await;

    assert_eq!(registry.len(), 2);
    let excluded = [&unpaid, &short, &repeated];
    assert!(registry.iter().all(|identity| !excluded.contains(&&identity.address)));
    assert!(registry.eligible(4).next().is_none());
    assert_eq!(summary.failed(), 3);
    assert_eq!(ledger.calls_to("registerOracle").len(), 5);
    // No index lookup for an identity whose fee payment failed.
    assert!(!ledger.calls_to("getMyIndices").contains(&Call::MyIndices(unpaid)));
}

#[tokio::test]
async fn test_pool_empty_when_fee_unreadable() {
    let ledger = Arc::new(
        MockLedger::new(31).with_fee(Err(LedgerError::Transport("connection refused".into()))),
    );
    let oracles: Vec<_> = (12..31).map(account).collect();
    let manager = OraclePoolManager::new(ledger.clone());

    let (registry, summary) = manager.register_pool(&oracles).await;

    assert!(registry.is_empty());
    assert_eq!(summary.failed(), 1);
    assert!(ledger.calls_to("registerOracle").is_empty());
}
