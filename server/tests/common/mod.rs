//! Scripted in-memory ledger shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use flight_oracle_server::error::LedgerError;
use flight_oracle_server::ledger::{EventSubscription, LedgerEvent, LedgerGateway};
use flight_oracle_server::models::{Address, StatusResponseSubmission, Wei, ETHER};

pub fn account(n: u8) -> Address {
    Address::parse(&format!("0x{}", hex::encode([n; 20]))).unwrap()
}

pub fn rejected(message: &str) -> LedgerError {
    LedgerError::Rejected {
        code: -32000,
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Accounts,
    Authorize(Address),
    RegisterAirline { sponsor: Address, airline: Address },
    FundAirline { airline: Address, stake: Wei },
    RegisterFlight { airline: Address, flight: String, timestamp: u64 },
    FetchStatus { requester: Address, airline: Address, flight: String, timestamp: u64 },
    RegistrationFee,
    RegisterOracle { oracle: Address, fee: Wei },
    MyIndices(Address),
    Submit { oracle: Address, submission: StatusResponseSubmission },
    Subscribe,
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::Accounts => "accounts",
            Call::Authorize(_) => "authorizeAppContract",
            Call::RegisterAirline { .. } => "registerAirline",
            Call::FundAirline { .. } => "fundAirline",
            Call::RegisterFlight { .. } => "registerFlight",
            Call::FetchStatus { .. } => "fetchFlightStatus",
            Call::RegistrationFee => "REGISTRATION_FEE",
            Call::RegisterOracle { .. } => "registerOracle",
            Call::MyIndices(_) => "getMyIndices",
            Call::Submit { .. } => "submitOracleResponse",
            Call::Subscribe => "subscribe",
        }
    }
}

/// Ledger double. Calls are recorded in order; failures are scripted per
/// `(method, account)`; submissions for the same request are accepted until
/// the quorum is met and refused with `QuorumReached` afterwards.
pub struct MockLedger {
    accounts: Vec<Address>,
    fee: Result<Wei, LedgerError>,
    indices: HashMap<Address, Vec<u8>>,
    failures: HashMap<(&'static str, Address), LedgerError>,
    quorum: usize,
    accepted: Mutex<HashMap<(u8, String, u64), usize>>,
    calls: Mutex<Vec<Call>>,
    subscriptions: Mutex<VecDeque<mpsc::Receiver<LedgerEvent>>>,
}

impl MockLedger {
    /// `account_count` accounts named `account(0)..account(n-1)`.
    pub fn new(account_count: u8) -> Self {
        Self {
            accounts: (0..account_count).map(account).collect(),
            fee: Ok(ETHER),
            indices: HashMap::new(),
            failures: HashMap::new(),
            quorum: usize::MAX,
            accepted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_fee(mut self, fee: Result<Wei, LedgerError>) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_indices(mut self, oracle: &Address, indices: Vec<u8>) -> Self {
        self.indices.insert(oracle.clone(), indices);
        self
    }

    pub fn failing(mut self, method: &'static str, who: &Address, err: LedgerError) -> Self {
        self.failures.insert((method, who.clone()), err);
        self
    }

    pub fn with_quorum(mut self, quorum: usize) -> Self {
        self.quorum = quorum;
        self
    }

    /// Queue an event feed for the next `subscribe` call.
    pub fn feed(&self) -> mpsc::Sender<LedgerEvent> {
        let (tx, rx) = mpsc::channel(64);
        self.subscriptions.lock().unwrap().push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method() == method)
            .collect()
    }

    pub fn submissions(&self) -> Vec<(Address, StatusResponseSubmission)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Submit { oracle, submission } => Some((oracle, submission)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), LedgerError> {
        let method = call.method();
        let who = match &call {
            Call::Authorize(who) | Call::MyIndices(who) => Some(who.clone()),
            Call::RegisterAirline { airline, .. } => Some(airline.clone()),
            Call::FundAirline { airline, .. } | Call::RegisterFlight { airline, .. } => {
                Some(airline.clone())
            }
            Call::FetchStatus { requester, .. } => Some(requester.clone()),
            Call::RegisterOracle { oracle, .. } | Call::Submit { oracle, .. } => Some(oracle.clone()),
            _ => None,
        };
        self.calls.lock().unwrap().push(call);

        match who.and_then(|who| self.failures.get(&(method, who))) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.record(Call::Accounts)?;
        Ok(self.accounts.clone())
    }

    async fn authorize_app_contract(&self, owner: &Address) -> Result<(), LedgerError> {
        self.record(Call::Authorize(owner.clone()))
    }

    async fn register_airline(&self, sponsor: &Address, airline: &Address) -> Result<(), LedgerError> {
        self.record(Call::RegisterAirline {
            sponsor: sponsor.clone(),
            airline: airline.clone(),
        })
    }

    async fn fund_airline(&self, airline: &Address, stake: Wei) -> Result<(), LedgerError> {
        self.record(Call::FundAirline {
            airline: airline.clone(),
            stake,
        })
    }

    async fn register_flight(
        &self,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<(), LedgerError> {
        self.record(Call::RegisterFlight {
            airline: airline.clone(),
            flight: flight.to_string(),
            timestamp,
        })
    }

    async fn fetch_flight_status(
        &self,
        requester: &Address,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<(), LedgerError> {
        self.record(Call::FetchStatus {
            requester: requester.clone(),
            airline: airline.clone(),
            flight: flight.to_string(),
            timestamp,
        })
    }

    async fn registration_fee(&self) -> Result<Wei, LedgerError> {
        self.record(Call::RegistrationFee)?;
        self.fee.clone()
    }

    async fn register_oracle(&self, oracle: &Address, fee: Wei) -> Result<(), LedgerError> {
        self.record(Call::RegisterOracle {
            oracle: oracle.clone(),
            fee,
        })
    }

    async fn my_indices(&self, oracle: &Address) -> Result<Vec<u8>, LedgerError> {
        self.record(Call::MyIndices(oracle.clone()))?;
        Ok(self.indices.get(oracle).cloned().unwrap_or_else(|| vec![0, 1, 2]))
    }

    async fn submit_oracle_response(
        &self,
        oracle: &Address,
        response: &StatusResponseSubmission,
    ) -> Result<(), LedgerError> {
        self.record(Call::Submit {
            oracle: oracle.clone(),
            submission: response.clone(),
        })?;

        let key = (response.index, response.flight.clone(), response.timestamp);
        let mut accepted = self.accepted.lock().unwrap();
        let count = accepted.entry(key).or_insert(0);
        if *count >= self.quorum {
            return Err(LedgerError::QuorumReached);
        }
        *count += 1;
        Ok(())
    }

    async fn subscribe(&self) -> Result<EventSubscription, LedgerError> {
        self.record(Call::Subscribe)?;
        match self.subscriptions.lock().unwrap().pop_front() {
            Some(rx) => Ok(EventSubscription::from_receiver(rx)),
            None => Err(LedgerError::Transport("no event feed queued".to_string())),
        }
    }
}
