//! Business logic services for the flight oracle server

pub mod bootstrap;
pub mod flight_board;
pub mod oracle_pool;
pub mod phase;
pub mod responder;

pub use bootstrap::{BootstrapResult, BootstrapSettings, FlightRegistryBootstrapper};
pub use flight_board::FlightBoard;
pub use oracle_pool::{OraclePoolManager, OracleRegistry};
pub use phase::{ItemOutcome, ItemReport, Phase, PhaseSummary};
pub use responder::{
    OracleResponder, RandomStatusSource, RequestReport, ResponderState, StatusSource,
    SubmissionAttempt, SubmissionOutcome,
};
