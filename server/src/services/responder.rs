//! Oracle consensus responder
//!
//! Listens for `OracleRequest` events and answers each one from every
//! registered oracle holding the requested index. Quorum is the ledger's
//! business: a submission refused because enough matching answers already
//! arrived is an expected outcome, not an error.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::oracle_pool::OracleRegistry;
use crate::error::LedgerError;
use crate::ledger::{EventSubscription, LedgerEvent, LedgerGateway};
use crate::models::{Address, StatusCode, StatusRequestEvent, StatusResponseSubmission};

const RESUBSCRIBE_MAX_BACKOFF_SECONDS: u64 = 30;

/// Where oracles get the status they vote for.
pub trait StatusSource: Send + Sync {
    fn draw(&self) -> StatusCode;
}

/// Uniform draw over every status code.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomStatusSource;

impl StatusSource for RandomStatusSource {
    fn draw(&self) -> StatusCode {
        StatusCode::ALL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(StatusCode::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    Starting,
    Listening,
    Responding,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted,
    /// The ledger already had enough matching responses.
    QuorumReached,
    Failed(LedgerError),
}

#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    pub oracle: Address,
    pub status: StatusCode,
    pub outcome: SubmissionOutcome,
}

/// Everything that happened while answering one request.
#[derive(Debug, Clone)]
pub struct RequestReport {
    pub request: StatusRequestEvent,
    pub attempts: Vec<SubmissionAttempt>,
}

impl RequestReport {
    pub fn accepted(&self) -> usize {
        self.count(|outcome| matches!(outcome, SubmissionOutcome::Accepted))
    }

    pub fn quorum_reached(&self) -> usize {
        self.count(|outcome| matches!(outcome, SubmissionOutcome::QuorumReached))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, SubmissionOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&SubmissionOutcome) -> bool) -> usize {
        self.attempts.iter().filter(|attempt| pred(&attempt.outcome)).count()
    }
}

pub struct OracleResponder {
    ledger: Arc<dyn LedgerGateway>,
    registry: OracleRegistry,
    statuses: Arc<dyn StatusSource>,
    state: watch::Sender<ResponderState>,
}

impl OracleResponder {
    pub fn new(ledger: Arc<dyn LedgerGateway>, registry: OracleRegistry) -> Self {
        Self::with_status_source(ledger, registry, Arc::new(RandomStatusSource))
    }

    pub fn with_status_source(
        ledger: Arc<dyn LedgerGateway>,
        registry: OracleRegistry,
        statuses: Arc<dyn StatusSource>,
    ) -> Self {
        let (state, _) = watch::channel(ResponderState::Starting);
        Self {
            ledger,
            registry,
            statuses,
            state,
        }
    }

    pub fn state(&self) -> ResponderState {
        *self.state.borrow()
    }

    fn enter(&self, next: ResponderState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = ?previous, to = ?next, "oracle responder state");
        }
    }

    /// Listen forever, resubscribing with backoff whenever the feed ends or
    /// cannot be opened.
    pub async fn run(&self) {
        info!(oracles = self.registry.len(), "oracle responder starting");
        let mut consecutive_failures: u32 = 0;

        loop {
            self.enter(ResponderState::Starting);
            match self.ledger.subscribe().await {
                Ok(mut subscription) => {
                    consecutive_failures = 0;
                    let handled = self.drain(&mut subscription).await;
                    warn!(handled, "ledger event feed ended; resubscribing");
                }
                Err(err) => error!(error = %err, "could not subscribe to ledger events"),
            }

            consecutive_failures = consecutive_failures.saturating_add(1);
            let backoff = resubscribe_backoff(consecutive_failures);
            debug!(backoff_seconds = backoff.as_secs(), "waiting before resubscribing");
            sleep(backoff).await;
        }
    }

    /// Handle events until the subscription ends. Returns how many events
    /// were consumed.
    pub async fn drain(&self, subscription: &mut EventSubscription) -> usize {
        self.enter(ResponderState::Listening);
        let mut handled = 0;
        while let Some(event) = subscription.next().await {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    pub async fn handle_event(&self, event: LedgerEvent) -> Option<RequestReport> {
        match event {
            LedgerEvent::OracleRequest(request) => Some(self.handle_request(&request).await),
            LedgerEvent::FlightStatusInfo(finalized) => {
                let status = StatusCode::try_from(finalized.status)
                    .map(|status| status.to_string())
                    .unwrap_or_else(|_| finalized.status.to_string());
                info!(
                    airline = %finalized.airline,
                    requester = %finalized.requester,
                    flight = %finalized.flight,
                    timestamp = finalized.timestamp,
                    status = %status,
                    "flight status finalized"
                );
                None
            }
            LedgerEvent::StreamError(reason) => {
                warn!(reason = %reason, "ledger event stream error");
                None
            }
        }
    }

    /// Answer one request from every eligible oracle. Each submission is
    /// attempted regardless of how the previous ones fared.
    pub async fn handle_request(&self, request: &StatusRequestEvent) -> RequestReport {
        self.enter(ResponderState::Responding);
        let mut attempts = Vec::new();

        for identity in self.registry.eligible(request.index) {
            let status = self.statuses.draw();
            let submission = StatusResponseSubmission::answer(request, status);

            let outcome = match self
                .ledger
                .submit_oracle_response(&identity.address, &submission)
                .await
            {
                Ok(()) => {
                    info!(oracle = %identity.address, flight = %request.flight, status = %status, "oracle response accepted");
                    SubmissionOutcome::Accepted
                }
                Err(err) if err.is_quorum_reached() => {
                    info!(oracle = %identity.address, flight = %request.flight, "quorum already reached; response not needed");
                    SubmissionOutcome::QuorumReached
                }
                Err(err) => {
                    warn!(oracle = %identity.address, flight = %request.flight, error = %err, "oracle response lost");
                    SubmissionOutcome::Failed(err)
                }
            };

            attempts.push(SubmissionAttempt {
                oracle: identity.address.clone(),
                status,
                outcome,
            });
        }

        let report = RequestReport {
            request: request.clone(),
            attempts,
        };

        info!(
            index = request.index,
            airline = %request.airline,
            flight = %request.flight,
            attempted = report.attempts.len(),
            accepted = report.accepted(),
            quorum_reached = report.quorum_reached(),
            failed = report.failed(),
            "oracle request handled"
        );

        self.enter(ResponderState::Listening);
        report
    }
}

fn resubscribe_backoff(consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(5);
    Duration::from_secs(2u64.saturating_pow(exponent).min(RESUBSCRIBE_MAX_BACKOFF_SECONDS))
}
