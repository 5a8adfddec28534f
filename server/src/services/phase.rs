//! Structured per-item outcomes for the sequential bootstrap phases

use std::fmt;

use tracing::{info, warn};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AuthorizeContract,
    RegisterAirlines,
    FundAirlines,
    RegisterFlights,
    RegisterOracles,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AuthorizeContract => "authorize app contract",
            Phase::RegisterAirlines => "register airlines",
            Phase::FundAirlines => "fund airlines",
            Phase::RegisterFlights => "register flights",
            Phase::RegisterOracles => "register oracles",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed,
    /// Never sent to the ledger.
    Skipped { reason: String },
    /// Sent and rejected, or lost in transit.
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub items: Vec<ItemReport>,
}

impl PhaseSummary {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            items: Vec::new(),
        }
    }

    /// Record a ledger call's result against `item`.
    pub fn record(&mut self, item: impl Into<String>, result: Result<(), LedgerError>) {
        let item = item.into();
        let outcome = match result {
            Ok(()) => ItemOutcome::Completed,
            Err(err) => {
                warn!(phase = %self.phase, item = %item, error = %err, "bootstrap item failed; skipping");
                ItemOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        self.items.push(ItemReport { item, outcome });
    }

    pub fn skip(&mut self, item: impl Into<String>, reason: impl Into<String>) {
        let item = item.into();
        let reason = reason.into();
        warn!(phase = %self.phase, item = %item, reason = %reason, "bootstrap item skipped");
        self.items.push(ItemReport {
            item,
            outcome: ItemOutcome::Skipped { reason },
        });
    }

    pub fn completed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Completed))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, ItemOutcome::Skipped { .. }))
    }

    pub fn outcome_of(&self, item: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|report| report.item == item)
            .map(|report| &report.outcome)
    }

    pub fn log(&self) {
        info!(
            phase = %self.phase,
            completed = self.completed(),
            failed = self.failed(),
            skipped = self.skipped(),
            "bootstrap phase finished"
        );
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|report| pred(&report.outcome)).count()
    }
}
