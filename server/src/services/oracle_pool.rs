//! Oracle pool registration and the read-only registry handed to the responder

use std::sync::Arc;

use tracing::{error, info};

use super::phase::{Phase, PhaseSummary};
use crate::error::LedgerError;
use crate::ledger::LedgerGateway;
use crate::models::{Address, OracleIdentity, Wei};

/// Registered oracles, immutable once built and cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct OracleRegistry {
    identities: Arc<[OracleIdentity]>,
}

impl OracleRegistry {
    pub fn new(identities: Vec<OracleIdentity>) -> Self {
        Self {
            identities: identities.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OracleIdentity> {
        self.identities.iter()
    }

    /// Every identity assigned `index`, in registration order.
    pub fn eligible(&self, index: u8) -> impl Iterator<Item = &OracleIdentity> {
        self.identities
            .iter()
            .filter(move |identity| identity.answers(index))
    }
}

pub struct OraclePoolManager {
    ledger: Arc<dyn LedgerGateway>,
}

impl OraclePoolManager {
    pub fn new(ledger: Arc<dyn LedgerGateway>) -> Self {
        Self { ledger }
    }

    /// Read the ledger's registration fee, then register every candidate.
    pub async fn register_pool(&self, candidates: &[Address]) -> (OracleRegistry, PhaseSummary) {
        match self.ledger.registration_fee().await {
            Ok(fee) => self.register_pool_with_fee(candidates, fee).await,
            Err(err) => {
                error!(error = %err, "could not read oracle registration fee; oracle pool left empty");
                let mut summary = PhaseSummary::new(Phase::RegisterOracles);
                summary.record("REGISTRATION_FEE", Err(err));
                (OracleRegistry::default(), summary)
            }
        }
    }

    /// Pay `fee` for each candidate and fetch its indices. A candidate that
    /// fails either step is left out of the registry; the rest carry on.
    pub async fn register_pool_with_fee(
        &self,
        candidates: &[Address],
        fee: Wei,
    ) -> (OracleRegistry, PhaseSummary) {
        let mut summary = PhaseSummary::new(Phase::RegisterOracles);
        let mut identities = Vec::with_capacity(candidates.len());

        for oracle in candidates {
            match self.register_one(oracle, fee).await {
                Ok(identity) => {
                    info!(oracle = %oracle, indices = ?identity.indices(), "oracle registered");
                    identities.push(identity);
                    summary.record(oracle.to_string(), Ok(()));
                }
                Err(err) => summary.record(oracle.to_string(), Err(err)),
            }
        }

        let registry = OracleRegistry::new(identities);
        info!(registered = registry.len(), candidates = candidates.len(), fee = %fee, "oracle pool ready");
        (registry, summary)
    }

    async fn register_one(&self, oracle: &Address, fee: Wei) -> Result<OracleIdentity, LedgerError> {
        self.ledger.register_oracle(oracle, fee).await?;
        let indices = self.ledger.my_indices(oracle).await?;
        OracleIdentity::new(oracle.clone(), indices)
    }
}
