use std::sync::{Arc, OnceLock};

use crate::models::Flight;

/// Write-once flight list shared between the bootstrap task and the API.
///
/// Readers see nothing until [`FlightBoard::publish`] installs the complete
/// list; there is no way to observe it half filled.
#[derive(Clone, Debug, Default)]
pub struct FlightBoard {
    flights: Arc<OnceLock<Vec<Flight>>>,
}

impl FlightBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the list. Returns `false` if one was already published.
    pub fn publish(&self, flights: Vec<Flight>) -> bool {
        self.flights.set(flights).is_ok()
    }

    pub fn is_published(&self) -> bool {
        self.flights.get().is_some()
    }

    pub fn list(&self) -> &[Flight] {
        self.flights.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, predicate: impl Fn(&Flight) -> bool) -> Option<&Flight> {
        self.list().iter().find(|flight| predicate(flight))
    }
}
