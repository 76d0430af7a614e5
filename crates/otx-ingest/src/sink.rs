//! Writes normalized pulses to a [`PulseStore`]

use crate::store::PulseStore;
use otx_common::types::PulseRecord;
use tracing::{debug, error, warn};

/// Upserts a page of records, one at a time, through the store it was given
pub struct PulseSink<S> {
    store: S,
}

impl<S: PulseStore> PulseSink<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Upsert every record in order and return how many were written.
    ///
    /// The first store error abandons the rest of the page and the call
    /// reports 0, even if earlier records in the page were already written.
    /// Duplicate `pulse_id`s within a page are applied in order, so the last
    /// one wins.
    pub async fn upsert(&self, records: &[PulseRecord]) -> usize {
        if records.is_empty() {
            warn!("No records to insert");
            return 0;
        }

        for record in records {
            if let Err(e) = self.store.upsert_pulse(record).await {
                error!(
                    pulse_id = %record.pulse_id,
                    error = %e,
                    "Store write failed, abandoning remaining records on this page"
                );
                return 0;
            }
            debug!(pulse_id = %record.pulse_id, "Upserted pulse");
        }

        records.len()
    }
}
