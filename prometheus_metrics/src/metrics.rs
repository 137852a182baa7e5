use std::sync::Arc;

use anyhow::Result;
use log::warn;
use once_cell::sync::OnceCell;
use prometheus::{
    histogram_opts, opts, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use types::phase0::primitives::Slot;

pub static METRICS: OnceCell<Arc<Metrics>> = OnceCell::new();

/// Where a committee lookup was answered from.
#[derive(Clone, Copy, Debug)]
pub enum CommitteeSource {
    Cache,
    Store,
    Api,
}

impl CommitteeSource {
    const fn label(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Store => "store",
            Self::Api => "api",
        }
    }
}

#[derive(Debug)]
pub struct Metrics {
    // Overview
    live: IntGauge,

    // Ingestion progress
    processed_slots: IntCounter,
    latest_processed_slot: IntGauge,
    head_slot: IntGauge,
    failed_slots: IntCounter,
    pub update_slot_times: Histogram,

    // Sub-entities
    attestation_batch_fallbacks: IntCounter,
    beacon_committee_lookups: IntCounterVec,
    sync_committee_lookups: IntCounterVec,

    // Beacon Node API
    pub eth2_api_request_times: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // Overview
            live: IntGauge::new("IS_LIVE", "Indexer status")?,

            // Ingestion progress
            processed_slots: IntCounter::new(
                "INDEXER_PROCESSED_SLOTS_TOTAL",
                "Number of slots committed to the store",
            )?,

            latest_processed_slot: IntGauge::new(
                "INDEXER_LATEST_PROCESSED_SLOT",
                "Latest slot committed to the store",
            )?,

            head_slot: IntGauge::new("INDEXER_HEAD_SLOT", "Latest head slot announced by the node")?,

            failed_slots: IntCounter::new(
                "INDEXER_FAILED_SLOTS_TOTAL",
                "Number of slot updates that were rolled back",
            )?,

            update_slot_times: Histogram::with_opts(histogram_opts!(
                "INDEXER_UPDATE_SLOT_TIMES",
                "Time spent fetching, decoding and storing a single slot"
            ))?,

            // Sub-entities
            attestation_batch_fallbacks: IntCounter::new(
                "INDEXER_ATTESTATION_BATCH_FALLBACKS_TOTAL",
                "Number of blocks whose attestations had to be stored one at a time",
            )?,

            beacon_committee_lookups: IntCounterVec::new(
                opts!(
                    "INDEXER_BEACON_COMMITTEE_LOOKUPS",
                    "Number of beacon committee lookups by source"
                ),
                &["source"],
            )?,

            sync_committee_lookups: IntCounterVec::new(
                opts!(
                    "INDEXER_SYNC_COMMITTEE_LOOKUPS",
                    "Number of sync committee lookups by source"
                ),
                &["source"],
            )?,

            // Beacon Node API
            eth2_api_request_times: HistogramVec::new(
                histogram_opts!(
                    "ETH2_API_REQUEST_TIMES",
                    "Response times for Beacon Node API requests"
                ),
                &["endpoint"],
            )?,
        })
    }

    pub fn register_with_default_metrics(&self) -> Result<()> {
        let default_registry = prometheus::default_registry();

        default_registry.register(Box::new(self.live.clone()))?;
        default_registry.register(Box::new(self.processed_slots.clone()))?;
        default_registry.register(Box::new(self.latest_processed_slot.clone()))?;
        default_registry.register(Box::new(self.head_slot.clone()))?;
        default_registry.register(Box::new(self.failed_slots.clone()))?;
        default_registry.register(Box::new(self.update_slot_times.clone()))?;
        default_registry.register(Box::new(self.attestation_batch_fallbacks.clone()))?;
        default_registry.register(Box::new(self.beacon_committee_lookups.clone()))?;
        default_registry.register(Box::new(self.sync_committee_lookups.clone()))?;
        default_registry.register(Box::new(self.eth2_api_request_times.clone()))?;

        Ok(())
    }

    // Overview
    pub fn set_live(&self) {
        self.live.set(1)
    }

    // Ingestion progress
    pub fn register_processed_slot(&self, slot: Slot) {
        self.processed_slots.inc();
        self.latest_processed_slot.set(slot as i64);
    }

    pub fn set_head_slot(&self, slot: Slot) {
        self.head_slot.set(slot as i64);
    }

    pub fn register_failed_slot(&self) {
        self.failed_slots.inc();
    }

    // Sub-entities
    pub fn register_attestation_batch_fallback(&self) {
        self.attestation_batch_fallbacks.inc();
    }

    pub fn register_beacon_committee_lookup(&self, source: CommitteeSource) {
        Self::increment(&self.beacon_committee_lookups, source.label());
    }

    pub fn register_sync_committee_lookup(&self, source: CommitteeSource) {
        Self::increment(&self.sync_committee_lookups, source.label());
    }

    fn increment(counter_vec: &IntCounterVec, label: &str) {
        match counter_vec.get_metric_with_label_values(&[label]) {
            Ok(counter) => counter.inc(),
            Err(error) => warn!("unable to register {label} in {counter_vec:?}: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_slots_update_counter_and_gauge() -> Result<()> {
        let metrics = Metrics::new()?;

        metrics.register_processed_slot(100);
        metrics.register_processed_slot(101);

        assert_eq!(metrics.processed_slots.get(), 2);
        assert_eq!(metrics.latest_processed_slot.get(), 101);

        Ok(())
    }

    #[test]
    fn committee_lookups_are_counted_by_source() -> Result<()> {
        let metrics = Metrics::new()?;

        metrics.register_beacon_committee_lookup(CommitteeSource::Store);
        metrics.register_beacon_committee_lookup(CommitteeSource::Store);
        metrics.register_beacon_committee_lookup(CommitteeSource::Api);

        let store = metrics
            .beacon_committee_lookups
            .get_metric_with_label_values(&["store"])?;

        assert_eq!(store.get(), 2);

        Ok(())
    }
}
