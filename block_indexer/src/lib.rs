//! Ingestion of beacon blocks into the chain store.
//!
//! [`BlockIndexer`] keeps the store in step with the chain one slot at a time. Every slot is
//! written in a single transaction together with the watermark that names it.

pub use crate::{
    context::BeaconNodeApi,
    decoder::{base_fee_per_gas, block_record, decode_block, DecodedBlock},
    error::Error,
    indexer::{activity_permit, ActivityPermit, BlockIndexer, HeadUpdateOutcome, IndexerConfig},
};

mod committees;
mod context;
mod decoder;
mod error;
mod extractors;
mod indexer;
mod watermark;

#[cfg(test)]
mod fakes;
