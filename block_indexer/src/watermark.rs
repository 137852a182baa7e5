// The watermark is the latest slot whose data is fully stored.
//
// It is kept as a JSON document in the metadata of the chain store and must only be written in
// the same transaction as the data of the slot it names.

use anyhow::Result;
use chain_db::MetadataStore;
use serde::{Deserialize, Serialize};
use types::phase0::primitives::Slot;

const METADATA_KEY: &str = "blocks.standard";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
struct Metadata {
    // -1 before the first slot is processed.
    latest_slot: i64,
}

/// Returns `None` if no slot has been processed yet.
pub fn latest_slot(store: &impl MetadataStore) -> Result<Option<Slot>> {
    let Some(bytes) = store.metadata(METADATA_KEY)? else {
        return Ok(None);
    };

    let metadata = serde_json::from_slice::<Metadata>(&bytes)?;

    if metadata.latest_slot < 0 {
        return Ok(None);
    }

    Ok(Some(metadata.latest_slot.try_into()?))
}

pub fn set_latest_slot(store: &mut impl MetadataStore, slot: Slot) -> Result<()> {
    let metadata = Metadata {
        latest_slot: slot.try_into()?,
    };

    store.set_metadata(METADATA_KEY, serde_json::to_vec(&metadata)?)
}
