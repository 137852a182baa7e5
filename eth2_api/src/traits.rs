use anyhow::Result;
use async_trait::async_trait;
use types::{
    altair::primitives::SyncCommitteePeriod, combined::VersionedSignedBeaconBlock,
    phase0::primitives::Slot,
};

use crate::containers::{BeaconCommittee, SyncCommittee};

#[async_trait]
pub trait SignedBeaconBlockProvider: Send + Sync {
    /// Returns `None` if no block was proposed in `slot`.
    async fn signed_beacon_block(&self, slot: Slot) -> Result<Option<VersionedSignedBeaconBlock>>;
}

#[async_trait]
pub trait BeaconCommitteesProvider: Send + Sync {
    /// Returns all committees of the epoch containing `slot`.
    async fn beacon_committees(&self, slot: Slot) -> Result<Vec<BeaconCommittee>>;
}

#[async_trait]
pub trait SyncCommitteeProvider: Send + Sync {
    async fn sync_committee(&self, period: SyncCommitteePeriod) -> Result<SyncCommittee>;
}
