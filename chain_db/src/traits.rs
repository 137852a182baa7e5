// Capability traits of the chain store.
//
// Consumers name the capabilities they need instead of depending on a concrete store.
// `ChainDbTransaction` bundles all of them for code that works inside a transaction.

use core::ops::RangeInclusive;

use anyhow::Result;
use types::{
    altair::primitives::SyncCommitteePeriod,
    phase0::primitives::{CommitteeIndex, Slot, H256},
};

use crate::records::{
    Attestation, AttesterSlashing, BeaconCommittee, Block, Deposit, ProposerSlashing,
    SyncAggregate, SyncCommittee, VoluntaryExit,
};

pub trait ChainDb: Send + Sync {
    type Transaction: ChainDbTransaction;

    fn begin_transaction(&self) -> Result<Self::Transaction>;
}

/// A unit of work against the store.
///
/// Reads observe the transaction's own writes. Dropping a transaction without calling
/// [`commit`](Self::commit) discards everything written through it.
pub trait ChainDbTransaction:
    BlocksProvider
    + BlocksSetter
    + AttestationsSetter
    + ProposerSlashingsSetter
    + AttesterSlashingsSetter
    + DepositsSetter
    + VoluntaryExitsSetter
    + SyncAggregateSetter
    + BeaconCommitteesProvider
    + SyncCommitteesProvider
    + MetadataStore
    + Send
{
    fn commit(self) -> Result<()>;

    fn rollback(self);
}

pub trait BlocksProvider {
    /// Returns all blocks stored for `slot`, ordered by root.
    fn blocks_at_slot(&self, slot: Slot) -> Result<Vec<Block>>;

    fn block_by_root(&self, root: H256) -> Result<Option<Block>>;
}

pub trait BlocksSetter {
    /// Inserts or replaces the block with the same root.
    ///
    /// If `block.canonical` is `None` the flag already stored for that root is kept.
    fn set_block(&mut self, block: &Block) -> Result<()>;
}

pub trait AttestationsSetter {
    fn set_attestation(&mut self, attestation: &Attestation) -> Result<()>;

    fn set_attestations(&mut self, attestations: &[Attestation]) -> Result<()> {
        attestations
            .iter()
            .try_for_each(|attestation| self.set_attestation(attestation))
    }
}

pub trait ProposerSlashingsSetter {
    fn set_proposer_slashing(&mut self, proposer_slashing: &ProposerSlashing) -> Result<()>;
}

pub trait AttesterSlashingsSetter {
    fn set_attester_slashing(&mut self, attester_slashing: &AttesterSlashing) -> Result<()>;
}

pub trait DepositsSetter {
    fn set_deposit(&mut self, deposit: &Deposit) -> Result<()>;
}

pub trait VoluntaryExitsSetter {
    fn set_voluntary_exit(&mut self, voluntary_exit: &VoluntaryExit) -> Result<()>;
}

pub trait SyncAggregateSetter {
    fn set_sync_aggregate(&mut self, sync_aggregate: &SyncAggregate) -> Result<()>;
}

pub trait BeaconCommitteesProvider {
    fn beacon_committee_by_slot_and_index(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<Option<BeaconCommittee>>;

    /// Returns committees for all slots in `slots`, ordered by slot and index.
    fn beacon_committees(&self, slots: RangeInclusive<Slot>) -> Result<Vec<BeaconCommittee>>;
}

pub trait BeaconCommitteesSetter {
    fn set_beacon_committee(&mut self, beacon_committee: &BeaconCommittee) -> Result<()>;
}

pub trait SyncCommitteesProvider {
    fn sync_committee(&self, period: SyncCommitteePeriod) -> Result<Option<SyncCommittee>>;
}

pub trait SyncCommitteesSetter {
    fn set_sync_committee(&mut self, sync_committee: &SyncCommittee) -> Result<()>;
}

/// Opaque documents stored by name.
pub trait MetadataStore {
    fn metadata(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set_metadata(&mut self, key: &str, value: Vec<u8>) -> Result<()>;
}
