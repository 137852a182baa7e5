use core::{fmt::Display, ops::RangeInclusive};
use std::sync::Arc;

use anyhow::Result;
use database::{Database, Transaction};
use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use types::{
    altair::primitives::SyncCommitteePeriod,
    phase0::primitives::{CommitteeIndex, Slot, H256},
};

use crate::{
    keys::{
        BeaconCommitteeBySlotAndIndex, BeaconCommitteeSlotStart, BlockByRoot, BlockRootBySlot,
        Included, Metadata, SlotStart, SyncCommitteeByPeriod, ATTESTATION_PREFIX,
        ATTESTER_SLASHING_PREFIX, DEPOSIT_PREFIX, PROPOSER_SLASHING_PREFIX, SYNC_AGGREGATE_PREFIX,
        VOLUNTARY_EXIT_PREFIX,
    },
    records::{
        Attestation, AttesterSlashing, BeaconCommittee, Block, Deposit, ProposerSlashing,
        SyncAggregate, SyncCommittee, VoluntaryExit,
    },
    traits::{
        AttestationsSetter, AttesterSlashingsSetter, BeaconCommitteesProvider,
        BeaconCommitteesSetter, BlocksProvider, BlocksSetter, ChainDb, ChainDbTransaction,
        DepositsSetter, MetadataStore, ProposerSlashingsSetter, SyncAggregateSetter,
        SyncCommitteesProvider, SyncCommitteesSetter, VoluntaryExitsSetter,
    },
};

/// [`ChainDb`] backed by a key-value [`Database`]. Values are `bincode`-encoded records.
#[derive(Clone)]
pub struct ChainStore {
    database: Arc<Database>,
}

impl ChainStore {
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            database: Arc::new(database),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Database::in_memory())
    }
}

impl ChainDb for ChainStore {
    type Transaction = ChainStoreTransaction;

    fn begin_transaction(&self) -> Result<Self::Transaction> {
        Ok(ChainStoreTransaction {
            transaction: Transaction::new(Arc::clone(&self.database)),
        })
    }
}

pub struct ChainStoreTransaction {
    transaction: Transaction,
}

impl ChainDbTransaction for ChainStoreTransaction {
    fn commit(self) -> Result<()> {
        self.transaction.commit()
    }

    fn rollback(self) {
        if !self.transaction.is_empty() {
            debug!("discarding uncommitted chain store writes");
        }
    }
}

impl BlocksProvider for ChainStoreTransaction {
    fn blocks_at_slot(&self, slot: Slot) -> Result<Vec<Block>> {
        let start = SlotStart(slot).to_string();
        let end = SlotStart(slot.saturating_add(1)).to_string();

        self.transaction
            .iterator_ascending(start..end)?
            .map(|(_, value)| -> Result<Block> {
                let root = bincode::deserialize(&value)?;
                let block = self
                    .block_by_root(root)?
                    .ok_or(Error::DanglingSlotIndex { slot, root })?;

                Ok(block)
            })
            .collect()
    }

    fn block_by_root(&self, root: H256) -> Result<Option<Block>> {
        self.get(BlockByRoot(root))
    }
}

impl BlocksSetter for ChainStoreTransaction {
    fn set_block(&mut self, block: &Block) -> Result<()> {
        if block.canonical.is_none() {
            let stored_canonical = self
                .block_by_root(block.root)?
                .and_then(|stored| stored.canonical);

            if let Some(canonical) = stored_canonical {
                let block = Block {
                    canonical: Some(canonical),
                    ..block.clone()
                };

                return self.put_block(&block);
            }
        }

        self.put_block(block)
    }
}

impl AttestationsSetter for ChainStoreTransaction {
    fn set_attestation(&mut self, attestation: &Attestation) -> Result<()> {
        self.put(Included(ATTESTATION_PREFIX, attestation.inclusion), attestation)
    }
}

impl ProposerSlashingsSetter for ChainStoreTransaction {
    fn set_proposer_slashing(&mut self, proposer_slashing: &ProposerSlashing) -> Result<()> {
        self.put(
            Included(PROPOSER_SLASHING_PREFIX, proposer_slashing.inclusion),
            proposer_slashing,
        )
    }
}

impl AttesterSlashingsSetter for ChainStoreTransaction {
    fn set_attester_slashing(&mut self, attester_slashing: &AttesterSlashing) -> Result<()> {
        self.put(
            Included(ATTESTER_SLASHING_PREFIX, attester_slashing.inclusion),
            attester_slashing,
        )
    }
}

impl DepositsSetter for ChainStoreTransaction {
    fn set_deposit(&mut self, deposit: &Deposit) -> Result<()> {
        self.put(Included(DEPOSIT_PREFIX, deposit.inclusion), deposit)
    }
}

impl VoluntaryExitsSetter for ChainStoreTransaction {
    fn set_voluntary_exit(&mut self, voluntary_exit: &VoluntaryExit) -> Result<()> {
        self.put(
            Included(VOLUNTARY_EXIT_PREFIX, voluntary_exit.inclusion),
            voluntary_exit,
        )
    }
}

impl SyncAggregateSetter for ChainStoreTransaction {
    fn set_sync_aggregate(&mut self, sync_aggregate: &SyncAggregate) -> Result<()> {
        self.put(
            Included(SYNC_AGGREGATE_PREFIX, sync_aggregate.inclusion),
            sync_aggregate,
        )
    }
}

impl BeaconCommitteesProvider for ChainStoreTransaction {
    fn beacon_committee_by_slot_and_index(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<Option<BeaconCommittee>> {
        self.get(BeaconCommitteeBySlotAndIndex(slot, index))
    }

    fn beacon_committees(&self, slots: RangeInclusive<Slot>) -> Result<Vec<BeaconCommittee>> {
        if slots.is_empty() {
            return Ok(vec![]);
        }

        let start = BeaconCommitteeSlotStart(*slots.start()).to_string();
        let end = BeaconCommitteeSlotStart(slots.end().saturating_add(1)).to_string();

        self.transaction
            .iterator_ascending(start..end)?
            .map(|(_, value)| -> Result<BeaconCommittee> { Ok(bincode::deserialize(&value)?) })
            .collect()
    }
}

impl BeaconCommitteesSetter for ChainStoreTransaction {
    fn set_beacon_committee(&mut self, beacon_committee: &BeaconCommittee) -> Result<()> {
        self.put(
            BeaconCommitteeBySlotAndIndex(beacon_committee.slot, beacon_committee.index),
            beacon_committee,
        )
    }
}

impl SyncCommitteesProvider for ChainStoreTransaction {
    fn sync_committee(&self, period: SyncCommitteePeriod) -> Result<Option<SyncCommittee>> {
        self.get(SyncCommitteeByPeriod(period))
    }
}

impl SyncCommitteesSetter for ChainStoreTransaction {
    fn set_sync_committee(&mut self, sync_committee: &SyncCommittee) -> Result<()> {
        self.put(SyncCommitteeByPeriod(sync_committee.period), sync_committee)
    }
}

impl MetadataStore for ChainStoreTransaction {
    fn metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.transaction.get(Metadata(key).to_string())
    }

    fn set_metadata(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.transaction.put(Metadata(key).to_string(), value);
        Ok(())
    }
}

impl ChainStoreTransaction {
    fn put_block(&mut self, block: &Block) -> Result<()> {
        self.put(BlockByRoot(block.root), block)?;
        self.put(BlockRootBySlot(block.slot, block.root), &block.root)
    }

    fn get<V: DeserializeOwned>(&self, key: impl Display) -> Result<Option<V>> {
        let Some(bytes) = self.transaction.get(key.to_string())? else {
            return Ok(None);
        };

        Ok(Some(bincode::deserialize(&bytes)?))
    }

    fn put(&mut self, key: impl Display, value: &impl Serialize) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.transaction.put(key.to_string(), bytes);
        Ok(())
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("slot {slot} is indexed to block {root:?}, which is not stored")]
    DanglingSlotIndex { slot: Slot, root: H256 },
}
