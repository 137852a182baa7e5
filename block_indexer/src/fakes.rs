// Collaborators for tests: a scripted beacon node, a fixed clock and a chain store that records
// committed sub-entities and can be told to fail.

use core::{
    ops::RangeInclusive,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chain_db::{
    Attestation, AttestationsSetter, AttesterSlashing, AttesterSlashingsSetter,
    BeaconCommittee as StoredBeaconCommittee, BeaconCommitteesProvider, Block, BlocksProvider,
    BlocksSetter, ChainDb, ChainDbTransaction, ChainStore, ChainStoreTransaction, Deposit,
    DepositsSetter, MetadataStore, ProposerSlashing, ProposerSlashingsSetter, SyncAggregate,
    SyncAggregateSetter, SyncCommittee as StoredSyncCommittee, SyncCommitteesProvider,
    VoluntaryExit, VoluntaryExitsSetter,
};
use clock::ChainTime;
use eth2_api::{
    BeaconCommittee, BeaconCommitteesProvider as BeaconCommitteesApi, SignedBeaconBlockProvider,
    SyncCommittee, SyncCommitteeProvider,
};
use helper_functions::misc;
use ssz::BitList;
use tokio_util::sync::CancellationToken;
use types::{
    altair::primitives::SyncCommitteePeriod,
    capella::containers::{
        BeaconBlock as CapellaBeaconBlock, SignedBeaconBlock as CapellaSignedBeaconBlock,
    },
    combined::{SignedBeaconBlock, VersionedSignedBeaconBlock},
    phase0::{
        containers::{
            Attestation as WireAttestation, AttestationData, AttesterSlashing as WireAttesterSlashing,
            BeaconBlock as Phase0BeaconBlock, BeaconBlockHeader, Deposit as WireDeposit,
            DepositData, IndexedAttestation, ProposerSlashing as WireProposerSlashing, SignedBeaconBlockHeader,
            SignedBeaconBlock as Phase0SignedBeaconBlock, SignedVoluntaryExit,
            VoluntaryExit as WireVoluntaryExit,
        },
        primitives::{CommitteeIndex, Slot, ValidatorIndex, H256},
    },
    preset::Minimal,
};

use crate::context::Context;

pub const BEACON_COMMITTEE_SIZE: usize = 4;
pub const COMMITTEES_PER_SLOT: u64 = 2;

// Minimal preset.
const SYNC_COMMITTEE_SIZE: u64 = 32;

#[must_use]
pub fn beacon_committee_members(slot: Slot, index: CommitteeIndex) -> Vec<ValidatorIndex> {
    (0..)
        .take(BEACON_COMMITTEE_SIZE)
        .map(|position: u64| slot * 100 + index * 10 + position)
        .collect()
}

#[must_use]
pub fn sync_committee_members(period: SyncCommitteePeriod) -> Vec<ValidatorIndex> {
    (0..SYNC_COMMITTEE_SIZE)
        .map(|position| period * 1000 + position)
        .collect()
}

#[derive(Clone, Default)]
pub struct FakeBeaconNode {
    inner: Arc<FakeBeaconNodeInner>,
}

#[derive(Default)]
struct FakeBeaconNodeInner {
    blocks: Mutex<BTreeMap<Slot, VersionedSignedBeaconBlock>>,
    unavailable_slots: Mutex<BTreeSet<Slot>>,
    block_requests: AtomicUsize,
    beacon_committee_requests: AtomicUsize,
    sync_committee_requests: AtomicUsize,
}

impl FakeBeaconNode {
    pub fn with_blocks(blocks: impl IntoIterator<Item = SignedBeaconBlock<Minimal>>) -> Result<Self> {
        let node = Self::default();

        for block in blocks {
            node.add_block(&block)?;
        }

        Ok(node)
    }

    pub fn add_block(&self, block: &SignedBeaconBlock<Minimal>) -> Result<()> {
        let envelope = VersionedSignedBeaconBlock::new(block)?;

        self.inner
            .blocks
            .lock()
            .expect("fake beacon node mutex should not be poisoned")
            .insert(block.slot(), envelope);

        Ok(())
    }

    pub fn add_envelope(&self, slot: Slot, envelope: VersionedSignedBeaconBlock) {
        self.inner
            .blocks
            .lock()
            .expect("fake beacon node mutex should not be poisoned")
            .insert(slot, envelope);
    }

    pub fn make_unavailable(&self, slot: Slot) {
        self.inner
            .unavailable_slots
            .lock()
            .expect("fake beacon node mutex should not be poisoned")
            .insert(slot);
    }

    pub fn make_available(&self, slot: Slot) {
        self.inner
            .unavailable_slots
            .lock()
            .expect("fake beacon node mutex should not be poisoned")
            .remove(&slot);
    }

    pub fn context(&self) -> Context<Self> {
        Context {
            api: Arc::new(self.clone()),
            metrics: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn block_requests(&self) -> usize {
        self.inner.block_requests.load(Ordering::SeqCst)
    }

    pub fn beacon_committee_requests(&self) -> usize {
        self.inner.beacon_committee_requests.load(Ordering::SeqCst)
    }

    pub fn sync_committee_requests(&self) -> usize {
        self.inner.sync_committee_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignedBeaconBlockProvider for FakeBeaconNode {
    async fn signed_beacon_block(&self, slot: Slot) -> Result<Option<VersionedSignedBeaconBlock>> {
        // Lets other tasks run in the middle of a catch-up like a real request would.
        tokio::task::yield_now().await;

        self.inner.block_requests.fetch_add(1, Ordering::SeqCst);

        let unavailable = self
            .inner
            .unavailable_slots
            .lock()
            .expect("fake beacon node mutex should not be poisoned")
            .contains(&slot);

        if unavailable {
            bail!("beacon node unavailable at slot {slot}");
        }

        Ok(self
            .inner
            .blocks
            .lock()
            .expect("fake beacon node mutex should not be poisoned")
            .get(&slot)
            .cloned())
    }
}

#[async_trait]
impl BeaconCommitteesApi for FakeBeaconNode {
    async fn beacon_committees(&self, slot: Slot) -> Result<Vec<BeaconCommittee>> {
        self.inner
            .beacon_committee_requests
            .fetch_add(1, Ordering::SeqCst);

        let epoch = misc::compute_epoch_at_slot::<Minimal>(slot);
        let start_slot = misc::compute_start_slot_at_epoch::<Minimal>(epoch);
        let end_slot = misc::compute_start_slot_at_epoch::<Minimal>(epoch + 1);

        Ok((start_slot..end_slot)
            .flat_map(|slot| {
                (0..COMMITTEES_PER_SLOT).map(move |index| BeaconCommittee {
                    index,
                    slot,
                    validators: beacon_committee_members(slot, index),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SyncCommitteeProvider for FakeBeaconNode {
    async fn sync_committee(&self, period: SyncCommitteePeriod) -> Result<SyncCommittee> {
        self.inner
            .sync_committee_requests
            .fetch_add(1, Ordering::SeqCst);

        Ok(SyncCommittee {
            validators: sync_committee_members(period),
        })
    }
}

pub struct FixedClock {
    slot: AtomicU64,
}

impl FixedClock {
    pub fn new(slot: Slot) -> Arc<Self> {
        Arc::new(Self {
            slot: AtomicU64::new(slot),
        })
    }

    pub fn set_slot(&self, slot: Slot) {
        self.slot.store(slot, Ordering::SeqCst);
    }
}

impl ChainTime<Minimal> for FixedClock {
    fn current_slot(&self) -> Result<Slot> {
        Ok(self.slot.load(Ordering::SeqCst))
    }
}

pub fn phase0_block(slot: Slot) -> SignedBeaconBlock<Minimal> {
    let mut message = Phase0BeaconBlock::<Minimal> {
        slot,
        proposer_index: slot % 7,
        parent_root: H256::from_low_u64_be(slot.saturating_sub(1)),
        state_root: H256::repeat_byte(0x11),
        ..Phase0BeaconBlock::default()
    };

    message.body.graffiti = H256::from_low_u64_be(slot);

    Phase0SignedBeaconBlock {
        message,
        ..Phase0SignedBeaconBlock::default()
    }
    .into()
}

pub fn capella_block(slot: Slot) -> SignedBeaconBlock<Minimal> {
    let mut message = CapellaBeaconBlock::<Minimal> {
        slot,
        proposer_index: slot % 7,
        parent_root: H256::from_low_u64_be(slot.saturating_sub(1)),
        state_root: H256::repeat_byte(0x22),
        ..CapellaBeaconBlock::default()
    };

    message.body.graffiti = H256::from_low_u64_be(slot);
    message.body.execution_payload.block_number = slot;

    CapellaSignedBeaconBlock {
        message,
        ..CapellaSignedBeaconBlock::default()
    }
    .into()
}

pub fn attestation(
    slot: Slot,
    index: CommitteeIndex,
    bit_count: usize,
    set_bits: &[usize],
) -> Result<WireAttestation<Minimal>> {
    let mut aggregation_bits = BitList::with_length(bit_count)?;

    for bit in set_bits {
        aggregation_bits.set(*bit, true);
    }

    Ok(WireAttestation {
        aggregation_bits,
        data: AttestationData {
            slot,
            index,
            beacon_block_root: H256::from_low_u64_be(slot),
            ..AttestationData::default()
        },
        ..WireAttestation::default()
    })
}

/// A capella block at `slot` with one operation of every kind.
///
/// Attestations are for committees 0 and 1 of the previous slot. Sync committee bits 0 and 5 are
/// set.
pub fn full_capella_block(slot: Slot) -> Result<SignedBeaconBlock<Minimal>> {
    let mut block = CapellaSignedBeaconBlock::<Minimal> {
        message: CapellaBeaconBlock {
            slot,
            proposer_index: slot % 7,
            parent_root: H256::from_low_u64_be(slot.saturating_sub(1)),
            ..CapellaBeaconBlock::default()
        },
        ..CapellaSignedBeaconBlock::default()
    };

    let body = &mut block.message.body;
    let attested_slot = slot.saturating_sub(1);

    body.graffiti = H256::from_low_u64_be(slot);

    body.attestations = vec![
        attestation(attested_slot, 0, BEACON_COMMITTEE_SIZE, &[0, 2])?,
        attestation(attested_slot, 1, BEACON_COMMITTEE_SIZE, &[3])?,
    ]
    .try_into()?;

    body.proposer_slashings = vec![WireProposerSlashing {
        signed_header_1: SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                slot: attested_slot,
                proposer_index: 3,
                body_root: H256::repeat_byte(1),
                ..BeaconBlockHeader::default()
            },
            ..SignedBeaconBlockHeader::default()
        },
        signed_header_2: SignedBeaconBlockHeader {
            message: BeaconBlockHeader {
                slot: attested_slot,
                proposer_index: 3,
                body_root: H256::repeat_byte(2),
                ..BeaconBlockHeader::default()
            },
            ..SignedBeaconBlockHeader::default()
        },
    }]
    .try_into()?;

    body.attester_slashings = vec![WireAttesterSlashing {
        attestation_1: IndexedAttestation {
            attesting_indices: vec![4, 5].try_into()?,
            ..IndexedAttestation::default()
        },
        attestation_2: IndexedAttestation {
            attesting_indices: vec![5, 6].try_into()?,
            ..IndexedAttestation::default()
        },
    }]
    .try_into()?;

    body.deposits = vec![WireDeposit {
        data: DepositData {
            withdrawal_credentials: H256::repeat_byte(0xcc),
            amount: 32_000_000_000,
            ..DepositData::default()
        },
        ..WireDeposit::default()
    }]
    .try_into()?;

    body.voluntary_exits = vec![SignedVoluntaryExit {
        message: WireVoluntaryExit {
            epoch: 2,
            validator_index: 9,
        },
        ..SignedVoluntaryExit::default()
    }]
    .try_into()?;

    body.sync_aggregate.sync_committee_bits.set(0, true);
    body.sync_aggregate.sync_committee_bits.set(5, true);

    Ok(block.into())
}

/// Sub-entities written by committed transactions.
#[derive(Default)]
pub struct Records {
    pub attestations: Vec<Attestation>,
    pub proposer_slashings: Vec<ProposerSlashing>,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub deposits: Vec<Deposit>,
    pub voluntary_exits: Vec<VoluntaryExit>,
    pub sync_aggregates: Vec<SyncAggregate>,
}

impl Records {
    fn append(&mut self, other: &mut Self) {
        self.attestations.append(&mut other.attestations);
        self.proposer_slashings.append(&mut other.proposer_slashings);
        self.attester_slashings.append(&mut other.attester_slashings);
        self.deposits.append(&mut other.deposits);
        self.voluntary_exits.append(&mut other.voluntary_exits);
        self.sync_aggregates.append(&mut other.sync_aggregates);
    }
}

#[derive(Clone, Copy, Default)]
pub struct Faults {
    pub attestation_batches: bool,
    pub deposits: bool,
}

/// [`ChainStore`] that keeps a copy of committed sub-entities and fails the writes named in
/// [`Faults`].
#[derive(Clone)]
pub struct RecordingStore {
    store: ChainStore,
    faults: Faults,
    committed: Arc<Mutex<Records>>,
}

impl Default for RecordingStore {
    fn default() -> Self {
        Self::with_faults(Faults::default())
    }
}

impl RecordingStore {
    pub fn with_faults(faults: Faults) -> Self {
        Self {
            store: ChainStore::in_memory(),
            faults,
            committed: Arc::default(),
        }
    }

    pub const fn chain_store(&self) -> &ChainStore {
        &self.store
    }

    pub fn committed(&self) -> MutexGuard<'_, Records> {
        self.committed
            .lock()
            .expect("recording store mutex should not be poisoned")
    }
}

impl ChainDb for RecordingStore {
    type Transaction = RecordingTransaction;

    fn begin_transaction(&self) -> Result<Self::Transaction> {
        Ok(RecordingTransaction {
            transaction: self.store.begin_transaction()?,
            faults: self.faults,
            pending: Records::default(),
            committed: Arc::clone(&self.committed),
        })
    }
}

pub struct RecordingTransaction {
    transaction: ChainStoreTransaction,
    faults: Faults,
    pending: Records,
    committed: Arc<Mutex<Records>>,
}

impl ChainDbTransaction for RecordingTransaction {
    fn commit(mut self) -> Result<()> {
        self.transaction.commit()?;

        self.committed
            .lock()
            .expect("recording store mutex should not be poisoned")
            .append(&mut self.pending);

        Ok(())
    }

    fn rollback(self) {
        self.transaction.rollback();
    }
}

impl BlocksProvider for RecordingTransaction {
    fn blocks_at_slot(&self, slot: Slot) -> Result<Vec<Block>> {
        self.transaction.blocks_at_slot(slot)
    }

    fn block_by_root(&self, root: H256) -> Result<Option<Block>> {
        self.transaction.block_by_root(root)
    }
}

impl BlocksSetter for RecordingTransaction {
    fn set_block(&mut self, block: &Block) -> Result<()> {
        self.transaction.set_block(block)
    }
}

impl AttestationsSetter for RecordingTransaction {
    fn set_attestation(&mut self, attestation: &Attestation) -> Result<()> {
        self.transaction.set_attestation(attestation)?;
        self.pending.attestations.push(attestation.clone());
        Ok(())
    }

    fn set_attestations(&mut self, attestations: &[Attestation]) -> Result<()> {
        if self.faults.attestation_batches {
            bail!("batch insert rejected");
        }

        self.transaction.set_attestations(attestations)?;
        self.pending.attestations.extend_from_slice(attestations);
        Ok(())
    }
}

impl ProposerSlashingsSetter for RecordingTransaction {
    fn set_proposer_slashing(&mut self, proposer_slashing: &ProposerSlashing) -> Result<()> {
        self.transaction.set_proposer_slashing(proposer_slashing)?;
        self.pending.proposer_slashings.push(proposer_slashing.clone());
        Ok(())
    }
}

impl AttesterSlashingsSetter for RecordingTransaction {
    fn set_attester_slashing(&mut self, attester_slashing: &AttesterSlashing) -> Result<()> {
        self.transaction.set_attester_slashing(attester_slashing)?;
        self.pending.attester_slashings.push(attester_slashing.clone());
        Ok(())
    }
}

impl DepositsSetter for RecordingTransaction {
    fn set_deposit(&mut self, deposit: &Deposit) -> Result<()> {
        if self.faults.deposits {
            bail!("deposit insert rejected");
        }

        self.transaction.set_deposit(deposit)?;
        self.pending.deposits.push(deposit.clone());
        Ok(())
    }
}

impl VoluntaryExitsSetter for RecordingTransaction {
    fn set_voluntary_exit(&mut self, voluntary_exit: &VoluntaryExit) -> Result<()> {
        self.transaction.set_voluntary_exit(voluntary_exit)?;
        self.pending.voluntary_exits.push(*voluntary_exit);
        Ok(())
    }
}

impl SyncAggregateSetter for RecordingTransaction {
    fn set_sync_aggregate(&mut self, sync_aggregate: &SyncAggregate) -> Result<()> {
        self.transaction.set_sync_aggregate(sync_aggregate)?;
        self.pending.sync_aggregates.push(sync_aggregate.clone());
        Ok(())
    }
}

impl BeaconCommitteesProvider for RecordingTransaction {
    fn beacon_committee_by_slot_and_index(
        &self,
        slot: Slot,
        index: CommitteeIndex,
    ) -> Result<Option<StoredBeaconCommittee>> {
        self.transaction
            .beacon_committee_by_slot_and_index(slot, index)
    }

    fn beacon_committees(&self, slots: RangeInclusive<Slot>) -> Result<Vec<StoredBeaconCommittee>> {
        self.transaction.beacon_committees(slots)
    }
}

impl SyncCommitteesProvider for RecordingTransaction {
    fn sync_committee(&self, period: SyncCommitteePeriod) -> Result<Option<StoredSyncCommittee>> {
        self.transaction.sync_committee(period)
    }
}

impl MetadataStore for RecordingTransaction {
    fn metadata(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.transaction.metadata(key)
    }

    fn set_metadata(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.transaction.set_metadata(key, value)
    }
}
