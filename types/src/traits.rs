// Capability traits over the per-phase containers.
//
// Code that only cares about a subset of fields can work with any phase through these traits and
// ask for later fields with `post_*` methods instead of matching on every variant.

use duplicate::duplicate_item;
use ssz::{ContiguousList, SszHash, Uint256};
use typenum::U1;

use crate::{
    altair::containers::{
        BeaconBlock as AltairBeaconBlock, BeaconBlockBody as AltairBeaconBlockBody, SyncAggregate,
    },
    bellatrix::containers::{
        BeaconBlock as BellatrixBeaconBlock, BeaconBlockBody as BellatrixBeaconBlockBody,
        ExecutionPayload as BellatrixExecutionPayload,
    },
    capella::containers::{
        BeaconBlock as CapellaBeaconBlock, BeaconBlockBody as CapellaBeaconBlockBody,
        ExecutionPayload as CapellaExecutionPayload, SignedBlsToExecutionChange, Withdrawal,
    },
    phase0::{
        containers::{
            Attestation, AttesterSlashing, BeaconBlock as Phase0BeaconBlock,
            BeaconBlockBody as Phase0BeaconBlockBody, BeaconBlockHeader, Deposit, Eth1Data,
            ProposerSlashing, SignedVoluntaryExit,
        },
        primitives::{
            ExecutionAddress, ExecutionBlockHash, ExecutionBlockNumber, Gas, SignatureBytes,
            Slot, UnixSeconds, ValidatorIndex, H256,
        },
    },
    preset::Preset,
};

pub trait BeaconBlock<P: Preset>: SszHash<PackingFactor = U1> {
    fn slot(&self) -> Slot;
    fn proposer_index(&self) -> ValidatorIndex;
    fn parent_root(&self) -> H256;
    fn state_root(&self) -> H256;
    fn body(&self) -> &dyn BeaconBlockBody<P>;

    fn to_header(&self) -> BeaconBlockHeader {
        BeaconBlockHeader {
            slot: self.slot(),
            proposer_index: self.proposer_index(),
            parent_root: self.parent_root(),
            state_root: self.state_root(),
            body_root: self.body().hash_tree_root(),
        }
    }
}

#[duplicate_item(
    implementor;

    [Phase0BeaconBlock<P>];
    [AltairBeaconBlock<P>];
    [BellatrixBeaconBlock<P>];
    [CapellaBeaconBlock<P>];
)]
impl<P: Preset> BeaconBlock<P> for implementor {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn proposer_index(&self) -> ValidatorIndex {
        self.proposer_index
    }

    fn parent_root(&self) -> H256 {
        self.parent_root
    }

    fn state_root(&self) -> H256 {
        self.state_root
    }

    fn body(&self) -> &dyn BeaconBlockBody<P> {
        &self.body
    }
}

pub trait BeaconBlockBody<P: Preset>: SszHash<PackingFactor = U1> {
    fn randao_reveal(&self) -> &SignatureBytes;
    fn eth1_data(&self) -> Eth1Data;
    fn graffiti(&self) -> H256;
    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings>;
    fn attester_slashings(
        &self,
    ) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings>;
    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations>;
    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits>;
    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits>;

    fn post_altair(&self) -> Option<&dyn PostAltairBeaconBlockBody<P>>;
    fn post_bellatrix(&self) -> Option<&dyn PostBellatrixBeaconBlockBody<P>>;
    fn post_capella(&self) -> Option<&dyn PostCapellaBeaconBlockBody<P>>;
}

#[duplicate_item(
    implementor                  post_altair_body post_bellatrix_body post_capella_body;

    [Phase0BeaconBlockBody<P>]    [None]           [None]              [None];
    [AltairBeaconBlockBody<P>]    [Some(self)]     [None]              [None];
    [BellatrixBeaconBlockBody<P>] [Some(self)]     [Some(self)]        [None];
    [CapellaBeaconBlockBody<P>]   [Some(self)]     [Some(self)]        [Some(self)];
)]
impl<P: Preset> BeaconBlockBody<P> for implementor {
    fn randao_reveal(&self) -> &SignatureBytes {
        &self.randao_reveal
    }

    fn eth1_data(&self) -> Eth1Data {
        self.eth1_data
    }

    fn graffiti(&self) -> H256 {
        self.graffiti
    }

    fn proposer_slashings(&self) -> &ContiguousList<ProposerSlashing, P::MaxProposerSlashings> {
        &self.proposer_slashings
    }

    fn attester_slashings(
        &self,
    ) -> &ContiguousList<AttesterSlashing<P>, P::MaxAttesterSlashings> {
        &self.attester_slashings
    }

    fn attestations(&self) -> &ContiguousList<Attestation<P>, P::MaxAttestations> {
        &self.attestations
    }

    fn deposits(&self) -> &ContiguousList<Deposit, P::MaxDeposits> {
        &self.deposits
    }

    fn voluntary_exits(&self) -> &ContiguousList<SignedVoluntaryExit, P::MaxVoluntaryExits> {
        &self.voluntary_exits
    }

    fn post_altair(&self) -> Option<&dyn PostAltairBeaconBlockBody<P>> {
        post_altair_body
    }

    fn post_bellatrix(&self) -> Option<&dyn PostBellatrixBeaconBlockBody<P>> {
        post_bellatrix_body
    }

    fn post_capella(&self) -> Option<&dyn PostCapellaBeaconBlockBody<P>> {
        post_capella_body
    }
}

pub trait PostAltairBeaconBlockBody<P: Preset>: BeaconBlockBody<P> {
    fn sync_aggregate(&self) -> &SyncAggregate<P>;
}

#[duplicate_item(
    implementor;

    [AltairBeaconBlockBody<P>];
    [BellatrixBeaconBlockBody<P>];
    [CapellaBeaconBlockBody<P>];
)]
impl<P: Preset> PostAltairBeaconBlockBody<P> for implementor {
    fn sync_aggregate(&self) -> &SyncAggregate<P> {
        &self.sync_aggregate
    }
}

pub trait PostBellatrixBeaconBlockBody<P: Preset>: PostAltairBeaconBlockBody<P> {
    fn execution_payload(&self) -> &dyn ExecutionPayload<P>;
}

#[duplicate_item(
    implementor;

    [BellatrixBeaconBlockBody<P>];
    [CapellaBeaconBlockBody<P>];
)]
impl<P: Preset> PostBellatrixBeaconBlockBody<P> for implementor {
    fn execution_payload(&self) -> &dyn ExecutionPayload<P> {
        &self.execution_payload
    }
}

pub trait PostCapellaBeaconBlockBody<P: Preset>: PostBellatrixBeaconBlockBody<P> {
    fn bls_to_execution_changes(
        &self,
    ) -> &ContiguousList<SignedBlsToExecutionChange, P::MaxBlsToExecutionChanges>;
}

impl<P: Preset> PostCapellaBeaconBlockBody<P> for CapellaBeaconBlockBody<P> {
    fn bls_to_execution_changes(
        &self,
    ) -> &ContiguousList<SignedBlsToExecutionChange, P::MaxBlsToExecutionChanges> {
        &self.bls_to_execution_changes
    }
}

pub trait ExecutionPayload<P: Preset>: SszHash<PackingFactor = U1> {
    fn parent_hash(&self) -> ExecutionBlockHash;
    fn fee_recipient(&self) -> ExecutionAddress;
    fn state_root(&self) -> H256;
    fn receipts_root(&self) -> H256;
    fn logs_bloom(&self) -> &[u8];
    fn prev_randao(&self) -> H256;
    fn block_number(&self) -> ExecutionBlockNumber;
    fn gas_limit(&self) -> Gas;
    fn gas_used(&self) -> Gas;
    fn timestamp(&self) -> UnixSeconds;
    fn extra_data(&self) -> &[u8];
    fn base_fee_per_gas(&self) -> Uint256;
    fn block_hash(&self) -> ExecutionBlockHash;
    fn transactions_count(&self) -> usize;

    fn post_capella(&self) -> Option<&dyn PostCapellaExecutionPayload<P>>;
}

#[duplicate_item(
    implementor                    post_capella_payload;

    [BellatrixExecutionPayload<P>] [None];
    [CapellaExecutionPayload<P>]   [Some(self)];
)]
impl<P: Preset> ExecutionPayload<P> for implementor {
    fn parent_hash(&self) -> ExecutionBlockHash {
        self.parent_hash
    }

    fn fee_recipient(&self) -> ExecutionAddress {
        self.fee_recipient
    }

    fn state_root(&self) -> H256 {
        self.state_root
    }

    fn receipts_root(&self) -> H256 {
        self.receipts_root
    }

    fn logs_bloom(&self) -> &[u8] {
        &self.logs_bloom
    }

    fn prev_randao(&self) -> H256 {
        self.prev_randao
    }

    fn block_number(&self) -> ExecutionBlockNumber {
        self.block_number
    }

    fn gas_limit(&self) -> Gas {
        self.gas_limit
    }

    fn gas_used(&self) -> Gas {
        self.gas_used
    }

    fn timestamp(&self) -> UnixSeconds {
        self.timestamp
    }

    fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    fn base_fee_per_gas(&self) -> Uint256 {
        self.base_fee_per_gas
    }

    fn block_hash(&self) -> ExecutionBlockHash {
        self.block_hash
    }

    fn transactions_count(&self) -> usize {
        self.transactions.len()
    }

    fn post_capella(&self) -> Option<&dyn PostCapellaExecutionPayload<P>> {
        post_capella_payload
    }
}

pub trait PostCapellaExecutionPayload<P: Preset>: ExecutionPayload<P> {
    fn withdrawals(&self) -> &ContiguousList<Withdrawal, P::MaxWithdrawalsPerPayload>;
}

impl<P: Preset> PostCapellaExecutionPayload<P> for CapellaExecutionPayload<P> {
    fn withdrawals(&self) -> &ContiguousList<Withdrawal, P::MaxWithdrawalsPerPayload> {
        &self.withdrawals
    }
}
