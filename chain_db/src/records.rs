// Normalized records derived from beacon blocks.
//
// These are storage-side representations. They intentionally flatten the wire containers and do
// not depend on the preset, so a store can hold blocks from any network without type parameters.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use types::{
    altair::primitives::SyncCommitteePeriod,
    capella::primitives::WithdrawalIndex,
    phase0::primitives::{
        CommitteeIndex, DepositIndex, Epoch, ExecutionAddress, ExecutionBlockHash,
        ExecutionBlockNumber, Gas, Gwei, PublicKeyBytes, SignatureBytes, Slot, UnixSeconds,
        ValidatorIndex, H256,
    },
};

/// Position of a record inside the block that included it.
///
/// Ordering by `(slot, block_root, index)` reproduces the order of the lists in the block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Deserialize, Serialize)]
pub struct InclusionLocator {
    pub slot: Slot,
    pub block_root: H256,
    pub index: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Block {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub root: H256,
    pub graffiti: H256,
    pub randao_reveal: SignatureBytes,
    pub body_root: H256,
    pub parent_root: H256,
    pub state_root: H256,
    /// Written by the finalizer. `None` means canonicality has not been decided.
    pub canonical: Option<bool>,
    pub eth1_block_hash: ExecutionBlockHash,
    pub eth1_deposit_count: DepositIndex,
    pub eth1_deposit_root: H256,
    pub execution_payload: Option<ExecutionPayload>,
    pub bls_to_execution_changes: Option<Vec<BlsToExecutionChange>>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ExecutionPayload {
    pub parent_hash: ExecutionBlockHash,
    pub fee_recipient: ExecutionAddress,
    pub state_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Vec<u8>,
    pub prev_randao: H256,
    pub block_number: ExecutionBlockNumber,
    pub gas_limit: Gas,
    pub gas_used: Gas,
    pub timestamp: UnixSeconds,
    pub extra_data: Vec<u8>,
    pub base_fee_per_gas: BigUint,
    pub block_hash: ExecutionBlockHash,
    pub withdrawals: Option<Vec<Withdrawal>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Withdrawal {
    pub inclusion: InclusionLocator,
    pub index: WithdrawalIndex,
    pub validator_index: ValidatorIndex,
    pub address: ExecutionAddress,
    pub amount: Gwei,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BlsToExecutionChange {
    pub inclusion: InclusionLocator,
    pub validator_index: ValidatorIndex,
    pub from_bls_pubkey: PublicKeyBytes,
    pub to_execution_address: ExecutionAddress,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Attestation {
    pub inclusion: InclusionLocator,
    pub slot: Slot,
    pub committee_index: CommitteeIndex,
    pub beacon_block_root: H256,
    /// SSZ encoding of the aggregation bitlist, delimiting bit included.
    pub aggregation_bits: Vec<u8>,
    /// Empty if the bitlist length did not match the committee size.
    pub aggregation_indices: Vec<ValidatorIndex>,
    pub source_epoch: Epoch,
    pub source_root: H256,
    pub target_epoch: Epoch,
    pub target_root: H256,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SlashedHeader {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body_root: H256,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ProposerSlashing {
    pub inclusion: InclusionLocator,
    pub block_1_root: H256,
    pub header_1: SlashedHeader,
    pub block_2_root: H256,
    pub header_2: SlashedHeader,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SlashedAttestation {
    pub indices: Vec<ValidatorIndex>,
    pub slot: Slot,
    pub committee_index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source_epoch: Epoch,
    pub source_root: H256,
    pub target_epoch: Epoch,
    pub target_root: H256,
    pub signature: SignatureBytes,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct AttesterSlashing {
    pub inclusion: InclusionLocator,
    pub attestation_1: SlashedAttestation,
    pub attestation_2: SlashedAttestation,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Deposit {
    pub inclusion: InclusionLocator,
    pub validator_pubkey: PublicKeyBytes,
    pub withdrawal_credentials: H256,
    pub amount: Gwei,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct VoluntaryExit {
    pub inclusion: InclusionLocator,
    pub validator_index: ValidatorIndex,
    pub epoch: Epoch,
}

/// There is at most one sync aggregate per block, so `inclusion.index` is always 0.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SyncAggregate {
    pub inclusion: InclusionLocator,
    pub bits: Vec<u8>,
    pub indices: Vec<ValidatorIndex>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BeaconCommittee {
    pub slot: Slot,
    pub index: CommitteeIndex,
    pub committee: Vec<ValidatorIndex>,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct SyncCommittee {
    pub period: SyncCommitteePeriod,
    pub committee: Vec<ValidatorIndex>,
}
