use anyhow::Result;
use chain_db::{Block, BlsToExecutionChange, ExecutionPayload, InclusionLocator, Withdrawal};
use num_bigint::BigUint;
use ssz::{SszHash as _, Uint256};
use types::{
    altair::containers::SignedBeaconBlock as AltairSignedBeaconBlock,
    bellatrix::containers::SignedBeaconBlock as BellatrixSignedBeaconBlock,
    capella::containers::{
        SignedBeaconBlock as CapellaSignedBeaconBlock, Withdrawal as WireWithdrawal,
    },
    combined::{SignedBeaconBlock, VersionedSignedBeaconBlock},
    nonstandard::Phase,
    phase0::{
        containers::{BeaconBlockHeader, SignedBeaconBlock as Phase0SignedBeaconBlock},
        primitives::{Slot, H256},
    },
    preset::Preset,
    traits::PostCapellaBeaconBlockBody,
};

use crate::error::Error;

/// A block received from the beacon node along with the record stored for it.
pub struct DecodedBlock<P: Preset> {
    pub block: SignedBeaconBlock<P>,
    pub record: Block,
}

pub fn decode_block<P: Preset>(envelope: VersionedSignedBeaconBlock) -> Result<DecodedBlock<P>> {
    let block = decode_envelope(envelope)?;
    let record = block_record(&block);

    Ok(DecodedBlock { block, record })
}

fn decode_envelope<P: Preset>(envelope: VersionedSignedBeaconBlock) -> Result<SignedBeaconBlock<P>> {
    let VersionedSignedBeaconBlock { version, data } = envelope;

    let Ok(phase) = version.parse::<Phase>() else {
        return Err(Error::UnknownPhase { version }.into());
    };

    let block = match phase {
        Phase::Phase0 => serde_json::from_value::<Phase0SignedBeaconBlock<P>>(data)?.into(),
        Phase::Altair => serde_json::from_value::<AltairSignedBeaconBlock<P>>(data)?.into(),
        Phase::Bellatrix => serde_json::from_value::<BellatrixSignedBeaconBlock<P>>(data)?.into(),
        Phase::Capella => serde_json::from_value::<CapellaSignedBeaconBlock<P>>(data)?.into(),
    };

    Ok(block)
}

/// Builds the stored record of `block`.
///
/// `root` is the root of the block header, which is also the root of the unsigned block.
#[must_use]
pub fn block_record<P: Preset>(block: &SignedBeaconBlock<P>) -> Block {
    let message = block.message();
    let body = message.body();
    let body_root = body.hash_tree_root();

    let header = BeaconBlockHeader {
        slot: message.slot(),
        proposer_index: message.proposer_index(),
        parent_root: message.parent_root(),
        state_root: message.state_root(),
        body_root,
    };

    let root = header.hash_tree_root();
    let slot = header.slot;
    let eth1_data = body.eth1_data();

    let execution_payload = body.post_bellatrix().map(|body| {
        let payload = body.execution_payload();

        ExecutionPayload {
            parent_hash: payload.parent_hash(),
            fee_recipient: payload.fee_recipient(),
            state_root: payload.state_root(),
            receipts_root: payload.receipts_root(),
            logs_bloom: payload.logs_bloom().to_vec(),
            prev_randao: payload.prev_randao(),
            block_number: payload.block_number(),
            gas_limit: payload.gas_limit(),
            gas_used: payload.gas_used(),
            timestamp: payload.timestamp(),
            extra_data: payload.extra_data().to_vec(),
            base_fee_per_gas: base_fee_per_gas(payload.base_fee_per_gas()),
            block_hash: payload.block_hash(),
            withdrawals: payload
                .post_capella()
                .map(|payload| withdrawals(payload.withdrawals(), slot, root)),
        }
    });

    let bls_to_execution_changes = body
        .post_capella()
        .map(|body| bls_to_execution_changes(body, slot, root));

    Block {
        slot,
        proposer_index: header.proposer_index,
        root,
        graffiti: body.graffiti(),
        randao_reveal: body.randao_reveal().clone(),
        body_root,
        parent_root: header.parent_root,
        state_root: header.state_root,
        canonical: None,
        eth1_block_hash: eth1_data.block_hash,
        eth1_deposit_count: eth1_data.deposit_count,
        eth1_deposit_root: eth1_data.deposit_root,
        execution_payload,
        bls_to_execution_changes,
    }
}

/// Converts the little-endian wire representation to an integer.
#[must_use]
pub fn base_fee_per_gas(value: Uint256) -> BigUint {
    let mut bytes = value.to_le_bytes();
    bytes.reverse();
    BigUint::from_bytes_be(&bytes)
}

#[must_use]
pub const fn inclusion(slot: Slot, block_root: H256, index: usize) -> InclusionLocator {
    InclusionLocator {
        slot,
        block_root,
        index: index as u64,
    }
}

fn withdrawals(
    withdrawals: &[WireWithdrawal],
    slot: Slot,
    block_root: H256,
) -> Vec<Withdrawal> {
    withdrawals
        .iter()
        .enumerate()
        .map(|(index, withdrawal)| Withdrawal {
            inclusion: inclusion(slot, block_root, index),
            index: withdrawal.index,
            validator_index: withdrawal.validator_index,
            address: withdrawal.address,
            amount: withdrawal.amount,
        })
        .collect()
}

fn bls_to_execution_changes<P: Preset>(
    body: &dyn PostCapellaBeaconBlockBody<P>,
    slot: Slot,
    block_root: H256,
) -> Vec<BlsToExecutionChange> {
    body.bls_to_execution_changes()
        .iter()
        .enumerate()
        .map(|(index, signed_change)| {
            let change = &signed_change.message;

            BlsToExecutionChange {
                inclusion: inclusion(slot, block_root, index),
                validator_index: change.validator_index,
                from_bls_pubkey: change.from_bls_pubkey.clone(),
                to_execution_address: change.to_execution_address,
            }
        })
        .collect()
}
