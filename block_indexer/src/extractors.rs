// Records derived from the operations included in a block.
//
// Every record is keyed by the slot and root of the including block and its position in the
// list it came from. Any failure to store a record fails the whole slot.

use anyhow::{Context as _, Error as AnyhowError, Result};
use chain_db::{
    Attestation, AttestationsSetter as _, AttesterSlashing, AttesterSlashingsSetter as _, Block,
    ChainDbTransaction, Deposit, DepositsSetter as _, ProposerSlashing,
    ProposerSlashingsSetter as _, SlashedAttestation, SlashedHeader, SyncAggregate,
    SyncAggregateSetter as _, VoluntaryExit, VoluntaryExitsSetter as _,
};
use eth2_api::{
    BeaconCommitteesProvider as BeaconCommitteesApi, SyncCommitteeProvider as SyncCommitteeApi,
};
use helper_functions::misc;
use logging::{debug_with_progress, warn_with_progress};
use ssz::SszHash as _;
use types::{
    altair::primitives::SyncCommitteePeriod,
    combined::SignedBeaconBlock,
    phase0::{
        containers::{IndexedAttestation, SignedBeaconBlockHeader},
        primitives::ValidatorIndex,
    },
    preset::Preset,
};

use crate::{
    committees::{BeaconCommitteeCache, SyncCommitteeCache},
    context::Context,
    decoder,
    error::Error,
};

// Committees for attestations from recent slots are loaded from the store in one query.
const ATTESTATION_PREFETCH_SLOTS: u64 = 5;

pub async fn store_attestations<P: Preset, A: BeaconCommitteesApi>(
    context: &Context<A>,
    committees: &mut BeaconCommitteeCache,
    transaction: &mut impl ChainDbTransaction,
    block: &SignedBeaconBlock<P>,
    record: &Block,
) -> Result<()> {
    let wire_attestations = block.message().body().attestations();

    if wire_attestations.is_empty() {
        return Ok(());
    }

    committees.prune::<P>(record.slot);
    committees.prefetch(
        &*transaction,
        misc::trailing_slots(record.slot, ATTESTATION_PREFETCH_SLOTS),
    )?;

    let mut attestations = Vec::with_capacity(wire_attestations.len());

    for (index, attestation) in wire_attestations.iter().enumerate() {
        let data = attestation.data;

        let committee = committees
            .resolve(context, &*transaction, data.slot, data.index)
            .await?;

        let bits = &attestation.aggregation_bits;

        let aggregation_indices = if bits.len() == committee.len() {
            committee
                .iter()
                .zip(bits.iter().by_vals())
                .filter(|(_, participated)| *participated)
                .map(|(validator_index, _)| *validator_index)
                .collect()
        } else {
            warn_with_progress!(
                "attestation {index} in block {:?} has {} aggregation bits \
                 but committee {} at slot {} has {} members",
                record.root,
                bits.len(),
                data.index,
                data.slot,
                committee.len(),
            );

            vec![]
        };

        attestations.push(Attestation {
            inclusion: decoder::inclusion(record.slot, record.root, index),
            slot: data.slot,
            committee_index: data.index,
            beacon_block_root: data.beacon_block_root,
            aggregation_bits: bits.to_ssz_bytes(),
            aggregation_indices,
            source_epoch: data.source.epoch,
            source_root: data.source.root,
            target_epoch: data.target.epoch,
            target_root: data.target.root,
        });
    }

    if let Err(error) = transaction.set_attestations(&attestations) {
        debug_with_progress!(
            "failed to store attestations of block {:?} in one batch, \
             storing them one at a time: {error:?}",
            record.root,
        );

        if let Some(metrics) = context.metrics.as_ref() {
            metrics.register_attestation_batch_fallback();
        }

        for attestation in &attestations {
            transaction
                .set_attestation(attestation)
                .context("failed to set attestation")?;
        }
    }

    Ok(())
}

pub fn store_proposer_slashings<P: Preset>(
    transaction: &mut impl ChainDbTransaction,
    block: &SignedBeaconBlock<P>,
    record: &Block,
) -> Result<()> {
    for (index, proposer_slashing) in block
        .message()
        .body()
        .proposer_slashings()
        .iter()
        .enumerate()
    {
        let signed_header_1 = &proposer_slashing.signed_header_1;
        let signed_header_2 = &proposer_slashing.signed_header_2;

        transaction.set_proposer_slashing(&ProposerSlashing {
            inclusion: decoder::inclusion(record.slot, record.root, index),
            block_1_root: signed_header_1.message.hash_tree_root(),
            header_1: slashed_header(signed_header_1),
            block_2_root: signed_header_2.message.hash_tree_root(),
            header_2: slashed_header(signed_header_2),
        })?;
    }

    Ok(())
}

pub fn store_attester_slashings<P: Preset>(
    transaction: &mut impl ChainDbTransaction,
    block: &SignedBeaconBlock<P>,
    record: &Block,
) -> Result<()> {
    for (index, attester_slashing) in block
        .message()
        .body()
        .attester_slashings()
        .iter()
        .enumerate()
    {
        transaction.set_attester_slashing(&AttesterSlashing {
            inclusion: decoder::inclusion(record.slot, record.root, index),
            attestation_1: slashed_attestation(&attester_slashing.attestation_1),
            attestation_2: slashed_attestation(&attester_slashing.attestation_2),
        })?;
    }

    Ok(())
}

pub fn store_deposits<P: Preset>(
    transaction: &mut impl ChainDbTransaction,
    block: &SignedBeaconBlock<P>,
    record: &Block,
) -> Result<()> {
    for (index, deposit) in block.message().body().deposits().iter().enumerate() {
        transaction.set_deposit(&Deposit {
            inclusion: decoder::inclusion(record.slot, record.root, index),
            validator_pubkey: deposit.data.pubkey.clone(),
            withdrawal_credentials: deposit.data.withdrawal_credentials,
            amount: deposit.data.amount,
        })?;
    }

    Ok(())
}

pub fn store_voluntary_exits<P: Preset>(
    transaction: &mut impl ChainDbTransaction,
    block: &SignedBeaconBlock<P>,
    record: &Block,
) -> Result<()> {
    for (index, signed_voluntary_exit) in block.message().body().voluntary_exits().iter().enumerate()
    {
        let voluntary_exit = signed_voluntary_exit.message;

        transaction.set_voluntary_exit(&VoluntaryExit {
            inclusion: decoder::inclusion(record.slot, record.root, index),
            validator_index: voluntary_exit.validator_index,
            epoch: voluntary_exit.epoch,
        })?;
    }

    Ok(())
}

/// Does nothing for phase 0 blocks.
pub async fn store_sync_aggregate<P: Preset, A: SyncCommitteeApi>(
    context: &Context<A>,
    committees: &mut SyncCommitteeCache,
    transaction: &mut impl ChainDbTransaction,
    block: &SignedBeaconBlock<P>,
    record: &Block,
    period: SyncCommitteePeriod,
) -> Result<()> {
    let Some(body) = block.message().body().post_altair() else {
        return Ok(());
    };

    let bits = &body.sync_aggregate().sync_committee_bits;
    let committee = committees.resolve(context, &*transaction, period).await?;

    let indices = bits
        .iter()
        .by_vals()
        .enumerate()
        .filter(|(_, participated)| *participated)
        .map(|(bit_index, _)| {
            committee.get(bit_index).copied().ok_or_else(|| {
                AnyhowError::new(Error::SyncCommitteeTooSmall {
                    period,
                    committee_size: committee.len(),
                    bit_index,
                })
            })
        })
        .collect::<Result<Vec<ValidatorIndex>>>()?;

    transaction.set_sync_aggregate(&SyncAggregate {
        inclusion: decoder::inclusion(record.slot, record.root, 0),
        bits: bits.as_bytes().to_vec(),
        indices,
    })
}

fn slashed_header(signed_header: &SignedBeaconBlockHeader) -> SlashedHeader {
    let header = signed_header.message;

    SlashedHeader {
        slot: header.slot,
        proposer_index: header.proposer_index,
        parent_root: header.parent_root,
        state_root: header.state_root,
        body_root: header.body_root,
        signature: signed_header.signature.clone(),
    }
}

fn slashed_attestation<P: Preset>(attestation: &IndexedAttestation<P>) -> SlashedAttestation {
    let data = attestation.data;

    SlashedAttestation {
        indices: attestation.attesting_indices.to_vec(),
        slot: data.slot,
        committee_index: data.index,
        beacon_block_root: data.beacon_block_root,
        source_epoch: data.source.epoch,
        source_root: data.source.root,
        target_epoch: data.target.epoch,
        target_root: data.target.root,
        signature: attestation.signature.clone(),
    }
}
