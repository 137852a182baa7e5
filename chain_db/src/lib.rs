pub use crate::{
    records::{
        Attestation, AttesterSlashing, BeaconCommittee, Block, BlsToExecutionChange, Deposit,
        ExecutionPayload, InclusionLocator, ProposerSlashing, SlashedAttestation, SlashedHeader,
        SyncAggregate, SyncCommittee, VoluntaryExit, Withdrawal,
    },
    store::{ChainStore, ChainStoreTransaction},
    traits::{
        AttestationsSetter, AttesterSlashingsSetter, BeaconCommitteesProvider,
        BeaconCommitteesSetter, BlocksProvider, BlocksSetter, ChainDb, ChainDbTransaction,
        DepositsSetter, MetadataStore, ProposerSlashingsSetter, SyncAggregateSetter,
        SyncCommitteesProvider, SyncCommitteesSetter, VoluntaryExitsSetter,
    },
};

mod keys;
mod records;
mod store;
mod traits;
