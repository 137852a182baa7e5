use thiserror::Error;
use types::{
    altair::primitives::SyncCommitteePeriod,
    phase0::primitives::{CommitteeIndex, Slot},
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("unknown block version {version}")]
    UnknownPhase { version: String },
    #[error("committee {committee_index} at slot {slot} not found in cache, store or beacon node")]
    CommitteeNotFound {
        slot: Slot,
        committee_index: CommitteeIndex,
    },
    #[error(
        "sync committee for period {period} has {committee_size} members \
         but bit {bit_index} is set in sync aggregate"
    )]
    SyncCommitteeTooSmall {
        period: SyncCommitteePeriod,
        committee_size: usize,
        bit_index: usize,
    },
    #[error("ingestion cancelled")]
    Cancelled,
}
