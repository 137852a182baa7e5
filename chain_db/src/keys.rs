// Keys are formatted so that lexicographic order matches numeric order.
// Slots and indices are zero-padded to the width of `u64::MAX`.

use derive_more::Display;
use types::{
    altair::primitives::SyncCommitteePeriod,
    phase0::primitives::{CommitteeIndex, Slot, H256},
};

use crate::records::InclusionLocator;

pub trait PrefixableKey {
    const PREFIX: &'static str;
}

#[derive(Display)]
#[display("{}{_0:x}", Self::PREFIX)]
pub struct BlockByRoot(pub H256);

impl PrefixableKey for BlockByRoot {
    const PREFIX: &'static str = "b";
}

#[derive(Display)]
#[display("{}{_0:020}{_1:x}", Self::PREFIX)]
pub struct BlockRootBySlot(pub Slot, pub H256);

impl PrefixableKey for BlockRootBySlot {
    const PREFIX: &'static str = "r";
}

/// The first key of a slot. Every `BlockRootBySlot` key of that slot sorts after it.
#[derive(Display)]
#[display("{}{_0:020}", BlockRootBySlot::PREFIX)]
pub struct SlotStart(pub Slot);

#[derive(Display)]
#[display("{}{:020}{:x}{:020}", _0, _1.slot, _1.block_root, _1.index)]
pub struct Included(pub &'static str, pub InclusionLocator);

pub const ATTESTATION_PREFIX: &str = "a";
pub const PROPOSER_SLASHING_PREFIX: &str = "p";
pub const ATTESTER_SLASHING_PREFIX: &str = "q";
pub const DEPOSIT_PREFIX: &str = "d";
pub const VOLUNTARY_EXIT_PREFIX: &str = "v";
pub const SYNC_AGGREGATE_PREFIX: &str = "y";

#[derive(Display)]
#[display("{}{_0:020}{_1:020}", Self::PREFIX)]
pub struct BeaconCommitteeBySlotAndIndex(pub Slot, pub CommitteeIndex);

impl PrefixableKey for BeaconCommitteeBySlotAndIndex {
    const PREFIX: &'static str = "c";
}

#[derive(Display)]
#[display("{}{_0:020}", BeaconCommitteeBySlotAndIndex::PREFIX)]
pub struct BeaconCommitteeSlotStart(pub Slot);

#[derive(Display)]
#[display("{}{_0:020}", Self::PREFIX)]
pub struct SyncCommitteeByPeriod(pub SyncCommitteePeriod);

impl PrefixableKey for SyncCommitteeByPeriod {
    const PREFIX: &'static str = "s";
}

#[derive(Display)]
#[display("{}{_0}", Self::PREFIX)]
pub struct Metadata<'key>(pub &'key str);

impl PrefixableKey for Metadata<'_> {
    const PREFIX: &'static str = "m";
}
