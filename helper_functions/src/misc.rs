use core::ops::RangeInclusive;

use typenum::Unsigned as _;
use types::{
    altair::primitives::SyncCommitteePeriod,
    phase0::primitives::{Epoch, Slot},
    preset::Preset,
};

#[must_use]
pub const fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SlotsPerEpoch::U64
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SlotsPerEpoch::U64)
}

/// <https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/altair/validator.md#sync-committee>
#[must_use]
pub const fn sync_committee_period<P: Preset>(epoch: Epoch) -> SyncCommitteePeriod {
    epoch / P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD.get()
}

#[must_use]
pub const fn sync_committee_period_at_slot<P: Preset>(slot: Slot) -> SyncCommitteePeriod {
    sync_committee_period::<P>(compute_epoch_at_slot::<P>(slot))
}

#[must_use]
pub const fn start_of_sync_committee_period<P: Preset>(period: SyncCommitteePeriod) -> Epoch {
    period.saturating_mul(P::EPOCHS_PER_SYNC_COMMITTEE_PERIOD.get())
}

/// Returns the slots from `lookback` slots before `slot` up to and including `slot`.
#[must_use]
pub const fn trailing_slots(slot: Slot, lookback: u64) -> RangeInclusive<Slot> {
    slot.saturating_sub(lookback)..=slot
}
