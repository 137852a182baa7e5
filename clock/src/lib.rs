//! Chain time derived from the genesis time and `SECONDS_PER_SLOT`.
//!
//! Slot boundaries are produced by a [`tokio::time::Interval`] anchored to the start of the next
//! slot. `Instant`s are opaque, so the anchor is computed by pairing `Instant::now()` with
//! `SystemTime::now()` and assuming they refer to the same moment.

use core::{marker::PhantomData, time::Duration};
use std::{
    sync::Arc,
    time::{Instant, SystemTime},
};

use anyhow::Result;
use futures::stream::{Stream, StreamExt as _};
use helper_functions::misc;
use thiserror::Error;
use tokio_stream::wrappers::IntervalStream;
use types::{
    altair::primitives::SyncCommitteePeriod,
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Epoch, Slot, UnixSeconds},
    },
    preset::Preset,
};

/// Source of the current slot.
///
/// Implemented by [`SlotClock`] in production. Tests substitute a clock with a fixed slot.
pub trait ChainTime<P: Preset>: Send + Sync {
    fn current_slot(&self) -> Result<Slot>;

    fn current_epoch(&self) -> Result<Epoch> {
        self.current_slot().map(misc::compute_epoch_at_slot::<P>)
    }

    fn slot_to_sync_committee_period(&self, slot: Slot) -> SyncCommitteePeriod {
        misc::sync_committee_period_at_slot::<P>(slot)
    }
}

pub struct SlotClock<P: Preset> {
    config: Arc<Config>,
    genesis_time: UnixSeconds,
    phantom: PhantomData<P>,
}

impl<P: Preset> ChainTime<P> for SlotClock<P> {
    fn current_slot(&self) -> Result<Slot> {
        let unix_epoch_to_now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
        Ok(slot_at(&self.config, unix_epoch_to_now, self.genesis_time))
    }
}

impl<P: Preset> SlotClock<P> {
    #[must_use]
    pub const fn new(config: Arc<Config>, genesis_time: UnixSeconds) -> Self {
        Self {
            config,
            genesis_time,
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub const fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    /// Returns a stream that yields every slot number as the slot starts.
    ///
    /// If called in the middle of a slot, the first item is the next slot.
    pub fn slots(&self) -> Result<impl Stream<Item = Result<Slot>> + use<P>> {
        let now_instant = Instant::now();
        let unix_epoch_to_now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;

        let (mut next_slot, now_to_next_slot) =
            next_slot_start(&self.config, unix_epoch_to_now, self.genesis_time)?;

        let next_instant = now_instant
            .checked_add(now_to_next_slot)
            .ok_or(ClockError::InstantOutOfRange)?;

        let interval = tokio::time::interval_at(next_instant.into(), slot_duration(&self.config));

        Ok(IntervalStream::new(interval).map(move |_| -> Result<Slot> {
            let current_slot = next_slot;
            next_slot = current_slot
                .checked_add(1)
                .ok_or(ClockError::RanOutOfSlots)?;
            Ok(current_slot)
        }))
    }
}

#[derive(Debug, Error)]
enum ClockError {
    #[error("ran out of slots")]
    RanOutOfSlots,
    #[error("start of next slot cannot be represented as an Instant")]
    InstantOutOfRange,
}

/// Computes the slot in progress at `unix_epoch_to_now`.
///
/// Times before genesis map to the genesis slot.
#[must_use]
pub fn slot_at(config: &Config, unix_epoch_to_now: Duration, genesis_time: UnixSeconds) -> Slot {
    let genesis_to_now = unix_epoch_to_now.saturating_sub(Duration::from_secs(genesis_time));
    let slots_since_genesis = genesis_to_now.as_secs() / config.seconds_per_slot.get();
    GENESIS_SLOT + slots_since_genesis
}

// Returns the next slot to start and the time remaining until it does.
fn next_slot_start(
    config: &Config,
    unix_epoch_to_now: Duration,
    genesis_time: UnixSeconds,
) -> Result<(Slot, Duration)> {
    let unix_epoch_to_genesis = Duration::from_secs(genesis_time);

    if unix_epoch_to_now <= unix_epoch_to_genesis {
        return Ok((GENESIS_SLOT, unix_epoch_to_genesis - unix_epoch_to_now));
    }

    let current_slot = slot_at(config, unix_epoch_to_now, genesis_time);
    let next_slot = current_slot
        .checked_add(1)
        .ok_or(ClockError::RanOutOfSlots)?;

    let slots_until_next = (next_slot - GENESIS_SLOT).try_into()?;
    let genesis_to_next_slot = slot_duration(config).saturating_mul(slots_until_next);
    let unix_epoch_to_next_slot = unix_epoch_to_genesis + genesis_to_next_slot;

    Ok((next_slot, unix_epoch_to_next_slot - unix_epoch_to_now))
}

const fn slot_duration(config: &Config) -> Duration {
    Duration::from_secs(config.seconds_per_slot.get())
}
