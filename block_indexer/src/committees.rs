// Committee lookups for attestations and sync aggregates.
//
// Both caches resolve from memory first, then from the chain store and finally from the beacon
// node. They are owned by the indexer and only touched while the activity permit is held.

use core::ops::RangeInclusive;
use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use chain_db::{BeaconCommitteesProvider, SyncCommitteesProvider};
use eth2_api::{
    BeaconCommitteesProvider as BeaconCommitteesApi, SyncCommitteeProvider as SyncCommitteeApi,
};
use helper_functions::misc;
use logging::debug_with_progress;
use prometheus_metrics::CommitteeSource;
use types::{
    altair::primitives::SyncCommitteePeriod,
    phase0::primitives::{CommitteeIndex, Slot, ValidatorIndex},
    preset::Preset,
};

use crate::{context::Context, error::Error};

pub type Committee = Arc<[ValidatorIndex]>;

// Attestations included in a block can only be for the current or the previous epoch.
const BEACON_COMMITTEE_RETENTION_EPOCHS: u64 = 2;

const SYNC_COMMITTEE_RETENTION_PERIODS: u64 = 2;

#[derive(Default)]
pub struct BeaconCommitteeCache {
    committees: BTreeMap<(Slot, CommitteeIndex), Committee>,
}

impl BeaconCommitteeCache {
    #[cfg(test)]
    fn len(&self) -> usize {
        self.committees.len()
    }

    /// Drops committees too old to be referenced by attestations in a block at `slot`.
    pub fn prune<P: Preset>(&mut self, slot: Slot) {
        let epoch = misc::compute_epoch_at_slot::<P>(slot);
        let oldest_epoch = epoch.saturating_sub(BEACON_COMMITTEE_RETENTION_EPOCHS);
        let oldest_slot = misc::compute_start_slot_at_epoch::<P>(oldest_epoch);

        self.committees = self.committees.split_off(&(oldest_slot, 0));
    }

    /// Loads every committee the store has for `slots`.
    pub fn prefetch(
        &mut self,
        store: &impl BeaconCommitteesProvider,
        slots: RangeInclusive<Slot>,
    ) -> Result<()> {
        for committee in store.beacon_committees(slots)? {
            self.committees
                .insert((committee.slot, committee.index), committee.committee.into());
        }

        Ok(())
    }

    pub async fn resolve<A: BeaconCommitteesApi>(
        &mut self,
        context: &Context<A>,
        store: &impl BeaconCommitteesProvider,
        slot: Slot,
        committee_index: CommitteeIndex,
    ) -> Result<Committee> {
        let key = (slot, committee_index);

        if let Some(committee) = self.committees.get(&key) {
            register_beacon_committee_lookup(context, CommitteeSource::Cache);
            return Ok(Arc::clone(committee));
        }

        if let Some(committee) = store.beacon_committee_by_slot_and_index(slot, committee_index)? {
            register_beacon_committee_lookup(context, CommitteeSource::Store);

            let committee = Committee::from(committee.committee);
            self.committees.insert(key, Arc::clone(&committee));
            return Ok(committee);
        }

        debug_with_progress!(
            "committee {committee_index} at slot {slot} not in store, requesting beacon node",
        );

        let committees = context
            .cancellable(context.api.beacon_committees(slot))
            .await?;

        register_beacon_committee_lookup(context, CommitteeSource::Api);

        for committee in committees {
            self.committees
                .insert((committee.slot, committee.index), committee.validators.into());
        }

        self.committees
            .get(&key)
            .map(Arc::clone)
            .ok_or_else(|| {
                Error::CommitteeNotFound {
                    slot,
                    committee_index,
                }
                .into()
            })
    }
}

/// Sync committees by period. At most the two latest periods are kept.
#[derive(Default)]
pub struct SyncCommitteeCache {
    committees: BTreeMap<SyncCommitteePeriod, Committee>,
}

impl SyncCommitteeCache {
    #[cfg(test)]
    fn contains(&self, period: SyncCommitteePeriod) -> bool {
        self.committees.contains_key(&period)
    }

    pub async fn resolve<A: SyncCommitteeApi>(
        &mut self,
        context: &Context<A>,
        store: &impl SyncCommitteesProvider,
        period: SyncCommitteePeriod,
    ) -> Result<Committee> {
        if let Some(committee) = self.committees.get(&period) {
            register_sync_committee_lookup(context, CommitteeSource::Cache);
            return Ok(Arc::clone(committee));
        }

        let committee = if let Some(committee) = store.sync_committee(period)? {
            register_sync_committee_lookup(context, CommitteeSource::Store);
            Committee::from(committee.committee)
        } else {
            debug_with_progress!(
                "sync committee for period {period} not in store, requesting beacon node",
            );

            let committee = context
                .cancellable(context.api.sync_committee(period))
                .await?;

            register_sync_committee_lookup(context, CommitteeSource::Api);
            Committee::from(committee.validators)
        };

        self.insert(period, Arc::clone(&committee));

        Ok(committee)
    }

    fn insert(&mut self, period: SyncCommitteePeriod, committee: Committee) {
        self.committees.insert(period, committee);

        if let Some(stale_period) = period.checked_sub(SYNC_COMMITTEE_RETENTION_PERIODS) {
            self.committees = self.committees.split_off(&(stale_period + 1));
        }
    }
}

fn register_beacon_committee_lookup<A>(context: &Context<A>, source: CommitteeSource) {
    if let Some(metrics) = context.metrics.as_ref() {
        metrics.register_beacon_committee_lookup(source);
    }
}

fn register_sync_committee_lookup<A>(context: &Context<A>, source: CommitteeSource) {
    if let Some(metrics) = context.metrics.as_ref() {
        metrics.register_sync_committee_lookup(source);
    }
}

#[cfg(test)]
mod tests {
    use chain_db::{
        BeaconCommittee, BeaconCommitteesSetter as _, ChainDb as _, ChainDbTransaction as _,
        ChainStore, ChainStoreTransaction,
    };
    use types::preset::Minimal;

    use crate::fakes::{beacon_committee_members, sync_committee_members, FakeBeaconNode};

    use super::*;

    #[tokio::test]
    async fn beacon_committee_comes_from_store_before_api() -> Result<()> {
        let node = FakeBeaconNode::default();
        let context = node.context();
        let store = store_with_committee(&BeaconCommittee {
            slot: 10,
            index: 1,
            committee: vec![7, 8, 9],
        })?;

        let mut cache = BeaconCommitteeCache::default();
        let committee = cache.resolve(&context, &store, 10, 1).await?;

        assert_eq!(committee.to_vec(), vec![7, 8, 9]);
        assert_eq!(node.beacon_committee_requests(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn beacon_committees_of_whole_response_are_cached() -> Result<()> {
        let node = FakeBeaconNode::default();
        let context = node.context();
        let store = ChainStore::in_memory().begin_transaction()?;

        let mut cache = BeaconCommitteeCache::default();

        let first = cache.resolve(&context, &store, 17, 0).await?;
        let second = cache.resolve(&context, &store, 17, 1).await?;
        let other_slot = cache.resolve(&context, &store, 20, 0).await?;

        assert_eq!(first.to_vec(), beacon_committee_members(17, 0));
        assert_eq!(second.to_vec(), beacon_committee_members(17, 1));
        assert_eq!(other_slot.to_vec(), beacon_committee_members(20, 0));

        // The fake beacon node returns the whole epoch at once.
        assert_eq!(node.beacon_committee_requests(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn missing_beacon_committee_is_an_error() -> Result<()> {
        let node = FakeBeaconNode::default();
        let context = node.context();
        let store = ChainStore::in_memory().begin_transaction()?;

        let error = BeaconCommitteeCache::default()
            .resolve(&context, &store, 17, 99)
            .await
            .expect_err("fake beacon node only has committees 0 and 1");

        assert_eq!(
            error.downcast_ref::<Error>(),
            Some(&Error::CommitteeNotFound {
                slot: 17,
                committee_index: 99,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn prune_keeps_two_previous_epochs() -> Result<()> {
        let node = FakeBeaconNode::default();
        let context = node.context();
        let store = ChainStore::in_memory().begin_transaction()?;

        let mut cache = BeaconCommitteeCache::default();

        // Minimal preset has 8 slots per epoch. The fake node has 2 committees per slot.
        cache.resolve(&context, &store, 9, 0).await?;
        cache.resolve(&context, &store, 17, 0).await?;

        assert_eq!(cache.len(), 32);

        cache.prune::<Minimal>(24);

        assert_eq!(cache.len(), 32);

        cache.prune::<Minimal>(32);

        assert_eq!(cache.len(), 16);

        cache.prune::<Minimal>(48);

        assert_eq!(cache.len(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn sync_committees_older_than_two_periods_are_evicted() -> Result<()> {
        let node = FakeBeaconNode::default();
        let context = node.context();
        let store = ChainStore::in_memory().begin_transaction()?;

        let mut cache = SyncCommitteeCache::default();

        for period in 1..=3 {
            cache.resolve(&context, &store, period).await?;
        }

        assert_eq!(node.sync_committee_requests(), 3);
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
        assert!(cache.contains(3));

        let second = cache.resolve(&context, &store, 2).await?;
        let third = cache.resolve(&context, &store, 3).await?;

        assert_eq!(node.sync_committee_requests(), 3);
        assert_eq!(second.to_vec(), sync_committee_members(2));
        assert_eq!(third.to_vec(), sync_committee_members(3));

        Ok(())
    }

    #[tokio::test]
    async fn cancelled_lookup_does_not_reach_beacon_node() -> Result<()> {
        let node = FakeBeaconNode::default();
        let context = node.context();
        let store = ChainStore::in_memory().begin_transaction()?;

        context.cancellation.cancel();

        let error = SyncCommitteeCache::default()
            .resolve(&context, &store, 1)
            .await
            .expect_err("lookup should be cancelled");

        assert_eq!(error.downcast_ref::<Error>(), Some(&Error::Cancelled));

        Ok(())
    }

    fn store_with_committee(committee: &BeaconCommittee) -> Result<ChainStoreTransaction> {
        let store = ChainStore::in_memory();

        let mut transaction = store.begin_transaction()?;
        transaction.set_beacon_committee(committee)?;
        transaction.commit()?;

        store.begin_transaction()
    }
}
