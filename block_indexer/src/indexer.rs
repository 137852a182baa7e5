use core::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chain_db::{BlocksProvider as _, BlocksSetter as _, ChainDb, ChainDbTransaction};
use clock::ChainTime;
use eth2_api::SignedBeaconBlockProvider as _;
use logging::{
    debug_with_progress, info_with_progress, warn_with_progress, INGESTION_PROGRESS,
};
use prometheus_metrics::Metrics;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use types::{
    combined::VersionedSignedBeaconBlock,
    config::Config,
    phase0::{
        consts::GENESIS_SLOT,
        primitives::{Slot, H256},
    },
    preset::Preset,
};

use crate::{
    committees::{BeaconCommitteeCache, SyncCommitteeCache},
    context::{BeaconNodeApi, Context},
    decoder::{self, DecodedBlock},
    extractors, watermark,
};

/// Permit that allows at most one of the indexer and its sibling processes to write at a time.
///
/// Clones share the same permit.
pub type ActivityPermit = Arc<Semaphore>;

#[must_use]
pub fn activity_permit() -> ActivityPermit {
    Arc::new(Semaphore::new(1))
}

#[derive(Clone, Copy, Default, Debug)]
pub struct IndexerConfig {
    /// Fetch and store blocks again even if the store already has a block for the slot.
    pub refetch: bool,
    /// First slot to process in a store that has not reached it yet.
    pub start_slot: Option<Slot>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HeadUpdateOutcome {
    /// The activity permit was held by someone else. Nothing was done.
    Busy,
    /// The head was the same as the last one handled. Nothing was done.
    AlreadyHandled,
    CaughtUp,
    /// Catch-up stopped at a slot that could not be processed.
    /// The watermark stays at the last slot that was.
    Failed,
}

// State that survives between runs. Only accessed while the activity permit is held.
#[derive(Default)]
struct State {
    last_handled_block_root: Option<H256>,
    sync_committees: SyncCommitteeCache,
}

pub struct BlockIndexer<P: Preset, D, A, C> {
    config: IndexerConfig,
    chain_config: Arc<Config>,
    chain_time: Arc<C>,
    database: D,
    context: Context<A>,
    activity_permit: ActivityPermit,
    state: Mutex<State>,
    phantom: PhantomData<P>,
}

impl<P, D, A, C> BlockIndexer<P, D, A, C>
where
    P: Preset,
    D: ChainDb,
    A: BeaconNodeApi,
    C: ChainTime<P>,
{
    #[expect(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        config: IndexerConfig,
        chain_config: Arc<Config>,
        chain_time: Arc<C>,
        database: D,
        api: Arc<A>,
        activity_permit: ActivityPermit,
        cancellation: CancellationToken,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        Self {
            config,
            chain_config,
            chain_time,
            database,
            context: Context {
                api,
                metrics,
                cancellation,
            },
            activity_permit,
            state: Mutex::default(),
            phantom: PhantomData,
        }
    }

    /// Processes all slots up to the current one in response to a new head.
    ///
    /// Failures are logged and reported through the returned outcome. The next call retries
    /// from the first slot that was not processed.
    pub async fn on_head_updated(
        &self,
        slot: Slot,
        block_root: H256,
        state_root: H256,
        epoch_transition: bool,
    ) -> HeadUpdateOutcome {
        INGESTION_PROGRESS.set_head_slot(slot);

        if let Some(metrics) = self.context.metrics.as_ref() {
            metrics.set_head_slot(slot);
        }

        let Ok(_permit) = self.activity_permit.try_acquire() else {
            debug_with_progress!(
                "another process is active, ignoring head {block_root:?} at slot {slot}",
            );
            return HeadUpdateOutcome::Busy;
        };

        let mut state = self.state.lock().await;

        if state.last_handled_block_root == Some(block_root) {
            debug_with_progress!("head {block_root:?} at slot {slot} already handled");
            return HeadUpdateOutcome::AlreadyHandled;
        }

        debug_with_progress!(
            "head updated to {block_root:?} at slot {slot} \
             (state root: {state_root:?}, epoch transition: {epoch_transition})",
        );

        match self.run_catch_up(&mut state).await {
            Ok(()) => {
                state.last_handled_block_root = Some(block_root);
                HeadUpdateOutcome::CaughtUp
            }
            Err(error) => {
                debug_with_progress!("catch-up for head {block_root:?} stopped: {error:?}");
                HeadUpdateOutcome::Failed
            }
        }
    }

    /// Like [`Self::on_head_updated`] but without a head to remember.
    ///
    /// Returns [`HeadUpdateOutcome::Busy`] if the activity permit is held by someone else.
    pub async fn catch_up(&self) -> Result<HeadUpdateOutcome> {
        let Ok(_permit) = self.activity_permit.try_acquire() else {
            debug_with_progress!("another process is active, skipping catch-up");
            return Ok(HeadUpdateOutcome::Busy);
        };

        let mut state = self.state.lock().await;

        self.run_catch_up(&mut state).await?;

        Ok(HeadUpdateOutcome::CaughtUp)
    }

    /// Processes a single slot in its own transaction.
    ///
    /// The caller is responsible for holding the activity permit.
    pub async fn update_slot(&self, slot: Slot) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut beacon_committees = BeaconCommitteeCache::default();

        self.process_slot(&mut beacon_committees, &mut state.sync_committees, slot)
            .await
    }

    async fn run_catch_up(&self, state: &mut State) -> Result<()> {
        self.context.ensure_not_cancelled()?;

        let latest_slot = {
            let transaction = self.database.begin_transaction()?;
            let latest_slot = watermark::latest_slot(&transaction)?;
            transaction.rollback();
            latest_slot
        };

        let next_slot = latest_slot.map_or(GENESIS_SLOT, |slot| slot.saturating_add(1));
        let first_slot = next_slot.max(self.config.start_slot.unwrap_or(GENESIS_SLOT));
        let current_slot = self.chain_time.current_slot()?;

        if first_slot > current_slot {
            debug_with_progress!("no slots to process (current slot: {current_slot})");
            return Ok(());
        }

        info_with_progress!("processing slots {first_slot}..={current_slot}");

        // Committees are only shared between the slots of a single run.
        let mut beacon_committees = BeaconCommitteeCache::default();

        for slot in first_slot..=current_slot {
            if let Err(error) = self
                .process_slot(&mut beacon_committees, &mut state.sync_committees, slot)
                .await
            {
                warn_with_progress!("failed to process slot {slot}: {error:?}");

                if let Some(metrics) = self.context.metrics.as_ref() {
                    metrics.register_failed_slot();
                }

                return Err(error);
            }
        }

        Ok(())
    }

    async fn process_slot(
        &self,
        beacon_committees: &mut BeaconCommitteeCache,
        sync_committees: &mut SyncCommitteeCache,
        slot: Slot,
    ) -> Result<()> {
        let _timer = self
            .context
            .metrics
            .as_ref()
            .map(|metrics| metrics.update_slot_times.start_timer());

        self.context.ensure_not_cancelled()?;

        let mut transaction = self.database.begin_transaction()?;

        let result = self
            .fill_transaction(&mut transaction, beacon_committees, sync_committees, slot)
            .await
            .and_then(|()| self.context.ensure_not_cancelled());

        if let Err(error) = result {
            transaction.rollback();
            return Err(error);
        }

        transaction
            .commit()
            .with_context(|| format!("failed to commit slot {slot}"))?;

        INGESTION_PROGRESS.set_processed_slot(slot);

        if let Some(metrics) = self.context.metrics.as_ref() {
            metrics.register_processed_slot(slot);
        }

        debug_with_progress!("slot {slot} processed");

        Ok(())
    }

    async fn fill_transaction(
        &self,
        transaction: &mut D::Transaction,
        beacon_committees: &mut BeaconCommitteeCache,
        sync_committees: &mut SyncCommitteeCache,
        slot: Slot,
    ) -> Result<()> {
        let already_stored = !self.config.refetch && !transaction.blocks_at_slot(slot)?.is_empty();

        if already_stored {
            debug_with_progress!("block at slot {slot} already stored");
        } else {
            let envelope = self
                .context
                .cancellable(self.context.api.signed_beacon_block(slot))
                .await
                .with_context(|| format!("failed to fetch block at slot {slot}"))?;

            match envelope {
                Some(envelope) => {
                    self.store_block(transaction, beacon_committees, sync_committees, envelope)
                        .await?;
                }
                None => debug_with_progress!("no block at slot {slot}"),
            }
        }

        watermark::set_latest_slot(transaction, slot).context("failed to set metadata")
    }

    async fn store_block(
        &self,
        transaction: &mut D::Transaction,
        beacon_committees: &mut BeaconCommitteeCache,
        sync_committees: &mut SyncCommitteeCache,
        envelope: VersionedSignedBeaconBlock,
    ) -> Result<()> {
        let DecodedBlock { block, record } = decoder::decode_block::<P>(envelope)?;

        let expected_phase = self.chain_config.phase_at_slot::<P>(record.slot);

        if block.phase() != expected_phase {
            warn_with_progress!(
                "block {:?} at slot {} is a {} block but {expected_phase} is scheduled for the slot",
                record.root,
                record.slot,
                block.phase(),
            );
        }

        transaction
            .set_block(&record)
            .context("failed to set block")?;

        extractors::store_attestations(
            &self.context,
            beacon_committees,
            transaction,
            &block,
            &record,
        )
        .await
        .context("failed to store attestations")?;

        extractors::store_proposer_slashings(transaction, &block, &record)
            .context("failed to store proposer slashings")?;

        extractors::store_attester_slashings(transaction, &block, &record)
            .context("failed to store attester slashings")?;

        extractors::store_deposits(transaction, &block, &record)
            .context("failed to store deposits")?;

        extractors::store_voluntary_exits(transaction, &block, &record)
            .context("failed to store voluntary exits")?;

        let period = self.chain_time.slot_to_sync_committee_period(record.slot);

        extractors::store_sync_aggregate(
            &self.context,
            sync_committees,
            transaction,
            &block,
            &record,
            period,
        )
        .await
        .context("failed to store sync aggregate")
    }
}
