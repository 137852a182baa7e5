use core::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use eth2_api::{BeaconCommitteesProvider, SignedBeaconBlockProvider, SyncCommitteeProvider};
use prometheus_metrics::Metrics;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Everything the Beacon Node API has to provide to the indexer.
pub trait BeaconNodeApi:
    SignedBeaconBlockProvider + BeaconCommitteesProvider + SyncCommitteeProvider
{
}

impl<A> BeaconNodeApi for A where
    A: SignedBeaconBlockProvider + BeaconCommitteesProvider + SyncCommitteeProvider
{
}

// Collaborators shared by everything that runs while a slot is being processed.
pub struct Context<A> {
    pub api: Arc<A>,
    pub metrics: Option<Arc<Metrics>>,
    pub cancellation: CancellationToken,
}

impl<A> Context<A> {
    pub fn ensure_not_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            bail!(Error::Cancelled);
        }

        Ok(())
    }

    /// Runs a request to a collaborator, giving up as soon as cancellation is requested.
    pub async fn cancellable<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;

            () = self.cancellation.cancelled() => bail!(Error::Cancelled),
            result = future => result,
        }
    }
}
