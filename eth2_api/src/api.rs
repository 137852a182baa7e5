use core::{marker::PhantomData, time::Duration};
use std::sync::Arc;

use anyhow::{bail, Error as AnyhowError, Result};
use async_trait::async_trait;
use futures::{stream, Stream, StreamExt as _};
use helper_functions::misc;
use log::debug;
use mime::{APPLICATION_JSON, TEXT_EVENT_STREAM};
use prometheus_metrics::Metrics;
use reqwest::{header::ACCEPT, Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use types::{
    altair::primitives::SyncCommitteePeriod, combined::VersionedSignedBeaconBlock,
    config::Config, phase0::primitives::Slot, preset::Preset,
};

use crate::{
    containers::{BeaconCommittee, EthResponse, Genesis, HeadEvent, SyncCommittee},
    events::EventBuffer,
    traits::{BeaconCommitteesProvider, SignedBeaconBlockProvider, SyncCommitteeProvider},
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Eth2ApiError {
    #[error("bad request to beacon node (beacon node response: {message})")]
    BadRequest { message: String },
    #[error("beacon node internal error (beacon node response: {message})")]
    BeaconNodeInternalError { message: String },
    #[error("head event stream ended")]
    EventStreamEnded,
}

/// Client for the standard Beacon Node API.
pub struct Eth2Api<P: Preset> {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    metrics: Option<Arc<Metrics>>,
    phantom: PhantomData<P>,
}

impl<P: Preset> Eth2Api<P> {
    #[must_use]
    pub const fn new(client: Client, base_url: Url, request_timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            request_timeout,
            metrics: None,
            phantom: PhantomData,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Option<Arc<Metrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub async fn genesis(&self) -> Result<Genesis> {
        let url = self.url("/eth/v1/beacon/genesis")?;

        debug!("getting genesis from {url}");

        self.get_json::<EthResponse<Genesis>>(url, "genesis")
            .await
            .map(|response| response.data)
    }

    /// Returns the runtime configuration the beacon node is running with.
    pub async fn config_spec(&self) -> Result<Config> {
        let url = self.url("/eth/v1/config/spec")?;

        debug!("getting chain configuration from {url}");

        self.get_json::<EthResponse<Config>>(url, "config_spec")
            .await
            .map(|response| response.data)
    }

    /// Subscribes to `head` events.
    ///
    /// The stream ends with an error if the connection is closed by the beacon node.
    pub async fn head_events(&self) -> Result<impl Stream<Item = Result<HeadEvent>> + use<P>> {
        let mut url = self.url("/eth/v1/events")?;
        url.query_pairs_mut().append_pair("topics", "head");

        debug!("subscribing to head events at {url}");

        // No timeout. The connection is expected to stay open indefinitely.
        let response = self
            .client
            .get(url)
            .header(ACCEPT, TEXT_EVENT_STREAM.as_ref())
            .send()
            .await?;

        let response = handle_error(response).await?;
        let mut buffer = EventBuffer::default();

        let events = response
            .bytes_stream()
            .map(move |chunk| -> Vec<Result<HeadEvent>> {
                match chunk {
                    Ok(bytes) => buffer
                        .push(&bytes)
                        .into_iter()
                        .filter_map(|result| {
                            result
                                .and_then(|event| event.into_head_event())
                                .transpose()
                        })
                        .collect(),
                    Err(error) => vec![Err(error.into())],
                }
            })
            .flat_map(stream::iter)
            .chain(stream::once(async {
                Err(AnyhowError::new(Eth2ApiError::EventStreamEnded))
            }));

        Ok(events)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, endpoint: &str) -> Result<T> {
        let response = self.get(url, endpoint).await?;
        let response = handle_error(response).await?;
        Ok(response.json().await?)
    }

    async fn get(&self, url: Url, endpoint: &str) -> Result<Response> {
        let _timer = self.metrics.as_ref().and_then(|metrics| {
            prometheus_metrics::start_timer_vec(&metrics.eth2_api_request_times, endpoint)
        });

        self.client
            .get(url)
            .header(ACCEPT, APPLICATION_JSON.as_ref())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(Into::into)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(Into::into)
    }
}

#[async_trait]
impl<P: Preset> SignedBeaconBlockProvider for Eth2Api<P> {
    async fn signed_beacon_block(&self, slot: Slot) -> Result<Option<VersionedSignedBeaconBlock>> {
        let url = self.url(&format!("/eth/v2/beacon/blocks/{slot}"))?;

        debug!("getting block at slot {slot} from {url}");

        let response = self.get(url, "block").await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("beacon node has no block at slot {slot}");
            return Ok(None);
        }

        let response = handle_error(response).await?;

        Ok(Some(response.json().await?))
    }
}

#[async_trait]
impl<P: Preset> BeaconCommitteesProvider for Eth2Api<P> {
    async fn beacon_committees(&self, slot: Slot) -> Result<Vec<BeaconCommittee>> {
        let url = self.url(&format!("/eth/v1/beacon/states/{slot}/committees"))?;

        debug!("getting beacon committees for slot {slot} from {url}");

        self.get_json::<EthResponse<Vec<BeaconCommittee>>>(url, "committees")
            .await
            .map(|response| response.data)
    }
}

#[async_trait]
impl<P: Preset> SyncCommitteeProvider for Eth2Api<P> {
    async fn sync_committee(&self, period: SyncCommitteePeriod) -> Result<SyncCommittee> {
        let epoch = misc::start_of_sync_committee_period::<P>(period);
        let state_slot = misc::compute_start_slot_at_epoch::<P>(epoch);

        let mut url = self.url(&format!("/eth/v1/beacon/states/{state_slot}/sync_committees"))?;
        url.query_pairs_mut()
            .append_pair("epoch", &epoch.to_string());

        debug!("getting sync committee for period {period} from {url}");

        self.get_json::<EthResponse<SyncCommittee>>(url, "sync_committees")
            .await
            .map(|response| response.data)
    }
}

async fn handle_error(response: Response) -> Result<Response> {
    if response.status().is_client_error() {
        let message = response.text().await?;
        bail!(Eth2ApiError::BadRequest { message });
    }

    if response.status().is_server_error() {
        let message = response.text().await?;
        bail!(Eth2ApiError::BeaconNodeInternalError { message });
    }

    Ok(response)
}
