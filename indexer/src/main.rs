use core::{future::Future, pin::pin, time::Duration};
use std::{process::ExitCode, sync::Arc};

use anyhow::{ensure, Result};
use block_indexer::{activity_permit, BeaconNodeApi, BlockIndexer};
use chain_db::{ChainDb, ChainStore};
use clap::{Error as ClapError, Parser as _};
use clock::{ChainTime, SlotClock};
use database::Database;
use eth2_api::{Eth2Api, HeadEvent};
use futures::StreamExt as _;
use logging::{debug_with_progress, error_with_progress, info_with_progress, warn_with_progress};
use prometheus_metrics::{Metrics, METRICS};
use reqwest::Client;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use types::{
    config::Config,
    preset::{Mainnet, Minimal, Preset},
};

use crate::{
    app_config::{AppConfig, Network, StorageConfig},
    indexer_args::IndexerArgs,
};

mod app_config;
mod indexer_args;
mod metrics_server;

const DATABASE_NAME: &str = "chain";

// Delay before subscribing to head events again after the stream fails.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    if let Err(error) = try_main() {
        if let Some(clap_error) = error.downcast_ref::<ClapError>() {
            clap_error.exit();
        }

        error_with_progress!("{error:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    binary_utils::initialize_tracing_logger(module_path!(), false)?;

    let config = IndexerArgs::try_parse()?.try_into_config()?;

    info_with_progress!("starting block indexer");
    config.report();

    match config.network {
        Network::Mainnet => block_on(run::<Mainnet>(config)),
        Network::Minimal => block_on(run::<Minimal>(config)),
    }
}

async fn run<P: Preset>(config: AppConfig) -> Result<()> {
    let AppConfig {
        network: _,
        chain_config,
        beacon_node_url,
        request_timeout,
        storage_config,
        indexer_config,
        metrics_config,
    } = config;

    let metrics = match metrics_config {
        Some(metrics_config) => {
            let metrics = Arc::new(Metrics::new()?);
            metrics.register_with_default_metrics()?;
            METRICS.get_or_init(|| Arc::clone(&metrics));

            tokio::spawn({
                let metrics = Arc::clone(&metrics);

                async move {
                    if let Err(error) =
                        metrics_server::run_metrics_server(metrics_config, metrics).await
                    {
                        error_with_progress!("metrics server failed: {error:?}");
                    }
                }
            });

            Some(metrics)
        }
        None => None,
    };

    let api = Arc::new(
        Eth2Api::<P>::new(Client::new(), beacon_node_url, request_timeout)
            .with_metrics(metrics.clone()),
    );

    let genesis = api.genesis().await?;

    info_with_progress!(
        "genesis time: {} (genesis validators root: {:?})",
        genesis.genesis_time,
        genesis.genesis_validators_root,
    );

    let chain_config = chain_config_from_node(&api, chain_config).await?;

    let chain_time = Arc::new(SlotClock::<P>::new(
        Arc::clone(&chain_config),
        genesis.genesis_time,
    ));

    let database = match storage_config {
        Some(StorageConfig {
            directory,
            max_size,
        }) => ChainStore::new(Database::persistent(DATABASE_NAME, directory, max_size)?),
        None => ChainStore::in_memory(),
    };

    let cancellation = CancellationToken::new();

    let indexer = BlockIndexer::new(
        indexer_config,
        chain_config,
        chain_time,
        database,
        Arc::clone(&api),
        activity_permit(),
        cancellation.clone(),
        metrics,
    );

    let mut follow = pin!(follow_head(&api, &indexer, &cancellation));

    tokio::select! {
        result = &mut follow => result,
        result = tokio::signal::ctrl_c() => {
            result?;

            info_with_progress!("received interrupt, shutting down");
            cancellation.cancel();

            // Slots in progress see the cancellation and roll back.
            follow.await
        }
    }
}

/// Prefers the beacon node's own configuration so that fork epochs of custom networks are known.
///
/// Falls back to `default` if the node does not serve its configuration.
async fn chain_config_from_node<P: Preset>(
    api: &Eth2Api<P>,
    default: Arc<Config>,
) -> Result<Arc<Config>> {
    match api.config_spec().await {
        Ok(node_config) => {
            ensure!(
                node_config.preset_base == P::NAME,
                "beacon node runs the {} preset but the indexer was started with the {} preset",
                node_config.preset_base,
                P::NAME,
            );

            info_with_progress!(
                "using chain configuration {} from beacon node",
                node_config.config_name,
            );

            Ok(Arc::new(node_config))
        }
        Err(error) => {
            warn_with_progress!(
                "failed to get chain configuration from beacon node, \
                 using {} configuration: {error:?}",
                default.config_name,
            );

            Ok(default)
        }
    }
}

/// Runs the initial catch-up and then processes head events until `cancellation` is triggered.
async fn follow_head<P, D, A, C>(
    api: &Eth2Api<P>,
    indexer: &BlockIndexer<P, D, A, C>,
    cancellation: &CancellationToken,
) -> Result<()>
where
    P: Preset,
    D: ChainDb,
    A: BeaconNodeApi,
    C: ChainTime<P>,
{
    match indexer.catch_up().await {
        Ok(outcome) => debug_with_progress!("initial catch-up finished: {outcome:?}"),
        Err(error) => warn_with_progress!("initial catch-up failed: {error:?}"),
    }

    while !cancellation.is_cancelled() {
        let subscription = tokio::select! {
            () = cancellation.cancelled() => break,
            subscription = api.head_events() => subscription,
        };

        match subscription {
            Ok(events) => {
                let mut events = pin!(events);

                loop {
                    let event = tokio::select! {
                        () = cancellation.cancelled() => break,
                        event = events.next() => event,
                    };

                    match event {
                        Some(Ok(HeadEvent {
                            slot,
                            block,
                            state,
                            epoch_transition,
                        })) => {
                            let outcome = indexer
                                .on_head_updated(slot, block, state, epoch_transition)
                                .await;

                            debug_with_progress!("head {block:?} at slot {slot}: {outcome:?}");
                        }
                        Some(Err(error)) => {
                            warn_with_progress!("head event stream failed: {error:?}");
                            break;
                        }
                        None => break,
                    }
                }
            }
            Err(error) => warn_with_progress!("failed to subscribe to head events: {error:?}"),
        }

        tokio::select! {
            () = cancellation.cancelled() => {}
            () = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
        }
    }

    debug_with_progress!("stopped following head");

    Ok(())
}

// This is roughly what `#[tokio::main]` expands to.
fn block_on(future: impl Future<Output = Result<()>>) -> Result<()> {
    Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(future)
}

#[cfg(test)]
mod tests {
    use block_indexer::IndexerConfig;
    use httpmock::{Method, MockServer};
    use serde_json::json;
    use types::{nonstandard::Phase, preset::PresetName};

    use super::*;

    type TestIndexer = BlockIndexer<Minimal, ChainStore, Eth2Api<Minimal>, SlotClock<Minimal>>;

    // The clock is stopped before genesis and the start slot is ahead of it, so catch-up has
    // nothing to do and never contacts the beacon node.
    fn idle_indexer(
        server: &MockServer,
        cancellation: &CancellationToken,
    ) -> Result<(Arc<Eth2Api<Minimal>>, TestIndexer)> {
        let chain_config = Arc::new(Config::minimal());

        let api = Arc::new(api(server)?);

        let indexer = BlockIndexer::new(
            IndexerConfig {
                refetch: false,
                start_slot: Some(1),
            },
            Arc::clone(&chain_config),
            Arc::new(SlotClock::new(chain_config, u64::MAX)),
            ChainStore::in_memory(),
            Arc::clone(&api),
            activity_permit(),
            cancellation.clone(),
            None,
        );

        Ok((api, indexer))
    }

    fn api(server: &MockServer) -> Result<Eth2Api<Minimal>> {
        Ok(Eth2Api::new(
            Client::new(),
            server.url("/").parse()?,
            Duration::from_secs(1),
        ))
    }

    fn serve_config(server: &MockServer, preset_base: &str) {
        let body = json!({
            "data": {
                "CONFIG_NAME": "devnet",
                "PRESET_BASE": preset_base,
                "ALTAIR_FORK_EPOCH": "1",
                "BELLATRIX_FORK_EPOCH": "2",
                "CAPELLA_FORK_EPOCH": "3",
                "SECONDS_PER_SLOT": "6",
            },
        });

        server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v1/config/spec");
            then.status(200)
                .header("content-type", "application/json")
                .body(body.to_string());
        });
    }

    #[tokio::test]
    async fn fork_epochs_come_from_beacon_node() -> Result<()> {
        let server = MockServer::start();

        serve_config(&server, "minimal");

        let config = chain_config_from_node(&api(&server)?, Arc::new(Config::minimal())).await?;

        assert_eq!(config.config_name, "devnet");
        assert_eq!(config.phase_at_slot::<Minimal>(24), Phase::Capella);

        Ok(())
    }

    #[tokio::test]
    async fn default_configuration_is_used_when_node_does_not_serve_one() -> Result<()> {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v1/config/spec");
            then.status(404).body("not found");
        });

        let default = Arc::new(Config::minimal());
        let config = chain_config_from_node(&api(&server)?, Arc::clone(&default)).await?;

        assert!(Arc::ptr_eq(&config, &default));

        Ok(())
    }

    #[tokio::test]
    async fn configuration_for_other_preset_is_rejected() -> Result<()> {
        let server = MockServer::start();

        serve_config(&server, "mainnet");

        let error = chain_config_from_node(&api(&server)?, Arc::new(Config::minimal()))
            .await
            .expect_err("mainnet configuration cannot be used with the minimal preset");

        assert!(error.to_string().contains(&PresetName::Mainnet.to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn cancelled_follower_does_not_subscribe() -> Result<()> {
        let server = MockServer::start();

        let events = server.mock(|when, then| {
            when.method(Method::GET).path("/eth/v1/events");
            then.status(200).header("content-type", "text/event-stream");
        });

        let cancellation = CancellationToken::new();
        let (api, indexer) = idle_indexer(&server, &cancellation)?;

        cancellation.cancel();

        follow_head(&api, &indexer, &cancellation).await?;

        assert_eq!(events.hits_async().await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn cancellation_interrupts_resubscribe_delay() -> Result<()> {
        let server = MockServer::start();

        // An empty body ends the stream right away, after which the follower waits before
        // subscribing again.
        let events = server.mock(|when, then| {
            when.method(Method::GET)
                .path("/eth/v1/events")
                .query_param("topics", "head");
            then.status(200).header("content-type", "text/event-stream");
        });

        let cancellation = CancellationToken::new();
        let (api, indexer) = idle_indexer(&server, &cancellation)?;

        let cancel_after_subscription = async {
            while events.hits_async().await == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }

            cancellation.cancel();
        };

        let follow = follow_head(&api, &indexer, &cancellation);

        // Finishing well before the delay is over means the wait was cut short.
        let (result, ()) = tokio::time::timeout(RESUBSCRIBE_DELAY / 2, async {
            tokio::join!(follow, cancel_after_subscription)
        })
        .await?;

        result?;

        assert_eq!(events.hits_async().await, 1);

        Ok(())
    }
}
