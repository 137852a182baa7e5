use core::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};
use std::{path::PathBuf, sync::Arc};

use anyhow::{ensure, Result};
use block_indexer::IndexerConfig;
use bytesize::ByteSize;
use clap::Parser;
use reqwest::Url;
use thiserror::Error;
use types::phase0::primitives::Slot;

use crate::{
    app_config::{
        AppConfig, Network, StorageConfig, DEFAULT_BEACON_NODE_URL, DEFAULT_MAX_DB_SIZE,
        DEFAULT_METRICS_PORT, DEFAULT_REQUEST_TIMEOUT,
    },
    metrics_server::MetricsServerConfig,
};

/// Indexes beacon blocks served by a beacon node into a local store.
#[derive(Parser)]
#[clap(name = "indexer", verbatim_doc_comment)]
pub struct IndexerArgs {
    /// Name of the network the beacon node is on
    #[clap(long, value_enum, default_value_t = Network::default())]
    network: Network,

    /// Base URL of the Beacon Node API
    #[clap(long, default_value = DEFAULT_BEACON_NODE_URL)]
    beacon_node_url: Url,

    /// Timeout for requests to the beacon node in milliseconds
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT)]
    request_timeout: u64,

    /// Directory to store indexed data in. Data is kept in memory if omitted
    #[clap(long, value_name = "DIRECTORY")]
    data_dir: Option<PathBuf>,

    /// Maximum size of the database
    #[clap(long, default_value_t = DEFAULT_MAX_DB_SIZE)]
    max_db_size: ByteSize,

    /// Fetch and store blocks again even if they are already stored
    #[clap(long)]
    refetch: bool,

    /// First slot to index in an empty store
    #[clap(long, value_name = "SLOT")]
    start_slot: Option<Slot>,

    /// Enable the metrics server
    #[clap(long)]
    metrics: bool,

    /// Metrics server address
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    metrics_address: IpAddr,

    /// Metrics server port
    #[clap(long, default_value_t = DEFAULT_METRICS_PORT)]
    metrics_port: u16,
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
enum Error {
    #[error("--request-timeout must be greater than zero")]
    ZeroRequestTimeout,
}

impl IndexerArgs {
    pub fn try_into_config(self) -> Result<AppConfig> {
        let Self {
            network,
            beacon_node_url,
            request_timeout,
            data_dir,
            max_db_size,
            refetch,
            start_slot,
            metrics,
            metrics_address,
            metrics_port,
        } = self;

        ensure!(request_timeout > 0, Error::ZeroRequestTimeout);

        let storage_config = data_dir.map(|directory| StorageConfig {
            directory,
            max_size: max_db_size,
        });

        let metrics_config = metrics.then_some(MetricsServerConfig {
            metrics_address,
            metrics_port,
        });

        Ok(AppConfig {
            network,
            chain_config: Arc::new(network.chain_config()),
            beacon_node_url,
            request_timeout: Duration::from_millis(request_timeout),
            storage_config,
            indexer_config: IndexerConfig {
                refetch,
                start_slot,
            },
            metrics_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use core::{iter, net::SocketAddr};

    use super::*;

    fn try_config_from_args(args: impl IntoIterator<Item = &'static str>) -> Result<AppConfig> {
        IndexerArgs::try_parse_from(iter::once("indexer").chain(args))?.try_into_config()
    }

    fn config_from_args(args: impl IntoIterator<Item = &'static str>) -> AppConfig {
        try_config_from_args(args).expect("arguments should be valid")
    }

    #[test]
    fn defaults() {
        let config = config_from_args([]);

        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.chain_config.config_name, "mainnet");
        assert_eq!(config.beacon_node_url.as_str(), "http://localhost:5052/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.storage_config.is_none());
        assert!(!config.indexer_config.refetch);
        assert_eq!(config.indexer_config.start_slot, None);
        assert!(config.metrics_config.is_none());
    }

    #[test]
    fn storage_options() {
        let config = config_from_args(["--data-dir", "/tmp/indexer", "--max-db-size", "1 GiB"]);

        let storage_config = config
            .storage_config
            .expect("--data-dir should enable persistent storage");

        assert_eq!(storage_config.directory, PathBuf::from("/tmp/indexer"));
        assert_eq!(storage_config.max_size, ByteSize::gib(1));
    }

    #[test]
    fn indexer_options() {
        let config = config_from_args(["--refetch", "--start-slot", "1024"]);

        assert!(config.indexer_config.refetch);
        assert_eq!(config.indexer_config.start_slot, Some(1024));
    }

    #[test]
    fn metrics_options() {
        let config = config_from_args(["--metrics", "--metrics-port", "9100"]);

        let metrics_config = config
            .metrics_config
            .expect("--metrics should enable the metrics server");

        assert_eq!(
            SocketAddr::from(&metrics_config),
            SocketAddr::from((Ipv4Addr::LOCALHOST, 9100)),
        );
    }

    #[test]
    fn minimal_network() {
        let config = config_from_args(["--network", "minimal"]);

        assert_eq!(config.network, Network::Minimal);
        assert_eq!(config.chain_config.config_name, "minimal");
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let error = try_config_from_args(["--request-timeout", "0"])
            .expect_err("zero timeout should be rejected");

        assert_eq!(error.downcast_ref(), Some(&Error::ZeroRequestTimeout));
    }
}
