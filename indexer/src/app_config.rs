use core::time::Duration;
use std::{path::PathBuf, sync::Arc};

use block_indexer::IndexerConfig;
use bytesize::ByteSize;
use clap::ValueEnum;
use logging::info_with_progress;
use reqwest::Url;
use strum::Display;
use types::config::Config;

use crate::metrics_server::MetricsServerConfig;

pub const DEFAULT_BEACON_NODE_URL: &str = "http://localhost:5052";
pub const DEFAULT_MAX_DB_SIZE: ByteSize = ByteSize::gib(64);
pub const DEFAULT_METRICS_PORT: u16 = 5054;
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30_000;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Display, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    /// Local networks running the minimal preset.
    Minimal,
}

impl Network {
    #[must_use]
    pub fn chain_config(self) -> Config {
        match self {
            Self::Mainnet => Config::mainnet(),
            Self::Minimal => Config::minimal(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub directory: PathBuf,
    pub max_size: ByteSize,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: Network,
    pub chain_config: Arc<Config>,
    pub beacon_node_url: Url,
    pub request_timeout: Duration,
    /// `None` keeps everything in memory.
    pub storage_config: Option<StorageConfig>,
    pub indexer_config: IndexerConfig,
    pub metrics_config: Option<MetricsServerConfig>,
}

impl AppConfig {
    pub fn report(&self) {
        let Self {
            network,
            chain_config: _,
            beacon_node_url,
            request_timeout,
            storage_config,
            indexer_config,
            metrics_config,
        } = self;

        info_with_progress!("network: {network}");
        info_with_progress!("beacon node: {beacon_node_url} (request timeout: {request_timeout:?})");

        match storage_config {
            Some(StorageConfig {
                directory,
                max_size,
            }) => info_with_progress!(
                "data directory: {} (maximum database size: {max_size})",
                directory.display(),
            ),
            None => info_with_progress!("no data directory given, keeping data in memory"),
        }

        if indexer_config.refetch {
            info_with_progress!("blocks already in the store will be fetched again");
        }

        if let Some(start_slot) = indexer_config.start_slot {
            info_with_progress!("start slot: {start_slot}");
        }

        if let Some(metrics_config) = metrics_config {
            info_with_progress!(
                "metrics: {}:{}",
                metrics_config.metrics_address,
                metrics_config.metrics_port,
            );
        }
    }
}
