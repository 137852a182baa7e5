use std::io::{self, IsTerminal as _};

use anyhow::Result;
use chrono::{Local, SecondsFormat};
use logging::debug_with_progress;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::Writer, time::FormatTime},
    prelude::*,
    reload::{self, Handle},
    EnvFilter, Registry,
};

const LOG_ENVIRONMENT_VARIABLE: &str = "INDEXER_LOG";

const INDEXER_CRATES: &[&str] = &[
    "binary_utils",
    "block_indexer",
    "chain_db",
    "clock",
    "database",
    "eth2_api",
    "prometheus_metrics",
];

#[derive(Clone)]
pub struct TracingHandle {
    log_handle: Handle<EnvFilter, Registry>,
}

impl TracingHandle {
    pub fn modify_log<F>(&self, f: F) -> Result<(), reload::Error>
    where
        F: FnOnce(&mut EnvFilter),
    {
        self.log_handle.modify(f)
    }
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> core::fmt::Result {
        write!(
            w,
            "[{}]",
            Local::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

pub fn default_filter(module_path: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::default().add_directive(LevelFilter::OFF.into());

    for crate_name in INDEXER_CRATES {
        filter = filter.add_directive(format!("{crate_name}=info").parse()?);
    }

    filter = filter.add_directive(format!("{module_path}=info").parse()?);

    if let Ok(env_filter) = EnvFilter::try_from_env(LOG_ENVIRONMENT_VARIABLE) {
        for directive in env_filter.to_string().split(',') {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

pub fn initialize_tracing_logger(
    module_path: &str,
    always_write_style: bool,
) -> Result<TracingHandle> {
    let (filter_layer, log_handle) = reload::Layer::new(default_filter(module_path)?);
    let enable_ansi = always_write_style || io::stdout().is_terminal();

    let stdout_layer = fmt::layer::<Registry>()
        .compact()
        .with_thread_ids(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(true)
        .with_timer(LocalTimer)
        .with_ansi(enable_ansi)
        .with_filter(filter_layer);

    // Crates below the indexer (libmdbx bindings, HTTP client) still log through `log`.
    tracing_log::LogTracer::init()?;

    tracing_subscriber::registry().with(stdout_layer).try_init()?;

    debug_with_progress!("tracing started!");

    Ok(TracingHandle { log_handle })
}
