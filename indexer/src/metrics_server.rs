use core::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Error as AnyhowError, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use logging::{info_with_progress, warn_with_progress};
use prometheus::TextEncoder;
use prometheus_metrics::Metrics;
use thiserror::Error;

#[derive(Clone, Copy, Debug)]
pub struct MetricsServerConfig {
    pub metrics_address: IpAddr,
    pub metrics_port: u16,
}

impl From<&MetricsServerConfig> for SocketAddr {
    fn from(config: &MetricsServerConfig) -> Self {
        Self::from((config.metrics_address, config.metrics_port))
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
struct Error(#[from] prometheus::Error);

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn_with_progress!("failed to encode metrics: {self}");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

pub async fn run_metrics_server(config: MetricsServerConfig, metrics: Arc<Metrics>) -> Result<()> {
    let addr = SocketAddr::from(&config);

    info_with_progress!("metrics server is listening on {addr}");

    let router = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(metrics);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, router)
        .await
        .map_err(AnyhowError::new)
}

/// `GET /metrics`
#[expect(clippy::unused_async)]
async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> Result<String, Error> {
    let mut buffer = String::new();

    metrics.set_live();

    TextEncoder::new().encode_utf8(prometheus::gather().as_slice(), &mut buffer)?;

    Ok(buffer)
}
