//! Logging and metrics setup, and per-operation outcome reporting.

use std::net::SocketAddr;
use std::str::FromStr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::domain::{ChainError, ConfigError};

pub const REQUESTS_TOTAL: &str = "chain_query_requests_total";
pub const ERRORS_TOTAL: &str = "chain_query_errors_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                key: "LOG_FORMAT".to_string(),
                message: format!("unknown log format '{other}'"),
            }),
        }
    }
}

/// Installs the global tracing subscriber, filtered by `RUST_LOG`
/// (default `info`).
pub fn init_tracing(format: LogFormat) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Installs the recorder together with a scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics_exporter(
    addr: SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new()
        .with_recommended_naming(true)
        .with_http_listener(addr)
        .install()
}

/// Records the outcome of a facade operation and passes it through.
pub fn report<T>(
    backend: &'static str,
    operation: &'static str,
    result: Result<T, ChainError>,
) -> Result<T, ChainError> {
    metrics::counter!(REQUESTS_TOTAL, "backend" => backend, "operation" => operation).increment(1);
    match &result {
        Ok(_) => debug!(backend, operation, "Chain query succeeded"),
        Err(err) => {
            let kind = err.kind().as_str();
            warn!(backend, operation, kind, error = %err, "Chain query failed");
            metrics::counter!(
                ERRORS_TOTAL,
                "backend" => backend,
                "operation" => operation,
                "kind" => kind
            )
            .increment(1);
        }
    }
    result
}
