//! # Tessera Telemetry
//!
//! Logging and metrics plumbing for the gossip node.
//!
//! ```text
//! subsystems ── tracing::{info,debug,warn}! ──► tracing-subscriber (pretty | JSON)
//!      │
//!      └── Metrics::snapshot() ──► MetricsHandle::export_* ──► Prometheus registry
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let guard = init_telemetry(TelemetryConfig::from_env())?;
//! guard.metrics().export_totals("emitter", &[("events_emitted", 1)]);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `tessera` | Service name on log lines |
//! | `TS_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `TS_JSON_LOGS` | `false` | JSON log lines |
//! | `TS_CONSOLE_OUTPUT` | `true` | Log to stdout |
//! | `TS_METRICS_PORT` | `9100` | Prometheus port |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{register_metrics, MetricsHandle, REGISTRY};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric families could not be created or registered.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// A setting could not be interpreted.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    logging::init_logging(&config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        metrics_port = config.metrics_port,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { config, metrics })
}

/// Keeps telemetry active.
pub struct TelemetryGuard {
    config: TelemetryConfig,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Registered metric families.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }

    /// Settings telemetry was started with.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.config.service_name, "Shutting down telemetry");
    }
}

/// Span carrying the subsystem name.
#[macro_export]
macro_rules! subsystem_span {
    ($name:expr, $subsystem:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name, subsystem = $subsystem $(, $($field)*)?)
    };
}
