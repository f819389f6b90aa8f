//! Telemetry configuration from environment variables.

use std::env;

/// Logging and metrics settings of one node process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether logs go to stdout at all
    pub console_output: bool,

    /// JSON lines instead of the human-readable format
    pub json_logs: bool,

    /// Port the node exposes Prometheus text on
    pub metrics_port: u16,

    /// Seconds between exports of subsystem counters into the registry
    pub metrics_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "tessera".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_port: 9100,
            metrics_interval_secs: 10,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: tessera)
    /// - `TS_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `TS_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `TS_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    /// - `TS_METRICS_PORT`: Prometheus metrics port (default: 9100)
    /// - `TS_METRICS_INTERVAL`: Export period in seconds (default: 10)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TelemetryConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("TS_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("TS_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.console_output),

            json_logs: lookup("TS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            metrics_port: lookup("TS_METRICS_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_port),

            metrics_interval_secs: lookup("TS_METRICS_INTERVAL")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.metrics_interval_secs),
        }
    }

    /// Quiet settings for tests.
    pub fn for_testing() -> Self {
        Self {
            service_name: "tessera-test".to_string(),
            log_level: "warn".to_string(),
            console_output: false,
            ..Self::default()
        }
    }
}
