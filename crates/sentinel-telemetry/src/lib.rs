//! # Sentinel Telemetry
//!
//! Observability for Quantum-Sentinel: structured logging through
//! `tracing` and Prometheus metrics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sentinel_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//!
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QS_SERVICE_NAME` | `quantum-sentinel` | Service name in logs |
//! | `QS_SUBSYSTEM_ID` | `00` | Subsystem identifier |
//! | `QS_LOG_LEVEL` | `info` | Log level filter |
//! | `QS_JSON_LOGS` | `false` | JSON-formatted log output |
//! | `QS_METRICS_PORT` | `9100` | Prometheus metrics port |

mod config;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, ACCESSES_RECORDED,
    ACTIVE_THREATS, CACHE_LOOKUPS, CLASSIFIER_DURATION, COMMITMENTS, COMMITMENT_DURATION,
    CONSENSUS_CONFIDENCE, CONSENSUS_ROUNDS, COORDINATED_ATTACKS, SECURE_TIMESTAMPS,
    SUBSYSTEM_ERRORS, TEMPORAL_ALERTS, THREATS_DETECTED, TOKENS_GENERATED,
};

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;

    let filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(e.to_string()))?;

    let init_result = if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    init_result.map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    tracing::info!(
        service = %config.full_service_name(),
        environment = %config.environment,
        metrics_port = config.metrics_port,
        "telemetry initialized"
    );

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "quantum-sentinel");
    }
}
