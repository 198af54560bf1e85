//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for the sentinel observability stack.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for logs and metrics
    pub service_name: String,

    /// Subsystem identifier (01, 02)
    pub subsystem_id: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Prometheus metrics port
    pub metrics_port: u16,

    /// Deployment environment (dev, staging, prod)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "quantum-sentinel".to_string(),
            subsystem_id: "00".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: 9100,
            environment: "dev".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QS_SERVICE_NAME`: Service name (default: quantum-sentinel)
    /// - `QS_SUBSYSTEM_ID`: Subsystem ID (default: 00)
    /// - `QS_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QS_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `QS_METRICS_PORT`: Prometheus metrics port (default: 9100)
    /// - `QS_ENVIRONMENT`: Deployment environment (default: dev)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("QS_SERVICE_NAME")
                .unwrap_or_else(|_| "quantum-sentinel".to_string()),

            subsystem_id: env::var("QS_SUBSYSTEM_ID").unwrap_or_else(|_| "00".to_string()),

            log_level: env::var("QS_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("QS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            metrics_port: env::var("QS_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(9100),

            environment: env::var("QS_ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()),
        }
    }

    /// Create configuration for a specific subsystem.
    pub fn for_subsystem(subsystem_id: &str, subsystem_name: &str) -> Self {
        let mut config = Self::from_env();
        config.subsystem_id = subsystem_id.to_string();
        config.service_name = format!("qs-{}-{}", subsystem_id, subsystem_name);
        config
    }

    /// Get the full service name including subsystem.
    pub fn full_service_name(&self) -> String {
        if self.subsystem_id == "00" {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.subsystem_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "quantum-sentinel");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_for_subsystem() {
        let config = TelemetryConfig::for_subsystem("01", "canary-detection");
        assert_eq!(config.subsystem_id, "01");
        assert_eq!(config.service_name, "qs-01-canary-detection");
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "quantum-sentinel");

        config.subsystem_id = "02".to_string();
        assert_eq!(config.full_service_name(), "quantum-sentinel-02");
    }
}
