//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Filter directive (`info`, `mc_05_session_controller=debug,info`, ...)
    pub log_level: String,

    /// Emit one JSON object per line instead of human-readable output
    pub json_logs: bool,

    /// Disable to install the filter without any output layer
    pub console_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "multiverse-chat".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            console_output: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MC_SERVICE_NAME`: Service name (default: multiverse-chat)
    /// - `MC_LOG_LEVEL` or `RUST_LOG`: Filter directive (default: info)
    /// - `MC_JSON_LOGS`: JSON output (default: false, true inside containers)
    /// - `MC_CONSOLE_OUTPUT`: Write logs to stdout (default: true)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self::from_lookup(|key| env::var(key).ok(), is_container)
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>, is_container: bool) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("MC_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("MC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("MC_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),
            console_output: lookup("MC_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
