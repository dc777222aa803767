//! # Chat Telemetry
//!
//! Logging and metrics for the chat server.
//!
//! - Logs: `tracing` events rendered by `tracing-subscriber`, human-readable
//!   or JSON lines
//! - Metrics: Prometheus registry, exported as text by the runtime's
//!   `/metrics` route
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chat_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MC_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `MC_JSON_LOGS` | `false` | JSON line output |
//! | `MC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `MC_SERVICE_NAME` | `multiverse-chat` | Service name in logs |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, COMMANDS_RECEIVED, CONNECTIONS_OPEN,
    CONNECTIONS_TOTAL, EVENTS_DROPPED, EVENTS_SENT, FRAMES_RECEIVED, FRAME_ENQUEUE_DURATION,
    IDENTITIES_ACTIVE,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logger: {0}")]
    LoggerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Increment a counter, optionally with labels.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::HistogramTimer::new(&$histogram)
    };
}
