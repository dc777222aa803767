//! Prometheus metrics.
//!
//! All metrics follow the naming convention: `mc_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CONNECTIONS
    // =========================================================================

    /// Open transport connections
    pub static ref CONNECTIONS_OPEN: Gauge = Gauge::new(
        "mc_connections_open",
        "Number of currently open connections"
    ).expect("metric creation failed");

    /// Connections accepted since start
    pub static ref CONNECTIONS_TOTAL: Counter = Counter::new(
        "mc_connections_accepted_total",
        "Total connections accepted"
    ).expect("metric creation failed");

    /// Bound display names
    pub static ref IDENTITIES_ACTIVE: Gauge = Gauge::new(
        "mc_identities_active",
        "Number of connections holding a display name"
    ).expect("metric creation failed");

    // =========================================================================
    // TRAFFIC
    // =========================================================================

    /// Inbound frames by kind
    pub static ref FRAMES_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("mc_frames_received_total", "Inbound frames"),
        &["kind"]  // kind: claim_name/message/invalid
    ).expect("metric creation failed");

    /// Commands seen by name
    pub static ref COMMANDS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("mc_commands_received_total", "Commands received"),
        &["command"]
    ).expect("metric creation failed");

    /// Outbound events written to sockets, by type
    pub static ref EVENTS_SENT: CounterVec = CounterVec::new(
        Opts::new("mc_events_sent_total", "Outbound events written to clients"),
        &["type"]  // type: claim_accepted/claim_rejected/chat_message/...
    ).expect("metric creation failed");

    /// Outbound events that never reached a client
    pub static ref EVENTS_DROPPED: Gauge = Gauge::new(
        "mc_events_dropped",
        "Outbound events dropped on full or closed outboxes"
    ).expect("metric creation failed");

    /// Time from frame receipt to enqueue on the session inbox
    pub static ref FRAME_ENQUEUE_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "mc_frame_enqueue_duration_seconds",
            "Time spent handing a frame to its session worker"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).unwrap_or_default())
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(CONNECTIONS_OPEN.clone()),
        Box::new(CONNECTIONS_TOTAL.clone()),
        Box::new(IDENTITIES_ACTIVE.clone()),
        Box::new(FRAMES_RECEIVED.clone()),
        Box::new(COMMANDS_RECEIVED.clone()),
        Box::new(EVENTS_SENT.clone()),
        Box::new(EVENTS_DROPPED.clone()),
        Box::new(FRAME_ENQUEUE_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
