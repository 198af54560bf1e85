//! Prometheus metrics for Quantum-Sentinel subsystems.
//!
//! All metrics follow the naming convention: `qs_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., threats_detected_total)
//! - **Gauge**: Value that can go up or down (e.g., active_threats)
//! - **Histogram**: Distribution of values (e.g., classifier_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CANARY DETECTION METRICS (Subsystem 1)
    // =========================================================================

    /// Total canary tokens generated
    pub static ref TOKENS_GENERATED: Counter = Counter::new(
        "qs_detection_tokens_generated_total",
        "Total number of canary tokens generated"
    ).expect("metric creation failed");

    /// Total token accesses recorded
    pub static ref ACCESSES_RECORDED: Counter = Counter::new(
        "qs_detection_accesses_recorded_total",
        "Total number of canary token accesses recorded"
    ).expect("metric creation failed");

    /// Threats detected, by indicator and level
    pub static ref THREATS_DETECTED: CounterVec = CounterVec::new(
        Opts::new("qs_detection_threats_total", "Threats detected by indicator"),
        &["indicator", "level"]  // level: medium/high/critical
    ).expect("metric creation failed");

    /// Currently active threats (inside the active window)
    pub static ref ACTIVE_THREATS: Gauge = Gauge::new(
        "qs_detection_active_threats",
        "Number of threats inside the active window"
    ).expect("metric creation failed");

    /// Detection cache lookups, by outcome
    pub static ref CACHE_LOOKUPS: CounterVec = CounterVec::new(
        Opts::new("qs_detection_cache_lookups_total", "Detection cache lookups"),
        &["outcome"]  // outcome: hit/miss
    ).expect("metric creation failed");

    /// Coordinated attacks flagged by the correlation engine
    pub static ref COORDINATED_ATTACKS: Counter = Counter::new(
        "qs_detection_coordinated_attacks_total",
        "Total number of coordinated attacks flagged"
    ).expect("metric creation failed");

    /// Classifier evaluation duration
    pub static ref CLASSIFIER_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qs_detection_classifier_duration_seconds",
            "Time spent running the classifier bank over one access window"
        ).buckets(exponential_buckets(0.00001, 2.0, 15).unwrap())
    ).expect("metric creation failed");

    // =========================================================================
    // TEMPORAL INTEGRITY METRICS (Subsystem 2)
    // =========================================================================

    /// Secure timestamps served
    pub static ref SECURE_TIMESTAMPS: Counter = Counter::new(
        "qs_temporal_secure_timestamps_total",
        "Total number of secure timestamps produced"
    ).expect("metric creation failed");

    /// Temporal-attack alerts, by kind
    pub static ref TEMPORAL_ALERTS: CounterVec = CounterVec::new(
        Opts::new("qs_temporal_alerts_total", "Temporal attack alerts"),
        &["kind"]  // kind: clock_speed_anomaly/time_source_manipulation/quantum_safety_margin
    ).expect("metric creation failed");

    /// Time commitments generated and verified, by operation and outcome
    pub static ref COMMITMENTS: CounterVec = CounterVec::new(
        Opts::new("qs_temporal_commitments_total", "Time commitment operations"),
        &["operation", "outcome"]  // operation: commit/verify, outcome: ok/failed
    ).expect("metric creation failed");

    /// Commitment generation duration (sequential hash chain)
    pub static ref COMMITMENT_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qs_temporal_commitment_duration_seconds",
            "Time spent generating VDF commitments"
        ).buckets(exponential_buckets(0.0001, 2.0, 12).unwrap())
    ).expect("metric creation failed");

    /// Consensus rounds, by outcome
    pub static ref CONSENSUS_ROUNDS: CounterVec = CounterVec::new(
        Opts::new("qs_temporal_consensus_rounds_total", "Timestamp consensus rounds"),
        &["outcome"]  // outcome: success/quorum_failure/low_confidence/timeout
    ).expect("metric creation failed");

    /// Confidence of the most recent consensus round
    pub static ref CONSENSUS_CONFIDENCE: Gauge = Gauge::new(
        "qs_temporal_consensus_confidence",
        "Confidence of the last completed consensus round"
    ).expect("metric creation failed");

    // =========================================================================
    // ERROR METRICS
    // =========================================================================

    /// Subsystem errors by type
    pub static ref SUBSYSTEM_ERRORS: CounterVec = CounterVec::new(
        Opts::new("qs_subsystem_errors_total", "Errors by subsystem and type"),
        &["subsystem", "error_type"]
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Detection
        Box::new(TOKENS_GENERATED.clone()),
        Box::new(ACCESSES_RECORDED.clone()),
        Box::new(THREATS_DETECTED.clone()),
        Box::new(ACTIVE_THREATS.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(COORDINATED_ATTACKS.clone()),
        Box::new(CLASSIFIER_DURATION.clone()),
        // Temporal
        Box::new(SECURE_TIMESTAMPS.clone()),
        Box::new(TEMPORAL_ALERTS.clone()),
        Box::new(COMMITMENTS.clone()),
        Box::new(COMMITMENT_DURATION.clone()),
        Box::new(CONSENSUS_ROUNDS.clone()),
        Box::new(CONSENSUS_CONFIDENCE.clone()),
        // Errors
        Box::new(SUBSYSTEM_ERRORS.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
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
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // May fail if already registered by another test, which is fine
        let _ = register_metrics();
    }

    #[test]
    fn test_counter_increment() {
        TOKENS_GENERATED.inc();
        assert!(TOKENS_GENERATED.get() >= 1.0);
    }

    #[test]
    fn test_gauge_set() {
        ACTIVE_THREATS.set(3.0);
        assert_eq!(ACTIVE_THREATS.get(), 3.0);
    }

    #[test]
    fn test_labeled_counter() {
        THREATS_DETECTED
            .with_label_values(&["superposition_access", "high"])
            .inc();
        assert!(
            THREATS_DETECTED
                .with_label_values(&["superposition_access", "high"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_histogram_timer() {
        let _timer = HistogramTimer::new(&CLASSIFIER_DURATION);
        std::thread::sleep(std::time::Duration::from_millis(1));
        // Timer observes on drop
    }
}
