//! Detection configuration.
//!
//! The numeric thresholds are empirical defaults carried over from field
//! observation, not values calibrated against real attack data. Every one of
//! them is overridable per service instance.

use shared_types::{MICROS_PER_MILLI, MICROS_PER_SEC};

/// Tunable parameters for the detection half.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum mean indicator confidence that emits a `ThreatRecord`.
    pub sensitivity_threshold: f64,

    /// Access records older than this are pruned from the ledger.
    pub retention_micros: u64,

    /// Cross-token window used by the entanglement heuristic.
    pub entanglement_window_micros: u64,

    /// TTL of memoized classifier results.
    pub cache_ttl_micros: u64,

    /// Width of the access-count bucket in the cache key. Accesses within
    /// the same decade of counts reuse the memoized round, so a burst pays
    /// for classification once per bucket per TTL window.
    pub cache_count_bucket: u64,

    /// Threats older than this drop out of the "active" view.
    pub active_threat_window_micros: u64,

    /// Window for cross-algorithm correlation.
    pub correlation_window_micros: u64,

    /// Inactivity timeout before a threat chain closes. Closed chains are
    /// retained for twice this long for trend analysis.
    pub chain_timeout_micros: u64,

    /// Window for the coordinated-attack check.
    pub coordination_window_micros: u64,

    /// Minimum mean confidence for a coordinated-attack signal.
    pub coordination_min_confidence: f64,

    /// Distinct indicator types required for a coordinated-attack signal.
    pub coordination_min_indicators: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sensitivity_threshold: 0.7,
            retention_micros: 60 * MICROS_PER_SEC,
            entanglement_window_micros: 50 * MICROS_PER_MILLI,
            cache_ttl_micros: 5 * MICROS_PER_SEC,
            cache_count_bucket: 10,
            active_threat_window_micros: 300 * MICROS_PER_SEC,
            correlation_window_micros: 10 * MICROS_PER_SEC,
            chain_timeout_micros: 30 * MICROS_PER_SEC,
            coordination_window_micros: 5 * MICROS_PER_SEC,
            coordination_min_confidence: 0.75,
            coordination_min_indicators: 3,
        }
    }
}
