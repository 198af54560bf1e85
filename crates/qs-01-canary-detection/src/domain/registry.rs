//! # Threat Registry
//!
//! Append-only store of detected threats with a time-windowed "active" view.
//!
//! INVARIANT-5: records are never mutated after insertion, and every read
//! returns an owned snapshot so writers are never blocked by readers.

use parking_lot::RwLock;
use serde::Serialize;
use shared_types::{ThreatLevel, ThreatRecord, TimestampMicros};

/// Aggregate statistics for the query API.
#[derive(Debug, Clone, Serialize)]
pub struct ThreatStatistics {
    /// All threats ever recorded.
    pub total_threats: usize,
    /// Threats inside the active window.
    pub active_threats: usize,
    /// Low-severity count (all time).
    pub low: usize,
    /// Medium-severity count (all time).
    pub medium: usize,
    /// High-severity count (all time).
    pub high: usize,
    /// Critical-severity count (all time).
    pub critical: usize,
    /// Mean confidence across all recorded threats.
    pub mean_confidence: f64,
    /// High cross-algorithm correlations observed (supplied by the service
    /// from the correlation engine; the registry itself reports zero).
    pub high_correlation_pairs: usize,
    /// Threat chains updated within the inactivity timeout (ditto).
    pub active_chains: usize,
    /// Coordinated-attack signals raised so far (ditto).
    pub coordinated_signals: u64,
}

/// Append-only threat store.
#[derive(Debug)]
pub struct ThreatRegistry {
    active_window_micros: u64,
    threats: RwLock<Vec<ThreatRecord>>,
}

impl ThreatRegistry {
    /// Registry whose "active" view spans `active_window_micros`.
    pub fn new(active_window_micros: u64) -> Self {
        Self {
            active_window_micros,
            threats: RwLock::new(Vec::new()),
        }
    }

    /// Record a threat. The record is immutable from here on.
    pub fn insert(&self, threat: ThreatRecord) {
        self.threats.write().push(threat);
    }

    /// Threats detected within the active window of `now`, oldest-first.
    pub fn active_threats(&self, now: TimestampMicros) -> Vec<ThreatRecord> {
        let cutoff = now.saturating_sub(self.active_window_micros);
        self.threats
            .read()
            .iter()
            .filter(|t| t.detected_at >= cutoff)
            .cloned()
            .collect()
    }

    /// Full history snapshot, oldest-first.
    pub fn history(&self) -> Vec<ThreatRecord> {
        self.threats.read().clone()
    }

    /// Counts by level plus mean confidence.
    pub fn statistics(&self, now: TimestampMicros) -> ThreatStatistics {
        let threats = self.threats.read();
        let cutoff = now.saturating_sub(self.active_window_micros);
        let count = |level: ThreatLevel| threats.iter().filter(|t| t.level == level).count();
        let mean_confidence = if threats.is_empty() {
            0.0
        } else {
            threats.iter().map(|t| t.confidence).sum::<f64>() / threats.len() as f64
        };
        ThreatStatistics {
            total_threats: threats.len(),
            active_threats: threats.iter().filter(|t| t.detected_at >= cutoff).count(),
            low: count(ThreatLevel::Low),
            medium: count(ThreatLevel::Medium),
            high: count(ThreatLevel::High),
            critical: count(ThreatLevel::Critical),
            mean_confidence,
            high_correlation_pairs: 0,
            active_chains: 0,
            coordinated_signals: 0,
        }
    }
}
