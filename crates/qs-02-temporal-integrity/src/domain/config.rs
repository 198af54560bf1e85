//! Temporal subsystem configuration.
//!
//! Tolerances here are empirical defaults, not values derived from real
//! attack data; every deployment can override them.

use shared_types::{MICROS_PER_MILLI, MICROS_PER_SEC};

/// Tunable parameters for the temporal half.
#[derive(Debug, Clone)]
pub struct TemporalConfig {
    /// Maximum pairwise deviation between primary sources when producing a
    /// secure timestamp.
    pub pairwise_tolerance_micros: u64,

    /// Looser pairwise bound the attack detector polls against.
    pub detector_pairwise_tolerance_micros: u64,

    /// Relative clock-speed drift against baseline that raises an alert.
    pub clock_ratio_tolerance: f64,

    /// Ceiling on fragment-expiry / attack-duration; above this, protected
    /// data would outlive an attacker's compute budget.
    pub safety_margin_max: f64,

    /// Fragment-expiration duration the platform currently uses upstream.
    pub fragment_expiry_micros: u64,

    /// Worst-case completion time of a factoring-class attack.
    pub factoring_attack_micros: u64,

    /// Worst-case completion time of a search-class attack.
    pub search_attack_micros: u64,

    /// Detector poll tick.
    pub poll_interval_micros: u64,

    /// Floor the countermeasure interval-halving stops at.
    pub min_poll_interval_micros: u64,

    /// Measurements sampled before monitoring starts.
    pub baseline_samples: usize,

    /// Maximum drift an external timestamp may show against the isolated
    /// reference.
    pub isolation_tolerance_micros: u64,

    /// VDF difficulty; the chain runs `difficulty * 100` iterations.
    pub vdf_difficulty: u64,

    /// Commitments older than this fail verification.
    pub commitment_freshness_micros: u64,

    /// Proposals farther than this from the round median are outliers.
    pub consensus_outlier_micros: u64,

    /// Minimum acceptable consensus confidence.
    pub consensus_min_confidence: f64,

    /// Bounded wait for remote proposals.
    pub proposal_timeout_micros: u64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            pairwise_tolerance_micros: 50 * MICROS_PER_MILLI,
            detector_pairwise_tolerance_micros: 100 * MICROS_PER_MILLI,
            clock_ratio_tolerance: 0.05,
            safety_margin_max: 0.1,
            fragment_expiry_micros: 2 * MICROS_PER_SEC,
            factoring_attack_micros: 75 * MICROS_PER_SEC,
            search_attack_micros: 48 * MICROS_PER_SEC,
            poll_interval_micros: 10 * MICROS_PER_MILLI,
            min_poll_interval_micros: MICROS_PER_MILLI,
            baseline_samples: 10,
            isolation_tolerance_micros: 10 * MICROS_PER_MILLI,
            vdf_difficulty: 50,
            commitment_freshness_micros: MICROS_PER_SEC,
            consensus_outlier_micros: 100 * MICROS_PER_MILLI,
            consensus_min_confidence: 0.8,
            proposal_timeout_micros: 500 * MICROS_PER_MILLI,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_tolerances() {
        let config = TemporalConfig::default();
        assert_eq!(config.pairwise_tolerance_micros, 50_000);
        assert_eq!(config.detector_pairwise_tolerance_micros, 100_000);
        assert_eq!(config.clock_ratio_tolerance, 0.05);
        assert_eq!(config.safety_margin_max, 0.1);
        assert_eq!(config.commitment_freshness_micros, 1_000_000);
    }
}
