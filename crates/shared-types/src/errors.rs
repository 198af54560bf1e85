//! # Error Types
//!
//! Defines the shared temporal-integrity error taxonomy. Both halves see
//! these: the detection half through its secure-clock port, the temporal
//! half everywhere.

use thiserror::Error;

/// Failures of the secure-timestamp contract.
///
/// None of these are recovered automatically. A silently substituted
/// timestamp would defeat the property the temporal half exists to provide,
/// so every variant propagates to the caller.
#[derive(Debug, Clone, Error)]
pub enum TemporalError {
    /// Two independent time sources disagree beyond tolerance.
    #[error("temporal attack detected: {source_a} and {source_b} differ by {deviation_ms}ms (tolerance {tolerance_ms}ms)")]
    AttackDetected {
        /// First source in the failing pair.
        source_a: String,
        /// Second source in the failing pair.
        source_b: String,
        /// Observed pairwise deviation.
        deviation_ms: u64,
        /// Configured tolerance.
        tolerance_ms: u64,
    },

    /// Too few proposals survived the outlier filter.
    #[error("timestamp consensus failed: {surviving} of {proposed} proposals survived, need {required}")]
    ConsensusFailure {
        /// Proposals that survived the outlier filter.
        surviving: usize,
        /// Total proposals offered.
        proposed: usize,
        /// Byzantine quorum, floor(2n/3) + 1.
        required: usize,
    },

    /// Consensus succeeded numerically but with unacceptable confidence.
    #[error("consensus confidence {confidence:.3} below minimum {minimum:.3}")]
    LowConsensusConfidence {
        /// Achieved confidence.
        confidence: f64,
        /// Configured floor.
        minimum: f64,
    },

    /// A time commitment is older than the freshness bound.
    #[error("stale commitment: age {age_ms}ms exceeds freshness bound {bound_ms}ms")]
    StaleCommitment {
        /// Commitment age at verification time.
        age_ms: u64,
        /// Configured freshness bound.
        bound_ms: u64,
    },

    /// A time commitment failed structural verification.
    #[error("invalid commitment: {reason}")]
    CommitmentInvalid {
        /// What the verifier found.
        reason: String,
    },

    /// An external timestamp drifted from the isolated reference.
    #[error("isolation drift: external timestamp off by {drift_ms}ms (tolerance {tolerance_ms}ms)")]
    IsolationDrift {
        /// Observed drift against the fresh reference.
        drift_ms: u64,
        /// Configured tolerance.
        tolerance_ms: u64,
    },

    /// A clock source could not be read at all.
    #[error("clock source unavailable: {source_name}")]
    ClockUnavailable {
        /// Name of the failing source.
        source_name: String,
    },

    /// No remote agents answered within the collection window.
    #[error("proposal collection timed out after {timeout_ms}ms")]
    ProposalTimeout {
        /// Bounded wait that elapsed.
        timeout_ms: u64,
    },
}
