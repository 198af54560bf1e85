//! # Temporal Value Types
//!
//! Outputs of the temporal-integrity half: commitments, consensus results,
//! isolated references, and per-tick measurements.

use crate::entities::TimestampMicros;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 32-byte SHA3-256 digest.
pub type Digest = [u8; 32];

/// One reading of every configured clock source, taken in a single tick.
/// Ephemeral; the attack detector consumes it and moves on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingMeasurement {
    /// The host system clock.
    pub system_time: TimestampMicros,
    /// The isolated reference clock.
    pub reference_time: TimestampMicros,
    /// Named readings from every aggregated source.
    pub source_times: Vec<(String, TimestampMicros)>,
    /// system elapsed / reference elapsed since the previous measurement.
    /// 1.0 when both clocks advance in lockstep.
    pub clock_ratio: f64,
}

/// A sequential-computation proof binding a timestamp to arbitrary data.
///
/// Immutable once produced. Verification is a pure function of the fields
/// here plus the verifier's own clock reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeCommitment {
    /// Unique commitment id.
    pub id: Uuid,
    /// The committed timestamp.
    pub timestamp: TimestampMicros,
    /// SHA3-256 of `timestamp || data`.
    pub data_digest: Digest,
    /// Final state of the sequential hash chain.
    pub vdf_output: Digest,
    /// Intermediate chain states recorded every 10% of the iterations.
    /// Verification replays checkpoint-to-checkpoint segments from these.
    pub checkpoints: Vec<Digest>,
    /// 4-leaf Merkle root over timestamp hash, chain output, difficulty
    /// hash, and entropy.
    pub merkle_root: Digest,
    /// Random entropy folded into the Merkle root.
    pub entropy: Digest,
    /// Difficulty parameter; the chain ran `difficulty * 100` iterations.
    pub difficulty: u64,
}

/// A timestamp offered by one agent for a consensus round. Ephemeral input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampProposal {
    /// The proposing agent.
    pub agent_id: String,
    /// Its claimed current time.
    pub timestamp: TimestampMicros,
}

/// Durable output of one consensus round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusTimestamp {
    /// Median of the surviving proposals.
    pub value: TimestampMicros,
    /// Agents whose proposals survived the outlier filter.
    pub participants: Vec<String>,
    /// `max(0, 1 - max_deviation / outlier_tolerance)`.
    pub confidence: f64,
}

/// Static description of what the isolated reference clock guarantees.
/// Documentation attached to every validation result, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsolationGuarantees {
    /// The reference hardware shares no bus with the host clock.
    pub physically_isolated: bool,
    /// The reference never synchronizes over a network.
    pub network_independent: bool,
    /// Tampering with the reference leaves detectable evidence.
    pub tamper_evident: bool,
}

impl Default for IsolationGuarantees {
    fn default() -> Self {
        Self {
            physically_isolated: true,
            network_independent: true,
            tamper_evident: true,
        }
    }
}

/// A fresh reading of the isolated reference clock.
///
/// Produced per validation call and never cached; a stale reference would
/// defeat its purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolatedTimeReference {
    /// The reference reading.
    pub value: TimestampMicros,
    /// SHA3-256 binding the reading, the isolation marker, and randomness.
    pub isolation_proof: Digest,
    /// What the reference clock guarantees.
    pub guarantees: IsolationGuarantees,
}
