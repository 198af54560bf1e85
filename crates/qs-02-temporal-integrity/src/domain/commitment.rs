//! # Temporal Commitment Service
//!
//! Builds and verifies sequential-computation (VDF-style) proofs binding a
//! timestamp to arbitrary data.
//!
//! Generation walks `difficulty * 100` chained hash iterations; the chain is
//! inherently sequential, so no amount of parallel hardware shortens it.
//! Verification replays only spot-checked checkpoint segments, keeping the
//! generate-slow / verify-fast asymmetry that makes the proof useful.
//!
//! INVARIANT-2: `verify` is a pure function of the commitment plus the
//! caller-supplied `now`; no hidden state.

use crate::domain::hashing::{sha3_many, sha3_u64};
use rand::RngCore;
use shared_types::{Digest, TemporalError, TimeCommitment, TimestampMicros, MICROS_PER_MILLI};
use uuid::Uuid;

/// Checkpoints recorded along the chain (one every 10% of iterations).
const CHECKPOINT_COUNT: u64 = 10;

/// Builds and verifies time commitments.
#[derive(Debug, Clone)]
pub struct TemporalCommitmentService {
    difficulty: u64,
    freshness_micros: u64,
}

impl TemporalCommitmentService {
    /// Service producing chains of `difficulty * 100` iterations, with the
    /// given freshness bound on verification.
    pub fn new(difficulty: u64, freshness_micros: u64) -> Self {
        Self {
            difficulty: difficulty.max(1),
            freshness_micros,
        }
    }

    /// Number of chain iterations per commitment.
    pub fn iterations(&self) -> u64 {
        self.difficulty * 100
    }

    /// Produce a commitment binding `timestamp` to `data`.
    ///
    /// CPU-bound and sequential; callers on a detection hot path must move
    /// this onto a blocking task.
    pub fn commit(&self, timestamp: TimestampMicros, data: &[u8]) -> TimeCommitment {
        let data_digest = sha3_many(&[&timestamp.to_le_bytes(), data]);
        let iterations = self.iterations();
        let interval = (iterations / CHECKPOINT_COUNT).max(1);

        let mut state = data_digest;
        let mut checkpoints = Vec::with_capacity(CHECKPOINT_COUNT as usize);
        for i in 0..iterations {
            state = sha3_many(&[&state, &i.to_le_bytes()]);
            if (i + 1) % interval == 0 {
                checkpoints.push(state);
            }
        }

        let mut entropy = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut entropy);
        let merkle_root = merkle_root(timestamp, &state, self.difficulty, &entropy);

        TimeCommitment {
            id: Uuid::new_v4(),
            timestamp,
            data_digest,
            vdf_output: state,
            checkpoints,
            merkle_root,
            entropy,
            difficulty: self.difficulty,
        }
    }

    /// Verify a commitment against the caller's clock reading.
    ///
    /// Replays the first, last, and one root-selected middle segment, checks
    /// the Merkle root, and enforces the freshness bound. Flipping any byte
    /// of `vdf_output` or an inspected checkpoint fails verification.
    pub fn verify(&self, commitment: &TimeCommitment, now: TimestampMicros) -> bool {
        match self.check(commitment, now) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(
                    subsystem = "temporal-integrity",
                    commitment_id = %commitment.id,
                    %reason,
                    "commitment rejected"
                );
                false
            }
        }
    }

    /// Like `verify`, but surfaces the staleness case as a typed error.
    pub fn verify_strict(
        &self,
        commitment: &TimeCommitment,
        now: TimestampMicros,
    ) -> Result<(), TemporalError> {
        let age = now.saturating_sub(commitment.timestamp);
        if age >= self.freshness_micros {
            return Err(TemporalError::StaleCommitment {
                age_ms: age / MICROS_PER_MILLI,
                bound_ms: self.freshness_micros / MICROS_PER_MILLI,
            });
        }
        self.check(commitment, now)
            .map_err(|reason| TemporalError::CommitmentInvalid { reason })
    }

    fn check(&self, commitment: &TimeCommitment, now: TimestampMicros) -> Result<(), String> {
        let age = now.saturating_sub(commitment.timestamp);
        if age >= self.freshness_micros {
            return Err(format!("stale: age {age}us"));
        }

        let iterations = commitment.difficulty.max(1) * 100;
        let interval = (iterations / CHECKPOINT_COUNT).max(1);
        if commitment.checkpoints.len() != CHECKPOINT_COUNT as usize {
            return Err(format!(
                "checkpoint count {} != {CHECKPOINT_COUNT}",
                commitment.checkpoints.len()
            ));
        }

        let expected_root = merkle_root(
            commitment.timestamp,
            &commitment.vdf_output,
            commitment.difficulty,
            &commitment.entropy,
        );
        if expected_root != commitment.merkle_root {
            return Err("merkle root mismatch".into());
        }

        let last = CHECKPOINT_COUNT as usize - 1;
        if commitment.checkpoints[last] != commitment.vdf_output {
            return Err("final checkpoint diverges from output".into());
        }

        // Spot-check: first, last, and one root-selected middle segment.
        let middle = 1 + (commitment.merkle_root[0] as usize % (last - 1));
        for segment in [0, middle, last] {
            self.replay_segment(commitment, segment as u64, interval)?;
        }
        Ok(())
    }

    fn replay_segment(
        &self,
        commitment: &TimeCommitment,
        segment: u64,
        interval: u64,
    ) -> Result<(), String> {
        let mut state = if segment == 0 {
            commitment.data_digest
        } else {
            commitment.checkpoints[segment as usize - 1]
        };
        for i in segment * interval..(segment + 1) * interval {
            state = sha3_many(&[&state, &i.to_le_bytes()]);
        }
        if state != commitment.checkpoints[segment as usize] {
            return Err(format!("segment {segment} replay mismatch"));
        }
        Ok(())
    }
}

fn merkle_root(
    timestamp: TimestampMicros,
    vdf_output: &Digest,
    difficulty: u64,
    entropy: &Digest,
) -> Digest {
    let l1 = sha3_u64(timestamp);
    let l3 = sha3_u64(difficulty);
    let left = sha3_many(&[&l1, vdf_output]);
    let right = sha3_many(&[&l3, entropy]);
    sha3_many(&[&left, &right])
}
