//! # Time Source Aggregator
//!
//! Reads independent clock sources, cross-validates the primary three, and
//! produces the secure timestamp: hardware time plus entropy jitter,
//! deliberately unpredictable yet independently verifiable.
//!
//! INVARIANT-1: pairwise disagreement beyond tolerance fails the request
//! with `TemporalError::AttackDetected`. Never absorbed, never retried with
//! fewer sources.

use crate::ports::{ClockSource, EntropySource};
use shared_types::{TemporalError, TimestampMicros, MICROS_PER_MILLI};

/// Aggregates N independent clock sources into one hardened reading.
pub struct TimeSourceAggregator {
    /// Primary sources, pairwise cross-validated. At least three.
    primary: Vec<Box<dyn ClockSource>>,
    /// Jitter folded into the returned timestamp.
    entropy: Box<dyn EntropySource>,
    pairwise_tolerance_micros: u64,
}

impl TimeSourceAggregator {
    /// Build an aggregator over the given sources.
    ///
    /// `primary[0]` is the hardware-clock analog whose reading anchors the
    /// secure timestamp.
    pub fn new(
        primary: Vec<Box<dyn ClockSource>>,
        entropy: Box<dyn EntropySource>,
        pairwise_tolerance_micros: u64,
    ) -> Self {
        debug_assert!(primary.len() >= 3, "need at least three primary sources");
        Self {
            primary,
            entropy,
            pairwise_tolerance_micros,
        }
    }

    /// Read every source, newest snapshot per call.
    pub fn read_all(&self) -> Result<Vec<(String, TimestampMicros)>, TemporalError> {
        self.primary
            .iter()
            .map(|s| Ok((s.name().to_string(), s.read()?)))
            .collect()
    }

    /// Cross-validate the primary sources and produce a secure timestamp.
    pub fn secure_timestamp(&self) -> Result<TimestampMicros, TemporalError> {
        let readings = self.read_all()?;
        self.validate_pairwise(&readings, self.pairwise_tolerance_micros)?;
        let hardware = readings[0].1;
        Ok(hardware + self.entropy.sample())
    }

    /// Pairwise deviation check over a set of readings.
    pub fn validate_pairwise(
        &self,
        readings: &[(String, TimestampMicros)],
        tolerance_micros: u64,
    ) -> Result<(), TemporalError> {
        for i in 0..readings.len() {
            for j in (i + 1)..readings.len() {
                let deviation = readings[i].1.abs_diff(readings[j].1);
                if deviation > tolerance_micros {
                    tracing::error!(
                        subsystem = "temporal-integrity",
                        source_a = %readings[i].0,
                        source_b = %readings[j].0,
                        deviation_ms = deviation / MICROS_PER_MILLI,
                        "time source disagreement"
                    );
                    return Err(TemporalError::AttackDetected {
                        source_a: readings[i].0.clone(),
                        source_b: readings[j].0.clone(),
                        deviation_ms: deviation / MICROS_PER_MILLI,
                        tolerance_ms: tolerance_micros / MICROS_PER_MILLI,
                    });
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TimeSourceAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSourceAggregator")
            .field("primary_sources", &self.primary.len())
            .field("pairwise_tolerance_micros", &self.pairwise_tolerance_micros)
            .finish()
    }
}
