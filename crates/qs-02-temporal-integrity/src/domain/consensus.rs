//! # Consensus Coordinator
//!
//! Byzantine-fault-tolerant median consensus over timestamp proposals from
//! multiple agents.
//!
//! INVARIANT-3: a round succeeds only when at least floor(2n/3) + 1
//! proposals survive the outlier filter. With at most one third of agents
//! faulty, the surviving median cannot be dragged outside the honest range.

use crate::ports::ProposalGatherer;
use shared_types::{
    ConsensusTimestamp, TemporalError, TimestampMicros, TimestampProposal, MICROS_PER_MILLI,
};

/// Runs timestamp consensus rounds.
#[derive(Debug, Clone)]
pub struct ConsensusCoordinator {
    outlier_tolerance_micros: u64,
    min_confidence: f64,
}

impl ConsensusCoordinator {
    /// Coordinator with the given outlier tolerance and confidence floor.
    pub fn new(outlier_tolerance_micros: u64, min_confidence: f64) -> Self {
        Self {
            outlier_tolerance_micros,
            min_confidence,
        }
    }

    /// Run one round over already-collected proposals.
    pub fn consensus(
        &self,
        proposals: &[TimestampProposal],
    ) -> Result<ConsensusTimestamp, TemporalError> {
        let total = proposals.len();
        let required = (2 * total) / 3 + 1;
        if total == 0 {
            return Err(TemporalError::ConsensusFailure {
                surviving: 0,
                proposed: 0,
                required,
            });
        }

        let raw_median = median(proposals.iter().map(|p| p.timestamp));
        let survivors: Vec<&TimestampProposal> = proposals
            .iter()
            .filter(|p| p.timestamp.abs_diff(raw_median) <= self.outlier_tolerance_micros)
            .collect();

        if survivors.len() < required {
            return Err(TemporalError::ConsensusFailure {
                surviving: survivors.len(),
                proposed: total,
                required,
            });
        }

        let value = median(survivors.iter().map(|p| p.timestamp));
        let max_deviation = survivors
            .iter()
            .map(|p| p.timestamp.abs_diff(value))
            .max()
            .unwrap_or(0);
        let confidence =
            (1.0 - max_deviation as f64 / self.outlier_tolerance_micros as f64).max(0.0);

        if confidence < self.min_confidence {
            return Err(TemporalError::LowConsensusConfidence {
                confidence,
                minimum: self.min_confidence,
            });
        }

        tracing::info!(
            subsystem = "temporal-integrity",
            participants = survivors.len(),
            discarded = total - survivors.len(),
            confidence,
            "timestamp consensus reached"
        );
        Ok(ConsensusTimestamp {
            value,
            participants: survivors.iter().map(|p| p.agent_id.clone()).collect(),
            confidence,
        })
    }

    /// Gather proposals through the port (bounded wait) and run a round.
    pub async fn round<G: ProposalGatherer>(
        &self,
        gatherer: &G,
        timeout_micros: u64,
    ) -> Result<ConsensusTimestamp, TemporalError> {
        let collect = gatherer.collect(timeout_micros);
        let proposals = tokio::time::timeout(
            std::time::Duration::from_micros(timeout_micros),
            collect,
        )
        .await
        .map_err(|_| TemporalError::ProposalTimeout {
            timeout_ms: timeout_micros / MICROS_PER_MILLI,
        })??;
        self.consensus(&proposals)
    }
}

fn median(timestamps: impl Iterator<Item = TimestampMicros>) -> TimestampMicros {
    let mut sorted: Vec<TimestampMicros> = timestamps.collect();
    sorted.sort_unstable();
    let n = sorted.len();
    if n == 0 {
        return 0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2
    }
}
