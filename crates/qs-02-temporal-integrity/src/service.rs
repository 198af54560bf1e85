//! Temporal-integrity service facade.
//!
//! Wires the aggregator, isolation reference, commitment service and
//! consensus coordinator into the one surface other subsystems depend on.
//! Implements `shared_types::SecureClock`, which is how the detection half
//! consumes hardened time without linking against this crate's internals.

use crate::domain::{
    ConsensusCoordinator, IsolationReference, TemporalCommitmentService, TemporalConfig,
    TimeSourceAggregator,
};
use crate::ports::{ClockSource, EntropySource, ProposalGatherer};
use shared_types::{
    ConsensusTimestamp, IsolatedTimeReference, SecureClock, TemporalError, TimeCommitment,
    TimestampMicros,
};
use std::sync::Arc;

/// The temporal subsystem's public surface.
pub struct TemporalService<G: ProposalGatherer> {
    aggregator: Arc<TimeSourceAggregator>,
    isolation: Arc<IsolationReference>,
    commitments: Arc<TemporalCommitmentService>,
    coordinator: ConsensusCoordinator,
    gatherer: G,
    proposal_timeout_micros: u64,
}

impl<G: ProposalGatherer> TemporalService<G> {
    /// Assemble the service from sources and config.
    pub fn new(
        config: &TemporalConfig,
        primary_sources: Vec<Box<dyn ClockSource>>,
        entropy: Box<dyn EntropySource>,
        reference: Box<dyn ClockSource>,
        gatherer: G,
    ) -> Self {
        Self {
            aggregator: Arc::new(TimeSourceAggregator::new(
                primary_sources,
                entropy,
                config.pairwise_tolerance_micros,
            )),
            isolation: Arc::new(IsolationReference::new(
                reference,
                config.isolation_tolerance_micros,
            )),
            commitments: Arc::new(TemporalCommitmentService::new(
                config.vdf_difficulty,
                config.commitment_freshness_micros,
            )),
            coordinator: ConsensusCoordinator::new(
                config.consensus_outlier_micros,
                config.consensus_min_confidence,
            ),
            gatherer,
            proposal_timeout_micros: config.proposal_timeout_micros,
        }
    }

    /// Shared handle to the aggregator, for wiring the attack detector.
    pub fn aggregator(&self) -> Arc<TimeSourceAggregator> {
        Arc::clone(&self.aggregator)
    }

    /// Shared handle to the isolation reference.
    pub fn isolation(&self) -> Arc<IsolationReference> {
        Arc::clone(&self.isolation)
    }

    /// Bind a secure timestamp to `data` with a VDF commitment.
    ///
    /// Generation is CPU-bound sequential hashing; it runs on the blocking
    /// pool so it never stalls the async runtime.
    pub async fn commit(&self, data: Vec<u8>) -> Result<TimeCommitment, TemporalError> {
        let timestamp = self.aggregator.secure_timestamp()?;
        let commitments = Arc::clone(&self.commitments);
        tokio::task::spawn_blocking(move || commitments.commit(timestamp, &data))
            .await
            .map_err(|e| TemporalError::CommitmentInvalid {
                reason: format!("commitment task failed: {e}"),
            })
    }

    /// Verify a commitment against the current secure time.
    pub fn verify_commitment(&self, commitment: &TimeCommitment) -> Result<(), TemporalError> {
        let now = self.aggregator.secure_timestamp()?;
        self.commitments.verify_strict(commitment, now)
    }

    /// Run one distributed consensus round over gathered proposals.
    pub async fn consensus_round(&self) -> Result<ConsensusTimestamp, TemporalError> {
        self.coordinator
            .round(&self.gatherer, self.proposal_timeout_micros)
            .await
    }

    /// Fresh isolated-reference reading with proof.
    pub fn isolated_reference(&self) -> Result<IsolatedTimeReference, TemporalError> {
        self.isolation.fresh()
    }

    /// Validate an external timestamp against the isolated reference.
    pub fn validate_isolated(
        &self,
        external: TimestampMicros,
    ) -> Result<IsolatedTimeReference, TemporalError> {
        self.isolation.validate(external)
    }
}

impl<G: ProposalGatherer> SecureClock for TemporalService<G> {
    fn now(&self) -> Result<TimestampMicros, TemporalError> {
        self.aggregator.secure_timestamp()
    }
}
