//! Domain layer: aggregation, commitments, detection, consensus.

pub mod aggregator;
pub mod commitment;
pub mod config;
pub mod consensus;
pub mod detector;
pub mod hashing;
pub mod isolation;

pub use aggregator::TimeSourceAggregator;
pub use commitment::TemporalCommitmentService;
pub use config::TemporalConfig;
pub use consensus::ConsensusCoordinator;
pub use detector::{DetectorState, TemporalAttackDetector};
pub use isolation::IsolationReference;
