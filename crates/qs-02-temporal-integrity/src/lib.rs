//! # Temporal-Integrity Subsystem
//!
//! **Subsystem ID:** 2
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Guarantees that every timestamp used for expiry and ordering decisions
//! cannot be silently manipulated by an attacker controlling the local
//! clock. Produces the "secure timestamp" the detection half consumes.
//!
//! ## Components
//!
//! ```text
//! [ClockSource x N] ──→ [TimeSourceAggregator] ──→ secure timestamp
//!                              │
//! [IsolationReference] ──→ [TemporalAttackDetector] ──alerts──→ [AlertSink]
//!                              │
//! [TemporalCommitmentService]  │        [ConsensusCoordinator]
//!   commit / verify            │          BFT median over proposals
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Source disagreement is never absorbed | `domain/aggregator.rs` - pairwise check fails the request |
//! | INVARIANT-2 | Commitment verification is a pure function of its inputs | `domain/commitment.rs` - caller supplies `now` |
//! | INVARIANT-3 | Consensus requires floor(2n/3)+1 survivors | `domain/consensus.rs` - quorum check before median |
//! | INVARIANT-4 | Isolated references are never cached | `domain/isolation.rs` - fresh reading per call |
//! | INVARIANT-5 | Detector loop exits within one tick of `stop()` | `domain/detector.rs` - flag checked every iteration |
//!
//! ## Security
//!
//! The VDF commitment is non-parallelizable by construction: generation
//! walks a sequential hash chain, verification replays spot-checked
//! checkpoint segments. The asymmetry is the security property.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    ConsensusCoordinator, DetectorState, IsolationReference, TemporalAttackDetector,
    TemporalCommitmentService, TemporalConfig, TimeSourceAggregator,
};
pub use ports::{AlertSink, ClockSource, EntropySource, ProposalGatherer};
pub use service::TemporalService;
