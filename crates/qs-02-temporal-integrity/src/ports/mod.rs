//! Ports (hexagonal boundaries) for the temporal subsystem.

pub mod outbound;

pub use outbound::{AlertSink, ClockSource, EntropySource, ProposalGatherer};
