//! Outbound (driven) ports for the temporal subsystem.
//!
//! Every clock the subsystem reads comes through `ClockSource`, so real
//! hardware and simulated test doubles are interchangeable and no randomness
//! is ever compiled into a production code path.

use async_trait::async_trait;
use shared_types::{AuditEvent, TemporalError, TimestampMicros, TimestampProposal};

/// One independent time source (hardware clock, GPS receiver, NTP
/// consensus, ...).
pub trait ClockSource: Send + Sync {
    /// Stable source name, used in error reports and measurements.
    fn name(&self) -> &str;

    /// Read the source's current time.
    fn read(&self) -> Result<TimestampMicros, TemporalError>;
}

/// A source of unpredictable jitter folded into secure timestamps.
pub trait EntropySource: Send + Sync {
    /// One jitter sample in microseconds. Small relative to the pairwise
    /// tolerance, unpredictable to an observer.
    fn sample(&self) -> u64;
}

/// Sink for temporal-attack alerts, toward the external audit collaborator.
pub trait AlertSink: Send + Sync {
    /// Deliver one alert event. Must not block the detector loop.
    fn alert(&self, event: AuditEvent);
}

/// Collects timestamp proposals from remote agents for a consensus round.
#[async_trait]
pub trait ProposalGatherer: Send + Sync {
    /// Gather proposals, waiting at most `timeout_micros`.
    async fn collect(&self, timeout_micros: u64) -> Result<Vec<TimestampProposal>, TemporalError>;
}
