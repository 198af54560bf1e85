//! Adapters for the temporal subsystem's outbound ports.
//!
//! Production deployments plug real hardware behind `ClockSource`; this
//! module ships simulated sources (system clock plus a per-source offset
//! model) so the subsystem runs end to end on commodity machines, alongside
//! the test doubles the domain tests use.

use crate::ports::{AlertSink, ClockSource, EntropySource, ProposalGatherer};
use async_trait::async_trait;
use rand::Rng;
use shared_types::{AuditEvent, TemporalError, TimestampMicros, TimestampProposal};

/// System clock shifted by a fixed signed offset.
///
/// Doubles as a simulated independent source: offsets model the small fixed
/// skews real GPS or NTP paths exhibit.
pub struct OffsetClock {
    name: String,
    offset_micros: i64,
}

impl OffsetClock {
    pub fn new(name: impl Into<String>, offset_micros: i64) -> Self {
        Self {
            name: name.into(),
            offset_micros,
        }
    }
}

impl ClockSource for OffsetClock {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> Result<TimestampMicros, TemporalError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| TemporalError::ClockUnavailable {
                source_name: self.name.clone(),
            })?
            .as_micros() as u64;
        Ok(now.saturating_add_signed(self.offset_micros))
    }
}

/// Standard simulated trio: hardware anchor, GPS at +200us, NTP consensus
/// at -150us. All within the 50ms pairwise tolerance under normal operation.
pub fn simulated_sources() -> Vec<Box<dyn ClockSource>> {
    vec![
        Box::new(OffsetClock::new("hardware", 0)),
        Box::new(OffsetClock::new("gps", 200)),
        Box::new(OffsetClock::new("ntp-consensus", -150)),
    ]
}

/// Thread-local RNG jitter in `[0, max_micros)`.
pub struct RandomJitter {
    max_micros: u64,
}

impl RandomJitter {
    pub fn new(max_micros: u64) -> Self {
        Self { max_micros }
    }
}

impl EntropySource for RandomJitter {
    fn sample(&self) -> u64 {
        if self.max_micros == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..self.max_micros)
        }
    }
}

/// Constant jitter, for deterministic tests.
pub struct FixedJitter(pub u64);

impl EntropySource for FixedJitter {
    fn sample(&self) -> u64 {
        self.0
    }
}

/// Alert sink that logs through `tracing` at error level.
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, event: AuditEvent) {
        tracing::error!(
            subsystem = "temporal-integrity",
            event_type = %event.event_type,
            details = %event.details,
            "alert"
        );
    }
}

/// Alert sink that records events for assertions.
pub struct RecordingAlertSink {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

impl Default for RecordingAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// Gatherer that returns a fixed set of proposals immediately. Used in
/// single-node deployments (the local proposal set) and in tests.
pub struct StaticProposalGatherer {
    proposals: Vec<TimestampProposal>,
}

impl StaticProposalGatherer {
    pub fn new(proposals: Vec<TimestampProposal>) -> Self {
        Self { proposals }
    }
}

#[async_trait]
impl ProposalGatherer for StaticProposalGatherer {
    async fn collect(
        &self,
        _timeout_micros: u64,
    ) -> Result<Vec<TimestampProposal>, TemporalError> {
        Ok(self.proposals.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_clock_applies_signed_offset() {
        let ahead = OffsetClock::new("ahead", 1_000_000);
        let behind = OffsetClock::new("behind", -1_000_000);
        let a = ahead.read().unwrap();
        let b = behind.read().unwrap();
        assert!(a > b);
        let gap = a - b;
        assert!((1_900_000..2_100_000).contains(&gap), "gap was {gap}");
    }

    #[test]
    fn random_jitter_stays_bounded() {
        let jitter = RandomJitter::new(500);
        for _ in 0..100 {
            assert!(jitter.sample() < 500);
        }
        assert_eq!(RandomJitter::new(0).sample(), 0);
    }

    #[tokio::test]
    async fn static_gatherer_returns_its_proposals() {
        let gatherer = StaticProposalGatherer::new(vec![TimestampProposal {
            agent_id: "local".into(),
            timestamp: 42,
        }]);
        let proposals = gatherer.collect(1_000).await.unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].timestamp, 42);
    }
}
