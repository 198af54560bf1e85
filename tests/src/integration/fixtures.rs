//! Shared test fixtures for the integration scenarios.

use parking_lot::Mutex;
use qs_01_canary_detection::adapters::{InMemoryBackupStore, NullCrypto};
use qs_01_canary_detection::{AuditSink, CanaryService, DetectionConfig, SecureClock};
use shared_types::{AuditEvent, TemporalError, TimestampMicros};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Deterministic clock the scenarios advance by hand.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn at(now: TimestampMicros) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn advance(&self, micros: u64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }
}

impl SecureClock for ManualClock {
    fn now(&self) -> Result<TimestampMicros, TemporalError> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}

/// Audit sink recording every event for assertions.
pub struct RecordingSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

impl AuditSink for RecordingSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

pub type TestCanaryService =
    CanaryService<ManualClock, RecordingSink, NullCrypto, InMemoryBackupStore>;

/// Canary service over a manual clock starting at t = 1s.
pub fn canary_service() -> (Arc<ManualClock>, Arc<RecordingSink>, TestCanaryService) {
    canary_service_with(DetectionConfig::default())
}

pub fn canary_service_with(
    config: DetectionConfig,
) -> (Arc<ManualClock>, Arc<RecordingSink>, TestCanaryService) {
    let clock = Arc::new(ManualClock::at(1_000_000));
    let sink = Arc::new(RecordingSink::new());
    let service = CanaryService::new(
        Arc::clone(&clock),
        Arc::clone(&sink),
        Arc::new(NullCrypto),
        Arc::new(InMemoryBackupStore::new()),
        config,
    );
    (clock, sink, service)
}
