//! Outbound (driven) ports for the detection subsystem.
//!
//! These traits define what the detector needs from its collaborators: a
//! manipulation-resistant clock, an audit sink, an opaque crypto module, and
//! a delegated backup store.

use shared_types::{AuditEvent, TokenId};
#[cfg(test)]
use shared_types::{TemporalError, TimestampMicros};

// The secure-timestamp contract lives in shared-types; it is the one piece
// of vocabulary both halves share.
pub use shared_types::{SecureClock, SystemClock};

/// External compliance/audit collaborator. The core emits events; it never
/// stores them. Implementations must not block the detection hot path.
pub trait AuditSink: Send + Sync {
    /// Emit one structured audit event.
    fn emit(&self, event: AuditEvent);
}

/// External asymmetric-crypto module. Sign/verify/keypair only; the
/// primitives themselves live outside this core.
pub trait CryptoProvider: Send + Sync {
    /// Generate a keypair; returns (public, private) as opaque bytes.
    fn keypair(&self) -> Result<(Vec<u8>, Vec<u8>), String>;

    /// Sign `data`, returning an opaque signature.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, String>;

    /// Verify a signature over `data`.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, String>;
}

/// External backup/recovery store. This core only moves opaque bytes.
pub trait BackupStore: Send + Sync {
    /// Persist serialized token state under its id.
    fn save(&self, token_id: TokenId, bytes: &[u8]) -> Result<(), String>;

    /// Fetch serialized token state by id.
    fn load(&self, token_id: TokenId) -> Result<Vec<u8>, String>;
}

/// Recording audit sink for tests.
#[cfg(test)]
pub struct RecordingAuditSink {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl RecordingAuditSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl AuditSink for RecordingAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

/// Deterministic manual clock for tests.
#[cfg(test)]
pub struct MockClock {
    now: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl MockClock {
    pub fn at(now: TimestampMicros) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(now),
        }
    }

    pub fn advance(&self, micros: u64) {
        self.now
            .fetch_add(micros, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set(&self, now: TimestampMicros) {
        self.now.store(now, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl SecureClock for MockClock {
    fn now(&self) -> Result<TimestampMicros, TemporalError> {
        Ok(self.now.load(std::sync::atomic::Ordering::SeqCst))
    }
}
