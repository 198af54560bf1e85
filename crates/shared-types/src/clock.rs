//! The secure-timestamp contract.
//!
//! The only thing the two halves share: the detection half consumes this
//! trait, the temporal half provides the hardened implementation.

use crate::entities::TimestampMicros;
use crate::errors::TemporalError;

/// A clock whose readings are hard to forge or skew.
///
/// Failures propagate; substituting a fallback clock would silently void the
/// guarantees every expiry and ordering decision rests on.
pub trait SecureClock: Send + Sync {
    /// Current secure timestamp in microseconds.
    fn now(&self) -> Result<TimestampMicros, TemporalError>;
}

/// Plain host clock. Carries none of the temporal-half guarantees; suitable
/// for tests and deployments that accept host time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SecureClock for SystemClock {
    fn now(&self) -> Result<TimestampMicros, TemporalError> {
        Ok(std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as TimestampMicros)
    }
}
