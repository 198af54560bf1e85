//! # Isolation Reference
//!
//! An independent, non-networked clock used as ground truth.
//!
//! INVARIANT-4: every call takes a fresh reading and builds a fresh proof;
//! nothing is cached. A stale reference would defeat its purpose.

use crate::domain::hashing::sha3_many;
use crate::ports::ClockSource;
use rand::RngCore;
use shared_types::{
    IsolatedTimeReference, IsolationGuarantees, TemporalError, TimestampMicros, MICROS_PER_MILLI,
};

/// Marker bound into every isolation proof.
const ISOLATION_MARKER: &[u8] = b"qs-isolated-reference";

/// Wraps the isolated reference clock.
pub struct IsolationReference {
    reference: Box<dyn ClockSource>,
    tolerance_micros: u64,
}

impl IsolationReference {
    /// Build over the given reference clock with the given validation
    /// tolerance.
    pub fn new(reference: Box<dyn ClockSource>, tolerance_micros: u64) -> Self {
        Self {
            reference,
            tolerance_micros,
        }
    }

    /// Fresh reading plus proof. Never cached.
    pub fn fresh(&self) -> Result<IsolatedTimeReference, TemporalError> {
        let value = self.reference.read()?;
        let mut nonce = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut nonce);
        let isolation_proof = sha3_many(&[&value.to_le_bytes(), ISOLATION_MARKER, &nonce]);
        Ok(IsolatedTimeReference {
            value,
            isolation_proof,
            guarantees: IsolationGuarantees::default(),
        })
    }

    /// Validate an external timestamp against a fresh reference reading.
    ///
    /// Succeeds only when the external value is within tolerance; the
    /// returned reference carries the guarantee metadata for the caller's
    /// records.
    pub fn validate(
        &self,
        external: TimestampMicros,
    ) -> Result<IsolatedTimeReference, TemporalError> {
        let reference = self.fresh()?;
        let drift = reference.value.abs_diff(external);
        if drift > self.tolerance_micros {
            return Err(TemporalError::IsolationDrift {
                drift_ms: drift / MICROS_PER_MILLI,
                tolerance_ms: self.tolerance_micros / MICROS_PER_MILLI,
            });
        }
        Ok(reference)
    }
}

impl std::fmt::Debug for IsolationReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolationReference")
            .field("tolerance_micros", &self.tolerance_micros)
            .finish()
    }
}
