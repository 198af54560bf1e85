//! # Shared Types Crate
//!
//! This crate contains all domain entities and value types shared between the
//! detection half and the temporal-integrity half of Quantum-Sentinel.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Microsecond Time**: Every timestamp is a `TimestampMicros`; the
//!   classifier thresholds are sub-millisecond and coarser units would
//!   destroy them.
//! - **Immutable Records**: `ThreatRecord` and `TimeCommitment` are never
//!   mutated after construction; "active" views are purely time-windowed.

pub mod audit;
pub mod clock;
pub mod entities;
pub mod errors;
pub mod temporal;

pub use audit::AuditEvent;
pub use clock::{SecureClock, SystemClock};
pub use entities::*;
pub use errors::TemporalError;
pub use temporal::*;
