//! Ports (hexagonal boundaries) for the detection subsystem.

pub mod inbound;
pub mod outbound;

pub use inbound::CanaryApi;
pub use outbound::{AuditSink, BackupStore, CryptoProvider, SecureClock, SystemClock};
