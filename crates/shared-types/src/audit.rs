//! Structured audit events.
//!
//! The core emits these toward an external compliance sink; it never stores
//! them itself.

use crate::entities::TimestampMicros;
use serde::{Deserialize, Serialize};

/// One structured audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Machine-readable event kind, e.g. `token_generated`,
    /// `threat_detected`, `temporal_alert`, `coordinated_attack`.
    pub event_type: String,
    /// Event payload; shape depends on `event_type`.
    pub details: serde_json::Value,
    /// When the event was produced.
    pub timestamp: TimestampMicros,
}

impl AuditEvent {
    /// Build an event with the given kind and payload.
    pub fn new(
        event_type: impl Into<String>,
        details: serde_json::Value,
        timestamp: TimestampMicros,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            details,
            timestamp,
        }
    }
}
