//! Inbound (driving) port for the detection subsystem.

use crate::domain::{CorrelationAnalysis, DetectionError, ThreatStatistics};
use shared_types::{AccessorId, CanaryToken, ThreatRecord, TokenId};

/// Token lifecycle and query API exposed upward.
pub trait CanaryApi: Send + Sync {
    /// Create a new tracked canary token.
    fn generate_token(&self, label: &str) -> Result<CanaryToken, DetectionError>;

    /// Record one access; returns whether a threat was triggered.
    fn access(&self, token_id: TokenId, accessor_id: AccessorId) -> Result<bool, DetectionError>;

    /// Record one access carrying a numeric query payload.
    fn access_with_value(
        &self,
        token_id: TokenId,
        accessor_id: AccessorId,
        value: Option<u64>,
    ) -> Result<bool, DetectionError>;

    /// Threats inside the active window.
    fn get_active_threats(&self) -> Result<Vec<ThreatRecord>, DetectionError>;

    /// Aggregate threat statistics.
    fn get_statistics(&self) -> Result<ThreatStatistics, DetectionError>;

    /// Correlation-engine summary.
    fn get_correlation_analysis(&self) -> Result<CorrelationAnalysis, DetectionError>;
}
