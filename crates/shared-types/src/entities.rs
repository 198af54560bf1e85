//! # Core Domain Entities
//!
//! Defines the detection-half entities shared across subsystems.
//!
//! ## Clusters
//!
//! - **Tokens**: `CanaryToken`, `AccessRecord`
//! - **Threats**: `Indicator`, `IndicatorHit`, `ThreatLevel`, `ThreatRecord`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// CLUSTER A: TIME AND IDENTITY
// =============================================================================

/// Microseconds since the Unix epoch.
///
/// All subsystems use microsecond resolution; several classifier thresholds
/// sit below one millisecond.
pub type TimestampMicros = u64;

/// Microseconds in one millisecond.
pub const MICROS_PER_MILLI: u64 = 1_000;

/// Microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// A classifier confidence score, always within `[0, 1]`.
pub type Confidence = f64;

/// Unique identifier for a canary token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub Uuid);

impl TokenId {
    /// Generate a fresh random token id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of whoever touched a token (process, session, peer).
pub type AccessorId = String;

// =============================================================================
// CLUSTER B: CANARY TOKENS
// =============================================================================

/// A decoy identifier whose access pattern is monitored to infer
/// adversarial probing.
///
/// Identity is immutable; only the access counters change, and only the
/// AccessLedger changes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanaryToken {
    /// Unique token id.
    pub id: TokenId,
    /// Human-readable label chosen at creation.
    pub label: String,
    /// Creation time.
    pub created_at: TimestampMicros,
    /// Free-form metadata attached at creation.
    pub metadata: serde_json::Value,
    /// Total recorded accesses.
    pub access_count: u64,
    /// Time of the most recent access, if any.
    pub last_accessed: Option<TimestampMicros>,
}

/// One observed access to a canary token. Append-only; pruned by age.
///
/// Insertion order equals timestamp order per token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    /// The token that was touched.
    pub token_id: TokenId,
    /// Who touched it.
    pub accessor_id: AccessorId,
    /// Numeric query payload, when the probe carried one. Consumed by the
    /// structure-sensitive classifiers (period finding, oracle balance,
    /// search amplification, factoring signature).
    pub value: Option<u64>,
    /// When the access happened.
    pub timestamp: TimestampMicros,
}

// =============================================================================
// CLUSTER C: THREATS
// =============================================================================

/// The nine access-pattern classifiers.
///
/// Each names the computational signature its heuristic looks for, not a
/// physical measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// >3 accesses to one token inside a 100 ms window.
    SuperpositionAccess,
    /// >2 distinct tokens accessed inside a 50 ms cross-token window.
    EntanglementCorrelation,
    /// Mean inter-access interval below 1 ms.
    Speedup,
    /// Alternating-rhythm interval signature over the last 5 accesses.
    Interference,
    /// Repeated XOR difference among recent access values (Simon's style).
    PeriodFinding,
    /// Sub-millisecond probe followed by classical-pace verification
    /// (Bernstein-Vazirani style).
    LinearStructure,
    /// Single fast query with a near-constant value set (Deutsch-Jozsa style).
    OracleBalance,
    /// Rapid converging query burst (Grover style).
    SearchAmplification,
    /// Rapid modular-structured probing of key-sized values (Shor style).
    FactoringSignature,
}

impl Indicator {
    /// Stable wire/display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SuperpositionAccess => "superposition_access",
            Self::EntanglementCorrelation => "entanglement_correlation",
            Self::Speedup => "speedup",
            Self::Interference => "interference",
            Self::PeriodFinding => "period_finding",
            Self::LinearStructure => "linear_structure",
            Self::OracleBalance => "oracle_balance",
            Self::SearchAmplification => "search_amplification",
            Self::FactoringSignature => "factoring_signature",
        }
    }

    /// Rank of the attack algorithm this indicator suggests, from cheapest
    /// to most capable. Used by threat-chain escalation tracking.
    pub fn complexity_rank(&self) -> u8 {
        match self {
            Self::SuperpositionAccess => 1,
            Self::EntanglementCorrelation => 2,
            Self::OracleBalance => 3,
            Self::Speedup | Self::LinearStructure => 4,
            Self::PeriodFinding | Self::Interference => 5,
            Self::SearchAmplification => 6,
            Self::FactoringSignature => 7,
        }
    }

    /// All indicator kinds, in rank order.
    pub const ALL: [Indicator; 9] = [
        Self::SuperpositionAccess,
        Self::EntanglementCorrelation,
        Self::OracleBalance,
        Self::Speedup,
        Self::LinearStructure,
        Self::PeriodFinding,
        Self::Interference,
        Self::SearchAmplification,
        Self::FactoringSignature,
    ];
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One classifier firing: which indicator, and how sure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorHit {
    /// The classifier that fired.
    pub indicator: Indicator,
    /// Confidence in `[0, 1]`.
    pub confidence: Confidence,
}

/// Severity level derived from aggregate confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    /// Aggregate confidence below 0.75.
    Low,
    /// Aggregate confidence in [0.75, 0.85).
    Medium,
    /// Aggregate confidence in [0.85, 0.95).
    High,
    /// Aggregate confidence at or above 0.95.
    Critical,
}

impl ThreatLevel {
    /// Map an aggregate confidence to a severity level.
    pub fn from_confidence(confidence: Confidence) -> Self {
        if confidence >= 0.95 {
            Self::Critical
        } else if confidence >= 0.85 {
            Self::High
        } else if confidence >= 0.75 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// A detected threat. Immutable once created.
///
/// Exists iff the aggregate confidence at creation time reached the
/// configured sensitivity threshold. Drops out of the "active" view after
/// 300 s but remains in history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRecord {
    /// Unique threat id.
    pub id: Uuid,
    /// Severity derived from `confidence`.
    pub level: ThreatLevel,
    /// When the threat was detected.
    pub detected_at: TimestampMicros,
    /// Every indicator that fired in the detection round.
    pub indicators: Vec<IndicatorHit>,
    /// Mean confidence over `indicators`.
    pub confidence: Confidence,
    /// Tokens implicated in the round.
    pub affected_tokens: Vec<TokenId>,
}
