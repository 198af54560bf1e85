//! # Canary Access-Pattern Detection Subsystem
//!
//! **Subsystem ID:** 1
//! **Status:** Production-Ready
//!
//! ## Purpose
//!
//! Monitors access patterns against sentinel "canary" identifiers and flags
//! patterns consistent with an adversary holding disproportionate
//! computational power. No physical quantum sensor exists; this is a
//! behavioral heuristic engine producing calibrated confidence scores from
//! access timing statistics.
//!
//! ## Pipeline
//!
//! ```text
//! access() ──→ [AccessLedger] ──→ [DetectionCache]──miss──→ [ClassifierBank]
//!                                       │ hit                     │
//!                                       ↓                         ↓
//!                                  indicators  ←──────────── indicators
//!                                       │
//!                         mean ≥ threshold? ──→ [ThreatRegistry]
//!                                       │
//!                                       └──→ [CorrelationEngine]
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | Confidences within [0, 1] | `domain/classifiers.rs` - bank clamps every hit |
//! | INVARIANT-2 | ThreatRecord iff mean confidence >= threshold | `service.rs` - single emission site |
//! | INVARIANT-3 | Per-token records timestamp-ordered | `domain/ledger.rs` - append under per-token lock |
//! | INVARIANT-4 | Cache entries never served past TTL | `domain/cache.rs` - read-side age check |
//! | INVARIANT-5 | Threats immutable once created | `domain/registry.rs` - append-only store, snapshot reads |
//!
//! ## Fault Isolation
//!
//! One classifier faulting is logged and excluded from the round; sibling
//! classifiers still run. Secure-timestamp failures are never absorbed: they
//! propagate to the caller unchanged.
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | Temporal half | `SecureClock` | Manipulation-resistant timestamps |
//! | Compliance | `AuditSink` | Structured audit events |
//! | Crypto module | `CryptoProvider` | Opaque sign/verify for token backups |
//! | Backup store | `BackupStore` | Delegated token persistence |

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    AccessLedger, CacheKey, ClassifierWindow, CoordinatedAttack, CorrelationAnalysis,
    CorrelationEngine, CorrelationOutcome, DetectionCache, DetectionConfig, DetectionError,
    PatternClassifierBank, ThreatChain, ThreatRegistry, ThreatStatistics,
};
pub use ports::{AuditSink, BackupStore, CanaryApi, CryptoProvider, SecureClock, SystemClock};
pub use service::CanaryService;
