//! Domain layer: pure detection logic and in-memory state.

pub mod cache;
pub mod classifiers;
pub mod config;
pub mod correlation;
pub mod errors;
pub mod ledger;
pub mod registry;

pub use cache::{CacheKey, DetectionCache};
pub use classifiers::{Classifier, ClassifierWindow, PatternClassifierBank};
pub use config::DetectionConfig;
pub use correlation::{
    CoordinatedAttack, CorrelationAnalysis, CorrelationEngine, CorrelationOutcome, ThreatChain,
};
pub use errors::{ClassifierFault, DetectionError};
pub use ledger::AccessLedger;
pub use registry::{ThreatRegistry, ThreatStatistics};
