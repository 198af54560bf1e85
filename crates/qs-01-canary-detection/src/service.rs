//! Canary Detection Service - core business logic.
//!
//! # Architecture
//! - Single coordinator instance owning all detection state; no process-wide
//!   singletons
//! - Generic over outbound ports, wired with `Arc`s at construction
//! - Synchronous hot path; background maintenance runs in the caller's
//!   scheduler via `run_maintenance`

use crate::domain::{
    AccessLedger, ClassifierWindow, CorrelationAnalysis, CorrelationEngine, DetectionCache,
    DetectionConfig, DetectionError, PatternClassifierBank, ThreatRegistry, ThreatStatistics,
};
use crate::ports::{AuditSink, BackupStore, CanaryApi, CryptoProvider, SecureClock};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_types::{
    AccessRecord, AccessorId, AuditEvent, CanaryToken, ThreatLevel, ThreatRecord,
    TimestampMicros, TokenId,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Serialized token state handed to the external backup collaborator.
#[derive(Debug, Serialize, Deserialize)]
struct TokenBackup {
    id: TokenId,
    value: String,
    created_at: TimestampMicros,
    access_pattern: Vec<AccessRecord>,
    signature: Vec<u8>,
    access_count: u64,
}

impl TokenBackup {
    fn signed_bytes(&self) -> Result<Vec<u8>, DetectionError> {
        bincode::serialize(&(
            &self.id,
            &self.value,
            self.created_at,
            &self.access_pattern,
            self.access_count,
        ))
        .map_err(|e| DetectionError::Serialization(e.to_string()))
    }
}

/// Canary Detection Service.
///
/// The facade both halves of the platform talk to for token lifecycle and
/// threat queries.
pub struct CanaryService<C, A, K, B>
where
    C: SecureClock,
    A: AuditSink,
    K: CryptoProvider,
    B: BackupStore,
{
    clock: Arc<C>,
    audit: Arc<A>,
    crypto: Arc<K>,
    backup: Arc<B>,
    config: DetectionConfig,
    tokens: RwLock<HashMap<TokenId, CanaryToken>>,
    ledger: AccessLedger,
    bank: PatternClassifierBank,
    cache: DetectionCache,
    correlation: Mutex<CorrelationEngine>,
    registry: ThreatRegistry,
}

impl<C, A, K, B> CanaryService<C, A, K, B>
where
    C: SecureClock,
    A: AuditSink,
    K: CryptoProvider,
    B: BackupStore,
{
    /// Create a new detection service.
    pub fn new(
        clock: Arc<C>,
        audit: Arc<A>,
        crypto: Arc<K>,
        backup: Arc<B>,
        config: DetectionConfig,
    ) -> Self {
        let ledger = AccessLedger::new(config.retention_micros);
        let cache = DetectionCache::new(config.cache_ttl_micros, config.cache_count_bucket);
        let correlation = CorrelationEngine::new(
            config.correlation_window_micros,
            config.chain_timeout_micros,
            config.coordination_window_micros,
            config.coordination_min_confidence,
            config.coordination_min_indicators,
        );
        let registry = ThreatRegistry::new(config.active_threat_window_micros);
        Self {
            clock,
            audit,
            crypto,
            backup,
            config,
            tokens: RwLock::new(HashMap::new()),
            ledger,
            bank: PatternClassifierBank::new(),
            cache,
            correlation: Mutex::new(correlation),
            registry,
        }
    }

    /// Create a service with the default configuration.
    pub fn with_defaults(clock: Arc<C>, audit: Arc<A>, crypto: Arc<K>, backup: Arc<B>) -> Self {
        Self::new(clock, audit, crypto, backup, DetectionConfig::default())
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Periodic maintenance: ledger compaction and cache sweep.
    ///
    /// The background pruner calls this on its own cadence; it is safe to
    /// run concurrently with the hot path.
    pub fn run_maintenance(&self) -> Result<(), DetectionError> {
        let now = self.clock.now()?;
        self.ledger.prune(now);
        self.cache.sweep(now);
        Ok(())
    }

    /// Serialize a token (with its retained access pattern) to the external
    /// backup store, signed through the crypto collaborator.
    pub fn backup_token(&self, token_id: TokenId) -> Result<(), DetectionError> {
        let now = self.clock.now()?;
        let token = self
            .tokens
            .read()
            .get(&token_id)
            .cloned()
            .ok_or(DetectionError::TokenNotFound(token_id))?;
        let access_pattern = self
            .ledger
            .recent(token_id, self.config.retention_micros, now);

        let mut record = TokenBackup {
            id: token.id,
            value: token.label.clone(),
            created_at: token.created_at,
            access_pattern,
            signature: Vec::new(),
            access_count: token.access_count,
        };
        record.signature = self
            .crypto
            .sign(&record.signed_bytes()?)
            .map_err(DetectionError::Crypto)?;

        let bytes =
            bincode::serialize(&record).map_err(|e| DetectionError::Serialization(e.to_string()))?;
        self.backup
            .save(token_id, &bytes)
            .map_err(DetectionError::Backup)?;

        self.audit.emit(AuditEvent::new(
            "token_backed_up",
            json!({ "token_id": token_id.to_string() }),
            now,
        ));
        Ok(())
    }

    /// Restore a token from the external backup store. Fails if the stored
    /// signature does not verify.
    pub fn restore_token(&self, token_id: TokenId) -> Result<CanaryToken, DetectionError> {
        let now = self.clock.now()?;
        let bytes = self.backup.load(token_id).map_err(DetectionError::Backup)?;
        let record: TokenBackup =
            bincode::deserialize(&bytes).map_err(|e| DetectionError::Serialization(e.to_string()))?;

        let verified = self
            .crypto
            .verify(&record.signed_bytes()?, &record.signature)
            .map_err(DetectionError::Crypto)?;
        if !verified {
            return Err(DetectionError::BackupSignatureRejected(token_id));
        }

        let token = CanaryToken {
            id: record.id,
            label: record.value,
            created_at: record.created_at,
            metadata: serde_json::Value::Null,
            access_count: record.access_count,
            last_accessed: record.access_pattern.last().map(|r| r.timestamp),
        };
        self.tokens.write().insert(token.id, token.clone());

        self.audit.emit(AuditEvent::new(
            "token_restored",
            json!({ "token_id": token_id.to_string() }),
            now,
        ));
        Ok(token)
    }

    /// Direct registry access for embedding callers.
    pub fn registry(&self) -> &ThreatRegistry {
        &self.registry
    }

    fn evaluate_round(
        &self,
        token_id: TokenId,
        access_count: u64,
        now: TimestampMicros,
    ) -> Option<ThreatRecord> {
        let key = self.cache.key(token_id, access_count, now);
        let hits = match self.cache.get(&key, now) {
            Some(hits) => hits,
            None => {
                let window = ClassifierWindow {
                    token_id,
                    now,
                    records: self
                        .ledger
                        .recent(token_id, self.config.retention_micros, now),
                    cross_token_count: self.ledger.distinct_tokens_since(
                        now.saturating_sub(self.config.entanglement_window_micros),
                    ),
                };
                let hits = self.bank.run(&window);
                self.cache.insert(key, hits.clone(), now);
                hits
            }
        };

        let confidence = PatternClassifierBank::aggregate(&hits)?;
        if confidence < self.config.sensitivity_threshold {
            return None;
        }
        Some(ThreatRecord {
            id: Uuid::new_v4(),
            level: ThreatLevel::from_confidence(confidence),
            detected_at: now,
            indicators: hits,
            confidence,
            affected_tokens: vec![token_id],
        })
    }

    fn record_threat(&self, threat: ThreatRecord) {
        let indicator_names: Vec<&str> =
            threat.indicators.iter().map(|h| h.indicator.name()).collect();
        tracing::warn!(
            subsystem = "canary-detection",
            threat_id = %threat.id,
            level = %threat.level,
            confidence = threat.confidence,
            indicators = ?indicator_names,
            "threat detected"
        );
        self.audit.emit(AuditEvent::new(
            "threat_detected",
            json!({
                "threat_id": threat.id.to_string(),
                "level": threat.level.to_string(),
                "confidence": threat.confidence,
                "indicators": indicator_names,
                "affected_tokens": threat
                    .affected_tokens
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>(),
            }),
            threat.detected_at,
        ));

        let outcome = self.correlation.lock().observe(&threat);
        if let Some(coordinated) = outcome.coordinated {
            self.audit.emit(AuditEvent::new(
                "coordinated_attack",
                json!({
                    "indicators": coordinated
                        .indicators
                        .iter()
                        .map(|i| i.name())
                        .collect::<Vec<_>>(),
                    "mean_confidence": coordinated.mean_confidence,
                }),
                coordinated.detected_at,
            ));
        }
        self.registry.insert(threat);
    }
}

impl<C, A, K, B> CanaryApi for CanaryService<C, A, K, B>
where
    C: SecureClock,
    A: AuditSink,
    K: CryptoProvider,
    B: BackupStore,
{
    fn generate_token(&self, label: &str) -> Result<CanaryToken, DetectionError> {
        let now = self.clock.now()?;
        let token = CanaryToken {
            id: TokenId::random(),
            label: label.to_string(),
            created_at: now,
            metadata: json!({ "label": label }),
            access_count: 0,
            last_accessed: None,
        };
        self.tokens.write().insert(token.id, token.clone());
        tracing::info!(
            subsystem = "canary-detection",
            token_id = %token.id,
            label,
            "canary token generated"
        );
        self.audit.emit(AuditEvent::new(
            "token_generated",
            json!({ "token_id": token.id.to_string(), "label": label }),
            now,
        ));
        Ok(token)
    }

    fn access(&self, token_id: TokenId, accessor_id: AccessorId) -> Result<bool, DetectionError> {
        self.access_with_value(token_id, accessor_id, None)
    }

    fn access_with_value(
        &self,
        token_id: TokenId,
        accessor_id: AccessorId,
        value: Option<u64>,
    ) -> Result<bool, DetectionError> {
        // Secure timestamp first; a temporal failure aborts the request.
        let now = self.clock.now()?;

        let access_count = {
            let mut tokens = self.tokens.write();
            let token = tokens
                .get_mut(&token_id)
                .ok_or(DetectionError::TokenNotFound(token_id))?;
            token.access_count += 1;
            token.last_accessed = Some(now);
            token.access_count
        };

        self.ledger.record(token_id, accessor_id, value, now);

        match self.evaluate_round(token_id, access_count, now) {
            Some(threat) => {
                self.record_threat(threat);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn get_active_threats(&self) -> Result<Vec<ThreatRecord>, DetectionError> {
        let now = self.clock.now()?;
        Ok(self.registry.active_threats(now))
    }

    fn get_statistics(&self) -> Result<ThreatStatistics, DetectionError> {
        let now = self.clock.now()?;
        let mut stats = self.registry.statistics(now);
        let analysis = self.correlation.lock().analysis(now);
        stats.high_correlation_pairs = analysis.high_correlations.len();
        stats.active_chains = analysis.active_chains;
        stats.coordinated_signals = analysis.coordinated_signals;
        Ok(stats)
    }

    fn get_correlation_analysis(&self) -> Result<CorrelationAnalysis, DetectionError> {
        let now = self.clock.now()?;
        Ok(self.correlation.lock().analysis(now))
    }
}
