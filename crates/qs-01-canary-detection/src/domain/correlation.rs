//! # Correlation Engine
//!
//! Cross-indicator correlation and temporal threat-chain construction over
//! the classifier bank's output stream.
//!
//! Three analyses run on every observed threat:
//!
//! 1. **Cross-algorithm correlation** - timing/confidence coherence between
//!    indicator types inside a 10 s window
//! 2. **Threat chains** - sequential threats linked by indicator overlap or
//!    complexity-rank escalation, with a 30 s inactivity timeout
//! 3. **Coordinated attack** - three or more indicator types active inside
//!    5 s at high mean confidence

use serde::Serialize;
use shared_types::{Indicator, ThreatRecord, TimestampMicros};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Rolling history cap per indicator type.
const HISTORY_CAP: usize = 1_000;
/// Size the history is trimmed back to on overflow.
const HISTORY_TRIM: usize = 500;
/// Recorded high-correlation findings cap.
const FINDINGS_CAP: usize = 256;

/// Interval-consistency ceiling (stddev/mean of hit spacing).
const MAX_INTERVAL_INCONSISTENCY: f64 = 0.3;
/// Confidence-consistency ceiling (stddev of confidences).
const MAX_CONFIDENCE_INCONSISTENCY: f64 = 0.2;
/// Correlation strength above this is recorded as a high correlation.
const HIGH_CORRELATION_STRENGTH: f64 = 0.8;

#[derive(Debug, Clone, Copy)]
struct Observation {
    timestamp: TimestampMicros,
    confidence: f64,
}

/// A strong timing/confidence coherence between two indicator types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighCorrelation {
    /// Indicator from the triggering threat.
    pub a: Indicator,
    /// The correlated indicator type.
    pub b: Indicator,
    /// `1 - interval_inconsistency - confidence_inconsistency`, above 0.8.
    pub strength: f64,
    /// When the correlation was observed.
    pub observed_at: TimestampMicros,
}

/// A sequence of related threats linked over a bounded time window.
#[derive(Debug, Clone, Serialize)]
pub struct ThreatChain {
    /// Unique chain id.
    pub id: Uuid,
    /// First threat's detection time.
    pub started_at: TimestampMicros,
    /// Most recent threat's detection time.
    pub last_updated: TimestampMicros,
    /// Every indicator observed along the chain, in order.
    pub indicator_progression: Vec<Indicator>,
    /// Aggregate confidence of each threat along the chain.
    pub confidence_trend: Vec<f64>,
    /// Highest complexity rank seen so far.
    pub peak_rank: u8,
}

impl ThreatChain {
    /// Three consecutive strictly increasing confidences at the tail.
    pub fn is_escalating(&self) -> bool {
        let n = self.confidence_trend.len();
        if n < 3 {
            return false;
        }
        let tail = &self.confidence_trend[n - 3..];
        tail[0] < tail[1] && tail[1] < tail[2]
    }
}

/// A CRITICAL coordinated-attack signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatedAttack {
    /// Indicator types active inside the coordination window.
    pub indicators: Vec<Indicator>,
    /// Mean confidence of the recent activity.
    pub mean_confidence: f64,
    /// When the signal was raised.
    pub detected_at: TimestampMicros,
}

/// What one `observe` call found.
#[derive(Debug, Clone)]
pub struct CorrelationOutcome {
    /// Newly recorded high correlations.
    pub high_correlations: Vec<HighCorrelation>,
    /// The chain the threat joined (or started).
    pub chain_id: Uuid,
    /// Whether that chain is escalating after this threat.
    pub escalating: bool,
    /// Coordinated-attack signal, if raised.
    pub coordinated: Option<CoordinatedAttack>,
}

/// Summary for the query API.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationAnalysis {
    /// High correlations recorded so far (bounded).
    pub high_correlations: Vec<HighCorrelation>,
    /// Chains updated within the inactivity timeout.
    pub active_chains: usize,
    /// Active chains currently escalating.
    pub escalating_chains: usize,
    /// All chains still retained (closed ones kept 2x timeout for trends).
    pub retained_chains: usize,
    /// Coordinated-attack signals raised so far.
    pub coordinated_signals: u64,
}

/// Stateful correlation engine. Callers serialize access (the service holds
/// it behind a lock); internally it is plain data.
#[derive(Debug)]
pub struct CorrelationEngine {
    correlation_window_micros: u64,
    chain_timeout_micros: u64,
    coordination_window_micros: u64,
    coordination_min_confidence: f64,
    coordination_min_indicators: usize,
    histories: HashMap<Indicator, VecDeque<Observation>>,
    high_correlations: Vec<HighCorrelation>,
    chains: Vec<ThreatChain>,
    coordinated_signals: u64,
}

impl CorrelationEngine {
    /// Engine with the given analysis windows.
    pub fn new(
        correlation_window_micros: u64,
        chain_timeout_micros: u64,
        coordination_window_micros: u64,
        coordination_min_confidence: f64,
        coordination_min_indicators: usize,
    ) -> Self {
        Self {
            correlation_window_micros,
            chain_timeout_micros,
            coordination_window_micros,
            coordination_min_confidence,
            coordination_min_indicators,
            histories: HashMap::new(),
            high_correlations: Vec::new(),
            chains: Vec::new(),
            coordinated_signals: 0,
        }
    }

    /// Feed one threat through all three analyses.
    pub fn observe(&mut self, threat: &ThreatRecord) -> CorrelationOutcome {
        let now = threat.detected_at;
        for hit in &threat.indicators {
            let history = self.histories.entry(hit.indicator).or_default();
            history.push_back(Observation {
                timestamp: now,
                confidence: hit.confidence,
            });
            if history.len() > HISTORY_CAP {
                while history.len() > HISTORY_TRIM {
                    history.pop_front();
                }
            }
        }

        let high_correlations = self.cross_correlate(threat, now);
        let (chain_id, escalating) = self.link_into_chain(threat, now);
        let coordinated = self.check_coordination(now);
        if coordinated.is_some() {
            self.coordinated_signals += 1;
        }

        CorrelationOutcome {
            high_correlations,
            chain_id,
            escalating,
            coordinated,
        }
    }

    /// Query-API summary.
    pub fn analysis(&self, now: TimestampMicros) -> CorrelationAnalysis {
        let cutoff = now.saturating_sub(self.chain_timeout_micros);
        let active: Vec<&ThreatChain> = self
            .chains
            .iter()
            .filter(|c| c.last_updated >= cutoff)
            .collect();
        CorrelationAnalysis {
            high_correlations: self.high_correlations.clone(),
            active_chains: active.len(),
            escalating_chains: active.iter().filter(|c| c.is_escalating()).count(),
            retained_chains: self.chains.len(),
            coordinated_signals: self.coordinated_signals,
        }
    }

    /// Retained chains, newest-updated last.
    pub fn chains(&self) -> &[ThreatChain] {
        &self.chains
    }

    fn cross_correlate(
        &mut self,
        threat: &ThreatRecord,
        now: TimestampMicros,
    ) -> Vec<HighCorrelation> {
        let cutoff = now.saturating_sub(self.correlation_window_micros);
        let triggered: HashSet<Indicator> =
            threat.indicators.iter().map(|h| h.indicator).collect();

        let mut found = Vec::new();
        for a in &triggered {
            for (b, history) in &self.histories {
                if triggered.contains(b) {
                    continue;
                }
                let recent: Vec<&Observation> = history
                    .iter()
                    .filter(|o| o.timestamp >= cutoff)
                    .collect();
                if recent.len() < 2 {
                    continue;
                }
                let intervals: Vec<f64> = recent
                    .windows(2)
                    .map(|w| (w[1].timestamp - w[0].timestamp) as f64)
                    .collect();
                let interval_mean = stat_mean(&intervals);
                if interval_mean <= 0.0 {
                    continue;
                }
                let interval_inconsistency = stat_stddev(&intervals) / interval_mean;
                let confidences: Vec<f64> = recent.iter().map(|o| o.confidence).collect();
                let confidence_inconsistency = stat_stddev(&confidences);

                if interval_inconsistency < MAX_INTERVAL_INCONSISTENCY
                    && confidence_inconsistency < MAX_CONFIDENCE_INCONSISTENCY
                {
                    let strength = 1.0 - interval_inconsistency - confidence_inconsistency;
                    if strength > HIGH_CORRELATION_STRENGTH {
                        found.push(HighCorrelation {
                            a: *a,
                            b: *b,
                            strength,
                            observed_at: now,
                        });
                    }
                }
            }
        }

        for finding in &found {
            tracing::info!(
                subsystem = "canary-detection",
                a = %finding.a,
                b = %finding.b,
                strength = finding.strength,
                "high cross-algorithm correlation"
            );
        }
        self.high_correlations.extend(found.iter().cloned());
        if self.high_correlations.len() > FINDINGS_CAP {
            let excess = self.high_correlations.len() - FINDINGS_CAP;
            self.high_correlations.drain(..excess);
        }
        found
    }

    fn link_into_chain(&mut self, threat: &ThreatRecord, now: TimestampMicros) -> (Uuid, bool) {
        // Closed chains are retained 2x the timeout for trend analysis.
        let retain_cutoff = now.saturating_sub(self.chain_timeout_micros * 2);
        self.chains.retain(|c| c.last_updated >= retain_cutoff);

        let indicators: Vec<Indicator> = threat.indicators.iter().map(|h| h.indicator).collect();
        let max_rank = indicators
            .iter()
            .map(|i| i.complexity_rank())
            .max()
            .unwrap_or(0);
        let active_cutoff = now.saturating_sub(self.chain_timeout_micros);

        let matched = self
            .chains
            .iter_mut()
            .filter(|c| c.last_updated >= active_cutoff)
            .rev()
            .find(|c| {
                let tail_start = c.indicator_progression.len().saturating_sub(3);
                let tail = &c.indicator_progression[tail_start..];
                let overlaps = indicators.iter().any(|i| tail.contains(i));
                overlaps || max_rank > c.peak_rank
            });

        let (chain_id, escalating) = match matched {
            Some(chain) => {
                chain.last_updated = now;
                chain.indicator_progression.extend(indicators.iter());
                chain.confidence_trend.push(threat.confidence);
                chain.peak_rank = chain.peak_rank.max(max_rank);
                (chain.id, chain.is_escalating())
            }
            None => {
                let chain = ThreatChain {
                    id: Uuid::new_v4(),
                    started_at: now,
                    last_updated: now,
                    indicator_progression: indicators,
                    confidence_trend: vec![threat.confidence],
                    peak_rank: max_rank,
                };
                let id = chain.id;
                self.chains.push(chain);
                (id, false)
            }
        };

        if escalating {
            tracing::warn!(
                subsystem = "canary-detection",
                chain_id = %chain_id,
                "threat chain escalating"
            );
        }
        (chain_id, escalating)
    }

    fn check_coordination(&self, now: TimestampMicros) -> Option<CoordinatedAttack> {
        let cutoff = now.saturating_sub(self.coordination_window_micros);
        let mut active_types = Vec::new();
        let mut confidences = Vec::new();
        for (indicator, history) in &self.histories {
            let recent: Vec<&Observation> = history
                .iter()
                .rev()
                .take_while(|o| o.timestamp >= cutoff)
                .collect();
            if recent.is_empty() {
                continue;
            }
            active_types.push(*indicator);
            confidences.extend(recent.iter().map(|o| o.confidence));
        }

        if active_types.len() < self.coordination_min_indicators {
            return None;
        }
        let mean_confidence = stat_mean(&confidences);
        if mean_confidence <= self.coordination_min_confidence {
            return None;
        }

        tracing::error!(
            subsystem = "canary-detection",
            indicator_types = active_types.len(),
            mean_confidence,
            "coordinated attack pattern detected"
        );
        Some(CoordinatedAttack {
            indicators: active_types,
            mean_confidence,
            detected_at: now,
        })
    }
}

fn stat_mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn stat_stddev(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = stat_mean(samples);
    (samples.iter().map(|s| (s - m).powi(2)).sum::<f64>() / samples.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{IndicatorHit, ThreatLevel};

    fn engine() -> CorrelationEngine {
        CorrelationEngine::new(10_000_000, 30_000_000, 5_000_000, 0.75, 3)
    }

    fn threat(indicators: &[(Indicator, f64)], at: TimestampMicros) -> ThreatRecord {
        let hits: Vec<IndicatorHit> = indicators
            .iter()
            .map(|(i, c)| IndicatorHit {
                indicator: *i,
                confidence: *c,
            })
            .collect();
        let confidence = hits.iter().map(|h| h.confidence).sum::<f64>() / hits.len() as f64;
        ThreatRecord {
            id: Uuid::new_v4(),
            level: ThreatLevel::from_confidence(confidence),
            detected_at: at,
            indicators: hits,
            confidence,
            affected_tokens: Vec::new(),
        }
    }

    #[test]
    fn overlapping_threats_share_a_chain() {
        let mut engine = engine();
        let first = engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 1_000_000));
        let second = engine.observe(&threat(&[(Indicator::Speedup, 0.85)], 2_000_000));
        assert_eq!(first.chain_id, second.chain_id);
    }

    #[test]
    fn rank_escalation_joins_chain_without_overlap() {
        let mut engine = engine();
        let first = engine.observe(&threat(&[(Indicator::SuperpositionAccess, 0.9)], 1_000_000));
        // No indicator overlap, but factoring outranks superposition.
        let second = engine.observe(&threat(&[(Indicator::FactoringSignature, 0.98)], 2_000_000));
        assert_eq!(first.chain_id, second.chain_id);
    }

    #[test]
    fn inactive_chain_is_not_extended() {
        let mut engine = engine();
        let first = engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 1_000_000));
        // 31s later, past the 30s inactivity timeout.
        let second = engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 32_000_000));
        assert_ne!(first.chain_id, second.chain_id);
    }

    #[test]
    fn three_rising_confidences_flag_escalation() {
        let mut engine = engine();
        engine.observe(&threat(&[(Indicator::Speedup, 0.75)], 1_000_000));
        engine.observe(&threat(&[(Indicator::Speedup, 0.80)], 2_000_000));
        let third = engine.observe(&threat(&[(Indicator::Speedup, 0.85)], 3_000_000));
        assert!(third.escalating);
        let fourth = engine.observe(&threat(&[(Indicator::Speedup, 0.70)], 4_000_000));
        assert!(!fourth.escalating);
    }

    #[test]
    fn coordinated_attack_needs_three_types_at_confidence() {
        let mut engine = engine();
        engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 1_000_000));
        engine.observe(&threat(&[(Indicator::SuperpositionAccess, 0.9)], 1_500_000));
        let outcome =
            engine.observe(&threat(&[(Indicator::FactoringSignature, 0.98)], 2_000_000));
        let coordinated = outcome.coordinated.expect("three types active inside 5s");
        assert_eq!(coordinated.indicators.len(), 3);
        assert!(coordinated.mean_confidence > 0.75);
    }

    #[test]
    fn two_types_never_coordinate() {
        let mut engine = engine();
        engine.observe(&threat(&[(Indicator::Speedup, 0.9)], 1_000_000));
        let outcome = engine.observe(&threat(&[(Indicator::SuperpositionAccess, 0.9)], 1_500_000));
        assert!(outcome.coordinated.is_none());
    }

    #[test]
    fn coherent_sibling_history_records_high_correlation() {
        let mut engine = engine();
        // Metronomic speedup hits: identical spacing, identical confidence.
        for i in 0..4u64 {
            engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 1_000_000 + i * 1_000_000));
        }
        let outcome = engine.observe(&threat(
            &[(Indicator::SuperpositionAccess, 0.9)],
            5_000_000,
        ));
        assert!(outcome
            .high_correlations
            .iter()
            .any(|c| c.a == Indicator::SuperpositionAccess
                && c.b == Indicator::Speedup
                && c.strength > 0.8));
    }

    #[test]
    fn history_trims_to_half_cap_on_overflow() {
        let mut engine = engine();
        for i in 0..1_001u64 {
            engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 1_000_000 + i));
        }
        let history = engine.histories.get(&Indicator::Speedup).unwrap();
        assert_eq!(history.len(), HISTORY_TRIM);
    }

    #[test]
    fn analysis_summarizes_chain_state() {
        let mut engine = engine();
        engine.observe(&threat(&[(Indicator::Speedup, 0.8)], 1_000_000));
        let analysis = engine.analysis(2_000_000);
        assert_eq!(analysis.active_chains, 1);
        assert_eq!(analysis.retained_chains, 1);
        assert_eq!(analysis.coordinated_signals, 0);
    }
}
