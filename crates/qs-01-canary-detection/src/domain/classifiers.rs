//! # Pattern Classifier Bank
//!
//! Nine independent heuristics over a ledger window, each producing zero or
//! one `(indicator, confidence)`. Classifiers are pure functions of their
//! window and fault-isolated: one failing classifier is logged and skipped,
//! the others still run.
//!
//! The thresholds are behavioral signatures of known attack-algorithm query
//! patterns (Simon, Bernstein-Vazirani, Deutsch-Jozsa, Grover, Shor), not
//! physical measurements.

use super::errors::ClassifierFault;
use shared_types::{
    AccessRecord, Indicator, IndicatorHit, TimestampMicros, TokenId, MICROS_PER_MILLI,
};
use std::collections::HashMap;

/// Consistent snapshot handed to every classifier in a round.
#[derive(Debug, Clone)]
pub struct ClassifierWindow {
    /// Token the round is about.
    pub token_id: TokenId,
    /// Secure timestamp of the access that started the round.
    pub now: TimestampMicros,
    /// Retained records for the token, oldest-first.
    pub records: Vec<AccessRecord>,
    /// Distinct tokens accessed within the cross-token window of `now`.
    pub cross_token_count: usize,
}

impl ClassifierWindow {
    /// Inter-access intervals in microseconds, oldest-first.
    pub fn intervals(&self) -> Vec<u64> {
        self.records
            .windows(2)
            .map(|w| w[1].timestamp.saturating_sub(w[0].timestamp))
            .collect()
    }

    /// Numeric access values in record order.
    pub fn values(&self) -> Vec<u64> {
        self.records.iter().filter_map(|r| r.value).collect()
    }

    /// Records with a timestamp within `window_micros` of `now`.
    pub fn within(&self, window_micros: u64) -> usize {
        let cutoff = self.now.saturating_sub(window_micros);
        self.records.iter().filter(|r| r.timestamp >= cutoff).count()
    }
}

/// One detection heuristic.
pub trait Classifier: Send + Sync {
    /// The indicator this classifier can raise.
    fn indicator(&self) -> Indicator;

    /// Evaluate the window. `Ok(None)` means the signature is absent;
    /// `Err` means the classifier itself misbehaved and must be excluded
    /// from the round.
    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault>;
}

fn hit(indicator: Indicator, confidence: f64) -> Option<IndicatorHit> {
    Some(IndicatorHit {
        indicator,
        confidence,
    })
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn variance(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let m = mean(samples);
    samples.iter().map(|s| (s - m).powi(2)).sum::<f64>() / samples.len() as f64
}

// =============================================================================
// TIMING-ONLY HEURISTICS
// =============================================================================

/// >3 accesses to one token inside 100 ms.
struct SuperpositionAccess;

impl Classifier for SuperpositionAccess {
    fn indicator(&self) -> Indicator {
        Indicator::SuperpositionAccess
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        if window.within(100 * MICROS_PER_MILLI) > 3 {
            return Ok(hit(self.indicator(), 0.9));
        }
        Ok(None)
    }
}

/// >2 distinct tokens accessed inside the 50 ms cross-token window.
struct EntanglementCorrelation;

impl Classifier for EntanglementCorrelation {
    fn indicator(&self) -> Indicator {
        Indicator::EntanglementCorrelation
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        if window.cross_token_count > 2 {
            return Ok(hit(self.indicator(), 0.85));
        }
        Ok(None)
    }
}

/// Mean inter-access interval under 1 ms across at least 3 accesses.
struct Speedup;

impl Classifier for Speedup {
    fn indicator(&self) -> Indicator {
        Indicator::Speedup
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        if window.records.len() < 3 {
            return Ok(None);
        }
        let intervals: Vec<f64> = window.intervals().iter().map(|i| *i as f64).collect();
        if mean(&intervals) < MICROS_PER_MILLI as f64 {
            return Ok(hit(self.indicator(), 0.8));
        }
        Ok(None)
    }
}

/// Alternating-rhythm signature: over the last 5 accesses, both interval
/// pairs two apart agree to within 1 ms.
struct Interference;

impl Classifier for Interference {
    fn indicator(&self) -> Indicator {
        Indicator::Interference
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        if window.records.len() < 5 {
            return Ok(None);
        }
        let tail = &window.records[window.records.len() - 5..];
        let intervals: Vec<u64> = tail
            .windows(2)
            .map(|w| w[1].timestamp.saturating_sub(w[0].timestamp))
            .collect();
        let matching = (0..intervals.len().saturating_sub(2))
            .filter(|&i| intervals[i].abs_diff(intervals[i + 2]) < MICROS_PER_MILLI)
            .count();
        if matching >= 2 {
            return Ok(hit(self.indicator(), 0.75));
        }
        Ok(None)
    }
}

/// Sub-millisecond probe followed by orders-of-magnitude slower follow-ups
/// (Bernstein-Vazirani style).
struct LinearStructure;

impl Classifier for LinearStructure {
    fn indicator(&self) -> Indicator {
        Indicator::LinearStructure
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        let intervals = window.intervals();
        if intervals.len() < 2 {
            return Ok(None);
        }
        let first = intervals[0];
        if first >= MICROS_PER_MILLI {
            return Ok(None);
        }
        let first_f = first.max(1) as f64;
        if intervals[1..].iter().any(|i| *i as f64 / first_f > 100.0) {
            return Ok(hit(self.indicator(), 0.90));
        }
        Ok(None)
    }
}

// =============================================================================
// VALUE-STRUCTURE HEURISTICS
// =============================================================================

/// Repeated XOR difference among recent access values (Simon's style):
/// at least 2 value pairs share a nonzero XOR within 15 total accesses,
/// at attack pace.
struct PeriodFinding;

impl Classifier for PeriodFinding {
    fn indicator(&self) -> Indicator {
        Indicator::PeriodFinding
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        if window.records.len() > 15 {
            return Ok(None);
        }
        let intervals: Vec<f64> = window.intervals().iter().map(|i| *i as f64).collect();
        if intervals.is_empty() || mean(&intervals) >= 10.0 * MICROS_PER_MILLI as f64 {
            return Ok(None);
        }
        let values = window.values();
        if values.len() < 4 {
            return Ok(None);
        }
        let mut xor_counts: HashMap<u64, usize> = HashMap::new();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                let d = values[i] ^ values[j];
                if d != 0 {
                    *xor_counts.entry(d).or_insert(0) += 1;
                }
            }
        }
        if xor_counts.values().any(|&c| c >= 2) {
            return Ok(hit(self.indicator(), 0.85));
        }
        Ok(None)
    }
}

/// Single fast query with a near-constant follow-up value set
/// (Deutsch-Jozsa style).
struct OracleBalance;

impl Classifier for OracleBalance {
    fn indicator(&self) -> Indicator {
        Indicator::OracleBalance
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        let intervals = window.intervals();
        let Some(&first) = intervals.first() else {
            return Ok(None);
        };
        if first >= MICROS_PER_MILLI / 2 {
            return Ok(None);
        }
        let followups: Vec<u64> = window.records[1..]
            .iter()
            .filter_map(|r| r.value)
            .collect();
        if followups.is_empty() {
            return Ok(None);
        }
        let mut distinct = followups.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() <= 2 {
            return Ok(hit(self.indicator(), 0.80));
        }
        Ok(None)
    }
}

/// Rapid converging query burst (Grover style): sustained sub-2 ms pace and
/// shrinking value variance between window halves.
struct SearchAmplification;

impl Classifier for SearchAmplification {
    fn indicator(&self) -> Indicator {
        Indicator::SearchAmplification
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        let intervals = window.intervals();
        if intervals.len() < 10 {
            return Ok(None);
        }
        let fast = intervals
            .iter()
            .filter(|i| **i < 2 * MICROS_PER_MILLI)
            .count();
        if (fast as f64) < 0.8 * intervals.len() as f64 {
            return Ok(None);
        }
        let values: Vec<f64> = window.values().iter().map(|v| *v as f64).collect();
        if values.len() < 4 {
            return Ok(None);
        }
        let mid = values.len() / 2;
        let early = variance(&values[..mid]);
        let late = variance(&values[mid..]);
        if early > 0.0 && late <= 0.7 * early {
            return Ok(hit(self.indicator(), 0.95));
        }
        Ok(None)
    }
}

/// Rapid modular-structured probing of key-sized values (Shor style).
struct FactoringSignature;

/// Values below this have too few significant bits to be key material.
const KEY_SIZE_FLOOR: u64 = 1 << 40;

impl Classifier for FactoringSignature {
    fn indicator(&self) -> Indicator {
        Indicator::FactoringSignature
    }

    fn evaluate(&self, window: &ClassifierWindow) -> Result<Option<IndicatorHit>, ClassifierFault> {
        let intervals = window.intervals();
        if intervals.is_empty() {
            return Ok(None);
        }
        let rapid = intervals.iter().filter(|i| **i < MICROS_PER_MILLI).count();
        if (rapid as f64) < 0.7 * intervals.len() as f64 {
            return Ok(None);
        }
        let values = window.values();
        if !values.iter().any(|v| *v >= KEY_SIZE_FLOOR) {
            return Ok(None);
        }
        let modular = values.iter().enumerate().any(|(i, a)| {
            values
                .iter()
                .enumerate()
                .any(|(j, b)| i != j && *b > 1 && a != b && a % b == 0)
        });
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for v in &values {
            *counts.entry(*v).or_insert(0) += 1;
        }
        let periodic = counts.values().any(|&c| c >= 2);
        if modular || periodic {
            return Ok(hit(self.indicator(), 0.98));
        }
        Ok(None)
    }
}

// =============================================================================
// THE BANK
// =============================================================================

/// All nine classifiers behind one dispatch point.
pub struct PatternClassifierBank {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl Default for PatternClassifierBank {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternClassifierBank {
    /// Bank with the full standard classifier set.
    pub fn new() -> Self {
        Self {
            classifiers: vec![
                Box::new(SuperpositionAccess),
                Box::new(EntanglementCorrelation),
                Box::new(Speedup),
                Box::new(Interference),
                Box::new(PeriodFinding),
                Box::new(LinearStructure),
                Box::new(OracleBalance),
                Box::new(SearchAmplification),
                Box::new(FactoringSignature),
            ],
        }
    }

    /// Bank with a caller-supplied classifier set (test seam).
    pub fn with_classifiers(classifiers: Vec<Box<dyn Classifier>>) -> Self {
        Self { classifiers }
    }

    /// Run every classifier over the window.
    ///
    /// Faulting classifiers are logged and excluded; confidences are clamped
    /// into `[0, 1]` so no classifier can violate the bound downstream.
    pub fn run(&self, window: &ClassifierWindow) -> Vec<IndicatorHit> {
        let mut hits = Vec::new();
        for classifier in &self.classifiers {
            match classifier.evaluate(window) {
                Ok(Some(mut hit)) => {
                    hit.confidence = hit.confidence.clamp(0.0, 1.0);
                    hits.push(hit);
                }
                Ok(None) => {}
                Err(fault) => {
                    tracing::warn!(
                        subsystem = "canary-detection",
                        indicator = %fault.indicator,
                        reason = %fault.reason,
                        "classifier fault, excluded from round"
                    );
                }
            }
        }
        hits
    }

    /// Mean confidence over a round's hits, `None` when nothing fired.
    pub fn aggregate(hits: &[IndicatorHit]) -> Option<f64> {
        if hits.is_empty() {
            return None;
        }
        let sum: f64 = hits.iter().map(|h| h.confidence).sum();
        Some(sum / hits.len() as f64)
    }
}

impl std::fmt::Debug for PatternClassifierBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternClassifierBank")
            .field("classifiers", &self.classifiers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MICROS_PER_SEC;

    fn window(timestamps: &[u64], values: &[Option<u64>]) -> ClassifierWindow {
        let token_id = TokenId::random();
        let records = timestamps
            .iter()
            .zip(values.iter())
            .map(|(t, v)| AccessRecord {
                token_id,
                accessor_id: "probe".into(),
                value: *v,
                timestamp: *t,
            })
            .collect::<Vec<_>>();
        ClassifierWindow {
            token_id,
            now: timestamps.last().copied().unwrap_or(0),
            records,
            cross_token_count: 1,
        }
    }

    fn timing_window(timestamps: &[u64]) -> ClassifierWindow {
        window(timestamps, &vec![None; timestamps.len()])
    }

    #[test]
    fn superposition_fires_on_four_accesses_in_window() {
        // t = 0, 10, 20, 30 ms
        let w = timing_window(&[1_000_000, 1_010_000, 1_020_000, 1_030_000]);
        let hits = PatternClassifierBank::new().run(&w);
        let hit = hits
            .iter()
            .find(|h| h.indicator == Indicator::SuperpositionAccess)
            .expect("superposition should fire");
        assert_eq!(hit.confidence, 0.9);
    }

    #[test]
    fn superposition_silent_on_three_accesses() {
        let w = timing_window(&[1_000_000, 1_040_000, 1_080_000]);
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .all(|h| h.indicator != Indicator::SuperpositionAccess));
    }

    #[test]
    fn entanglement_needs_three_distinct_tokens() {
        let mut w = timing_window(&[1_000_000]);
        w.cross_token_count = 3;
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::EntanglementCorrelation
                && h.confidence == 0.85));
    }

    #[test]
    fn speedup_fires_on_submillisecond_pace() {
        let w = timing_window(&[1_000_000, 1_000_300, 1_000_700, 1_001_100]);
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::Speedup && h.confidence == 0.8));
    }

    #[test]
    fn interference_fires_on_alternating_rhythm() {
        // Intervals 5ms, 20ms, 5.2ms, 20.3ms; both (i, i+2) pairs within 1ms.
        let w = timing_window(&[1_000_000, 1_005_000, 1_025_000, 1_030_200, 1_050_500]);
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::Interference && h.confidence == 0.75));
    }

    #[test]
    fn linear_structure_fires_on_probe_then_verification() {
        // Instant follow-up at +0.2ms, verification at +500ms: ratio 2499x.
        let w = timing_window(&[1_000_000, 1_000_200, 1_500_000]);
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::LinearStructure && h.confidence == 0.90));
    }

    #[test]
    fn linear_structure_silent_on_uniform_pace() {
        let w = timing_window(&[1_000_000, 1_100_000, 1_200_000]);
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .all(|h| h.indicator != Indicator::LinearStructure));
    }

    #[test]
    fn period_finding_fires_on_repeated_xor_difference() {
        // 1^3 == 5^7 == 2: two pairs share a XOR difference.
        let w = window(
            &[1_000_000, 1_002_000, 1_004_000, 1_006_000],
            &[Some(1), Some(3), Some(5), Some(7)],
        );
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::PeriodFinding && h.confidence == 0.85));
    }

    #[test]
    fn oracle_balance_fires_on_fast_query_with_constant_values() {
        let w = window(
            &[1_000_000, 1_000_300, 1_002_000, 1_004_000],
            &[None, Some(0), Some(1), Some(0)],
        );
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::OracleBalance && h.confidence == 0.80));
    }

    #[test]
    fn search_amplification_fires_on_converging_burst() {
        let timestamps: Vec<u64> = (0..12).map(|i| 1_000_000 + i * 1_500).collect();
        // Wide spread early, tight cluster late.
        let values: Vec<Option<u64>> = vec![
            Some(900),
            Some(10),
            Some(500),
            Some(40),
            Some(700),
            Some(120),
            Some(300),
            Some(310),
            Some(305),
            Some(302),
            Some(303),
            Some(304),
        ];
        let w = window(&timestamps, &values);
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::SearchAmplification && h.confidence == 0.95));
    }

    #[test]
    fn factoring_signature_fires_on_modular_key_probing() {
        let p: u64 = 1 << 41;
        let w = window(
            &[1_000_000, 1_000_400, 1_000_800, 1_001_200],
            &[Some(p), Some(2), Some(p * 3), Some(7)],
        );
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .any(|h| h.indicator == Indicator::FactoringSignature && h.confidence == 0.98));
    }

    #[test]
    fn factoring_silent_without_key_sized_values() {
        let w = window(
            &[1_000_000, 1_000_400, 1_000_800],
            &[Some(10), Some(20), Some(10)],
        );
        let hits = PatternClassifierBank::new().run(&w);
        assert!(hits
            .iter()
            .all(|h| h.indicator != Indicator::FactoringSignature));
    }

    #[test]
    fn confidences_always_within_bounds() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let bank = PatternClassifierBank::new();
        for _ in 0..200 {
            let n = rng.gen_range(1..20);
            let mut t = 1_000_000u64;
            let mut timestamps = Vec::new();
            let mut values = Vec::new();
            for _ in 0..n {
                t += rng.gen_range(0..2_000_000);
                timestamps.push(t);
                values.push(if rng.gen_bool(0.5) {
                    Some(rng.gen::<u64>())
                } else {
                    None
                });
            }
            let mut w = window(&timestamps, &values);
            w.cross_token_count = rng.gen_range(0..6);
            for hit in bank.run(&w) {
                assert!((0.0..=1.0).contains(&hit.confidence));
            }
        }
    }

    #[test]
    fn faulting_classifier_does_not_abort_siblings() {
        struct Faulty;
        impl Classifier for Faulty {
            fn indicator(&self) -> Indicator {
                Indicator::Speedup
            }
            fn evaluate(
                &self,
                _window: &ClassifierWindow,
            ) -> Result<Option<IndicatorHit>, ClassifierFault> {
                Err(ClassifierFault {
                    indicator: Indicator::Speedup,
                    reason: "synthetic".into(),
                })
            }
        }
        let bank = PatternClassifierBank::with_classifiers(vec![
            Box::new(Faulty),
            Box::new(SuperpositionAccess),
        ]);
        let w = timing_window(&[1_000_000, 1_010_000, 1_020_000, 1_030_000]);
        let hits = bank.run(&w);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].indicator, Indicator::SuperpositionAccess);
    }

    #[test]
    fn aggregate_is_mean_of_hits() {
        let hits = vec![
            IndicatorHit {
                indicator: Indicator::Speedup,
                confidence: 0.8,
            },
            IndicatorHit {
                indicator: Indicator::SuperpositionAccess,
                confidence: 0.9,
            },
        ];
        let agg = PatternClassifierBank::aggregate(&hits).unwrap();
        assert!((agg - 0.85).abs() < 1e-9);
        assert!(PatternClassifierBank::aggregate(&[]).is_none());
    }

    #[test]
    fn empty_window_fires_nothing() {
        let w = ClassifierWindow {
            token_id: TokenId::random(),
            now: MICROS_PER_SEC,
            records: Vec::new(),
            cross_token_count: 0,
        };
        assert!(PatternClassifierBank::new().run(&w).is_empty());
    }
}
