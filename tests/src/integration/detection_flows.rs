//! # Detection Integration Flows
//!
//! Full token lifecycle through the detection subsystem: generation,
//! access bursts, threat registration, correlation, and backup recovery.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{canary_service, canary_service_with};
    use qs_01_canary_detection::{
        CanaryApi, ClassifierWindow, DetectionConfig, PatternClassifierBank,
    };
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared_types::{AccessRecord, Indicator, ThreatLevel};

    #[test]
    fn access_burst_raises_and_then_expires_a_threat() {
        let (clock, _sink, svc) = canary_service();
        let token = svc.generate_token("payments-api-key").unwrap();

        // Four accesses inside 100 ms trip the burst heuristic.
        for _ in 0..4 {
            svc.access(token.id, "scanner-7".into()).unwrap();
            clock.advance(10_000);
        }

        let active = svc.get_active_threats().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].level, ThreatLevel::High);
        assert_eq!(active[0].affected_tokens, vec![token.id]);

        // Past the active window the threat drops out of the live view but
        // stays in history.
        clock.advance(301 * shared_types::MICROS_PER_SEC);
        assert!(svc.get_active_threats().unwrap().is_empty());
        assert_eq!(svc.get_statistics().unwrap().total_threats, 1);
    }

    #[test]
    fn slow_access_pattern_never_alerts() {
        let (clock, sink, svc) = canary_service();
        let token = svc.generate_token("staging-secret").unwrap();

        // Human-scale traffic with natural jitter. A metronome-perfect
        // cadence would legitimately look like interference banding, so the
        // gaps here vary by hundreds of milliseconds.
        let gaps_ms: [u64; 10] = [1_000, 1_400, 900, 1_600, 1_200, 800, 1_500, 1_100, 1_300, 950];
        for gap in gaps_ms {
            let triggered = svc.access(token.id, "backup-job".into()).unwrap();
            assert!(!triggered);
            clock.advance(gap * shared_types::MICROS_PER_MILLI);
        }
        assert!(svc.get_active_threats().unwrap().is_empty());
        assert!(!sink.event_types().contains(&"threat_detected".to_string()));
    }

    #[test]
    fn random_traffic_upholds_the_threshold_contract() {
        // A count bucket of one keeps every round out of the memo (counts
        // only ever increment), so the shadow evaluation below sees exactly
        // the window the service classified.
        let config = DetectionConfig {
            cache_count_bucket: 1,
            ..DetectionConfig::default()
        };
        let threshold = config.sensitivity_threshold;
        let retention = config.retention_micros;
        let (clock, _sink, svc) = canary_service_with(config);
        let token = svc.generate_token("fuzzed-secret").unwrap();

        let bank = PatternClassifierBank::new();
        let mut rng = StdRng::seed_from_u64(0x5e17);
        let mut shadow: Vec<AccessRecord> = Vec::new();
        let mut now = 1_000_000u64;
        let mut expected_threats = 0usize;

        for step in 0..400 {
            // Mix sub-millisecond bursts with second-scale lulls so some
            // windows trip heuristics and others stay quiet.
            let gap = if rng.gen_bool(0.4) {
                rng.gen_range(50..1_500)
            } else {
                rng.gen_range(5_000..1_500_000)
            };
            clock.advance(gap);
            now += gap;
            let value = rng
                .gen_bool(0.5)
                .then(|| rng.gen::<u64>() >> rng.gen_range(0u32..48));

            shadow.push(AccessRecord {
                token_id: token.id,
                accessor_id: "fuzzer".into(),
                value,
                timestamp: now,
            });
            let cutoff = now.saturating_sub(retention);
            shadow.retain(|r| r.timestamp >= cutoff);

            let window = ClassifierWindow {
                token_id: token.id,
                now,
                records: shadow.clone(),
                cross_token_count: 1,
            };
            let confidence = PatternClassifierBank::aggregate(&bank.run(&window));
            if let Some(c) = confidence {
                assert!((0.0..=1.0).contains(&c), "confidence {c} out of bounds");
            }
            let expected = confidence.is_some_and(|c| c >= threshold);

            let triggered = svc
                .access_with_value(token.id, "fuzzer".into(), value)
                .unwrap();
            assert_eq!(triggered, expected, "divergence at step {step}");
            if expected {
                expected_threats += 1;
            }
        }

        // A record exists for every round that crossed the threshold and for
        // nothing else, and none dips below it.
        let stats = svc.get_statistics().unwrap();
        assert_eq!(stats.total_threats, expected_threats);
        assert!(svc
            .get_active_threats()
            .unwrap()
            .iter()
            .all(|t| t.confidence >= threshold));
    }

    #[test]
    fn multi_token_flood_raises_coordinated_attack() {
        let (clock, sink, svc) = canary_service();
        let a = svc.generate_token("token-a").unwrap();
        let b = svc.generate_token("token-b").unwrap();
        let c = svc.generate_token("token-c").unwrap();

        // Round-robin sub-millisecond flood over three tokens: trips the
        // burst, speedup, and cross-token heuristics together.
        for _ in 0..6 {
            for token in [a.id, b.id, c.id] {
                svc.access(token, "botnet".into()).unwrap();
                clock.advance(200);
            }
        }

        let types = sink.event_types();
        assert!(types.contains(&"threat_detected".to_string()));
        assert!(types.contains(&"coordinated_attack".to_string()));

        let analysis = svc.get_correlation_analysis().unwrap();
        assert!(analysis.coordinated_signals >= 1);
        assert!(analysis.active_chains >= 1);

        // The coordinated event names at least three indicator families.
        let coordinated = sink
            .events()
            .into_iter()
            .find(|e| e.event_type == "coordinated_attack")
            .unwrap();
        let indicators = coordinated.details["indicators"].as_array().unwrap();
        assert!(indicators.len() >= 3);
    }

    #[test]
    fn value_carrying_accesses_reach_the_value_heuristics() {
        let (clock, _sink, svc) = canary_service();
        let token = svc.generate_token("kv-cell").unwrap();

        // Simon-style probe: repeated XOR structure at attack pace.
        let values = [0x10u64, 0x35, 0x10 ^ 0x7, 0x35 ^ 0x7, 0x52, 0x52 ^ 0x7];
        let mut triggered = false;
        for v in values {
            triggered |= svc
                .access_with_value(token.id, "prober".into(), Some(v))
                .unwrap();
            clock.advance(3_000);
        }
        assert!(triggered);

        let active = svc.get_active_threats().unwrap();
        assert!(active.iter().any(|t| t
            .indicators
            .iter()
            .any(|h| h.indicator == Indicator::PeriodFinding)));
    }

    #[test]
    fn raised_sensitivity_threshold_suppresses_medium_signals() {
        let (clock, _sink, svc) = canary_service_with(DetectionConfig {
            sensitivity_threshold: 0.95,
            ..DetectionConfig::default()
        });
        let token = svc.generate_token("t").unwrap();
        for _ in 0..4 {
            svc.access(token.id, "probe".into()).unwrap();
            clock.advance(10_000);
        }
        assert!(svc.get_active_threats().unwrap().is_empty());
    }

    #[test]
    fn backup_survives_service_restart() {
        use qs_01_canary_detection::adapters::{InMemoryBackupStore, NullCrypto};
        use qs_01_canary_detection::CanaryService;
        use crate::integration::fixtures::{ManualClock, RecordingSink};
        use std::sync::Arc;

        let store = Arc::new(InMemoryBackupStore::new());
        let clock = Arc::new(ManualClock::at(1_000_000));

        let first = CanaryService::with_defaults(
            Arc::clone(&clock),
            Arc::new(RecordingSink::new()),
            Arc::new(NullCrypto),
            Arc::clone(&store),
        );
        let token = first.generate_token("durable").unwrap();
        first.access(token.id, "reader".into()).unwrap();
        first.backup_token(token.id).unwrap();
        drop(first);

        // A fresh service sharing the store recovers the token.
        let second = CanaryService::with_defaults(
            clock,
            Arc::new(RecordingSink::new()),
            Arc::new(NullCrypto),
            store,
        );
        let restored = second.restore_token(token.id).unwrap();
        assert_eq!(restored.id, token.id);
        assert_eq!(restored.label, "durable");
        assert_eq!(restored.access_count, 1);
        // Restored tokens are live again.
        second.access(token.id, "reader".into()).unwrap();
    }
}
