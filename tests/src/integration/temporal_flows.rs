//! # Temporal Integration Flows
//!
//! The temporal subsystem assembled as a whole: source aggregation,
//! commitments, consensus rounds, and the attack detector loop.

#[cfg(test)]
mod tests {
    use qs_02_temporal_integrity::adapters::{
        FixedJitter, OffsetClock, RecordingAlertSink, StaticProposalGatherer,
    };
    use qs_02_temporal_integrity::{
        AlertSink, DetectorState, IsolationReference, TemporalAttackDetector, TemporalConfig,
        TemporalService, TimeSourceAggregator,
    };
    use shared_types::{SecureClock, TemporalError, TimestampProposal};
    use std::sync::Arc;

    fn service_with_sources(
        offsets: [i64; 3],
        proposals: Vec<TimestampProposal>,
    ) -> TemporalService<StaticProposalGatherer> {
        TemporalService::new(
            &TemporalConfig {
                vdf_difficulty: 5,
                ..TemporalConfig::default()
            },
            vec![
                Box::new(OffsetClock::new("hardware", offsets[0])),
                Box::new(OffsetClock::new("gps", offsets[1])),
                Box::new(OffsetClock::new("ntp-consensus", offsets[2])),
            ],
            Box::new(FixedJitter(7)),
            Box::new(OffsetClock::new("isolated", 0)),
            StaticProposalGatherer::new(proposals),
        )
    }

    #[test]
    fn agreeing_sources_serve_secure_timestamps() {
        let svc = service_with_sources([0, 300, -200], Vec::new());
        let first = svc.now().unwrap();
        let second = svc.now().unwrap();
        assert!(second >= first);
    }

    #[test]
    fn manipulated_source_fails_the_whole_request() {
        // GPS skewed 80 ms beyond the 50 ms pairwise tolerance.
        let svc = service_with_sources([0, 80_000, 0], Vec::new());
        let err = svc.now().unwrap_err();
        match err {
            TemporalError::AttackDetected {
                source_a, source_b, ..
            } => {
                let pair = [source_a.as_str(), source_b.as_str()];
                assert!(pair.contains(&"gps"));
            }
            other => panic!("expected AttackDetected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn commitment_binds_data_and_rejects_tampering() {
        let svc = service_with_sources([0, 0, 0], Vec::new());
        let commitment = svc.commit(b"ledger-segment-41".to_vec()).await.unwrap();
        svc.verify_commitment(&commitment).unwrap();

        // Shifting the committed timestamp invalidates the digest chain.
        let mut forged = commitment.clone();
        forged.timestamp += 1;
        let err = svc.verify_commitment(&forged).unwrap_err();
        assert!(matches!(err, TemporalError::CommitmentInvalid { .. }));
    }

    #[tokio::test]
    async fn byzantine_minority_is_outvoted() {
        let base = 5_000_000u64;
        let mut proposals: Vec<TimestampProposal> = (0..7)
            .map(|i| TimestampProposal {
                agent_id: format!("honest-{i}"),
                timestamp: base + i * 1_000,
            })
            .collect();
        proposals.push(TimestampProposal {
            agent_id: "liar-1".into(),
            timestamp: base + 900_000,
        });
        proposals.push(TimestampProposal {
            agent_id: "liar-2".into(),
            timestamp: base.saturating_sub(700_000),
        });

        let svc = service_with_sources([0, 0, 0], proposals);
        let consensus = svc.consensus_round().await.unwrap();

        // Liars fall outside the 100 ms outlier band and are excluded.
        assert_eq!(consensus.participants.len(), 7);
        assert!(!consensus.participants.iter().any(|p| p.starts_with("liar")));
        assert!(consensus.value >= base && consensus.value <= base + 6_000);
        assert!(consensus.confidence >= 0.95);
    }

    #[tokio::test]
    async fn scattered_proposals_fail_quorum() {
        // Readings 300 ms apart: after outlier filtering fewer than
        // floor(2n/3)+1 survive.
        let proposals: Vec<TimestampProposal> = (0..6)
            .map(|i| TimestampProposal {
                agent_id: format!("agent-{i}"),
                timestamp: 1_000_000 + i * 300_000,
            })
            .collect();
        let svc = service_with_sources([0, 0, 0], proposals);
        let err = svc.consensus_round().await.unwrap_err();
        assert!(matches!(err, TemporalError::ConsensusFailure { .. }));
    }

    #[test]
    fn isolation_rejects_drifted_external_time() {
        let svc = service_with_sources([0, 0, 0], Vec::new());
        let reference = svc.isolated_reference().unwrap();
        svc.validate_isolated(reference.value).unwrap();

        let err = svc
            .validate_isolated(reference.value + 50_000)
            .unwrap_err();
        assert!(matches!(err, TemporalError::IsolationDrift { .. }));
    }

    #[tokio::test]
    async fn detector_full_lifecycle_with_unsafe_margin() {
        let config = TemporalConfig {
            poll_interval_micros: 1_000,
            min_poll_interval_micros: 250,
            baseline_samples: 2,
            // 40 s fragment expiry against a 48 s search attack is far past
            // the 10% safety ceiling.
            fragment_expiry_micros: 40_000_000,
            ..TemporalConfig::default()
        };
        let aggregator = Arc::new(TimeSourceAggregator::new(
            vec![
                Box::new(OffsetClock::new("hardware", 0)),
                Box::new(OffsetClock::new("gps", 0)),
                Box::new(OffsetClock::new("ntp-consensus", 0)),
            ],
            Box::new(FixedJitter(0)),
            config.pairwise_tolerance_micros,
        ));
        let isolation = Arc::new(IsolationReference::new(
            Box::new(OffsetClock::new("isolated", 0)),
            config.isolation_tolerance_micros,
        ));
        let alerts = Arc::new(RecordingAlertSink::new());
        let sink: Arc<dyn AlertSink> = alerts.clone();
        let mut detector = TemporalAttackDetector::new(config, aggregator, isolation, sink);

        assert_eq!(detector.state(), DetectorState::Idle);
        detector.start().await.unwrap();
        assert_eq!(detector.state(), DetectorState::Monitoring);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        detector.stop().await;
        assert_eq!(detector.state(), DetectorState::Idle);

        assert!(detector.alert_count() > 0);
        let events = alerts.events();
        assert!(events.iter().all(|e| e.event_type == "temporal_alert"));
        assert!(events
            .iter()
            .any(|e| e.details["kind"] == "quantum_safety_margin"));
        // Countermeasures tightened the poll cadence, floored at the minimum.
        assert!(detector.poll_interval_micros() < 1_000);
        assert!(detector.poll_interval_micros() >= 250);
    }
}
