//! # Quantum-Sentinel Node
//!
//! The main entry point for the sentinel monitor. Wires both subsystems
//! into one process:
//!
//! ```text
//! [ClockSource x3] ──→ TemporalService ──SecureClock──→ CanaryService
//!                          │                                 │
//!                  TemporalAttackDetector            maintenance loop
//!                          │                                 │
//!                      AlertSink ──→ telemetry ←── statistics gauge
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from env)
//! 2. Initialize telemetry (logging + metrics)
//! 3. Assemble the temporal service over simulated sources
//! 4. Assemble the canary service on top of the secure clock
//! 5. Establish the detector baseline and start monitoring
//! 6. Run until Ctrl+C, then stop the detector and exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use qs_01_canary_detection::adapters::{InMemoryBackupStore, NullCrypto, TracingAuditSink};
use qs_01_canary_detection::{CanaryApi, CanaryService, DetectionConfig};
use qs_02_temporal_integrity::adapters::{simulated_sources, OffsetClock, RandomJitter};
use qs_02_temporal_integrity::{
    AlertSink, ProposalGatherer, TemporalAttackDetector, TemporalConfig, TemporalService,
    TimeSourceAggregator,
};
use shared_types::{AuditEvent, TemporalError, TimestampProposal};

/// Gathers local proposals by polling every configured clock source. Each
/// source acts as one agent in the consensus round. Multi-node deployments
/// replace this with a network gatherer.
struct LocalProposalGatherer {
    aggregator: Arc<TimeSourceAggregator>,
}

#[async_trait]
impl ProposalGatherer for LocalProposalGatherer {
    async fn collect(
        &self,
        _timeout_micros: u64,
    ) -> Result<Vec<TimestampProposal>, TemporalError> {
        Ok(self
            .aggregator
            .read_all()?
            .into_iter()
            .map(|(agent_id, timestamp)| TimestampProposal {
                agent_id,
                timestamp,
            })
            .collect())
    }
}

/// Alert sink that counts alerts in Prometheus and logs them.
struct MetricsAlertSink;

impl AlertSink for MetricsAlertSink {
    fn alert(&self, event: AuditEvent) {
        let kind = event
            .details
            .get("kind")
            .and_then(|k| k.as_str())
            .unwrap_or("unknown");
        sentinel_telemetry::TEMPORAL_ALERTS
            .with_label_values(&[kind])
            .inc();
        tracing::error!(
            subsystem = "sentinel-node",
            event_type = %event.event_type,
            details = %event.details,
            "temporal alert"
        );
    }
}

/// Node-level configuration assembled from the environment.
struct SentinelConfig {
    detection: DetectionConfig,
    temporal: TemporalConfig,
    /// Cadence of cache sweeps and ledger pruning.
    maintenance_interval: Duration,
    /// Cadence of the statistics gauge refresh.
    statistics_interval: Duration,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            temporal: TemporalConfig::default(),
            maintenance_interval: Duration::from_secs(5),
            statistics_interval: Duration::from_secs(10),
        }
    }
}

/// Load configuration from environment variables.
fn load_config() -> SentinelConfig {
    let mut config = SentinelConfig::default();

    if let Ok(threshold) = std::env::var("QS_SENSITIVITY_THRESHOLD") {
        match threshold.parse::<f64>() {
            Ok(t) if (0.0..=1.0).contains(&t) => config.detection.sensitivity_threshold = t,
            _ => warn!("QS_SENSITIVITY_THRESHOLD must be a float in [0, 1]"),
        }
    }

    if let Ok(difficulty) = std::env::var("QS_VDF_DIFFICULTY") {
        match difficulty.parse::<u64>() {
            Ok(d) if d > 0 => config.temporal.vdf_difficulty = d,
            _ => warn!("QS_VDF_DIFFICULTY must be a positive integer"),
        }
    }

    if let Ok(expiry_ms) = std::env::var("QS_FRAGMENT_EXPIRY_MS") {
        match expiry_ms.parse::<u64>() {
            Ok(ms) => config.temporal.fragment_expiry_micros = ms * 1_000,
            _ => warn!("QS_FRAGMENT_EXPIRY_MS must be an integer millisecond count"),
        }
    }

    config
}

type NodeTemporalService = TemporalService<LocalProposalGatherer>;
type NodeCanaryService =
    CanaryService<NodeTemporalService, TracingAuditSink, NullCrypto, InMemoryBackupStore>;

/// The sentinel runtime orchestrating both subsystems.
struct SentinelRuntime {
    canary: Arc<NodeCanaryService>,
    temporal: Arc<NodeTemporalService>,
    detector: TemporalAttackDetector,
    config: SentinelConfig,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl SentinelRuntime {
    /// Assemble both subsystems.
    ///
    /// The temporal service is built first; the canary service consumes it
    /// as its `SecureClock`, so every detection timestamp is hardened.
    fn new(config: SentinelConfig) -> Self {
        info!("Creating Quantum-Sentinel runtime");

        // Bootstrap aggregator for the proposal gatherer; the service builds
        // its own from the same simulated sources.
        let gatherer_aggregator = Arc::new(TimeSourceAggregator::new(
            simulated_sources(),
            Box::new(RandomJitter::new(50)),
            config.temporal.pairwise_tolerance_micros,
        ));

        let temporal = Arc::new(TemporalService::new(
            &config.temporal,
            simulated_sources(),
            Box::new(RandomJitter::new(50)),
            Box::new(OffsetClock::new("isolated", 0)),
            LocalProposalGatherer {
                aggregator: gatherer_aggregator,
            },
        ));

        let detector = TemporalAttackDetector::new(
            config.temporal.clone(),
            temporal.aggregator(),
            temporal.isolation(),
            Arc::new(MetricsAlertSink),
        );

        let canary = Arc::new(CanaryService::new(
            Arc::clone(&temporal),
            Arc::new(TracingAuditSink),
            Arc::new(NullCrypto),
            Arc::new(InMemoryBackupStore::new()),
            config.detection.clone(),
        ));

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        Self {
            canary,
            temporal,
            detector,
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start the background tasks and the attack detector.
    async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Quantum-Sentinel Node v0.1.0");
        info!("  Canary Detection + Temporal Integrity");
        info!("===========================================");

        // Prove the temporal chain end to end before serving.
        let commitment = self
            .temporal
            .commit(b"sentinel-startup".to_vec())
            .await
            .context("startup commitment failed")?;
        self.temporal
            .verify_commitment(&commitment)
            .context("startup commitment did not verify")?;
        sentinel_telemetry::COMMITMENTS
            .with_label_values(&["commit", "ok"])
            .inc();
        info!(
            difficulty = commitment.difficulty,
            "startup time commitment verified"
        );

        let consensus = self
            .temporal
            .consensus_round()
            .await
            .context("startup consensus round failed")?;
        sentinel_telemetry::CONSENSUS_ROUNDS
            .with_label_values(&["success"])
            .inc();
        sentinel_telemetry::CONSENSUS_CONFIDENCE.set(consensus.confidence);
        info!(
            participants = consensus.participants.len(),
            confidence = consensus.confidence,
            "startup consensus round complete"
        );

        self.detector
            .start()
            .await
            .context("attack detector failed to start")?;

        self.start_maintenance_loop();
        self.start_statistics_loop();

        info!("All subsystems initialized and running");
        Ok(())
    }

    /// Periodic cache sweep and ledger prune.
    fn start_maintenance_loop(&self) {
        let canary = Arc::clone(&self.canary);
        let interval = self.config.maintenance_interval;
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = canary.run_maintenance() {
                            warn!("maintenance pass failed: {e}");
                            sentinel_telemetry::SUBSYSTEM_ERRORS
                                .with_label_values(&["qs-01", "maintenance"])
                                .inc();
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("[qs-01] Shutdown signal received");
                        break;
                    }
                }
            }
        });
    }

    /// Periodic refresh of the threat statistics gauges.
    fn start_statistics_loop(&self) {
        let canary = Arc::clone(&self.canary);
        let interval = self.config.statistics_interval;
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match canary.get_statistics() {
                            Ok(stats) => {
                                sentinel_telemetry::ACTIVE_THREATS
                                    .set(stats.active_threats as f64);
                                info!(
                                    total = stats.total_threats,
                                    active = stats.active_threats,
                                    mean_confidence = stats.mean_confidence,
                                    "threat statistics"
                                );
                            }
                            Err(e) => {
                                warn!("statistics query failed: {e}");
                                sentinel_telemetry::SUBSYSTEM_ERRORS
                                    .with_label_values(&["qs-01", "statistics"])
                                    .inc();
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("[qs-01] Statistics loop stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Shutdown gracefully: stop the detector, stop the loops, exit.
    async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");
        self.detector.stop().await;
        if self.shutdown_tx.send(true).is_err() {
            warn!("no background tasks were listening for shutdown");
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        info!(
            detector_alerts = self.detector.alert_count(),
            "Shutdown complete"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry_config = sentinel_telemetry::TelemetryConfig::from_env();
    let _guard = sentinel_telemetry::init_telemetry(&telemetry_config)
        .context("telemetry initialization failed")?;

    let config = load_config();
    let mut runtime = SentinelRuntime::new(config);
    runtime.start().await?;

    // Seed one canary so an idle deployment still has a tripwire.
    let token = runtime.canary.generate_token("sentinel-bootstrap")?;
    sentinel_telemetry::TOKENS_GENERATED.inc();
    info!(token_id = %token.id, "bootstrap canary token armed");

    info!("Sentinel is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
