//! # Temporal Attack Detector
//!
//! Polling loop comparing live timing measurements against an established
//! baseline and the aggregated sources.
//!
//! ## State Machine
//!
//! ```text
//! IDLE ──start()──→ MONITORING ──violation──→ ALERTED
//!   ↑                   ↑                        │
//!   └──── stop() ───────┴──── COUNTERMEASURES ←──┘
//! ```
//!
//! INVARIANT-5: the stop flag is observed every iteration; the loop exits
//! within one tick interval and joins cleanly.

use crate::domain::aggregator::TimeSourceAggregator;
use crate::domain::config::TemporalConfig;
use crate::domain::isolation::IsolationReference;
use crate::ports::AlertSink;
use serde_json::json;
use shared_types::{
    AuditEvent, SecureClock as _, SystemClock, TemporalError, TimingMeasurement,
    MICROS_PER_MILLI,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Detector lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Not monitoring.
    Idle,
    /// Poll loop active, no live alert.
    Monitoring,
    /// A violation was just observed.
    Alerted,
    /// Adapting the poll cadence after an alert.
    Countermeasures,
}

/// One detected violation.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Violation kind: `clock_speed_anomaly`, `time_source_manipulation`,
    /// or `quantum_safety_margin`.
    pub kind: &'static str,
    /// Structured details for the alert event.
    pub details: serde_json::Value,
}

/// Background temporal-attack detector.
pub struct TemporalAttackDetector {
    config: TemporalConfig,
    aggregator: Arc<TimeSourceAggregator>,
    isolation: Arc<IsolationReference>,
    alerts: Arc<dyn AlertSink>,
    state: Arc<parking_lot::RwLock<DetectorState>>,
    stop: Arc<AtomicBool>,
    poll_interval_micros: Arc<AtomicU64>,
    fragment_expiry_micros: Arc<AtomicU64>,
    alert_count: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl TemporalAttackDetector {
    /// Build a detector; call `start` to begin monitoring.
    pub fn new(
        config: TemporalConfig,
        aggregator: Arc<TimeSourceAggregator>,
        isolation: Arc<IsolationReference>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let poll = config.poll_interval_micros;
        let expiry = config.fragment_expiry_micros;
        Self {
            config,
            aggregator,
            isolation,
            alerts,
            state: Arc::new(parking_lot::RwLock::new(DetectorState::Idle)),
            stop: Arc::new(AtomicBool::new(false)),
            poll_interval_micros: Arc::new(AtomicU64::new(poll)),
            fragment_expiry_micros: Arc::new(AtomicU64::new(expiry)),
            alert_count: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DetectorState {
        *self.state.read()
    }

    /// Alerts raised since start.
    pub fn alert_count(&self) -> u64 {
        self.alert_count.load(Ordering::SeqCst)
    }

    /// Current poll interval (countermeasures shrink it).
    pub fn poll_interval_micros(&self) -> u64 {
        self.poll_interval_micros.load(Ordering::SeqCst)
    }

    /// Update the upstream fragment-expiry duration the safety margin is
    /// computed against. Takes effect on the next tick.
    pub fn set_fragment_expiry_micros(&self, micros: u64) {
        self.fragment_expiry_micros.store(micros, Ordering::SeqCst);
    }

    /// Take one timing measurement against the previous sample.
    pub fn measure(
        aggregator: &TimeSourceAggregator,
        isolation: &IsolationReference,
        previous: Option<&TimingMeasurement>,
    ) -> Result<TimingMeasurement, TemporalError> {
        let system_time = SystemClock.now()?;
        let reference_time = isolation.fresh()?.value;
        let source_times = aggregator.read_all()?;
        let clock_ratio = match previous {
            Some(prev) => {
                let sys_elapsed = system_time.saturating_sub(prev.system_time);
                let ref_elapsed = reference_time.saturating_sub(prev.reference_time);
                if ref_elapsed == 0 {
                    1.0
                } else {
                    sys_elapsed as f64 / ref_elapsed as f64
                }
            }
            None => 1.0,
        };
        Ok(TimingMeasurement {
            system_time,
            reference_time,
            source_times,
            clock_ratio,
        })
    }

    /// Evaluate one measurement against the baseline. Pure check logic; the
    /// poll loop and tests share it.
    pub fn check_measurement(
        &self,
        measurement: &TimingMeasurement,
        baseline_ratio: f64,
    ) -> Vec<Violation> {
        check_measurement(
            &self.config,
            &self.aggregator,
            self.fragment_expiry_micros.load(Ordering::SeqCst),
            measurement,
            baseline_ratio,
        )
    }

    /// Establish the baseline and spawn the poll loop.
    pub async fn start(&mut self) -> Result<(), TemporalError> {
        if self.handle.is_some() {
            return Ok(());
        }
        self.stop.store(false, Ordering::SeqCst);

        // Baseline: sample N measurements before monitoring starts.
        let mut previous: Option<TimingMeasurement> = None;
        let mut ratios = Vec::with_capacity(self.config.baseline_samples);
        for _ in 0..self.config.baseline_samples {
            let measurement =
                Self::measure(&self.aggregator, &self.isolation, previous.as_ref())?;
            if previous.is_some() {
                ratios.push(measurement.clock_ratio);
            }
            previous = Some(measurement);
            tokio::time::sleep(std::time::Duration::from_micros(
                self.config.poll_interval_micros / 2,
            ))
            .await;
        }
        let baseline_ratio = if ratios.is_empty() {
            1.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };
        tracing::info!(
            subsystem = "temporal-integrity",
            baseline_ratio,
            samples = self.config.baseline_samples,
            "baseline established, monitoring started"
        );
        *self.state.write() = DetectorState::Monitoring;

        let loop_self = LoopHandles {
            config: self.config.clone(),
            aggregator: Arc::clone(&self.aggregator),
            isolation: Arc::clone(&self.isolation),
            alerts: Arc::clone(&self.alerts),
            state: Arc::clone(&self.state),
            stop: Arc::clone(&self.stop),
            poll_interval_micros: Arc::clone(&self.poll_interval_micros),
            fragment_expiry_micros: Arc::clone(&self.fragment_expiry_micros),
            alert_count: Arc::clone(&self.alert_count),
        };
        self.handle = Some(tokio::spawn(async move {
            loop_self.run(baseline_ratio, previous).await;
        }));
        Ok(())
    }

    /// Signal the loop to stop and join it. Returns within one tick.
    pub async fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        *self.state.write() = DetectorState::Idle;
    }
}

/// Pure violation check over one measurement.
fn check_measurement(
    config: &TemporalConfig,
    aggregator: &TimeSourceAggregator,
    fragment_expiry_micros: u64,
    measurement: &TimingMeasurement,
    baseline_ratio: f64,
) -> Vec<Violation> {
    let mut violations = Vec::new();

    // (a) Clock-speed anomaly against baseline.
    if baseline_ratio > 0.0 {
        let drift = (measurement.clock_ratio - baseline_ratio).abs() / baseline_ratio;
        if drift > config.clock_ratio_tolerance {
            violations.push(Violation {
                kind: "clock_speed_anomaly",
                details: json!({
                    "ratio": measurement.clock_ratio,
                    "baseline": baseline_ratio,
                    "relative_drift": drift,
                }),
            });
        }
    }

    // (b) Pairwise source manipulation.
    if let Err(TemporalError::AttackDetected {
        source_a,
        source_b,
        deviation_ms,
        ..
    }) = aggregator.validate_pairwise(
        &measurement.source_times,
        config.detector_pairwise_tolerance_micros,
    ) {
        violations.push(Violation {
            kind: "time_source_manipulation",
            details: json!({
                "source_a": source_a,
                "source_b": source_b,
                "deviation_ms": deviation_ms,
            }),
        });
    }

    // (c) Quantum-timing safety margin: protected data must expire well
    // before the cheapest relevant attack completes.
    let expiry = fragment_expiry_micros as f64;
    for (attack, duration) in [
        ("factoring", config.factoring_attack_micros),
        ("search", config.search_attack_micros),
    ] {
        let margin = expiry / duration as f64;
        if margin >= config.safety_margin_max {
            violations.push(Violation {
                kind: "quantum_safety_margin",
                details: json!({
                    "attack_class": attack,
                    "margin": margin,
                    "ceiling": config.safety_margin_max,
                }),
            });
        }
    }

    violations
}

struct LoopHandles {
    config: TemporalConfig,
    aggregator: Arc<TimeSourceAggregator>,
    isolation: Arc<IsolationReference>,
    alerts: Arc<dyn AlertSink>,
    state: Arc<parking_lot::RwLock<DetectorState>>,
    stop: Arc<AtomicBool>,
    poll_interval_micros: Arc<AtomicU64>,
    fragment_expiry_micros: Arc<AtomicU64>,
    alert_count: Arc<AtomicU64>,
}

impl LoopHandles {
    async fn run(self, baseline_ratio: f64, mut previous: Option<TimingMeasurement>) {
        while !self.stop.load(Ordering::SeqCst) {
            let violations = match TemporalAttackDetector::measure(
                &self.aggregator,
                &self.isolation,
                previous.as_ref(),
            ) {
                Ok(measurement) => {
                    let violations = check_measurement(
                        &self.config,
                        &self.aggregator,
                        self.fragment_expiry_micros.load(Ordering::SeqCst),
                        &measurement,
                        baseline_ratio,
                    );
                    previous = Some(measurement);
                    violations
                }
                Err(err) => vec![Violation {
                    kind: "time_source_failure",
                    details: json!({ "error": err.to_string() }),
                }],
            };

            if !violations.is_empty() {
                *self.state.write() = DetectorState::Alerted;
                let now = SystemClock.now().unwrap_or_default();
                for violation in &violations {
                    self.alert_count.fetch_add(1, Ordering::SeqCst);
                    tracing::error!(
                        subsystem = "temporal-integrity",
                        kind = violation.kind,
                        details = %violation.details,
                        "temporal attack alert"
                    );
                    self.alerts.alert(AuditEvent::new(
                        "temporal_alert",
                        json!({ "kind": violation.kind, "details": violation.details }),
                        now,
                    ));
                }

                // Countermeasure: poll faster, floored at the minimum.
                *self.state.write() = DetectorState::Countermeasures;
                let current = self.poll_interval_micros.load(Ordering::SeqCst);
                let next = (current / 2).max(self.config.min_poll_interval_micros);
                self.poll_interval_micros.store(next, Ordering::SeqCst);
                tracing::warn!(
                    subsystem = "temporal-integrity",
                    poll_interval_ms = next / MICROS_PER_MILLI,
                    "countermeasures engaged, poll interval tightened"
                );
                *self.state.write() = DetectorState::Monitoring;
            }

            let tick = self.poll_interval_micros.load(Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_micros(tick)).await;
        }
        *self.state.write() = DetectorState::Idle;
    }
}
