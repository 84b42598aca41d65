// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Monitor Kernel + Periodic Driver
// ─────────────────────────────────────────────────────────────────────
//! One `tick` runs the full cycle:
//!
//!   1. Snapshot the latest samples
//!   2. Score every theory in parallel against the history window
//!   3. Classify with hysteresis
//!   4. Record decisions in the proof chain, then publish them
//!   5. Re-verify the chain every N ticks
//!   6. Assess welfare and publish the tick's outputs
//!
//! `spawn` drives ticks at `measurement_rate` on a dedicated thread.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Sender};
use serde::{Deserialize, Serialize};

use vigil_ledger::{DecisionRecord, EventKind, ProofChain, TamperReport, TriggeringEvent};
use vigil_observers::{WelfareInputs, WelfareMonitor};
use vigil_theories::TheoryScorer;
use vigil_types::{
    Band, CompositeScore, HistoryWindow, MonitorConfig, VigilError, VigilResult, WelfareSeverity,
    WelfareStatus,
};

use crate::aggregator::{IngestionAggregator, StalenessPolicy};
use crate::classifier::{BandTransition, CompositeClassifier};
use crate::engine::ScoringEngine;
use crate::publish::Publisher;

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub composite: CompositeScore,
    pub transition: Option<BandTransition>,
    /// Records appended during this tick, in chain order.
    pub decisions: Vec<DecisionRecord>,
    /// With welfare monitoring disabled, only tamper and deadline alerts,
    /// and `None` on ticks without either.
    pub welfare: Option<WelfareStatus>,
    /// The tick overran its period.
    pub late: bool,
    pub elapsed: Duration,
}

/// Summary of the run so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReport {
    pub current_band: Option<Band>,
    pub current_score: Option<f64>,
    pub welfare: Option<WelfareSeverity>,
    pub total_ticks: u64,
    pub late_ticks: u64,
    pub average_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub chain_length: usize,
    /// First 16 hex characters of the newest record hash.
    pub latest_proof: Option<String>,
    pub tamper_detected: bool,
}

#[derive(Debug, Default)]
struct RunStats {
    ticks: u64,
    late: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl RunStats {
    fn record(&mut self, value: f64, late: bool) {
        self.ticks += 1;
        self.late += u64::from(late);
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn average(&self) -> Option<f64> {
        (self.ticks > 0).then(|| self.sum / self.ticks as f64)
    }
}

pub struct MonitorKernel {
    config: MonitorConfig,
    aggregator: Arc<IngestionAggregator>,
    engine: ScoringEngine,
    classifier: CompositeClassifier,
    chain: Arc<ProofChain>,
    welfare: WelfareMonitor,
    publisher: Arc<dyn Publisher>,
    history: HistoryWindow,
    composites: VecDeque<CompositeScore>,
    severity: WelfareSeverity,
    last_welfare: Option<WelfareStatus>,
    tamper: Option<TamperReport>,
    stats: RunStats,
    tick_period: Duration,
    stopped: bool,
}

impl MonitorKernel {
    /// Validate `config`, build the scorers and open the proof chain.
    pub fn new(config: MonitorConfig, publisher: Arc<dyn Publisher>) -> VigilResult<Self> {
        config.validate()?;
        let chain = if config.proof_chain {
            let path = config.chain_path.as_ref().ok_or_else(|| {
                VigilError::Config("proof_chain requires chain_path".into())
            })?;
            ProofChain::open(path)?
        } else {
            ProofChain::new()
        };
        log::info!(
            "Vigil kernel initialised: {} theories at {} Hz, chain {}",
            config.theories.len(),
            config.measurement_rate,
            if config.proof_chain { "persisted" } else { "in memory" }
        );
        Ok(Self {
            aggregator: Arc::new(IngestionAggregator::new(StalenessPolicy::new(
                config.staleness_bound_ms,
            ))),
            engine: ScoringEngine::from_config(&config),
            classifier: CompositeClassifier::from_config(&config),
            chain: Arc::new(chain),
            welfare: WelfareMonitor::from_config(&config),
            publisher,
            history: HistoryWindow::new(config.history_window),
            composites: VecDeque::with_capacity(config.baseline_ticks),
            severity: WelfareSeverity::Healthy,
            last_welfare: None,
            tamper: None,
            stats: RunStats::default(),
            tick_period: config.tick_period(),
            stopped: false,
            config,
        })
    }

    /// Replace the built-in scorer of the same theory with `scorer`.
    pub fn with_scorer(mut self, scorer: Arc<dyn TheoryScorer>) -> Self {
        self.engine = self.engine.with_scorer(scorer);
        self
    }

    /// Producer-side handle; clone freely across threads.
    pub fn ingestor(&self) -> Arc<IngestionAggregator> {
        Arc::clone(&self.aggregator)
    }

    pub fn chain(&self) -> Arc<ProofChain> {
        Arc::clone(&self.chain)
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn current_band(&self) -> Option<Band> {
        self.classifier.current_band()
    }

    /// Run one monitoring cycle at `now_ms`.
    pub fn tick(&mut self, now_ms: i64) -> VigilResult<TickOutput> {
        if self.stopped {
            return Err(VigilError::Shutdown);
        }
        let start = Instant::now();

        let snapshot = self.aggregator.snapshot(now_ms);
        let scores = self.engine.evaluate(&snapshot, &self.history);
        let classification = self
            .classifier
            .classify(snapshot.tick_index, now_ms, scores);
        let composite = classification.composite;
        let tick_index = composite.tick_index;

        let mut decisions = Vec::new();
        if let Some(t) = classification.transition {
            let event = TriggeringEvent::band_transition(t.from, t.to);
            log::info!(
                "Tick {tick_index}: {} (score {:.3})",
                event.detail,
                composite.value
            );
            decisions.extend(self.decide(event, &composite, now_ms));
        }

        self.history.push(snapshot);
        self.composites.push_back(composite.clone());
        while self.composites.len() > self.config.baseline_ticks {
            self.composites.pop_front();
        }

        let n = self.config.verify_every_n_ticks;
        if n > 0 && (tick_index + 1) % n == 0 {
            self.verify_chain(tick_index);
        }

        let elapsed = start.elapsed();
        let late = elapsed > self.tick_period;
        if late {
            log::warn!(
                "Tick {tick_index} overran its period: {:.1}ms > {:.1}ms",
                elapsed.as_secs_f64() * 1e3,
                self.tick_period.as_secs_f64() * 1e3
            );
            if self.config.decisions.on_deadline_miss {
                let event = TriggeringEvent::new(
                    EventKind::DeadlineMiss {
                        elapsed_ms: elapsed.as_millis() as u64,
                        budget_ms: self.tick_period.as_millis() as u64,
                    },
                    format!("tick {tick_index} overran its period"),
                );
                decisions.extend(self.decide(event, &composite, now_ms));
            }
        }

        let welfare = if self.config.welfare_monitoring {
            let status = self.assess_welfare(tick_index, late);
            if status.severity > self.severity {
                log::warn!(
                    "Welfare escalated {} -> {} at tick {tick_index}: {}",
                    self.severity,
                    status.severity,
                    status.concerns.join("; ")
                );
                if self.config.decisions.on_welfare_escalation {
                    let event = TriggeringEvent::new(
                        EventKind::WelfareEscalation {
                            from: self.severity,
                            to: status.severity,
                        },
                        status.concerns.join("; "),
                    );
                    decisions.extend(self.decide(event, &composite, now_ms));
                }
            }
            self.severity = status.severity;
            self.last_welfare = Some(status.clone());
            Some(status)
        } else {
            self.alert_status(tick_index, late)
        };

        self.publisher
            .consciousness_level(tick_index, composite.value, composite.band, late);
        self.publisher.awareness_score(&composite, late);
        if let Some(status) = &welfare {
            self.publisher.welfare_status(status);
        }
        self.stats.record(composite.value, late);

        Ok(TickOutput {
            composite,
            transition: classification.transition,
            decisions,
            welfare,
            late,
            elapsed,
        })
    }

    /// `tick` at the current wall-clock time.
    pub fn tick_now(&mut self) -> VigilResult<TickOutput> {
        self.tick(now_ms())
    }

    /// Append a decision and publish it. A ledger failure is logged and
    /// the tick continues without the record.
    fn decide(
        &self,
        event: TriggeringEvent,
        composite: &CompositeScore,
        now_ms: i64,
    ) -> Option<DecisionRecord> {
        match self.chain.append(event, composite.clone(), now_ms) {
            Ok(record) => {
                if self.config.log_decisions {
                    log::info!(
                        "Decision #{} recorded: {} [{}]",
                        record.index,
                        record.triggering_event.detail,
                        record.record_hash.get(..16).unwrap_or_default()
                    );
                }
                self.publisher.decision_proof(&record);
                Some(record)
            }
            Err(e) => {
                log::error!("Failed to record decision at tick {}: {e}", composite.tick_index);
                None
            }
        }
    }

    fn verify_chain(&mut self, tick_index: u64) {
        match self.chain.audit() {
            Ok(Ok(())) => {
                log::debug!("Proof chain verified at tick {tick_index} ({} records)", self.chain.len());
            }
            Ok(Err(report)) => {
                log::error!("Proof chain tamper detected at tick {tick_index}: {report}");
                self.tamper = Some(report);
            }
            Err(e) => {
                log::error!("Proof chain audit failed at tick {tick_index}: {e}");
            }
        }
    }

    fn assess_welfare(&mut self, tick_index: u64, late: bool) -> WelfareStatus {
        let decisions = self.chain.tail(self.config.decision_window);
        let composites = self.composites.make_contiguous();
        self.welfare.assess(&WelfareInputs {
            tick_index,
            composites,
            decisions: &decisions,
            snapshot: self.history.latest(),
            deadline_missed: late,
            tamper: self.tamper.as_ref(),
        })
    }

    /// Tamper and deadline alerts with welfare monitoring disabled.
    fn alert_status(&mut self, tick_index: u64, late: bool) -> Option<WelfareStatus> {
        let composites = self.composites.make_contiguous();
        self.welfare.alerts(&WelfareInputs {
            tick_index,
            composites,
            decisions: &[],
            snapshot: None,
            deadline_missed: late,
            tamper: self.tamper.as_ref(),
        })
    }

    /// Record a shutdown decision if configured and flush the chain.
    /// Further ticks fail with `Shutdown`; repeated calls are no-ops.
    pub fn shutdown(&mut self, now_ms: i64) -> VigilResult<Option<DecisionRecord>> {
        if self.stopped {
            return Ok(None);
        }
        self.stopped = true;
        let record = match (self.config.decisions.on_shutdown, self.composites.back()) {
            (true, Some(last)) => {
                let event = TriggeringEvent::new(
                    EventKind::Shutdown,
                    format!("shutdown after {} ticks", self.stats.ticks),
                );
                self.decide(event, last, now_ms)
            }
            _ => None,
        };
        self.chain.flush()?;
        log::info!(
            "Vigil kernel stopped after {} ticks, {} decisions",
            self.stats.ticks,
            self.chain.len()
        );
        Ok(record)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn report(&self) -> MonitorReport {
        let last = self.composites.back();
        MonitorReport {
            current_band: self.classifier.current_band(),
            current_score: last.map(|c| c.value),
            welfare: self.last_welfare.as_ref().map(|w| w.severity),
            total_ticks: self.stats.ticks,
            late_ticks: self.stats.late,
            average_score: self.stats.average(),
            min_score: self.stats.min,
            max_score: self.stats.max,
            chain_length: self.chain.len(),
            latest_proof: self
                .chain
                .last()
                .map(|r| r.record_hash.chars().take(16).collect()),
            tamper_detected: self.tamper.is_some(),
        }
    }
}

/// Owner of a running periodic driver.
pub struct KernelHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<MonitorKernel>>,
    ingestor: Arc<IngestionAggregator>,
    chain: Arc<ProofChain>,
}

/// Drive `kernel` at its measurement rate on a dedicated thread.
pub fn spawn(mut kernel: MonitorKernel) -> VigilResult<KernelHandle> {
    let period = kernel.tick_period;
    let ingestor = kernel.ingestor();
    let chain = kernel.chain();
    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

    let join = thread::Builder::new()
        .name("vigil-tick".into())
        .spawn(move || {
            let ticker = crossbeam_channel::tick(period);
            loop {
                select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        if let Err(e) = kernel.tick_now() {
                            log::error!("Tick failed: {e}");
                        }
                    }
                }
            }
            if let Err(e) = kernel.shutdown(now_ms()) {
                log::error!("Shutdown failed: {e}");
            }
            kernel
        })?;

    Ok(KernelHandle {
        stop_tx,
        join: Some(join),
        ingestor,
        chain,
    })
}

impl KernelHandle {
    pub fn ingestor(&self) -> Arc<IngestionAggregator> {
        Arc::clone(&self.ingestor)
    }

    pub fn chain(&self) -> Arc<ProofChain> {
        Arc::clone(&self.chain)
    }

    /// Let the in-flight tick finish, stop the driver and hand the
    /// kernel back.
    pub fn shutdown(mut self) -> VigilResult<MonitorKernel> {
        let _ = self.stop_tx.send(());
        let join = self.join.take().ok_or(VigilError::Shutdown)?;
        join.join().map_err(|_| {
            log::error!("Tick thread panicked");
            VigilError::Shutdown
        })
    }
}

impl Drop for KernelHandle {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.stop_tx.send(());
            let _ = join.join();
        }
    }
}
