// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Welfare / Consistency Monitor
// ─────────────────────────────────────────────────────────────────────
//! Longitudinal flags over the retained history.
//!
//! Pipeline per tick:
//!   1. Window statistics over the last W composites (mean, per-theory
//!      variance against the older baseline)
//!   2. Trailing self-model availability
//!   3. Latest snapshot bounds (errors, battery, sensor health)
//!   4. Decision-record patterns and alert inputs
//!   5. Severity: no flags → healthy, > 2 flags or tamper → concern

use std::collections::BTreeSet;

use vigil_ledger::{DecisionRecord, TamperReport};
use vigil_types::{
    Band, BandThresholds, CompositeScore, MonitorConfig, Snapshot, TheoryId, WelfareConfig,
    WelfareFlag, WelfareSeverity, WelfareStatus,
};

/// Everything one assessment looks at. Borrowed; nothing is retained.
#[derive(Debug, Clone, Copy)]
pub struct WelfareInputs<'a> {
    pub tick_index: u64,
    /// Retained composites, oldest first. The last W form the window,
    /// anything older is the drift baseline.
    pub composites: &'a [CompositeScore],
    /// The last K decision records, oldest first.
    pub decisions: &'a [DecisionRecord],
    pub snapshot: Option<&'a Snapshot>,
    pub deadline_missed: bool,
    pub tamper: Option<&'a TamperReport>,
}

pub struct WelfareMonitor {
    config: WelfareConfig,
    window: usize,
    low_threshold: f64,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance; needs at least two values.
fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

fn subscores(composites: &[CompositeScore], theory: TheoryId) -> Vec<f64> {
    composites
        .iter()
        .filter_map(|c| c.score_for(theory))
        .filter(|s| s.is_evidence())
        .map(|s| s.value)
        .collect()
}

impl WelfareMonitor {
    /// `window` is W; sustained-low compares against the C-1 threshold.
    pub fn new(config: WelfareConfig, thresholds: &BandThresholds, window: usize) -> Self {
        Self {
            config,
            window: window.max(1),
            low_threshold: thresholds.threshold(Band::C1Functional),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.welfare.clone(),
            &config.thresholds,
            config.history_window,
        )
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Derive the welfare status for one tick.
    pub fn assess(&self, inputs: &WelfareInputs<'_>) -> WelfareStatus {
        let composites = inputs.composites;
        let split = composites.len().saturating_sub(self.window);
        let (baseline, recent) = composites.split_at(split);
        let recent_values: Vec<f64> = recent.iter().map(|c| c.value).collect();
        let mean_score = mean(&recent_values);

        let mut raised: Vec<(WelfareFlag, String)> = Vec::new();

        if recent.len() >= self.window {
            if let Some(m) = mean_score.filter(|m| *m < self.low_threshold) {
                raised.push((
                    WelfareFlag::SustainedLowScore,
                    format!("mean {m:.3} < {:.3} over {} ticks", self.low_threshold, self.window),
                ));
            }
        }

        if let Some(detail) = self.drift(baseline, recent) {
            raised.push((WelfareFlag::BehavioralDrift, detail));
        }

        let missing_run = composites
            .iter()
            .rev()
            .take_while(|c| {
                c.score_for(TheoryId::Hot)
                    .map_or(true, |s| s.confidence <= 0.0)
            })
            .count();
        if missing_run > self.config.max_missing_self_ticks {
            raised.push((
                WelfareFlag::MissingSelfMonitoring,
                format!("no self-model evidence for {missing_run} ticks"),
            ));
        }

        if let Some(snapshot) = inputs.snapshot {
            self.snapshot_flags(snapshot, &mut raised);
        }

        if let Some(detail) = self.sudden_drop(composites) {
            raised.push((WelfareFlag::SuddenScoreDrop, detail));
        }

        let downgrades = inputs
            .decisions
            .iter()
            .filter(|d| d.triggering_event.is_downgrade())
            .count();
        if downgrades >= self.config.downgrade_alert_count {
            raised.push((
                WelfareFlag::RepeatedDowngrade,
                format!("{downgrades} downgrades in last {} decisions", inputs.decisions.len()),
            ));
        }

        self.alert_flags(inputs, &mut raised);
        conclude(inputs, raised, mean_score)
    }

    /// Only the alert flags (tamper, deadline miss), for runs with the
    /// full assessment disabled. `None` when neither is raised.
    pub fn alerts(&self, inputs: &WelfareInputs<'_>) -> Option<WelfareStatus> {
        let mut raised = Vec::new();
        self.alert_flags(inputs, &mut raised);
        if raised.is_empty() {
            return None;
        }
        let values: Vec<f64> = inputs.composites.iter().map(|c| c.value).collect();
        let start = values.len().saturating_sub(self.window);
        Some(conclude(inputs, raised, mean(&values[start..])))
    }

    fn alert_flags(&self, inputs: &WelfareInputs<'_>, raised: &mut Vec<(WelfareFlag, String)>) {
        if let Some(report) = inputs.tamper {
            raised.push((WelfareFlag::ChainTamperDetected, report.to_string()));
        }
        if inputs.deadline_missed {
            raised.push((WelfareFlag::DeadlineMiss, String::new()));
        }
    }

    fn drift(&self, baseline: &[CompositeScore], recent: &[CompositeScore]) -> Option<String> {
        let mut drifting = Vec::new();
        for theory in TheoryId::ALL {
            let (Some(base_var), Some(recent_var)) = (
                variance(&subscores(baseline, theory)),
                variance(&subscores(recent, theory)),
            ) else {
                continue;
            };
            let reference = base_var.max(self.config.drift_floor);
            if recent_var > self.config.drift_ratio * reference {
                drifting.push(format!("{theory} var {recent_var:.4} vs {reference:.4}"));
            }
        }
        if drifting.is_empty() {
            None
        } else {
            Some(drifting.join(", "))
        }
    }

    fn snapshot_flags(&self, snapshot: &Snapshot, raised: &mut Vec<(WelfareFlag, String)>) {
        if let Some(state) = snapshot.state() {
            if state.error_count > self.config.error_count_limit {
                raised.push((
                    WelfareFlag::HighErrorCount,
                    format!("{} errors", state.error_count),
                ));
            }
            if state.battery_level < self.config.battery_critical {
                raised.push((
                    WelfareFlag::CriticalBattery,
                    format!("{:.0}%", state.battery_level * 100.0),
                ));
            }
        }
        if let Some(sensor) = snapshot.sensor() {
            let degraded: Vec<&str> = sensor
                .health
                .iter()
                .filter(|(_, h)| **h < self.config.sensor_health_floor)
                .map(|(name, _)| name.as_str())
                .collect();
            if !degraded.is_empty() {
                raised.push((WelfareFlag::DegradedSensorHealth, degraded.join(", ")));
            }
        }
    }

    fn sudden_drop(&self, composites: &[CompositeScore]) -> Option<String> {
        let lookback = self.config.sudden_drop_lookback;
        if lookback == 0 || composites.len() < lookback + 1 {
            return None;
        }
        let (latest, prior) = composites.split_last()?;
        let prior = &prior[prior.len() - lookback..];
        let was_high = prior.iter().all(|c| c.value > self.config.sudden_drop_prior);
        if was_high && latest.value < self.config.sudden_drop_floor {
            Some(format!("{:.3} after {} ticks above {:.2}", latest.value, lookback, self.config.sudden_drop_prior))
        } else {
            None
        }
    }
}

fn conclude(
    inputs: &WelfareInputs<'_>,
    raised: Vec<(WelfareFlag, String)>,
    mean_score: Option<f64>,
) -> WelfareStatus {
    let flags: BTreeSet<WelfareFlag> = raised.iter().map(|(f, _)| *f).collect();
    let severity = if flags.is_empty() {
        WelfareSeverity::Healthy
    } else if flags.len() > 2 || flags.contains(&WelfareFlag::ChainTamperDetected) {
        WelfareSeverity::Concern
    } else {
        WelfareSeverity::Monitoring
    };
    let concerns = raised
        .iter()
        .map(|(flag, detail)| {
            if detail.is_empty() {
                flag.describe().to_string()
            } else {
                format!("{}: {detail}", flag.describe())
            }
        })
        .collect::<Vec<String>>();
    if !concerns.is_empty() {
        log::debug!(
            "Welfare tick {}: {severity} ({})",
            inputs.tick_index,
            concerns.join("; ")
        );
    }

    WelfareStatus {
        tick_index: inputs.tick_index,
        flags,
        severity,
        concerns,
        mean_score,
        recent_decisions: inputs.decisions.len(),
    }
}
