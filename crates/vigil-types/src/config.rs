// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Monitor Configuration
// ─────────────────────────────────────────────────────────────────────

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{VigilError, VigilResult};
use crate::score::{Band, TheoryId};

/// Lower-bound thresholds for C0..C4, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandThresholds(pub [f64; 5]);

impl Default for BandThresholds {
    fn default() -> Self {
        Self([0.0, 0.20, 0.50, 0.70, 0.85])
    }
}

impl BandThresholds {
    pub fn threshold(&self, band: Band) -> f64 {
        self.0[band.index()]
    }

    /// Highest band whose threshold is <= `value`. Values below the C0
    /// threshold still classify as C0.
    pub fn classify(&self, value: f64) -> Band {
        Band::ALL
            .iter()
            .rev()
            .find(|b| self.threshold(**b) <= value)
            .copied()
            .unwrap_or(Band::C0Reactive)
    }

    pub fn validate(&self) -> VigilResult<()> {
        for (i, t) in self.0.iter().enumerate() {
            if !t.is_finite() || !(0.0..=1.0).contains(t) {
                return Err(VigilError::Config(format!(
                    "thresholds[{i}] must be in [0, 1], got {t}"
                )));
            }
        }
        for i in 1..self.0.len() {
            if self.0[i] <= self.0[i - 1] {
                return Err(VigilError::Config(format!(
                    "thresholds must be strictly increasing, got C{} = {} <= C{} = {}",
                    i,
                    self.0[i],
                    i - 1,
                    self.0[i - 1]
                )));
            }
        }
        Ok(())
    }
}

/// Tuning knobs for the built-in theory scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TheoryParams {
    /// Minimum absolute change for a state channel to count as influenced.
    /// Default: 0.01.
    pub change_epsilon: f64,
    /// State vectors needed before the correlation-based integration
    /// measure replaces the dispersion fallback. Default: 4.
    pub integration_min_samples: usize,
    /// Quantization bins per channel for the transition graph. Default: 4.
    pub recurrence_levels: usize,
}

impl Default for TheoryParams {
    fn default() -> Self {
        Self {
            change_epsilon: 0.01,
            integration_min_samples: 4,
            recurrence_levels: 4,
        }
    }
}

/// Welfare monitor bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WelfareConfig {
    /// Drift when recent variance exceeds baseline variance by this factor.
    /// Default: 4.0.
    pub drift_ratio: f64,
    /// Baseline variance floor, so a perfectly flat baseline does not make
    /// any jitter look like drift. Default: 1e-3.
    pub drift_floor: f64,
    /// Consecutive confidence-0 self-model ticks tolerated. Default: 5.
    pub max_missing_self_ticks: usize,
    /// Default: 50.
    pub error_count_limit: u32,
    /// Default: 0.15.
    pub battery_critical: f64,
    /// Default: 0.3.
    pub sensor_health_floor: f64,
    /// Latest score below this after a run above `sudden_drop_prior`.
    /// Default: 0.3.
    pub sudden_drop_floor: f64,
    /// Default: 0.5.
    pub sudden_drop_prior: f64,
    /// Length of the prior run. Default: 3.
    pub sudden_drop_lookback: usize,
    /// Downward transitions among the last K decisions. Default: 3.
    pub downgrade_alert_count: usize,
}

impl Default for WelfareConfig {
    fn default() -> Self {
        Self {
            drift_ratio: 4.0,
            drift_floor: 1e-3,
            max_missing_self_ticks: 5,
            error_count_limit: 50,
            battery_critical: 0.15,
            sensor_health_floor: 0.3,
            sudden_drop_floor: 0.3,
            sudden_drop_prior: 0.5,
            sudden_drop_lookback: 3,
            downgrade_alert_count: 3,
        }
    }
}

/// Events besides band transitions that are recorded in the proof chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionTriggers {
    /// Default: true.
    pub on_welfare_escalation: bool,
    /// Default: false.
    pub on_deadline_miss: bool,
    /// Default: true.
    pub on_shutdown: bool,
}

impl Default for DecisionTriggers {
    fn default() -> Self {
        Self {
            on_welfare_escalation: true,
            on_deadline_miss: false,
            on_shutdown: true,
        }
    }
}

/// Runtime configuration for the Vigil Kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick frequency in Hz. Default: 10.0.
    pub measurement_rate: f64,

    /// Theories to score, in publication order. Default: all five.
    pub theories: Vec<TheoryId>,

    /// Band lower bounds. Default: 0.0 / 0.20 / 0.50 / 0.70 / 0.85.
    pub thresholds: BandThresholds,

    /// Per-theory weight in the composite. Missing entries weigh 1.0.
    pub theory_weights: BTreeMap<TheoryId, f64>,

    /// Persist the proof chain to `chain_path`. Default: false.
    pub proof_chain: bool,

    /// JSON Lines file backing the proof chain.
    pub chain_path: Option<PathBuf>,

    /// Log every appended decision at info level. Default: true.
    pub log_decisions: bool,

    /// Compute and publish welfare status each tick. Default: true.
    pub welfare_monitoring: bool,

    /// Consecutive ticks below the current band before stepping down (H).
    /// Default: 3.
    pub hysteresis_ticks: usize,

    /// Snapshots and composites in the sliding window (W). Default: 100.
    pub history_window: usize,

    /// Composites retained for the drift baseline, including the last W.
    /// Default: 400.
    pub baseline_ticks: usize,

    /// Decision records visible to the welfare monitor (K). Default: 50.
    pub decision_window: usize,

    /// Age after which a source is stale. Default: 500.
    pub staleness_bound_ms: u64,

    /// Re-verify the whole chain every N ticks; 0 disables. Default: 100.
    pub verify_every_n_ticks: u64,

    pub theory_params: TheoryParams,
    pub welfare: WelfareConfig,
    pub decisions: DecisionTriggers,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            measurement_rate: 10.0,
            theories: TheoryId::ALL.to_vec(),
            thresholds: BandThresholds::default(),
            theory_weights: BTreeMap::new(),
            proof_chain: false,
            chain_path: None,
            log_decisions: true,
            welfare_monitoring: true,
            hysteresis_ticks: 3,
            history_window: 100,
            baseline_ticks: 400,
            decision_window: 50,
            staleness_bound_ms: 500,
            verify_every_n_ticks: 100,
            theory_params: TheoryParams::default(),
            welfare: WelfareConfig::default(),
            decisions: DecisionTriggers::default(),
        }
    }
}

impl MonitorConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> VigilResult<()> {
        if !self.measurement_rate.is_finite() || self.measurement_rate <= 0.0 {
            return Err(VigilError::Config(format!(
                "measurement_rate must be > 0, got {}",
                self.measurement_rate
            )));
        }
        match Duration::try_from_secs_f64(1.0 / self.measurement_rate) {
            Ok(period) if !period.is_zero() => {}
            _ => {
                return Err(VigilError::Config(format!(
                    "measurement_rate {} gives no representable tick period",
                    self.measurement_rate
                )));
            }
        }
        if self.theories.is_empty() {
            return Err(VigilError::Config(
                "theories must name at least one theory".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for t in &self.theories {
            if !seen.insert(*t) {
                return Err(VigilError::Config(format!("theory {t} listed twice")));
            }
        }
        self.thresholds.validate()?;
        for (theory, w) in &self.theory_weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(VigilError::Config(format!(
                    "theory_weights[{theory}] must be >= 0, got {w}"
                )));
            }
        }
        if self.hysteresis_ticks < 1 {
            return Err(VigilError::Config(format!(
                "hysteresis_ticks must be >= 1, got {}",
                self.hysteresis_ticks
            )));
        }
        if self.history_window < 2 {
            return Err(VigilError::Config(format!(
                "history_window must be >= 2, got {}",
                self.history_window
            )));
        }
        if self.baseline_ticks < self.history_window {
            return Err(VigilError::Config(format!(
                "baseline_ticks ({}) must be >= history_window ({})",
                self.baseline_ticks, self.history_window
            )));
        }
        if self.decision_window < 1 {
            return Err(VigilError::Config(format!(
                "decision_window must be >= 1, got {}",
                self.decision_window
            )));
        }
        if self.staleness_bound_ms == 0 {
            return Err(VigilError::Config(
                "staleness_bound_ms must be > 0".to_string(),
            ));
        }
        if self.proof_chain && self.chain_path.is_none() {
            return Err(VigilError::Config(
                "proof_chain is enabled but chain_path is not set".to_string(),
            ));
        }
        if self.theory_params.recurrence_levels < 2 {
            return Err(VigilError::Config(format!(
                "theory_params.recurrence_levels must be >= 2, got {}",
                self.theory_params.recurrence_levels
            )));
        }
        if self.welfare.drift_ratio <= 0.0 {
            return Err(VigilError::Config(format!(
                "welfare.drift_ratio must be > 0, got {}",
                self.welfare.drift_ratio
            )));
        }
        Ok(())
    }

    /// Weight of `theory` in the composite.
    pub fn weight(&self, theory: TheoryId) -> f64 {
        self.theory_weights.get(&theory).copied().unwrap_or(1.0)
    }

    /// Time budget of one tick. Unrepresentable periods, which
    /// `validate` rejects, saturate to `Duration::MAX`.
    pub fn tick_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.measurement_rate).unwrap_or(Duration::MAX)
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> VigilResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| VigilError::Config(format!("JSON parse error: {e}")))
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> VigilResult<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| VigilError::Config(format!("YAML parse error: {e}")))
    }

    /// Load and validate a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> VigilResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text)?,
            Some("yaml") | Some("yml") => Self::from_yaml(&text)?,
            other => {
                return Err(VigilError::Config(format!(
                    "unsupported config extension {other:?} for {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_non_monotonic_thresholds_rejected() {
        let config = MonitorConfig {
            thresholds: BandThresholds([0.0, 0.5, 0.4, 0.7, 0.85]),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let config = MonitorConfig {
            thresholds: BandThresholds([0.0, 0.2, 0.2, 0.7, 0.85]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        let config = MonitorConfig {
            measurement_rate: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = MonitorConfig {
            measurement_rate: -5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_tick_period_rejected() {
        let config = MonitorConfig {
            measurement_rate: 1e-20,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, VigilError::Config(_)));
        assert!(err.to_string().contains("tick period"));
        assert_eq!(config.tick_period(), Duration::MAX);

        let fast = MonitorConfig {
            measurement_rate: 1e9,
            ..Default::default()
        };
        assert!(fast.validate().is_ok());
        assert_eq!(fast.tick_period(), Duration::from_nanos(1));
    }

    #[test]
    fn test_empty_theories_rejected() {
        let config = MonitorConfig {
            theories: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_theory_rejected() {
        let config = MonitorConfig {
            theories: vec![TheoryId::Gwt, TheoryId::Gwt],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_proof_chain_requires_path() {
        let config = MonitorConfig {
            proof_chain: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_classify_example_bands() {
        let t = BandThresholds::default();
        assert_eq!(t.classify(0.62), Band::C2Emerging);
        assert_eq!(t.classify(0.45), Band::C1Functional);
        assert_eq!(t.classify(0.50), Band::C2Emerging);
        assert_eq!(t.classify(0.0), Band::C0Reactive);
        assert_eq!(t.classify(0.99), Band::C4Transcendent);
    }

    #[test]
    fn test_classify_below_c0_floor() {
        let t = BandThresholds([0.1, 0.2, 0.5, 0.7, 0.85]);
        assert_eq!(t.classify(0.05), Band::C0Reactive);
    }

    #[test]
    fn test_tick_period() {
        let config = MonitorConfig::default();
        assert_eq!(config.tick_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_from_yaml_partial() {
        let yaml = "measurement_rate: 20.0\ntheories: [gwt, hot]\nthresholds: [0.0, 0.1, 0.4, 0.6, 0.9]\n";
        let config = MonitorConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.measurement_rate, 20.0);
        assert_eq!(config.theories, vec![TheoryId::Gwt, TheoryId::Hot]);
        assert_eq!(config.hysteresis_ticks, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_weights() {
        let json = r#"{"theory_weights": {"iit": 2.0}}"#;
        let config = MonitorConfig::from_json(json).unwrap();
        assert_eq!(config.weight(TheoryId::Iit), 2.0);
        assert_eq!(config.weight(TheoryId::Gwt), 1.0);
    }

    #[test]
    fn test_from_json_garbage() {
        assert!(MonitorConfig::from_json("{not json").is_err());
    }

    #[test]
    fn test_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.yaml");
        std::fs::write(&path, "measurement_rate: 0.0\n").unwrap();
        assert!(matches!(
            MonitorConfig::from_file(&path),
            Err(VigilError::Config(_))
        ));
    }

    #[test]
    fn test_from_file_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        std::fs::write(&path, "").unwrap();
        assert!(MonitorConfig::from_file(&path).is_err());
    }
}
