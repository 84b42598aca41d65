// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Welfare Status Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Longitudinal health indicator raised by the welfare monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WelfareFlag {
    SustainedLowScore,
    BehavioralDrift,
    MissingSelfMonitoring,
    HighErrorCount,
    CriticalBattery,
    DegradedSensorHealth,
    SuddenScoreDrop,
    RepeatedDowngrade,
    ChainTamperDetected,
    DeadlineMiss,
}

impl WelfareFlag {
    pub fn describe(&self) -> &'static str {
        match self {
            WelfareFlag::SustainedLowScore => "Mean score below functional threshold over window",
            WelfareFlag::BehavioralDrift => "Theory subscores vary well beyond their baseline",
            WelfareFlag::MissingSelfMonitoring => "Self-model consistency unavailable",
            WelfareFlag::HighErrorCount => "High error count may indicate system distress",
            WelfareFlag::CriticalBattery => "Critical battery level",
            WelfareFlag::DegradedSensorHealth => "Degraded sensor health",
            WelfareFlag::SuddenScoreDrop => "Sudden score drop detected",
            WelfareFlag::RepeatedDowngrade => "Repeated downward band transitions",
            WelfareFlag::ChainTamperDetected => "Proof chain verification failed",
            WelfareFlag::DeadlineMiss => "Tick exceeded its deadline",
        }
    }
}

/// Ordered severity; `Concern` is the highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WelfareSeverity {
    Healthy,
    Monitoring,
    Concern,
}

impl fmt::Display for WelfareSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WelfareSeverity::Healthy => "healthy",
            WelfareSeverity::Monitoring => "monitoring",
            WelfareSeverity::Concern => "concern",
        };
        f.write_str(s)
    }
}

/// Advisory per-tick welfare derivation. Always recomputable from the
/// retained history; never persisted as ground truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelfareStatus {
    pub tick_index: u64,
    pub flags: BTreeSet<WelfareFlag>,
    pub severity: WelfareSeverity,
    /// Human-readable concerns, one per flag, plus any detail.
    pub concerns: Vec<String>,
    /// Mean composite value over the window, if any composites exist.
    pub mean_score: Option<f64>,
    /// Decision records considered.
    pub recent_decisions: usize,
}

impl WelfareStatus {
    pub fn healthy(tick_index: u64) -> Self {
        Self {
            tick_index,
            flags: BTreeSet::new(),
            severity: WelfareSeverity::Healthy,
            concerns: Vec::new(),
            mean_score: None,
            recent_decisions: 0,
        }
    }

    pub fn has(&self, flag: WelfareFlag) -> bool {
        self.flags.contains(&flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(WelfareSeverity::Healthy < WelfareSeverity::Monitoring);
        assert!(WelfareSeverity::Monitoring < WelfareSeverity::Concern);
        assert_eq!(WelfareSeverity::Concern.to_string(), "concern");
    }

    #[test]
    fn test_healthy_status_has_no_flags() {
        let s = WelfareStatus::healthy(7);
        assert_eq!(s.tick_index, 7);
        assert!(!s.has(WelfareFlag::BehavioralDrift));
        assert_eq!(s.severity, WelfareSeverity::Healthy);
    }

    #[test]
    fn test_flag_serializes_snake_case() {
        let json = serde_json::to_string(&WelfareFlag::MissingSelfMonitoring).unwrap();
        assert_eq!(json, "\"missing_self_monitoring\"");
    }
}
