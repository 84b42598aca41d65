// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Score Types
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sample::SourceId;

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Identifier of a scoring theory family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TheoryId {
    /// Global workspace: broadcast breadth.
    Gwt,
    /// Integrated information: loss of joint information under a cut.
    Iit,
    /// Recurrent processing: feedback cycles in state transitions.
    Rpt,
    /// Higher-order: self-model consistency.
    Hot,
    /// Attention schema: attention allocation entropy.
    Ast,
}

impl TheoryId {
    pub const ALL: [TheoryId; 5] = [
        TheoryId::Gwt,
        TheoryId::Iit,
        TheoryId::Rpt,
        TheoryId::Hot,
        TheoryId::Ast,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TheoryId::Gwt => "gwt",
            TheoryId::Iit => "iit",
            TheoryId::Rpt => "rpt",
            TheoryId::Hot => "hot",
            TheoryId::Ast => "ast",
        }
    }
}

impl fmt::Display for TheoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scorer's normalized output for a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TheoryScore {
    pub theory: TheoryId,
    /// Normalized subscore in [0, 1].
    pub value: f64,
    /// How much evidence backs the value, in [0, 1]. Zero excludes the
    /// score from the composite.
    pub confidence: f64,
    /// Input streams the scorer actually read.
    pub inputs_used: Vec<SourceId>,
    /// The scorer errored or panicked.
    pub failed: bool,
    /// The raw value fell outside [0, 1] and was clamped.
    pub anomaly: bool,
    /// Failure reason or scorer-specific note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TheoryScore {
    pub fn new(theory: TheoryId, value: f64, confidence: f64, inputs_used: Vec<SourceId>) -> Self {
        Self {
            theory,
            value: clamp_score(value, 0.0, 1.0),
            confidence: clamp_score(confidence, 0.0, 1.0),
            inputs_used,
            failed: false,
            anomaly: false,
            detail: None,
        }
    }

    /// Confidence-0 placeholder for a scorer that could not produce a value.
    pub fn failed(theory: TheoryId, reason: impl Into<String>) -> Self {
        Self {
            theory,
            value: 0.0,
            confidence: 0.0,
            inputs_used: Vec::new(),
            failed: true,
            anomaly: false,
            detail: Some(reason.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Whether this score contributes to the composite.
    pub fn is_evidence(&self) -> bool {
        !self.failed && self.confidence > 0.0
    }
}

/// Discrete operating band, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    C0Reactive,
    C1Functional,
    C2Emerging,
    C3Autonomous,
    C4Transcendent,
}

impl Band {
    pub const ALL: [Band; 5] = [
        Band::C0Reactive,
        Band::C1Functional,
        Band::C2Emerging,
        Band::C3Autonomous,
        Band::C4Transcendent,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(i: usize) -> Option<Band> {
        Self::ALL.get(i).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Band::C0Reactive => "C-0 Reactive",
            Band::C1Functional => "C-1 Functional",
            Band::C2Emerging => "C-2 Emerging",
            Band::C3Autonomous => "C-3 Autonomous",
            Band::C4Transcendent => "C-4 Transcendent",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregated score combining all theory scores for a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub tick_index: u64,
    pub timestamp_ms: i64,
    /// Confidence-weighted mean in [0, 1].
    pub value: f64,
    /// Band after hysteresis.
    pub band: Band,
    /// No theory produced evidence; `value` was carried forward.
    pub stale: bool,
    pub contributions: Vec<TheoryScore>,
}

impl CompositeScore {
    pub fn score_for(&self, theory: TheoryId) -> Option<&TheoryScore> {
        self.contributions.iter().find(|s| s.theory == theory)
    }

    /// Number of contributions that counted as evidence.
    pub fn evidence_count(&self) -> usize {
        self.contributions.iter().filter(|s| s.is_evidence()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_nan() {
        assert_eq!(clamp_score(f64::NAN, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_clamp_pos_inf() {
        assert_eq!(clamp_score(f64::INFINITY, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_clamp_neg_inf() {
        assert_eq!(clamp_score(f64::NEG_INFINITY, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_clamp_above_hi() {
        assert_eq!(clamp_score(1.5, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_theory_score_clamps() {
        let s = TheoryScore::new(TheoryId::Iit, 1.5, -0.2, vec![SourceId::State]);
        assert_eq!(s.value, 1.0);
        assert_eq!(s.confidence, 0.0);
        assert!(!s.is_evidence());
    }

    #[test]
    fn test_failed_score_is_not_evidence() {
        let s = TheoryScore::failed(TheoryId::Hot, "no declared self-state");
        assert!(s.failed);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.detail.as_deref(), Some("no declared self-state"));
        assert!(!s.is_evidence());
    }

    #[test]
    fn test_band_ordering() {
        assert!(Band::C0Reactive < Band::C1Functional);
        assert!(Band::C3Autonomous < Band::C4Transcendent);
        assert_eq!(Band::from_index(2), Some(Band::C2Emerging));
        assert_eq!(Band::from_index(5), None);
        assert_eq!(Band::C2Emerging.index(), 2);
    }

    #[test]
    fn test_band_labels() {
        assert_eq!(Band::C0Reactive.to_string(), "C-0 Reactive");
        assert_eq!(Band::C4Transcendent.label(), "C-4 Transcendent");
    }

    #[test]
    fn test_theory_id_serde_lowercase() {
        let json = serde_json::to_string(&TheoryId::Gwt).unwrap();
        assert_eq!(json, "\"gwt\"");
        let back: TheoryId = serde_json::from_str("\"ast\"").unwrap();
        assert_eq!(back, TheoryId::Ast);
    }

    #[test]
    fn test_composite_score_lookup() {
        let composite = CompositeScore {
            tick_index: 4,
            timestamp_ms: 0,
            value: 0.5,
            band: Band::C2Emerging,
            stale: false,
            contributions: vec![
                TheoryScore::new(TheoryId::Gwt, 0.5, 1.0, vec![]),
                TheoryScore::failed(TheoryId::Hot, "missing"),
            ],
        };
        assert!(composite.score_for(TheoryId::Hot).is_some());
        assert!(composite.score_for(TheoryId::Iit).is_none());
        assert_eq!(composite.evidence_count(), 1);
    }
}
