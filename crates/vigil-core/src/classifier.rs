// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Composite Classifier
// ─────────────────────────────────────────────────────────────────────
//! Confidence-weighted composite and banding with downward hysteresis.
//!
//! ```text
//! value = Σ wᵢ·cᵢ·vᵢ / Σ wᵢ·cᵢ     (scores with cᵢ > 0 and wᵢ > 0)
//! ```
//!
//! Upward moves are immediate. A downward move needs `hysteresis_ticks`
//! consecutive non-stale ticks below the current band and lands on the
//! band of the last of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use vigil_types::{Band, BandThresholds, CompositeScore, MonitorConfig, TheoryId, TheoryScore};

/// A change of the current band. `from` is `None` for the first
/// classification after startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandTransition {
    pub from: Option<Band>,
    pub to: Band,
}

impl BandTransition {
    pub fn is_downgrade(&self) -> bool {
        matches!(self.from, Some(from) if self.to < from)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub composite: CompositeScore,
    pub transition: Option<BandTransition>,
}

pub struct CompositeClassifier {
    thresholds: BandThresholds,
    weights: BTreeMap<TheoryId, f64>,
    hysteresis_ticks: usize,
    current: Option<Band>,
    last_value: Option<f64>,
    below_count: usize,
}

impl CompositeClassifier {
    pub fn new(
        thresholds: BandThresholds,
        weights: BTreeMap<TheoryId, f64>,
        hysteresis_ticks: usize,
    ) -> Self {
        Self {
            thresholds,
            weights,
            hysteresis_ticks: hysteresis_ticks.max(1),
            current: None,
            last_value: None,
            below_count: 0,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.thresholds.clone(),
            config.theory_weights.clone(),
            config.hysteresis_ticks,
        )
    }

    fn weight(&self, theory: TheoryId) -> f64 {
        self.weights.get(&theory).copied().unwrap_or(1.0)
    }

    /// Weighted mean over the scores that count; `None` if none do.
    pub fn weighted_mean(&self, scores: &[TheoryScore]) -> Option<f64> {
        let (num, den) = scores
            .iter()
            .filter(|s| s.is_evidence())
            .map(|s| (self.weight(s.theory) * s.confidence, s.value))
            .filter(|(wc, _)| *wc > 0.0)
            .fold((0.0, 0.0), |(num, den), (wc, v)| (num + wc * v, den + wc));
        if den > 0.0 {
            Some((num / den).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// Current band, `None` until the first tick with evidence.
    pub fn current_band(&self) -> Option<Band> {
        self.current
    }

    /// Consecutive ticks counted towards the next downgrade.
    pub fn pending_downgrade(&self) -> usize {
        self.below_count
    }

    pub fn classify(
        &mut self,
        tick_index: u64,
        timestamp_ms: i64,
        scores: Vec<TheoryScore>,
    ) -> Classification {
        let fresh = self.weighted_mean(&scores);
        let stale = fresh.is_none();
        let value = fresh.or(self.last_value).unwrap_or(0.0);

        let mut transition = None;
        if let Some(value) = fresh {
            self.last_value = Some(value);
            let target = self.thresholds.classify(value);
            match self.current {
                None => {
                    transition = Some(BandTransition {
                        from: None,
                        to: target,
                    });
                    self.current = Some(target);
                }
                Some(current) if target >= current => {
                    self.below_count = 0;
                    if target > current {
                        transition = Some(BandTransition {
                            from: Some(current),
                            to: target,
                        });
                        self.current = Some(target);
                    }
                }
                Some(current) => {
                    self.below_count += 1;
                    if self.below_count >= self.hysteresis_ticks {
                        self.below_count = 0;
                        transition = Some(BandTransition {
                            from: Some(current),
                            to: target,
                        });
                        self.current = Some(target);
                    }
                }
            }
        }

        let band = self
            .current
            .unwrap_or_else(|| self.thresholds.classify(value));
        Classification {
            composite: CompositeScore {
                tick_index,
                timestamp_ms,
                value,
                band,
                stale,
                contributions: scores,
            },
            transition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(h: usize) -> CompositeClassifier {
        CompositeClassifier::new(BandThresholds::default(), BTreeMap::new(), h)
    }

    fn score(theory: TheoryId, value: f64, confidence: f64) -> TheoryScore {
        TheoryScore::new(theory, value, confidence, vec![])
    }

    fn single(value: f64) -> Vec<TheoryScore> {
        vec![score(TheoryId::Gwt, value, 1.0)]
    }

    #[test]
    fn test_weighted_mean_uses_weight_and_confidence() {
        let mut weights = BTreeMap::new();
        weights.insert(TheoryId::Iit, 2.0);
        let c = CompositeClassifier::new(BandThresholds::default(), weights, 3);
        let scores = vec![
            score(TheoryId::Gwt, 0.2, 1.0),
            score(TheoryId::Iit, 0.8, 0.5),
        ];
        // (1·1·0.2 + 2·0.5·0.8) / (1 + 1) = 0.5
        assert!((c.weighted_mean(&scores).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_and_failed_scores_excluded() {
        let mut weights = BTreeMap::new();
        weights.insert(TheoryId::Ast, 0.0);
        let c = CompositeClassifier::new(BandThresholds::default(), weights, 3);
        let scores = vec![
            score(TheoryId::Ast, 1.0, 1.0),
            TheoryScore::failed(TheoryId::Hot, "missing"),
            score(TheoryId::Rpt, 0.3, 0.4),
        ];
        assert!((c.weighted_mean(&scores).unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(c.weighted_mean(&scores[..2]), None);
    }

    #[test]
    fn test_hysteresis_example() {
        let mut c = classifier(3);
        let first = c.classify(0, 0, single(0.62));
        assert_eq!(first.composite.band, Band::C2Emerging);
        assert_eq!(
            first.transition,
            Some(BandTransition {
                from: None,
                to: Band::C2Emerging
            })
        );

        assert_eq!(c.classify(1, 100, single(0.45)).composite.band, Band::C2Emerging);
        assert_eq!(c.classify(2, 200, single(0.45)).composite.band, Band::C2Emerging);
        let third = c.classify(3, 300, single(0.45));
        assert_eq!(third.composite.band, Band::C1Functional);
        assert!(third.transition.unwrap().is_downgrade());
    }

    #[test]
    fn test_upward_transition_immediate() {
        let mut c = classifier(3);
        c.classify(0, 0, single(0.3));
        let up = c.classify(1, 100, single(0.9));
        assert_eq!(up.composite.band, Band::C4Transcendent);
        assert_eq!(
            up.transition,
            Some(BandTransition {
                from: Some(Band::C1Functional),
                to: Band::C4Transcendent
            })
        );
    }

    #[test]
    fn test_tick_at_current_band_resets_counter() {
        let mut c = classifier(3);
        c.classify(0, 0, single(0.6));
        c.classify(1, 100, single(0.4));
        c.classify(2, 200, single(0.4));
        assert_eq!(c.pending_downgrade(), 2);
        c.classify(3, 300, single(0.55));
        assert_eq!(c.pending_downgrade(), 0);
        c.classify(4, 400, single(0.4));
        let r = c.classify(5, 500, single(0.4));
        assert_eq!(r.composite.band, Band::C2Emerging);
        assert!(r.transition.is_none());
    }

    #[test]
    fn test_downgrade_lands_on_last_tick_band() {
        let mut c = classifier(3);
        c.classify(0, 0, single(0.75));
        c.classify(1, 100, single(0.6));
        c.classify(2, 200, single(0.3));
        let r = c.classify(3, 300, single(0.1));
        assert_eq!(
            r.transition,
            Some(BandTransition {
                from: Some(Band::C3Autonomous),
                to: Band::C0Reactive
            })
        );
    }

    #[test]
    fn test_stale_tick_carries_value_and_freezes_counter() {
        let mut c = classifier(2);
        c.classify(0, 0, single(0.6));
        c.classify(1, 100, single(0.3));
        assert_eq!(c.pending_downgrade(), 1);
        let stale = c.classify(2, 200, vec![TheoryScore::failed(TheoryId::Gwt, "x")]);
        assert!(stale.composite.stale);
        assert!((stale.composite.value - 0.3).abs() < 1e-12);
        assert_eq!(stale.composite.band, Band::C2Emerging);
        assert_eq!(c.pending_downgrade(), 1);
        let down = c.classify(3, 300, single(0.3));
        assert_eq!(down.composite.band, Band::C1Functional);
    }

    #[test]
    fn test_first_tick_without_evidence() {
        let mut c = classifier(3);
        let r = c.classify(0, 0, vec![]);
        assert!(r.composite.stale);
        assert_eq!(r.composite.value, 0.0);
        assert!(r.transition.is_none());
        assert_eq!(c.current_band(), None);
        let next = c.classify(1, 100, single(0.25));
        assert_eq!(next.transition.map(|t| t.from), Some(None));
    }

    #[test]
    fn test_hysteresis_one_is_immediate() {
        let mut c = classifier(1);
        c.classify(0, 0, single(0.9));
        let r = c.classify(1, 100, single(0.1));
        assert_eq!(r.composite.band, Band::C0Reactive);
    }
}
