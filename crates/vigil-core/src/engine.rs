// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Theory Scoring Engine
// ─────────────────────────────────────────────────────────────────────
//! Runs every configured scorer against one snapshot, in parallel.
//!
//! Output order follows configuration order, independent of which
//! scorer finishes first.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use rayon::prelude::*;

use vigil_theories::{build_scorer, TheoryScorer};
use vigil_types::{clamp_score, HistoryWindow, MonitorConfig, Snapshot, TheoryId, TheoryScore};

pub struct ScoringEngine {
    scorers: Vec<Arc<dyn TheoryScorer>>,
}

impl ScoringEngine {
    pub fn new(scorers: Vec<Arc<dyn TheoryScorer>>) -> Self {
        Self { scorers }
    }

    /// Built-in scorers for `config.theories`, in that order.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config
                .theories
                .iter()
                .map(|t| build_scorer(*t, &config.theory_params))
                .collect(),
        )
    }

    /// Replace the scorer for the same theory, or append it.
    pub fn with_scorer(mut self, scorer: Arc<dyn TheoryScorer>) -> Self {
        let theory = scorer.theory();
        match self.scorers.iter_mut().find(|s| s.theory() == theory) {
            Some(slot) => *slot = scorer,
            None => self.scorers.push(scorer),
        }
        self
    }

    pub fn theories(&self) -> Vec<TheoryId> {
        self.scorers.iter().map(|s| s.theory()).collect()
    }

    /// One `TheoryScore` per scorer. Never fails.
    pub fn evaluate(&self, snapshot: &Snapshot, history: &HistoryWindow) -> Vec<TheoryScore> {
        self.scorers
            .par_iter()
            .map(|scorer| run_scorer(scorer.as_ref(), snapshot, history))
            .collect()
    }
}

fn run_scorer(scorer: &dyn TheoryScorer, snapshot: &Snapshot, history: &HistoryWindow) -> TheoryScore {
    let theory = scorer.theory();
    match catch_unwind(AssertUnwindSafe(|| scorer.score(snapshot, history))) {
        Ok(Ok(score)) => normalize(theory, score),
        Ok(Err(failure)) => {
            log::warn!(
                "{theory} scorer failed at tick {}: {failure}",
                snapshot.tick_index
            );
            TheoryScore::failed(theory, failure.to_string())
        }
        Err(_) => {
            log::error!(
                "{theory} scorer panicked at tick {}; treating as confidence 0",
                snapshot.tick_index
            );
            TheoryScore::failed(theory, "scorer panicked")
        }
    }
}

fn normalize(theory: TheoryId, mut score: TheoryScore) -> TheoryScore {
    score.theory = theory;
    let in_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_range(score.value) || !in_range(score.confidence) {
        log::warn!(
            "{theory} scorer returned value {} confidence {}; clamping",
            score.value,
            score.confidence
        );
        score.value = clamp_score(score.value, 0.0, 1.0);
        score.confidence = clamp_score(score.confidence, 0.0, 1.0);
        score.anomaly = true;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_theories::{ExternalTheory, ScoringFailure};
    use vigil_types::{SourceId, SourceSlot};

    fn snapshot() -> Snapshot {
        Snapshot {
            tick_index: 0,
            timestamp_ms: 0,
            slots: [SourceSlot::empty(), SourceSlot::empty(), SourceSlot::empty()],
        }
    }

    fn raw(theory: TheoryId, value: f64) -> TheoryScore {
        TheoryScore {
            theory,
            value,
            confidence: 1.0,
            inputs_used: vec![SourceId::State],
            failed: false,
            anomaly: false,
            detail: None,
        }
    }

    fn fixed(theory: TheoryId, value: f64) -> Arc<dyn TheoryScorer> {
        Arc::new(ExternalTheory::new(theory, move |_, _| Ok(raw(theory, value))))
    }

    #[test]
    fn test_output_in_configuration_order() {
        let engine = ScoringEngine::new(vec![
            fixed(TheoryId::Rpt, 0.1),
            fixed(TheoryId::Gwt, 0.2),
            fixed(TheoryId::Ast, 0.3),
        ]);
        let scores = engine.evaluate(&snapshot(), &HistoryWindow::new(4));
        let order: Vec<_> = scores.iter().map(|s| s.theory).collect();
        assert_eq!(order, vec![TheoryId::Rpt, TheoryId::Gwt, TheoryId::Ast]);
    }

    #[test]
    fn test_failure_becomes_confidence_zero() {
        let engine = ScoringEngine::new(vec![Arc::new(ExternalTheory::new(
            TheoryId::Hot,
            |_, _| Err(ScoringFailure::MissingInput(SourceId::Action)),
        ))]);
        let s = &engine.evaluate(&snapshot(), &HistoryWindow::new(4))[0];
        assert!(s.failed);
        assert_eq!(s.confidence, 0.0);
        assert_eq!(s.detail.as_deref(), Some("missing input from action stream"));
    }

    #[test]
    fn test_panic_is_isolated() {
        let engine = ScoringEngine::new(vec![
            Arc::new(ExternalTheory::new(TheoryId::Iit, |_, _| panic!("boom"))),
            fixed(TheoryId::Gwt, 0.7),
        ]);
        let scores = engine.evaluate(&snapshot(), &HistoryWindow::new(4));
        assert!(scores[0].failed);
        assert_eq!(scores[0].confidence, 0.0);
        assert!(!scores[1].failed);
        assert!((scores[1].value - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_value_clamped_and_flagged() {
        let engine = ScoringEngine::new(vec![
            fixed(TheoryId::Gwt, 1.7),
            fixed(TheoryId::Iit, f64::NAN),
            fixed(TheoryId::Rpt, 0.4),
        ]);
        let scores = engine.evaluate(&snapshot(), &HistoryWindow::new(4));
        assert_eq!(scores[0].value, 1.0);
        assert!(scores[0].anomaly);
        assert_eq!(scores[1].value, 0.0);
        assert!(scores[1].anomaly);
        assert!(!scores[2].anomaly);
    }

    #[test]
    fn test_from_config_builds_all_theories() {
        let engine = ScoringEngine::from_config(&MonitorConfig::default());
        assert_eq!(engine.theories(), TheoryId::ALL.to_vec());
        let scores = engine.evaluate(&snapshot(), &HistoryWindow::new(4));
        assert_eq!(scores.len(), 5);
        // Empty snapshot: nothing to score, nothing panics.
        assert!(scores.iter().all(|s| !s.is_evidence()));
    }

    #[test]
    fn test_with_scorer_replaces_same_theory() {
        let engine = ScoringEngine::from_config(&MonitorConfig::default())
            .with_scorer(fixed(TheoryId::Hot, 0.9));
        assert_eq!(engine.theories().len(), 5);
        let scores = engine.evaluate(&snapshot(), &HistoryWindow::new(4));
        let hot = scores.iter().find(|s| s.theory == TheoryId::Hot).unwrap();
        assert!((hot.value - 0.9).abs() < 1e-12);
    }
}
