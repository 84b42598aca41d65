// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Theory Scorer Interface
// ─────────────────────────────────────────────────────────────────────
//! Capability trait shared by every awareness theory, plus a
//! closure-backed scorer for theories implemented outside this crate.

use std::sync::Arc;

use thiserror::Error;

use vigil_types::{HistoryWindow, Snapshot, SourceId, TheoryId, TheoryParams, TheoryScore};

use crate::attention::AttentionEntropy;
use crate::broadcast::BroadcastBreadth;
use crate::integration::IntegrationProxy;
use crate::recurrence::RecurrenceDepth;
use crate::self_model::SelfModelConsistency;

/// Why a scorer could not produce a value for this tick.
///
/// The scoring engine converts every failure into a confidence-0
/// `TheoryScore`; failures never abort a tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringFailure {
    #[error("missing input from {0} stream")]
    MissingInput(SourceId),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

/// Trait for awareness theory scorers.
///
/// Implementations must be pure: the same snapshot and history always
/// yield the same result. The returned value should lie in [0, 1]; the
/// engine clamps anything else and flags it as an anomaly.
pub trait TheoryScorer: Send + Sync {
    fn theory(&self) -> TheoryId;

    fn score(
        &self,
        snapshot: &Snapshot,
        history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure>;
}

type ScoreFn =
    Box<dyn Fn(&Snapshot, &HistoryWindow) -> Result<TheoryScore, ScoringFailure> + Send + Sync>;

/// Scorer that delegates to a function pointer.
///
/// Lets callers plug an alternative formula for a theory family
/// without touching the classifier.
pub struct ExternalTheory {
    theory: TheoryId,
    score_fn: ScoreFn,
}

impl ExternalTheory {
    pub fn new(
        theory: TheoryId,
        score_fn: impl Fn(&Snapshot, &HistoryWindow) -> Result<TheoryScore, ScoringFailure>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            theory,
            score_fn: Box::new(score_fn),
        }
    }
}

impl TheoryScorer for ExternalTheory {
    fn theory(&self) -> TheoryId {
        self.theory
    }

    fn score(
        &self,
        snapshot: &Snapshot,
        history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure> {
        (self.score_fn)(snapshot, history)
    }
}

/// Build the built-in scorer for a theory family.
pub fn build_scorer(theory: TheoryId, params: &TheoryParams) -> Arc<dyn TheoryScorer> {
    match theory {
        TheoryId::Gwt => Arc::new(BroadcastBreadth::new(params.change_epsilon)),
        TheoryId::Iit => Arc::new(IntegrationProxy::new(params.integration_min_samples)),
        TheoryId::Rpt => Arc::new(RecurrenceDepth::new(params.recurrence_levels)),
        TheoryId::Hot => Arc::new(SelfModelConsistency),
        TheoryId::Ast => Arc::new(AttentionEntropy),
    }
}

/// Lowest confidence among the given input slots.
pub(crate) fn input_confidence(snapshot: &Snapshot, sources: &[SourceId]) -> f64 {
    sources
        .iter()
        .map(|s| snapshot.confidence(*s))
        .fold(1.0, f64::min)
}
