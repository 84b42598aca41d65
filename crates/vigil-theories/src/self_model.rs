// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Self-Model Consistency (HOT)
// ─────────────────────────────────────────────────────────────────────
//! Higher-order proxy: does the system know what it is doing?
//!
//! Each distinct action in the window is paired with the declared
//! self-state in force when its outcome was observed. The score is
//! `1 - mean |declared - observed|` over every shared key, with each
//! error capped at 1.

use std::collections::BTreeSet;
use std::iter::once;

use vigil_types::{HistoryWindow, Snapshot, SourceId, TheoryId, TheoryScore};

use crate::scorer::{input_confidence, ScoringFailure, TheoryScorer};

pub struct SelfModelConsistency;

impl TheoryScorer for SelfModelConsistency {
    fn theory(&self) -> TheoryId {
        TheoryId::Hot
    }

    fn score(
        &self,
        snapshot: &Snapshot,
        history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure> {
        let mut seen_actions = BTreeSet::new();
        let mut total_error = 0.0;
        let mut comparisons = 0usize;
        let mut any_declared = false;
        let mut any_outcome = false;

        for snap in history.iter().chain(once(snapshot)) {
            let (Some(state), Some(action), Some(ts)) =
                (snap.state(), snap.action(), snap.action_timestamp())
            else {
                continue;
            };
            if !seen_actions.insert(ts) {
                continue;
            }
            any_declared |= !state.declared_self.is_empty();
            any_outcome |= !action.outcome.is_empty();
            for (key, observed) in &action.outcome {
                if let Some(declared) = state.declared_self.get(key) {
                    total_error += (declared - observed).abs().min(1.0);
                    comparisons += 1;
                }
            }
        }

        if comparisons == 0 {
            return Err(if !any_declared {
                ScoringFailure::MissingInput(SourceId::State)
            } else if !any_outcome {
                ScoringFailure::MissingInput(SourceId::Action)
            } else {
                ScoringFailure::InsufficientData(
                    "declared self-state and outcomes share no keys".into(),
                )
            });
        }

        let mean_error = total_error / comparisons as f64;
        let confidence = input_confidence(snapshot, &[SourceId::State, SourceId::Action]);
        Ok(TheoryScore::new(
            TheoryId::Hot,
            1.0 - mean_error,
            confidence,
            vec![SourceId::State, SourceId::Action],
        )
        .with_detail(format!(
            "{comparisons} comparisons over {} actions",
            seen_actions.len()
        )))
    }
}
