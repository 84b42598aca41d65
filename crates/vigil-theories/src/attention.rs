// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Attention Allocation Entropy (AST)
// ─────────────────────────────────────────────────────────────────────
//! Attention-schema proxy: normalized Shannon entropy `H / ln(n)` of the
//! weights the decision path assigns to sensor channels. 0 means all
//! attention on one channel, 1 means attention spread evenly.
//!
//! When the current action declares no attention weights, sensor health
//! stands in for them at half confidence.

use std::collections::BTreeMap;

use vigil_types::{HistoryWindow, Snapshot, SourceId, TheoryId, TheoryScore};

use crate::scorer::{input_confidence, ScoringFailure, TheoryScorer};

pub struct AttentionEntropy;

/// Normalized entropy of non-negative weights; `None` if they sum to 0.
pub fn normalized_entropy(weights: &BTreeMap<String, f64>) -> Option<f64> {
    let n = weights.len();
    let total: f64 = weights.values().map(|w| w.max(0.0)).sum();
    if n == 0 || total <= 0.0 {
        return None;
    }
    if n == 1 {
        return Some(0.0);
    }
    let h: f64 = weights
        .values()
        .map(|w| w.max(0.0) / total)
        .filter(|p| *p > 0.0)
        .map(|p| -p * p.ln())
        .sum();
    Some(h / (n as f64).ln())
}

impl TheoryScorer for AttentionEntropy {
    fn theory(&self) -> TheoryId {
        TheoryId::Ast
    }

    fn score(
        &self,
        snapshot: &Snapshot,
        _history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure> {
        if let Some(action) = snapshot.action().filter(|a| !a.attention.is_empty()) {
            let h = normalized_entropy(&action.attention).ok_or_else(|| {
                ScoringFailure::InsufficientData("attention weights sum to zero".into())
            })?;
            let confidence = input_confidence(snapshot, &[SourceId::Action]);
            return Ok(TheoryScore::new(
                TheoryId::Ast,
                h,
                confidence,
                vec![SourceId::Action],
            )
            .with_detail(format!("{} attended channels", action.attention.len())));
        }

        let sensor = snapshot
            .sensor()
            .filter(|s| !s.health.is_empty())
            .ok_or(ScoringFailure::MissingInput(SourceId::Action))?;
        let h = normalized_entropy(&sensor.health).ok_or_else(|| {
            ScoringFailure::InsufficientData("sensor health sums to zero".into())
        })?;
        log::debug!(
            "AST tick {}: no attention weights, using sensor health",
            snapshot.tick_index
        );
        let confidence = 0.5 * input_confidence(snapshot, &[SourceId::Sensor]);
        Ok(
            TheoryScore::new(TheoryId::Ast, h, confidence, vec![SourceId::Sensor])
                .with_detail("sensor health fallback"),
        )
    }
}
