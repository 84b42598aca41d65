// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Broadcast Breadth (GWT)
// ─────────────────────────────────────────────────────────────────────
//! Global-workspace proxy: how widely one component's output spreads.
//!
//! For every tick in the window that carries a new action, the state
//! channels whose value moved by more than `change_epsilon` since the
//! previous tick are credited to the acting component. The score is
//! the largest per-component reach as a fraction of all state channels.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::once;

use vigil_types::{HistoryWindow, Snapshot, SourceId, TheoryId, TheoryScore};

use crate::scorer::{input_confidence, ScoringFailure, TheoryScorer};

pub struct BroadcastBreadth {
    change_epsilon: f64,
}

impl BroadcastBreadth {
    pub fn new(change_epsilon: f64) -> Self {
        Self {
            change_epsilon: change_epsilon.abs(),
        }
    }
}

impl Default for BroadcastBreadth {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl TheoryScorer for BroadcastBreadth {
    fn theory(&self) -> TheoryId {
        TheoryId::Gwt
    }

    fn score(
        &self,
        snapshot: &Snapshot,
        history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure> {
        let state = snapshot
            .state()
            .ok_or(ScoringFailure::MissingInput(SourceId::State))?;
        if snapshot.action().is_none() {
            return Err(ScoringFailure::MissingInput(SourceId::Action));
        }
        let n_channels = state.channels.len();
        if n_channels == 0 {
            return Err(ScoringFailure::InsufficientData(
                "state carries no channels".into(),
            ));
        }

        let seq: Vec<&Snapshot> = history.iter().chain(once(snapshot)).collect();
        let mut reach: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut transitions = 0usize;

        for pair in seq.windows(2) {
            let (prev, cur) = (pair[0], pair[1]);
            let Some(act) = cur.action() else { continue };
            if cur.action_timestamp() == prev.action_timestamp() {
                continue; // carried action, not a new one
            }
            let (Some(before), Some(after)) = (prev.state(), cur.state()) else {
                continue;
            };
            transitions += 1;
            let influenced = reach.entry(act.component.as_str()).or_default();
            for (ch, v) in &after.channels {
                if let Some(pv) = before.channels.get(ch) {
                    if (v - pv).abs() > self.change_epsilon {
                        influenced.insert(ch.as_str());
                    }
                }
            }
        }

        if transitions == 0 {
            return Err(ScoringFailure::InsufficientData(
                "no action transitions in window".into(),
            ));
        }

        let (component, breadth) = reach
            .iter()
            .map(|(c, chs)| (*c, chs.len()))
            .max_by_key(|(_, n)| *n)
            .unwrap_or(("", 0));

        let value = breadth as f64 / n_channels as f64;
        let confidence = input_confidence(snapshot, &[SourceId::State, SourceId::Action]);
        Ok(
            TheoryScore::new(
                TheoryId::Gwt,
                value,
                confidence,
                vec![SourceId::State, SourceId::Action],
            )
            .with_detail(format!("{component} reaches {breadth}/{n_channels} channels")),
        )
    }
}
