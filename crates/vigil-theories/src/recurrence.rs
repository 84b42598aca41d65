// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Recurrence Depth (RPT)
// ─────────────────────────────────────────────────────────────────────
//! Recurrent-processing proxy.
//!
//! State vectors in the window are quantized into `levels` bins per
//! channel (range taken over the window). Consecutive distinct symbols
//! form a directed transition graph. Each strongly connected component
//! with more than one node contributes `E - N + 1` independent feedback
//! cycles; the total `k` is normalized as `k / (k + nodes - 1)`.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::once;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use vigil_types::{HistoryWindow, Snapshot, SourceId, TheoryId, TheoryScore};

use crate::scorer::{input_confidence, ScoringFailure, TheoryScorer};

pub struct RecurrenceDepth {
    levels: usize,
}

impl RecurrenceDepth {
    pub fn new(levels: usize) -> Self {
        Self {
            levels: levels.max(2),
        }
    }

    fn quantize(&self, value: f64, lo: f64, hi: f64) -> usize {
        let span = hi - lo;
        if span < 1e-12 {
            return 0;
        }
        let bin = ((value - lo) / span * self.levels as f64).floor() as usize;
        bin.min(self.levels - 1)
    }
}

impl Default for RecurrenceDepth {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Independent directed feedback cycles in a transition graph.
pub fn feedback_cycles(graph: &DiGraph<(), ()>) -> usize {
    tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let members: BTreeSet<NodeIndex> = scc.iter().copied().collect();
            let edges = graph
                .edge_indices()
                .filter_map(|e| graph.edge_endpoints(e))
                .filter(|(a, b)| members.contains(a) && members.contains(b))
                .count();
            edges + 1 - scc.len()
        })
        .sum()
}

impl TheoryScorer for RecurrenceDepth {
    fn theory(&self) -> TheoryId {
        TheoryId::Rpt
    }

    fn score(
        &self,
        snapshot: &Snapshot,
        history: &HistoryWindow,
    ) -> Result<TheoryScore, ScoringFailure> {
        let current = snapshot
            .state()
            .ok_or(ScoringFailure::MissingInput(SourceId::State))?;
        let keys: Vec<&String> = current.channels.keys().collect();
        if keys.is_empty() {
            return Err(ScoringFailure::InsufficientData(
                "state carries no channels".into(),
            ));
        }

        let vectors: Vec<Vec<f64>> = history
            .iter()
            .chain(once(snapshot))
            .filter_map(|s| s.state())
            .filter(|s| keys.iter().all(|k| s.channels.contains_key(*k)))
            .map(|s| keys.iter().map(|k| s.channels[*k]).collect())
            .collect();
        if vectors.len() < 3 {
            return Err(ScoringFailure::InsufficientData(format!(
                "need 3 state vectors, have {}",
                vectors.len()
            )));
        }

        let mut lo = vec![f64::INFINITY; keys.len()];
        let mut hi = vec![f64::NEG_INFINITY; keys.len()];
        for v in &vectors {
            for (i, x) in v.iter().enumerate() {
                lo[i] = lo[i].min(*x);
                hi[i] = hi[i].max(*x);
            }
        }

        let mut graph: DiGraph<(), ()> = DiGraph::new();
        let mut nodes: BTreeMap<Vec<usize>, NodeIndex> = BTreeMap::new();
        let mut edges: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
        let mut transitions = 0usize;
        let mut prev: Option<NodeIndex> = None;

        for v in &vectors {
            let symbol: Vec<usize> = v
                .iter()
                .enumerate()
                .map(|(i, x)| self.quantize(*x, lo[i], hi[i]))
                .collect();
            let node = *nodes.entry(symbol).or_insert_with(|| graph.add_node(()));
            if let Some(p) = prev {
                if p != node {
                    transitions += 1;
                    if edges.insert((p, node)) {
                        graph.add_edge(p, node, ());
                    }
                }
            }
            prev = Some(node);
        }

        let cycles = feedback_cycles(&graph);
        let n = graph.node_count();
        let value = if n > 1 {
            cycles as f64 / (cycles + n - 1) as f64
        } else {
            0.0
        };
        let confidence = input_confidence(snapshot, &[SourceId::State]);
        Ok(
            TheoryScore::new(TheoryId::Rpt, value, confidence, vec![SourceId::State])
                .with_detail(format!(
                    "{cycles} cycles over {n} states, {transitions} transitions"
                )),
        )
    }
}
