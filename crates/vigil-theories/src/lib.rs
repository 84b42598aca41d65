// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Theory Scorers
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Independent awareness scorers behind one capability trait.
//!
//! - GWT: broadcast breadth of a component's output over state channels
//! - IIT: joint information lost by the weakest bipartition of the state
//! - RPT: feedback cycles in the quantized state-transition graph
//! - HOT: declared self-state versus observed action outcomes
//! - AST: entropy of attention allocated over sensor channels
//!
//! Every scorer is a pure function of the current snapshot and the
//! bounded history window; none keeps state between calls.

pub mod attention;
pub mod broadcast;
pub mod integration;
pub mod recurrence;
pub mod scorer;
pub mod self_model;

pub use attention::AttentionEntropy;
pub use broadcast::BroadcastBreadth;
pub use integration::IntegrationProxy;
pub use recurrence::RecurrenceDepth;
pub use scorer::{build_scorer, ExternalTheory, ScoringFailure, TheoryScorer};
pub use self_model::SelfModelConsistency;

#[cfg(test)]
pub(crate) mod testutil;
