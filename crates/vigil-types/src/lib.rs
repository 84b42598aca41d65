// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Vigil Kernel, the real-time awareness monitor for autonomous systems.

pub mod config;
pub mod error;
pub mod history;
pub mod sample;
pub mod score;
pub mod welfare;

pub use config::{
    BandThresholds, DecisionTriggers, MonitorConfig, TheoryParams, WelfareConfig,
};
pub use error::{VigilError, VigilResult};
pub use history::HistoryWindow;
pub use sample::{
    ActionPayload, Payload, Sample, SensorPayload, Snapshot, SourceId, SourceSlot,
    StatePayload,
};
pub use score::{clamp_score, Band, CompositeScore, TheoryId, TheoryScore};
pub use welfare::{WelfareFlag, WelfareSeverity, WelfareStatus};
