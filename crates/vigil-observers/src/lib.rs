// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Welfare Observers
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Welfare / consistency monitor.
//!
//! Read-only observer over the composite history, recent decision
//! records and the latest snapshot. Its output is advisory: it never
//! mutates scores or the proof chain.

pub mod welfare;

pub use welfare::{WelfareInputs, WelfareMonitor};
