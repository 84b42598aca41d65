// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Core Tick Driver
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Periodic awareness monitor: ingestion, parallel theory scoring,
//! composite classification with hysteresis, proof chain and welfare.
//!
//! One tick: snapshot → score (parallel) → classify → decide → assess
//! welfare → publish.
//!
//! # Invariants
//!
//! 1. **Ticks never wait for stragglers**: a source that has not
//!    reported lowers its slot confidence; the tick still runs. Producer
//!    lock waits are bounded by the staleness bound.
//!
//! 2. **Scorer failures are data**: an error or a panic inside a scorer
//!    becomes a confidence-0 score. It never aborts the tick and never
//!    poisons the other scorers (`catch_unwind` per scorer).
//!
//! 3. **Monotone tick indices**: snapshots, composites and published
//!    outputs carry gap-free indices starting at 0.
//!
//! 4. **Decide, then publish**: a decision is visible on the
//!    `decision_proof` stream only after the proof chain accepted it.

pub mod aggregator;
pub mod classifier;
pub mod engine;
pub mod kernel;
pub mod publish;

pub use aggregator::{IngestionAggregator, StalenessPolicy};
pub use classifier::{BandTransition, Classification, CompositeClassifier};
pub use engine::ScoringEngine;
pub use kernel::{spawn, KernelHandle, MonitorKernel, MonitorReport, TickOutput};
pub use publish::{ChannelPublisher, NullPublisher, Publication, Publisher};
