// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Ingestion Aggregator
// ─────────────────────────────────────────────────────────────────────
//! Latest-sample slots for the sensor, state and action streams.
//!
//! Producers write into one `parking_lot::Mutex` slot per source; the
//! tick driver reads all three into a `Snapshot`. Nothing here waits
//! for a source to report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use vigil_types::{Sample, Snapshot, SourceId, SourceSlot, VigilError, VigilResult};

/// Maps sample age to a staleness flag and a confidence.
///
/// ```text
/// age ≤ bound                   → fresh, confidence 1
/// bound < age < multiple·bound  → stale, linear decay 1 → 0
/// age ≥ multiple·bound          → stale, confidence 0
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub bound_ms: u64,
    pub decay_multiple: u64,
}

impl StalenessPolicy {
    pub fn new(bound_ms: u64) -> Self {
        Self {
            bound_ms,
            decay_multiple: 3,
        }
    }

    /// `(stale, confidence)` for a sample `age_ms` old. Negative ages
    /// (clock skew) count as 0.
    pub fn assess(&self, age_ms: i64) -> (bool, f64) {
        let age = age_ms.max(0) as f64;
        let bound = self.bound_ms as f64;
        if age <= bound {
            return (false, 1.0);
        }
        let limit = bound * self.decay_multiple.max(1) as f64;
        if age >= limit || limit <= bound {
            return (true, 0.0);
        }
        (true, 1.0 - (age - bound) / (limit - bound))
    }
}

pub struct IngestionAggregator {
    slots: [Mutex<Option<Sample>>; 3],
    next_tick: AtomicU64,
    policy: StalenessPolicy,
}

impl IngestionAggregator {
    pub fn new(policy: StalenessPolicy) -> Self {
        Self {
            slots: [Mutex::new(None), Mutex::new(None), Mutex::new(None)],
            next_tick: AtomicU64::new(0),
            policy,
        }
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Store `sample` as the latest for its source.
    ///
    /// Malformed samples are rejected with `Validation`. A sample older
    /// than the one already held is dropped. Waiting for the slot is
    /// bounded by the staleness bound.
    pub fn ingest(&self, sample: Sample) -> VigilResult<()> {
        sample.validate()?;
        let source = sample.source;
        let wait = Duration::from_millis(self.policy.bound_ms);
        let mut slot = self.slots[source.index()]
            .try_lock_for(wait)
            .ok_or_else(|| VigilError::Timeout {
                what: format!("{source} slot lock"),
                waited_ms: self.policy.bound_ms,
            })?;
        if let Some(current) = slot.as_ref() {
            if sample.timestamp_ms < current.timestamp_ms {
                log::debug!(
                    "Dropping out-of-order {source} sample ({} < {})",
                    sample.timestamp_ms,
                    current.timestamp_ms
                );
                return Ok(());
            }
        }
        *slot = Some(sample);
        Ok(())
    }

    /// Assemble the next snapshot. Tick indices start at 0 and never skip.
    pub fn snapshot(&self, now_ms: i64) -> Snapshot {
        let tick_index = self.next_tick.fetch_add(1, Ordering::SeqCst);
        let slots = SourceId::ALL.map(|source| self.read_slot(source, now_ms));
        Snapshot {
            tick_index,
            timestamp_ms: now_ms,
            slots,
        }
    }

    /// Number of snapshots taken so far.
    pub fn ticks_taken(&self) -> u64 {
        self.next_tick.load(Ordering::SeqCst)
    }

    fn read_slot(&self, source: SourceId, now_ms: i64) -> SourceSlot {
        let Some(sample) = self.slots[source.index()].lock().clone() else {
            return SourceSlot::empty();
        };
        let age_ms = (now_ms - sample.timestamp_ms).max(0);
        let (stale, confidence) = self.policy.assess(age_ms);
        SourceSlot {
            sample: Some(sample),
            stale,
            confidence,
            age_ms: Some(age_ms),
        }
    }
}
