// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Bounded Snapshot History
// ─────────────────────────────────────────────────────────────────────

use std::collections::VecDeque;

use crate::sample::Snapshot;

/// Ring buffer of the last `capacity` snapshots, oldest first.
///
/// History-dependent scorers receive it read-only alongside the
/// current snapshot, which is never part of the window it is scored
/// against.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> + ExactSizeIterator {
        self.snapshots.iter()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

impl FromIterator<Snapshot> for HistoryWindow {
    /// Builds a window sized to hold every snapshot yielded.
    fn from_iter<I: IntoIterator<Item = Snapshot>>(iter: I) -> Self {
        let snapshots: VecDeque<Snapshot> = iter.into_iter().collect();
        let capacity = snapshots.len().max(1);
        Self {
            snapshots,
            capacity,
        }
    }
}
