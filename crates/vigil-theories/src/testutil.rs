use std::collections::BTreeMap;

use vigil_types::{
    ActionPayload, HistoryWindow, Sample, SensorPayload, Snapshot, SourceSlot, StatePayload,
};

fn fresh(sample: Sample) -> SourceSlot {
    SourceSlot {
        sample: Some(sample),
        stale: false,
        confidence: 1.0,
        age_ms: Some(0),
    }
}

pub fn empty_snapshot(tick: u64) -> Snapshot {
    Snapshot {
        tick_index: tick,
        timestamp_ms: tick as i64 * 100,
        slots: [SourceSlot::empty(), SourceSlot::empty(), SourceSlot::empty()],
    }
}

pub fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn state(channels: &[(&str, f64)]) -> StatePayload {
    StatePayload {
        channels: map(channels),
        ..Default::default()
    }
}

pub fn action(component: &str) -> ActionPayload {
    ActionPayload {
        component: component.to_string(),
        ..Default::default()
    }
}

/// Snapshot at `tick`; the action sample is timestamped at the tick so
/// each tick that carries one counts as a new action.
pub fn snapshot(
    tick: u64,
    sensor: Option<SensorPayload>,
    state: Option<StatePayload>,
    action: Option<ActionPayload>,
) -> Snapshot {
    let ts = tick as i64 * 100;
    let mut snap = empty_snapshot(tick);
    if let Some(p) = sensor {
        snap.slots[0] = fresh(Sample::sensor(ts, p));
    }
    if let Some(p) = state {
        snap.slots[1] = fresh(Sample::state(ts, p));
    }
    if let Some(p) = action {
        snap.slots[2] = fresh(Sample::action(ts, p));
    }
    snap
}

pub fn history(snaps: Vec<Snapshot>) -> HistoryWindow {
    snaps.into_iter().collect()
}
