// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Input Samples and Tick Snapshots
// ─────────────────────────────────────────────────────────────────────
//! Samples arrive from three independent producers (sensor, state,
//! action). Every tick the aggregator folds the latest sample of each
//! stream into a `Snapshot` with per-source staleness.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{VigilError, VigilResult};

/// Logical input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Sensor,
    State,
    Action,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::Sensor, SourceId::State, SourceId::Action];

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceId::Sensor => "sensor",
            SourceId::State => "state",
            SourceId::Action => "action",
        };
        f.write_str(s)
    }
}

/// Sensor readings plus per-sensor health in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    #[serde(default)]
    pub readings: BTreeMap<String, f64>,
    #[serde(default)]
    pub health: BTreeMap<String, f64>,
}

/// Internal state of the monitored system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    /// Named state channels (joint positions, controller variables, ...).
    #[serde(default)]
    pub channels: BTreeMap<String, f64>,
    /// What the system claims about itself (predicted success, load, ...).
    #[serde(default)]
    pub declared_self: BTreeMap<String, f64>,
    #[serde(default = "default_battery")]
    pub battery_level: f64,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub velocity: f64,
    #[serde(default)]
    pub uptime_s: f64,
    #[serde(default)]
    pub task_completion_rate: f64,
}

fn default_battery() -> f64 {
    1.0
}

impl Default for StatePayload {
    fn default() -> Self {
        Self {
            channels: BTreeMap::new(),
            declared_self: BTreeMap::new(),
            battery_level: 1.0,
            error_count: 0,
            velocity: 0.0,
            uptime_s: 0.0,
            task_completion_rate: 0.0,
        }
    }
}

/// An action emitted by one component of the monitored system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Component that issued the action.
    pub component: String,
    #[serde(default)]
    pub action_id: String,
    /// Weight given to each sensor channel on the decision path.
    #[serde(default)]
    pub attention: BTreeMap<String, f64>,
    /// Externally observed outcome, keyed like `StatePayload::declared_self`.
    #[serde(default)]
    pub outcome: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Sensor(SensorPayload),
    State(StatePayload),
    Action(ActionPayload),
}

impl Payload {
    pub fn source(&self) -> SourceId {
        match self {
            Payload::Sensor(_) => SourceId::Sensor,
            Payload::State(_) => SourceId::State,
            Payload::Action(_) => SourceId::Action,
        }
    }
}

/// A timestamped payload from one input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub source: SourceId,
    /// Producer timestamp, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub payload: Payload,
}

impl Sample {
    pub fn sensor(timestamp_ms: i64, payload: SensorPayload) -> Self {
        Self {
            source: SourceId::Sensor,
            timestamp_ms,
            payload: Payload::Sensor(payload),
        }
    }

    pub fn state(timestamp_ms: i64, payload: StatePayload) -> Self {
        Self {
            source: SourceId::State,
            timestamp_ms,
            payload: Payload::State(payload),
        }
    }

    pub fn action(timestamp_ms: i64, payload: ActionPayload) -> Self {
        Self {
            source: SourceId::Action,
            timestamp_ms,
            payload: Payload::Action(payload),
        }
    }

    /// Reject samples whose declared source disagrees with the payload
    /// or that carry non-finite numbers.
    pub fn validate(&self) -> VigilResult<()> {
        if self.payload.source() != self.source {
            return Err(VigilError::Validation(format!(
                "sample tagged {} carries a {} payload",
                self.source,
                self.payload.source()
            )));
        }
        let finite = |m: &BTreeMap<String, f64>| m.values().all(|v| v.is_finite());
        let ok = match &self.payload {
            Payload::Sensor(p) => finite(&p.readings) && finite(&p.health),
            Payload::State(p) => {
                finite(&p.channels)
                    && finite(&p.declared_self)
                    && p.battery_level.is_finite()
                    && p.velocity.is_finite()
            }
            Payload::Action(p) => finite(&p.attention) && finite(&p.outcome),
        };
        if !ok {
            return Err(VigilError::Validation(format!(
                "{} sample at {} contains non-finite values",
                self.source, self.timestamp_ms
            )));
        }
        Ok(())
    }
}

/// Per-source view inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSlot {
    /// Last-known sample, carried even when stale.
    pub sample: Option<Sample>,
    pub stale: bool,
    /// 1.0 when fresh, decays to 0 as the sample ages.
    pub confidence: f64,
    /// Age of the sample at tick time; `None` if never received.
    pub age_ms: Option<i64>,
}

impl SourceSlot {
    pub fn empty() -> Self {
        Self {
            sample: None,
            stale: true,
            confidence: 0.0,
            age_ms: None,
        }
    }
}

/// Time-aligned bundle of the most recent input data at a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick_index: u64,
    pub timestamp_ms: i64,
    /// Indexed by `SourceId::index()`.
    pub slots: [SourceSlot; 3],
}

impl Snapshot {
    pub fn slot(&self, source: SourceId) -> &SourceSlot {
        &self.slots[source.index()]
    }

    pub fn confidence(&self, source: SourceId) -> f64 {
        self.slot(source).confidence
    }

    pub fn is_fresh(&self, source: SourceId) -> bool {
        let slot = self.slot(source);
        slot.sample.is_some() && !slot.stale
    }

    pub fn sensor(&self) -> Option<&SensorPayload> {
        match self.slot(SourceId::Sensor).sample.as_ref().map(|s| &s.payload) {
            Some(Payload::Sensor(p)) => Some(p),
            _ => None,
        }
    }

    pub fn state(&self) -> Option<&StatePayload> {
        match self.slot(SourceId::State).sample.as_ref().map(|s| &s.payload) {
            Some(Payload::State(p)) => Some(p),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&ActionPayload> {
        match self.slot(SourceId::Action).sample.as_ref().map(|s| &s.payload) {
            Some(Payload::Action(p)) => Some(p),
            _ => None,
        }
    }

    /// Timestamp of the action sample, used to tell new actions from
    /// carried ones across ticks.
    pub fn action_timestamp(&self) -> Option<i64> {
        self.slot(SourceId::Action).sample.as_ref().map(|s| s.timestamp_ms)
    }
}
