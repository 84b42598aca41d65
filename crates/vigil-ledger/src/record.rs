// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Decision Records
// ─────────────────────────────────────────────────────────────────────
//! Record layout and hashing.
//!
//! ```text
//! payload_hash = SHA-256(JSON {triggering_event, composite_score})
//! record_hash  = SHA-256(index_le64 ‖ timestamp_ms_le64 ‖ payload_hash ‖ prev_hash)
//! ```
//!
//! Hashes are lowercase hex. `payload_hash` and `prev_hash` enter the
//! record hash as their hex text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use vigil_types::{Band, CompositeScore, VigilResult, WelfareSeverity};

/// `prev_hash` of the first record.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// First band assignment after startup.
    Classification { band: Band },
    BandTransition { from: Band, to: Band },
    WelfareEscalation {
        from: WelfareSeverity,
        to: WelfareSeverity,
    },
    DeadlineMiss { elapsed_ms: u64, budget_ms: u64 },
    Shutdown,
}

/// Why a decision was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeringEvent {
    pub kind: EventKind,
    pub detail: String,
}

impl TriggeringEvent {
    pub fn new(kind: EventKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn band_transition(from: Option<Band>, to: Band) -> Self {
        match from {
            None => Self::new(
                EventKind::Classification { band: to },
                format!("initial classification {to}"),
            ),
            Some(from) => Self::new(
                EventKind::BandTransition { from, to },
                format!("{from} -> {to}"),
            ),
        }
    }

    pub fn is_downgrade(&self) -> bool {
        matches!(self.kind, EventKind::BandTransition { from, to } if to < from)
    }
}

/// One immutable entry of the proof chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub index: u64,
    pub timestamp_ms: i64,
    pub composite: CompositeScore,
    pub triggering_event: TriggeringEvent,
    pub payload_hash: String,
    pub prev_hash: String,
    pub record_hash: String,
}

#[derive(Serialize)]
struct HashedPayload<'a> {
    triggering_event: &'a TriggeringEvent,
    composite_score: &'a CompositeScore,
}

/// Hash of the serialized `{triggering_event, composite_score}` pair.
pub fn compute_payload_hash(
    event: &TriggeringEvent,
    composite: &CompositeScore,
) -> VigilResult<String> {
    let bytes = serde_json::to_vec(&HashedPayload {
        triggering_event: event,
        composite_score: composite,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

pub fn compute_record_hash(
    index: u64,
    timestamp_ms: i64,
    payload_hash: &str,
    prev_hash: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    hasher.update(timestamp_ms.to_le_bytes());
    hasher.update(payload_hash.as_bytes());
    hasher.update(prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

impl DecisionRecord {
    /// Seal a new record on top of `prev_hash`.
    pub fn seal(
        index: u64,
        timestamp_ms: i64,
        triggering_event: TriggeringEvent,
        composite: CompositeScore,
        prev_hash: &str,
    ) -> VigilResult<Self> {
        let payload_hash = compute_payload_hash(&triggering_event, &composite)?;
        let record_hash = compute_record_hash(index, timestamp_ms, &payload_hash, prev_hash);
        Ok(Self {
            index,
            timestamp_ms,
            composite,
            triggering_event,
            payload_hash,
            prev_hash: prev_hash.to_string(),
            record_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{TheoryId, TheoryScore};

    fn composite(tick: u64, value: f64) -> CompositeScore {
        CompositeScore {
            tick_index: tick,
            timestamp_ms: tick as i64 * 100,
            value,
            band: Band::C2Emerging,
            stale: false,
            contributions: vec![TheoryScore::new(TheoryId::Gwt, value, 1.0, vec![])],
        }
    }

    #[test]
    fn test_genesis_is_64_hex_zeros() {
        assert_eq!(GENESIS_HASH.len(), 64);
        assert!(GENESIS_HASH.chars().all(|c| c == '0'));
    }

    #[test]
    fn test_seal_is_deterministic() {
        let ev = TriggeringEvent::band_transition(None, Band::C2Emerging);
        let a = DecisionRecord::seal(0, 1_000, ev.clone(), composite(0, 0.6), GENESIS_HASH).unwrap();
        let b = DecisionRecord::seal(0, 1_000, ev, composite(0, 0.6), GENESIS_HASH).unwrap();
        assert_eq!(a.record_hash, b.record_hash);
        assert_eq!(a.payload_hash.len(), 64);
    }

    #[test]
    fn test_record_hash_covers_every_field() {
        let base = compute_record_hash(0, 10, "aa", GENESIS_HASH);
        assert_ne!(base, compute_record_hash(1, 10, "aa", GENESIS_HASH));
        assert_ne!(base, compute_record_hash(0, 11, "aa", GENESIS_HASH));
        assert_ne!(base, compute_record_hash(0, 10, "ab", GENESIS_HASH));
        assert_ne!(base, compute_record_hash(0, 10, "aa", "ff"));
    }

    #[test]
    fn test_payload_hash_sensitive_to_detail() {
        let c = composite(0, 0.6);
        let a = TriggeringEvent::new(EventKind::Shutdown, "stop");
        let b = TriggeringEvent::new(EventKind::Shutdown, "stoq");
        assert_ne!(
            compute_payload_hash(&a, &c).unwrap(),
            compute_payload_hash(&b, &c).unwrap()
        );
    }

    #[test]
    fn test_band_transition_constructor() {
        let first = TriggeringEvent::band_transition(None, Band::C1Functional);
        assert!(matches!(first.kind, EventKind::Classification { .. }));
        let down = TriggeringEvent::band_transition(Some(Band::C2Emerging), Band::C1Functional);
        assert!(down.is_downgrade());
        let up = TriggeringEvent::band_transition(Some(Band::C1Functional), Band::C2Emerging);
        assert!(!up.is_downgrade());
    }

    #[test]
    fn test_record_json_round_trip_preserves_hash() {
        let ev = TriggeringEvent::band_transition(None, Band::C2Emerging);
        let rec = DecisionRecord::seal(0, 5, ev, composite(0, 0.1 + 0.2), GENESIS_HASH).unwrap();
        let json = serde_json::to_string(&rec).unwrap();
        let back: DecisionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
        let again = compute_payload_hash(&back.triggering_event, &back.composite).unwrap();
        assert_eq!(again, rec.payload_hash);
    }
}
