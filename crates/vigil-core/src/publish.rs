// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Output Streams
// ─────────────────────────────────────────────────────────────────────
//! The four outbound streams and two publishers for them.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use vigil_ledger::DecisionRecord;
use vigil_types::{Band, CompositeScore, WelfareStatus};

/// Sink for everything a tick produces. Publishing never fails the tick.
pub trait Publisher: Send + Sync {
    /// The composite value as a scalar, once per tick.
    fn consciousness_level(&self, tick_index: u64, value: f64, band: Band, late: bool);

    fn awareness_score(&self, composite: &CompositeScore, late: bool);

    /// Called only after the record is in the proof chain.
    fn decision_proof(&self, record: &DecisionRecord);

    fn welfare_status(&self, status: &WelfareStatus);
}

/// Discards every output.
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn consciousness_level(&self, _tick_index: u64, _value: f64, _band: Band, _late: bool) {}

    fn awareness_score(&self, _composite: &CompositeScore, _late: bool) {}

    fn decision_proof(&self, _record: &DecisionRecord) {}

    fn welfare_status(&self, _status: &WelfareStatus) {}
}

/// One message on a `ChannelPublisher`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stream", rename_all = "snake_case")]
pub enum Publication {
    ConsciousnessLevel {
        tick_index: u64,
        value: f64,
        band: Band,
        late: bool,
    },
    AwarenessScore {
        composite: CompositeScore,
        late: bool,
    },
    DecisionProof {
        record: DecisionRecord,
    },
    WelfareStatus {
        status: WelfareStatus,
    },
}

/// Forwards outputs into a crossbeam channel.
///
/// A full bounded channel drops the message with a warning; the tick
/// driver never blocks on a slow consumer.
pub struct ChannelPublisher {
    tx: Sender<Publication>,
}

impl ChannelPublisher {
    pub fn unbounded() -> (Self, Receiver<Publication>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn bounded(capacity: usize) -> (Self, Receiver<Publication>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    fn send(&self, publication: Publication) {
        match self.tx.try_send(publication) {
            Ok(()) => {}
            Err(TrySendError::Full(p)) => {
                log::warn!("Output channel full; dropping {}", stream_name(&p));
            }
            Err(TrySendError::Disconnected(_)) => {
                log::debug!("Output channel disconnected");
            }
        }
    }
}

fn stream_name(p: &Publication) -> &'static str {
    match p {
        Publication::ConsciousnessLevel { .. } => "consciousness_level",
        Publication::AwarenessScore { .. } => "awareness_score",
        Publication::DecisionProof { .. } => "decision_proof",
        Publication::WelfareStatus { .. } => "welfare_status",
    }
}

impl Publisher for ChannelPublisher {
    fn consciousness_level(&self, tick_index: u64, value: f64, band: Band, late: bool) {
        self.send(Publication::ConsciousnessLevel {
            tick_index,
            value,
            band,
            late,
        });
    }

    fn awareness_score(&self, composite: &CompositeScore, late: bool) {
        self.send(Publication::AwarenessScore {
            composite: composite.clone(),
            late,
        });
    }

    fn decision_proof(&self, record: &DecisionRecord) {
        self.send(Publication::DecisionProof {
            record: record.clone(),
        });
    }

    fn welfare_status(&self, status: &WelfareStatus) {
        self.send(Publication::WelfareStatus {
            status: status.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_publisher_forwards() {
        let (publisher, rx) = ChannelPublisher::unbounded();
        publisher.consciousness_level(3, 0.62, Band::C2Emerging, false);
        publisher.welfare_status(&WelfareStatus::healthy(3));
        assert_eq!(
            rx.try_recv().unwrap(),
            Publication::ConsciousnessLevel {
                tick_index: 3,
                value: 0.62,
                band: Band::C2Emerging,
                late: false
            }
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            Publication::WelfareStatus { .. }
        ));
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let (publisher, rx) = ChannelPublisher::bounded(1);
        publisher.consciousness_level(0, 0.1, Band::C0Reactive, false);
        publisher.consciousness_level(1, 0.1, Band::C0Reactive, false);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_disconnected_receiver_is_ignored() {
        let (publisher, rx) = ChannelPublisher::unbounded();
        drop(rx);
        publisher.consciousness_level(0, 0.1, Band::C0Reactive, true);
    }

    #[test]
    fn test_publication_json_tag() {
        let json = serde_json::to_string(&Publication::ConsciousnessLevel {
            tick_index: 1,
            value: 0.25,
            band: Band::C1Functional,
            late: false,
        })
        .unwrap();
        assert!(json.contains("\"stream\":\"consciousness_level\""));
        assert!(json.contains("\"value\":0.25"));
        assert!(json.contains("\"band\":\"c1_functional\""));
    }
}
