// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Hash-Linked Proof Chain
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::path::Path;

use parking_lot::Mutex;
use thiserror::Error;

use vigil_types::{CompositeScore, VigilError, VigilResult};

use crate::record::{
    compute_payload_hash, compute_record_hash, DecisionRecord, TriggeringEvent, GENESIS_HASH,
};
use crate::store::{load_records, JsonlStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TamperKind {
    /// Stored index differs from the record's position.
    IndexGap,
    /// `prev_hash` does not match the previous record (or genesis).
    BrokenLink,
    /// Stored payload hash does not match the stored payload.
    PayloadHashMismatch,
    /// Stored record hash does not match the stored fields.
    RecordHashMismatch,
    /// Persisted copy disagrees with the in-memory chain.
    PersistedMismatch,
}

impl fmt::Display for TamperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TamperKind::IndexGap => "index gap",
            TamperKind::BrokenLink => "broken link",
            TamperKind::PayloadHashMismatch => "payload hash mismatch",
            TamperKind::RecordHashMismatch => "record hash mismatch",
            TamperKind::PersistedMismatch => "persisted copy mismatch",
        };
        f.write_str(s)
    }
}

/// First point at which a chain stops verifying.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("chain diverges at index {index}: {kind} (expected {expected}, found {found})")]
pub struct TamperReport {
    pub index: u64,
    pub kind: TamperKind,
    pub expected: String,
    pub found: String,
}

impl TamperReport {
    fn new(index: u64, kind: TamperKind, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Recompute every hash of `records` and check every link.
///
/// Read-only. Succeeds on the empty chain.
pub fn verify(records: &[DecisionRecord]) -> Result<(), TamperReport> {
    let mut expected_prev: &str = GENESIS_HASH;
    for (pos, rec) in records.iter().enumerate() {
        let pos = pos as u64;
        if rec.index != pos {
            return Err(TamperReport::new(
                pos,
                TamperKind::IndexGap,
                pos.to_string(),
                rec.index.to_string(),
            ));
        }
        if rec.prev_hash != expected_prev {
            return Err(TamperReport::new(
                pos,
                TamperKind::BrokenLink,
                expected_prev,
                rec.prev_hash.as_str(),
            ));
        }
        let payload_hash = compute_payload_hash(&rec.triggering_event, &rec.composite)
            .map_err(|e| {
                TamperReport::new(pos, TamperKind::PayloadHashMismatch, "serializable payload", e.to_string())
            })?;
        if payload_hash != rec.payload_hash {
            return Err(TamperReport::new(
                pos,
                TamperKind::PayloadHashMismatch,
                payload_hash,
                rec.payload_hash.as_str(),
            ));
        }
        let record_hash =
            compute_record_hash(rec.index, rec.timestamp_ms, &rec.payload_hash, &rec.prev_hash);
        if record_hash != rec.record_hash {
            return Err(TamperReport::new(
                pos,
                TamperKind::RecordHashMismatch,
                record_hash,
                rec.record_hash.as_str(),
            ));
        }
        expected_prev = rec.record_hash.as_str();
    }
    Ok(())
}

/// Durable destination for appended records.
pub trait RecordSink: Send {
    /// Persist one record; on error nothing of it may remain.
    fn persist(&mut self, record: &DecisionRecord) -> VigilResult<()>;

    fn flush(&mut self) -> VigilResult<()>;

    /// Re-read the persisted records, if the sink can.
    fn reload(&self) -> Option<VigilResult<Vec<DecisionRecord>>> {
        None
    }
}

struct ChainState {
    records: Vec<DecisionRecord>,
    sink: Option<Box<dyn RecordSink>>,
}

/// Append-only, hash-linked decision ledger.
///
/// Thread-safe: the append path is serialized by a `parking_lot::Mutex`.
pub struct ProofChain {
    state: Mutex<ChainState>,
}

impl Default for ProofChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofChain {
    /// Empty in-memory chain.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                records: Vec::new(),
                sink: None,
            }),
        }
    }

    /// Empty chain writing every record to `sink`.
    pub fn with_sink(sink: Box<dyn RecordSink>) -> Self {
        Self {
            state: Mutex::new(ChainState {
                records: Vec::new(),
                sink: Some(sink),
            }),
        }
    }

    /// Resume the file-backed chain at `path`, creating it if missing.
    ///
    /// Existing records must verify; a tampered file is refused.
    pub fn open(path: impl AsRef<Path>) -> VigilResult<Self> {
        let path = path.as_ref();
        let records = load_records(path)?;
        verify(&records).map_err(|report| {
            VigilError::Ledger(format!("refusing to resume {}: {report}", path.display()))
        })?;
        let sink = JsonlStore::open(path)?;
        log::info!(
            "Resumed proof chain at {} with {} records",
            path.display(),
            records.len()
        );
        Ok(Self {
            state: Mutex::new(ChainState {
                records,
                sink: Some(Box::new(sink)),
            }),
        })
    }

    /// Append a decision. Seal, persist, then publish, all under one lock.
    pub fn append(
        &self,
        event: TriggeringEvent,
        composite: CompositeScore,
        timestamp_ms: i64,
    ) -> VigilResult<DecisionRecord> {
        let mut state = self.state.lock();
        let index = state.records.len() as u64;
        let prev_hash = state
            .records
            .last()
            .map(|r| r.record_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());
        let record = DecisionRecord::seal(index, timestamp_ms, event, composite, &prev_hash)?;
        if let Some(sink) = state.sink.as_mut() {
            sink.persist(&record)?;
        }
        state.records.push(record.clone());
        Ok(record)
    }

    /// Verify the in-memory chain.
    pub fn verify(&self) -> Result<(), TamperReport> {
        let records = self.records();
        verify(&records)
    }

    /// Verify the in-memory chain, then check the persisted copy against it.
    pub fn audit(&self) -> VigilResult<Result<(), TamperReport>> {
        let (records, persisted) = {
            let state = self.state.lock();
            let persisted = state.sink.as_ref().and_then(|s| s.reload());
            (state.records.clone(), persisted)
        };
        if let Err(report) = verify(&records) {
            return Ok(Err(report));
        }
        let Some(persisted) = persisted else {
            return Ok(Ok(()));
        };
        let persisted = persisted?;
        if let Err(report) = verify(&persisted) {
            return Ok(Err(report));
        }
        for (pos, mem) in records.iter().enumerate() {
            let found = persisted
                .get(pos)
                .map(|r| r.record_hash.as_str())
                .unwrap_or("<missing>");
            if found != mem.record_hash {
                return Ok(Err(TamperReport::new(
                    pos as u64,
                    TamperKind::PersistedMismatch,
                    mem.record_hash.as_str(),
                    found,
                )));
            }
        }
        if persisted.len() > records.len() {
            let pos = records.len();
            return Ok(Err(TamperReport::new(
                pos as u64,
                TamperKind::PersistedMismatch,
                "<end of chain>",
                persisted[pos].record_hash.as_str(),
            )));
        }
        Ok(Ok(()))
    }

    pub fn flush(&self) -> VigilResult<()> {
        let mut state = self.state.lock();
        match state.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn last(&self) -> Option<DecisionRecord> {
        self.state.lock().records.last().cloned()
    }

    /// Hash the next record will link to.
    pub fn head_hash(&self) -> String {
        self.state
            .lock()
            .records
            .last()
            .map(|r| r.record_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string())
    }

    /// The last `k` records, oldest first.
    pub fn tail(&self, k: usize) -> Vec<DecisionRecord> {
        let state = self.state.lock();
        let start = state.records.len().saturating_sub(k);
        state.records[start..].to_vec()
    }

    pub fn records(&self) -> Vec<DecisionRecord> {
        self.state.lock().records.clone()
    }
}
