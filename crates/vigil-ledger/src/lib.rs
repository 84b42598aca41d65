// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Proof Chain
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Tamper-evident decision ledger.
//!
//! Every classification-triggering decision becomes a `DecisionRecord`
//! whose hash covers its index, timestamp, payload hash and the hash of
//! the record before it.
//!
//! # Invariants
//!
//! 1. **Single writer**: `ProofChain::append` holds one mutex for the
//!    whole hash-persist-publish sequence, so indices are gap-free and
//!    no two records observe the same `prev_hash`.
//!
//! 2. **All-or-nothing**: a record becomes visible only after the sink
//!    accepted it. A failed write rolls the file back and leaves the
//!    in-memory chain untouched.
//!
//! 3. **Append-only**: there is no update or delete operation.
//!
//! 4. **Independent verification**: the JSON Lines file alone is enough
//!    to re-verify the chain (`store::verify_file`).

pub mod chain;
pub mod record;
pub mod store;

pub use chain::{verify, ProofChain, RecordSink, TamperKind, TamperReport};
pub use record::{DecisionRecord, EventKind, TriggeringEvent, GENESIS_HASH};
pub use store::{load_records, verify_file, JsonlStore};
