// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Vigil Kernel failures.
///
/// Data degradation and scorer failures never surface here: the former
/// lowers slot confidence, the latter becomes a confidence-0 score.
#[derive(Error, Debug)]
pub enum VigilError {
    /// Invalid configuration; raised before the first tick.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input (malformed sample, mismatched source).
    #[error("validation error: {0}")]
    Validation(String),

    /// A bounded wait expired.
    #[error("timeout: {what} exceeded {waited_ms}ms")]
    Timeout { what: String, waited_ms: u64 },

    /// Proof chain could not be extended or loaded.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// Filesystem failure while persisting or loading the chain.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding failure (JSON / YAML).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// The kernel was already stopped.
    #[error("kernel shut down")]
    Shutdown,
}

impl From<serde_json::Error> for VigilError {
    fn from(e: serde_json::Error) -> Self {
        VigilError::Serialization(e.to_string())
    }
}

pub type VigilResult<T> = Result<T, VigilError>;
