// ─────────────────────────────────────────────────────────────────────
// Vigil Kernel — JSON Lines Record Store
// ─────────────────────────────────────────────────────────────────────
//! One `DecisionRecord` per line, fsynced per append.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use vigil_types::{VigilError, VigilResult};

use crate::chain::{verify, RecordSink};
use crate::record::DecisionRecord;

pub struct JsonlStore {
    path: PathBuf,
    file: File,
}

impl JsonlStore {
    /// Open `path` for appending, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> VigilResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line)?;
        self.file.sync_data()
    }
}

impl RecordSink for JsonlStore {
    fn persist(&mut self, record: &DecisionRecord) -> VigilResult<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let before = self.file.metadata()?.len();
        if let Err(e) = self.write_line(&line) {
            log::error!(
                "Proof chain write failed at index {} ({}): {e}",
                record.index,
                self.path.display()
            );
            if let Err(rollback) = self.file.set_len(before) {
                log::error!("Rollback of {} failed: {rollback}", self.path.display());
            }
            return Err(VigilError::Ledger(format!(
                "failed to persist record {}: {e}",
                record.index
            )));
        }
        Ok(())
    }

    fn flush(&mut self) -> VigilResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    fn reload(&self) -> Option<VigilResult<Vec<DecisionRecord>>> {
        Some(load_records(&self.path))
    }
}

/// Read every record from a JSON Lines file. A missing file is an empty
/// chain; a truncated or unparsable line is an error.
pub fn load_records(path: impl AsRef<Path>) -> VigilResult<Vec<DecisionRecord>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DecisionRecord = serde_json::from_str(&line).map_err(|e| {
            VigilError::Ledger(format!(
                "{}:{}: unreadable record: {e}",
                path.display(),
                lineno + 1
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Verify a persisted chain without a running kernel. Returns the
/// number of verified records.
pub fn verify_file(path: impl AsRef<Path>) -> VigilResult<usize> {
    let path = path.as_ref();
    let records = load_records(path)?;
    verify(&records)
        .map_err(|report| VigilError::Ledger(format!("{}: {report}", path.display())))?;
    Ok(records.len())
}
