//! JSONL storage: one line per workspace or snapshot record.
//!
//! Workspace lines and snapshot lines share one file, tagged by `entry`.
//! Files are replaced atomically (tmp file, fsync, rename).

use crate::record::{SnapshotRecord, Workspace};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum LedgerEntry {
    Workspace(Workspace),
    Snapshot(SnapshotRecord),
}

/// Read ledger entries from a JSONL reader. Blank lines and `#` comments
/// are skipped.
pub fn read_entries(reader: impl BufRead) -> Result<Vec<LedgerEntry>, JsonlError> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.map_err(|e| JsonlError::Line {
            line: line_no,
            message: e.to_string(),
        })?;
        let content = line.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let entry = serde_json::from_str::<LedgerEntry>(content).map_err(|e| JsonlError::Line {
            line: line_no,
            message: format!("invalid ledger entry: {e}"),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

pub fn write_entries(writer: &mut impl Write, entries: &[LedgerEntry]) -> Result<(), JsonlError> {
    for entry in entries {
        serde_json::to_writer(&mut *writer, entry).map_err(|e| JsonlError::Encode(e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| JsonlError::Encode(e.to_string()))?;
    }
    Ok(())
}

/// Read ledger entries from a file. A missing file is an empty ledger.
pub fn read_entries_from_path(path: impl AsRef<Path>) -> Result<Vec<LedgerEntry>, JsonlError> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(JsonlError::file(path, e)),
    };
    check_ledger_bytes(path, &bytes)?;
    read_entries(bytes.as_slice())
}

/// Replace the ledger file with `entries`: write a sibling temp file, fsync
/// it, rename it over `path`, then fsync the directory.
pub fn write_entries_to_path(
    path: impl AsRef<Path>,
    entries: &[LedgerEntry],
) -> Result<(), JsonlError> {
    let path = path.as_ref();
    let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).map_err(|e| JsonlError::file(dir, e))?;
    }

    let staged = staging_path(path);
    if let Err(err) = write_staged(&staged, entries) {
        let _ = fs::remove_file(&staged);
        return Err(err);
    }
    if let Err(e) = fs::rename(&staged, path) {
        let _ = fs::remove_file(&staged);
        return Err(JsonlError::file(path, e));
    }
    if let Some(dir) = parent {
        File::open(dir)
            .and_then(|handle| handle.sync_all())
            .map_err(|e| JsonlError::file(dir, e))?;
    }
    Ok(())
}

fn write_staged(staged: &Path, entries: &[LedgerEntry]) -> Result<(), JsonlError> {
    let file = File::create(staged).map_err(|e| JsonlError::file(staged, e))?;
    let mut writer = BufWriter::new(file);
    write_entries(&mut writer, entries)?;
    writer
        .into_inner()
        .map_err(|e| JsonlError::file(staged, e.into_error()))?
        .sync_all()
        .map_err(|e| JsonlError::file(staged, e))
}

/// `<path>.tmp.<pid>.<nanos>`, next to the ledger so the rename stays on
/// one filesystem.
fn staging_path(path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let mut staged: OsString = path.as_os_str().to_owned();
    staged.push(format!(".tmp.{}.{nanos}", std::process::id()));
    PathBuf::from(staged)
}

fn check_ledger_bytes(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    let reason = if bytes.contains(&0) {
        "contains NUL bytes"
    } else if std::str::from_utf8(bytes).is_err() {
        "is not valid UTF-8"
    } else {
        return Ok(());
    };
    Err(JsonlError::Corrupt {
        path: path.display().to_string(),
        reason,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("{path}: {message}")]
    File { path: String, message: String },

    #[error("line {line}: {message}")]
    Line { line: usize, message: String },

    #[error("failed to encode ledger entry: {0}")]
    Encode(String),

    #[error("corrupted ledger {path}: file {reason}")]
    Corrupt { path: String, reason: &'static str },
}

impl JsonlError {
    fn file(path: &Path, err: std::io::Error) -> Self {
        Self::File {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) fn temp_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    let pid = std::process::id();
    std::env::temp_dir().join(format!("pubstate-ledger-{prefix}-{pid}-{nanos}.jsonl"))
}
