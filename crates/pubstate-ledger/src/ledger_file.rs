//! The JSONL ledger file shared by concurrent publishers.
//!
//! Every mutation holds a sibling `.lock` file naming what it is changing.
//! Inside the lock the ledger is reloaded from disk, the mutation runs
//! against one workspace, and the file is rewritten only when that
//! workspace's record or snapshot chain changed.

use crate::ledger::{LedgerError, SnapshotLedger};
use crate::record::{Outcome, OutcomeEffect, Workspace};
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerFileError<E> {
    #[error("snapshot ledger {lock_path} is busy with {holder}")]
    Busy { lock_path: String, holder: String },

    #[error("failed to lock snapshot ledger {lock_path}: {source}")]
    Lock {
        lock_path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(LedgerError),

    #[error(transparent)]
    Mutation(E),
}

impl<E> From<LedgerError> for LedgerFileError<E> {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

/// A snapshot ledger persisted as JSONL at a fixed path.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<ledger>.lock`, next to the ledger file.
    pub fn lock_path(&self) -> PathBuf {
        let mut path: OsString = self.path.as_os_str().to_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Read the ledger without taking the lock.
    pub fn load(&self) -> Result<SnapshotLedger, LedgerError> {
        SnapshotLedger::load_jsonl(&self.path)
    }

    /// Run `mutate` for one registered workspace under the ledger lock.
    ///
    /// An unknown workspace fails before `mutate` runs. A failed mutation
    /// leaves the file as it was.
    pub fn mutate_workspace<T, E, F>(
        &self,
        workspace_id: Uuid,
        mutate: F,
    ) -> Result<T, LedgerFileError<E>>
    where
        F: FnOnce(&mut SnapshotLedger) -> Result<T, E>,
    {
        let _lock = LedgerLock::acquire::<E>(self.lock_path(), &format!("workspace {workspace_id}"))?;
        let mut ledger = self.load()?;
        self.mutate_locked(&mut ledger, workspace_id, mutate)
    }

    /// Record a delivery outcome under the lock of the snapshot's workspace.
    pub fn record_outcome(
        &self,
        snapshot_id: Uuid,
        outcome: Outcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeEffect, LedgerFileError<LedgerError>> {
        let _lock =
            LedgerLock::acquire::<LedgerError>(self.lock_path(), &format!("snapshot {snapshot_id}"))?;
        let mut ledger = self.load()?;
        let workspace_id = ledger
            .snapshot(snapshot_id)
            .map(|record| record.workspace_id)
            .ok_or(LedgerError::UnknownSnapshot(snapshot_id))?;
        self.mutate_locked(&mut ledger, workspace_id, |ledger| {
            ledger.apply_outcome(snapshot_id, outcome, at)
        })
    }

    fn mutate_locked<T, E, F>(
        &self,
        ledger: &mut SnapshotLedger,
        workspace_id: Uuid,
        mutate: F,
    ) -> Result<T, LedgerFileError<E>>
    where
        F: FnOnce(&mut SnapshotLedger) -> Result<T, E>,
    {
        let before =
            ChainMark::of(ledger, workspace_id).ok_or(LedgerError::UnknownWorkspace(workspace_id))?;
        let value = mutate(ledger).map_err(LedgerFileError::Mutation)?;
        if ChainMark::of(ledger, workspace_id).as_ref() != Some(&before) {
            ledger.save_jsonl(&self.path)?;
            debug!(%workspace_id, path = %self.path.display(), "rewrote snapshot ledger");
        }
        Ok(value)
    }
}

/// What a mutation can change about one workspace: its record, and the
/// ids and outcomes of its snapshots.
#[derive(Debug, PartialEq)]
struct ChainMark {
    workspace: Workspace,
    snapshots: Vec<(Uuid, Option<Outcome>)>,
}

impl ChainMark {
    fn of(ledger: &SnapshotLedger, workspace_id: Uuid) -> Option<Self> {
        let workspace = ledger.workspace(workspace_id)?.clone();
        let snapshots = ledger
            .snapshots_of(workspace_id)
            .into_iter()
            .map(|record| (record.id, record.outcome()))
            .collect();
        Some(Self {
            workspace,
            snapshots,
        })
    }
}

/// Exclusive hold on the ledger, released when dropped.
struct LedgerLock {
    path: PathBuf,
    _file: File,
}

impl LedgerLock {
    fn acquire<E>(path: PathBuf, holder: &str) -> Result<Self, LedgerFileError<E>> {
        let lock_error = |source: std::io::Error| LedgerFileError::<E>::Lock {
            lock_path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(lock_error)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LedgerFileError::Busy {
                    lock_path: path.display().to_string(),
                    holder: current_holder(&path),
                });
            }
            Err(e) => return Err(lock_error(e)),
        };
        writeln!(
            file,
            "holder={holder}\npid={}\nutc={}",
            std::process::id(),
            Utc::now().to_rfc3339()
        )
        .map_err(lock_error)?;
        Ok(Self { path, _file: file })
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn current_holder(lock_path: &Path) -> String {
    fs::read_to_string(lock_path)
        .ok()
        .and_then(|text| {
            text.lines()
                .find_map(|line| line.strip_prefix("holder=").map(str::to_string))
        })
        .unwrap_or_else(|| "an unknown holder".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonl::temp_path;
    use crate::record::SnapshotRecord;
    use pubstate_kernel::StoredState;
    use serde_json::json;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc)
            + chrono::Duration::minutes(minutes)
    }

    fn stored(step: u32) -> StoredState {
        StoredState {
            schema_version: 7,
            payload: json!({"step": step}),
        }
    }

    /// A ledger file holding one stateful workspace with an active genesis.
    fn seeded(prefix: &str) -> (LedgerFile, Uuid, Uuid) {
        let file = LedgerFile::new(temp_path(prefix));
        let workspace_id = Uuid::new_v4();
        let mut ledger = SnapshotLedger::default();
        ledger.register_workspace(workspace_id, true).expect("register");
        let genesis = SnapshotRecord::genesis(workspace_id, stored(0), at(0));
        let genesis_id = genesis.id;
        ledger.import_genesis(genesis).expect("genesis");
        ledger.save_jsonl(file.path()).expect("seed");
        (file, workspace_id, genesis_id)
    }

    fn modified(file: &LedgerFile) -> std::time::SystemTime {
        fs::metadata(file.path())
            .and_then(|meta| meta.modified())
            .expect("ledger file metadata")
    }

    #[test]
    fn pending_append_is_persisted_and_the_lock_released() {
        let (file, workspace_id, genesis_id) = seeded("file-append");

        let pending = SnapshotRecord::pending(workspace_id, Some(genesis_id), stored(1), at(1));
        let pending_id = pending.id;
        file.mutate_workspace(workspace_id, |ledger| ledger.append_pending(pending))
            .expect("append");

        assert!(!file.lock_path().exists());
        let reloaded = file.load().expect("reload");
        let workspace = reloaded.workspace(workspace_id).expect("workspace");
        assert!(workspace.is_locked);
        assert_eq!(workspace.pending_snapshot_id, Some(pending_id));

        let _ = fs::remove_file(file.path());
    }

    #[test]
    fn unknown_workspace_fails_before_the_mutation_runs() {
        let (file, _, _) = seeded("file-unknown");
        let stranger = Uuid::new_v4();

        let mut ran = false;
        let result = file.mutate_workspace(stranger, |_| {
            ran = true;
            Ok::<_, LedgerError>(())
        });
        assert!(matches!(
            result,
            Err(LedgerFileError::Ledger(LedgerError::UnknownWorkspace(id))) if id == stranger
        ));
        assert!(!ran);
        assert!(!file.lock_path().exists());

        let _ = fs::remove_file(file.path());
    }

    #[test]
    fn rejected_mutation_leaves_the_file_untouched() {
        let (file, workspace_id, _) = seeded("file-reject");
        let before = fs::read(file.path()).expect("read");

        let stale = SnapshotRecord::pending(workspace_id, Some(Uuid::new_v4()), stored(1), at(1));
        let result = file.mutate_workspace(workspace_id, |ledger| ledger.append_pending(stale));
        assert!(matches!(
            result,
            Err(LedgerFileError::Mutation(LedgerError::StalePredecessor { .. }))
        ));
        assert_eq!(fs::read(file.path()).expect("read"), before);

        let _ = fs::remove_file(file.path());
    }

    #[test]
    fn repeated_outcome_does_not_rewrite_the_ledger() {
        let (file, workspace_id, genesis_id) = seeded("file-outcome");
        let pending = SnapshotRecord::pending(workspace_id, Some(genesis_id), stored(1), at(1));
        let pending_id = pending.id;
        file.mutate_workspace(workspace_id, |ledger| ledger.append_pending(pending))
            .expect("append");

        assert_eq!(
            file.record_outcome(pending_id, Outcome::Delivered, at(2))
                .expect("deliver"),
            OutcomeEffect::Activated
        );
        let written = modified(&file);
        let contents = fs::read(file.path()).expect("read");

        assert_eq!(
            file.record_outcome(pending_id, Outcome::Delivered, at(3))
                .expect("redeliver"),
            OutcomeEffect::AlreadyActive
        );
        assert_eq!(modified(&file), written);
        assert_eq!(fs::read(file.path()).expect("read"), contents);
        let reloaded = file.load().expect("reload");
        assert_eq!(
            reloaded
                .active_snapshot(workspace_id)
                .expect("workspace")
                .map(|record| record.id),
            Some(pending_id)
        );

        let _ = fs::remove_file(file.path());
    }

    #[test]
    fn outcome_for_an_unknown_snapshot_is_reported() {
        let (file, _, _) = seeded("file-outcome-unknown");
        let missing = Uuid::new_v4();
        let result = file.record_outcome(missing, Outcome::Failed, at(1));
        assert!(matches!(
            result,
            Err(LedgerFileError::Ledger(LedgerError::UnknownSnapshot(id))) if id == missing
        ));

        let _ = fs::remove_file(file.path());
    }

    #[test]
    fn held_lock_names_its_holder() {
        let (file, workspace_id, _) = seeded("file-busy");
        fs::write(file.lock_path(), format!("holder=workspace {workspace_id}\npid=0\n"))
            .expect("lock fixture");

        let result = file.mutate_workspace(workspace_id, |_| Ok::<_, LedgerError>(()));
        match result {
            Err(LedgerFileError::Busy { holder, .. }) => {
                assert_eq!(holder, format!("workspace {workspace_id}"));
            }
            other => panic!("expected a busy ledger, got {other:?}"),
        }
        assert!(file.lock_path().exists(), "a foreign lock is never removed");

        let _ = fs::remove_file(file.lock_path());
        let _ = fs::remove_file(file.path());
    }
}
