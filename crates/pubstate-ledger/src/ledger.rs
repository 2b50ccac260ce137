//! In-memory snapshot ledger.
//!
//! Holds every workspace and every snapshot record. The ledger enforces the
//! single-writer discipline of a workspace chain:
//! - a new snapshot must follow the workspace's current active snapshot
//! - a workspace accepts one pending snapshot at a time
//! - only a delivered publication activates its snapshot

use crate::jsonl::{JsonlError, LedgerEntry, read_entries_from_path, write_entries_to_path};
use crate::record::{Outcome, OutcomeEffect, SnapshotRecord, Workspace};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("workspace not found: {0}")]
    UnknownWorkspace(Uuid),

    #[error("workspace already registered: {0}")]
    WorkspaceExists(Uuid),

    #[error("snapshot not found: {0}")]
    UnknownSnapshot(Uuid),

    #[error("snapshot already recorded: {0}")]
    DuplicateSnapshot(Uuid),

    #[error(
        "stale predecessor for workspace {workspace_id}: snapshot follows {claimed:?}, active is {active:?}"
    )]
    StalePredecessor {
        workspace_id: Uuid,
        claimed: Option<Uuid>,
        active: Option<Uuid>,
    },

    #[error("workspace {workspace_id} is locked by pending snapshot {pending:?}")]
    WorkspaceLocked {
        workspace_id: Uuid,
        pending: Option<Uuid>,
    },

    #[error("snapshot {snapshot_id} was already reported {recorded:?}; {reported:?} rejected")]
    OutcomeConflict {
        snapshot_id: Uuid,
        recorded: Outcome,
        reported: Outcome,
    },

    #[error("snapshot {0} does not hold its workspace lock and cannot be activated")]
    NotPending(Uuid),

    #[error("snapshot {0} must be appended inactive")]
    AppendedActive(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotLedger {
    workspaces: BTreeMap<Uuid, Workspace>,
    snapshots: BTreeMap<Uuid, SnapshotRecord>,
}

impl SnapshotLedger {
    /// Build a ledger from persisted entries.
    ///
    /// Duplicate ids resolve last-write-wins, matching append-only JSONL.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        let mut ledger = Self::default();
        for entry in entries {
            match entry {
                LedgerEntry::Workspace(workspace) => {
                    ledger.workspaces.insert(workspace.id, workspace);
                }
                LedgerEntry::Snapshot(record) => {
                    ledger.snapshots.insert(record.id, record);
                }
            }
        }
        ledger
    }

    /// Every entry, workspaces first, each group in id order.
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.workspaces
            .values()
            .cloned()
            .map(LedgerEntry::Workspace)
            .chain(self.snapshots.values().cloned().map(LedgerEntry::Snapshot))
            .collect()
    }

    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Ok(Self::from_entries(read_entries_from_path(path)?))
    }

    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), LedgerError> {
        write_entries_to_path(path, &self.entries())?;
        Ok(())
    }

    pub fn workspace(&self, id: Uuid) -> Option<&Workspace> {
        self.workspaces.get(&id)
    }

    pub fn snapshot(&self, id: Uuid) -> Option<&SnapshotRecord> {
        self.snapshots.get(&id)
    }

    pub fn register_workspace(&mut self, id: Uuid, has_state: bool) -> Result<&Workspace, LedgerError> {
        if self.workspaces.contains_key(&id) {
            return Err(LedgerError::WorkspaceExists(id));
        }
        debug!(workspace_id = %id, has_state, "registered workspace");
        Ok(self.workspaces.entry(id).or_insert(Workspace::new(id, has_state)))
    }

    /// Record an already active first snapshot for a workspace without one.
    pub fn import_genesis(&mut self, record: SnapshotRecord) -> Result<(), LedgerError> {
        let workspace = self
            .workspaces
            .get_mut(&record.workspace_id)
            .ok_or(LedgerError::UnknownWorkspace(record.workspace_id))?;
        if workspace.active_snapshot_id.is_some() || record.predecessor_id.is_some() {
            return Err(LedgerError::StalePredecessor {
                workspace_id: workspace.id,
                claimed: record.predecessor_id,
                active: workspace.active_snapshot_id,
            });
        }
        if self.snapshots.contains_key(&record.id) {
            return Err(LedgerError::DuplicateSnapshot(record.id));
        }
        workspace.active_snapshot_id = Some(record.id);
        workspace.has_state = true;
        let mut record = record;
        if !record.is_activated {
            record.is_activated = true;
            record.activated_at = Some(record.created_at);
        }
        self.snapshots.insert(record.id, record);
        Ok(())
    }

    /// The workspace's active snapshot, if it has one.
    pub fn active_snapshot(&self, workspace_id: Uuid) -> Result<Option<&SnapshotRecord>, LedgerError> {
        let workspace = self
            .workspace(workspace_id)
            .ok_or(LedgerError::UnknownWorkspace(workspace_id))?;
        Ok(workspace
            .active_snapshot_id
            .and_then(|id| self.snapshots.get(&id)))
    }

    /// Record an inactive snapshot and lock its workspace.
    pub fn append_pending(&mut self, record: SnapshotRecord) -> Result<(), LedgerError> {
        let workspace = self
            .workspaces
            .get_mut(&record.workspace_id)
            .ok_or(LedgerError::UnknownWorkspace(record.workspace_id))?;
        if record.is_activated {
            return Err(LedgerError::AppendedActive(record.id));
        }
        if workspace.is_locked {
            return Err(LedgerError::WorkspaceLocked {
                workspace_id: workspace.id,
                pending: workspace.pending_snapshot_id,
            });
        }
        if record.predecessor_id != workspace.active_snapshot_id {
            return Err(LedgerError::StalePredecessor {
                workspace_id: workspace.id,
                claimed: record.predecessor_id,
                active: workspace.active_snapshot_id,
            });
        }
        if self.snapshots.contains_key(&record.id) {
            return Err(LedgerError::DuplicateSnapshot(record.id));
        }

        workspace.is_locked = true;
        workspace.pending_snapshot_id = Some(record.id);
        info!(
            workspace_id = %record.workspace_id,
            snapshot_id = %record.id,
            schema_version = record.state.schema_version,
            "appended pending snapshot"
        );
        self.snapshots.insert(record.id, record);
        Ok(())
    }

    /// Apply the delivery outcome of a pending snapshot.
    ///
    /// Repeating an outcome is a no-op; contradicting one is an
    /// `OutcomeConflict`. Only the snapshot holding its workspace lock can
    /// be delivered, so a failed snapshot never activates.
    pub fn apply_outcome(
        &mut self,
        snapshot_id: Uuid,
        outcome: Outcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeEffect, LedgerError> {
        let record = self
            .snapshots
            .get_mut(&snapshot_id)
            .ok_or(LedgerError::UnknownSnapshot(snapshot_id))?;
        let workspace = self
            .workspaces
            .get_mut(&record.workspace_id)
            .ok_or(LedgerError::UnknownWorkspace(record.workspace_id))?;

        if let Some(recorded) = record.outcome() {
            if recorded == outcome {
                return Ok(match outcome {
                    Outcome::Delivered => OutcomeEffect::AlreadyActive,
                    Outcome::Failed => OutcomeEffect::Unchanged,
                });
            }
            return Err(LedgerError::OutcomeConflict {
                snapshot_id,
                recorded,
                reported: outcome,
            });
        }
        let holds_lock = workspace.pending_snapshot_id == Some(snapshot_id);

        match outcome {
            Outcome::Delivered => {
                if !holds_lock {
                    return Err(LedgerError::NotPending(snapshot_id));
                }
                if record.predecessor_id != workspace.active_snapshot_id {
                    return Err(LedgerError::StalePredecessor {
                        workspace_id: workspace.id,
                        claimed: record.predecessor_id,
                        active: workspace.active_snapshot_id,
                    });
                }
                record.is_activated = true;
                record.activated_at = Some(at);
                workspace.active_snapshot_id = Some(snapshot_id);
                workspace.has_state = true;
                workspace.is_locked = false;
                workspace.pending_snapshot_id = None;
                info!(workspace_id = %workspace.id, %snapshot_id, "activated snapshot");
                Ok(OutcomeEffect::Activated)
            }
            Outcome::Failed => {
                if !holds_lock {
                    return Ok(OutcomeEffect::Unchanged);
                }
                record.failed_at = Some(at);
                workspace.is_locked = false;
                workspace.pending_snapshot_id = None;
                warn!(workspace_id = %workspace.id, %snapshot_id, "publication failed; snapshot stays inactive");
                Ok(OutcomeEffect::Released)
            }
        }
    }

    /// The active chain of a workspace, newest first.
    pub fn history(&self, workspace_id: Uuid) -> Result<Vec<&SnapshotRecord>, LedgerError> {
        let mut chain = Vec::new();
        let mut cursor = self.active_snapshot(workspace_id)?;
        while let Some(record) = cursor {
            chain.push(record);
            cursor = record.predecessor_id.and_then(|id| self.snapshots.get(&id));
        }
        Ok(chain)
    }

    /// Every snapshot of a workspace, active or not, oldest first.
    pub fn snapshots_of(&self, workspace_id: Uuid) -> Vec<&SnapshotRecord> {
        let mut records: Vec<&SnapshotRecord> = self
            .snapshots
            .values()
            .filter(|record| record.workspace_id == workspace_id)
            .collect();
        records.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then(left.id.cmp(&right.id))
        });
        records
    }
}
