//! Persisted ledger records: workspaces and the snapshots they chain.

use chrono::{DateTime, Utc};
use pubstate_kernel::{ContentHash, StoredState};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A publication environment with its own snapshot chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    /// Whether the workspace keeps versioned state at all.
    pub has_state: bool,
    pub active_snapshot_id: Option<Uuid>,
    /// Set while a snapshot awaits its delivery outcome.
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_snapshot_id: Option<Uuid>,
}

impl Workspace {
    pub fn new(id: Uuid, has_state: bool) -> Self {
        Self {
            id,
            has_state,
            active_snapshot_id: None,
            is_locked: false,
            pending_snapshot_id: None,
        }
    }
}

/// One state snapshot in a workspace chain.
///
/// Records are append-only. The only change a record ever sees is its
/// delivery outcome: activation once its publication is confirmed
/// delivered, or a failure mark that keeps it inactive for good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub predecessor_id: Option<Uuid>,
    pub state: StoredState,
    pub is_activated: bool,
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// A fresh, inactive snapshot following `predecessor_id`.
    pub fn pending(
        workspace_id: Uuid,
        predecessor_id: Option<Uuid>,
        state: StoredState,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            predecessor_id,
            state,
            is_activated: false,
            activated_at: None,
            failed_at: None,
            created_at,
        }
    }

    /// An already active first snapshot, e.g. when importing legacy state.
    pub fn genesis(workspace_id: Uuid, state: StoredState, at: DateTime<Utc>) -> Self {
        Self {
            is_activated: true,
            activated_at: Some(at),
            ..Self::pending(workspace_id, None, state, at)
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if self.is_activated {
            Some(Outcome::Delivered)
        } else if self.failed_at.is_some() {
            Some(Outcome::Failed)
        } else {
            None
        }
    }

    /// sha256 over the canonical JSON of the stored state.
    pub fn payload_digest(&self) -> String {
        let bytes = serde_json::to_vec(&self.state).expect("stored state must serialize");
        ContentHash::of_bytes(&bytes).to_string()
    }
}

/// What the delivery stage reports about a pending snapshot's publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Delivered,
    Failed,
}

/// What applying an outcome did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeEffect {
    /// The snapshot became the workspace's active snapshot.
    Activated,
    /// The snapshot was already active; nothing changed.
    AlreadyActive,
    /// The workspace lock held for the snapshot was released.
    Released,
    /// The snapshot held no lock; nothing changed.
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(payload: serde_json::Value) -> StoredState {
        StoredState {
            schema_version: 7,
            payload,
        }
    }

    #[test]
    fn digest_depends_only_on_state() {
        let workspace = Uuid::new_v4();
        let at = Utc::now();
        let first = SnapshotRecord::pending(workspace, None, stored(json!({"acts": {}})), at);
        let second = SnapshotRecord::pending(workspace, Some(first.id), stored(json!({"acts": {}})), at);
        let other = SnapshotRecord::pending(workspace, None, stored(json!({"acts": {"x": 1}})), at);

        assert_ne!(first.id, second.id);
        assert_eq!(first.payload_digest(), second.payload_digest());
        assert_ne!(first.payload_digest(), other.payload_digest());
        assert_eq!(first.payload_digest().len(), 64);
    }

    #[test]
    fn genesis_is_active_without_predecessor() {
        let record = SnapshotRecord::genesis(Uuid::new_v4(), stored(json!({})), Utc::now());
        assert!(record.is_activated);
        assert!(record.activated_at.is_some());
        assert!(record.predecessor_id.is_none());
    }
}
