//! The publish workflow.
//!
//! ```text
//! ledger ─load_active─▶ ActiveState ─decide─▶ PublicationPath
//!                                        │ ActMutation::patch(ctx)
//!                          ActStatePatcher ─▶ next ActiveState
//!                                        │ append_pending (publication packages)
//!                                  inactive SnapshotRecord, workspace locked
//! ```
//!
//! Activation happens later, through `apply_outcome`, once delivery is
//! confirmed. Any error aborts before the ledger is touched.

use crate::act_patcher::ActStatePatcher;
use crate::announcement_patcher::AnnouncementStatePatcher;
use crate::config::EngineConfig;
use crate::context::{AnnouncementContext, PublicationBuildContext};
use crate::decider::{PublicationPath, decide};
use crate::error::PublishError;
use chrono::{DateTime, Utc};
use pubstate_kernel::{ActiveState, StateError, StateRegistry};
use pubstate_ledger::{
    LedgerError, LedgerFile, Outcome, OutcomeEffect, SnapshotLedger, SnapshotRecord,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Validation packages derive a state but never record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Validation,
    Publication,
}

/// The active state of a workspace and the snapshot it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    pub snapshot_id: Uuid,
    pub state: ActiveState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Snapshot the publication was derived from; `None` for stateless
    /// workspaces.
    pub used_snapshot_id: Option<Uuid>,
    /// The pending snapshot recorded for a publication package.
    pub created_snapshot_id: Option<Uuid>,
    pub is_mutation: bool,
    pub state: Option<ActiveState>,
}

impl PublishReport {
    fn stateless() -> Self {
        Self {
            used_snapshot_id: None,
            created_snapshot_id: None,
            is_mutation: false,
            state: None,
        }
    }
}

pub struct Publisher {
    registry: StateRegistry,
    config: EngineConfig,
}

impl Publisher {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_registry(StateRegistry::standard(), config)
    }

    pub fn with_registry(registry: StateRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a workspace. A stateful one starts from an active, empty
    /// state snapshot.
    pub fn provision_workspace(
        &self,
        ledger: &mut SnapshotLedger,
        workspace_id: Uuid,
        has_state: bool,
        at: DateTime<Utc>,
    ) -> Result<(), PublishError> {
        ledger.register_workspace(workspace_id, has_state)?;
        if has_state {
            let stored = self.registry.store(&ActiveState::default())?;
            ledger.import_genesis(SnapshotRecord::genesis(workspace_id, stored, at))?;
        }
        Ok(())
    }

    /// Load and migrate the active state; `None` for a stateless workspace.
    pub fn load_active(
        &self,
        ledger: &SnapshotLedger,
        workspace_id: Uuid,
    ) -> Result<Option<LoadedState>, PublishError> {
        let workspace = ledger
            .workspace(workspace_id)
            .ok_or(LedgerError::UnknownWorkspace(workspace_id))?;
        if !workspace.has_state {
            return Ok(None);
        }
        let Some(record) = ledger.active_snapshot(workspace_id)? else {
            return Err(StateError::MissingPriorStateForStatefulWorkspace(
                workspace_id.to_string(),
            )
            .into());
        };
        let state = self.registry.load_stored(&record.state, &workspace_id)?;
        debug!(
            %workspace_id,
            snapshot_id = %record.id,
            stored_version = record.state.schema_version,
            "loaded active state"
        );
        Ok(Some(LoadedState {
            snapshot_id: record.id,
            state,
        }))
    }

    /// Decide the path, patch `ctx` on a mutation and derive the next state.
    ///
    /// Returns the next state and whether the publication is a mutation.
    pub fn prepare_act(
        &self,
        state: &ActiveState,
        ctx: &mut PublicationBuildContext,
    ) -> Result<(ActiveState, bool), PublishError> {
        let path = decide(state, &ctx.act_frbr, &ctx.document_type, &ctx.procedure_type)?;
        if let PublicationPath::Mutation(mutation) = &path {
            mutation.patch(ctx);
        }
        let next = ActStatePatcher::new(ctx, &self.config).apply(state)?;
        Ok((next, path.is_mutation()))
    }

    pub fn publish_act(
        &self,
        ledger: &mut SnapshotLedger,
        workspace_id: Uuid,
        ctx: &mut PublicationBuildContext,
        package: PackageType,
        at: DateTime<Utc>,
    ) -> Result<PublishReport, PublishError> {
        let Some(loaded) = self.load_active(ledger, workspace_id)? else {
            debug!(%workspace_id, "stateless workspace; state engine skipped");
            return Ok(PublishReport::stateless());
        };
        let (next, is_mutation) = self.prepare_act(&loaded.state, ctx)?;
        let created_snapshot_id = self.commit(ledger, workspace_id, &loaded, &next, package, at)?;
        Ok(PublishReport {
            used_snapshot_id: Some(loaded.snapshot_id),
            created_snapshot_id,
            is_mutation,
            state: Some(next),
        })
    }

    pub fn publish_announcement(
        &self,
        ledger: &mut SnapshotLedger,
        workspace_id: Uuid,
        ctx: &AnnouncementContext,
        package: PackageType,
        at: DateTime<Utc>,
    ) -> Result<PublishReport, PublishError> {
        let Some(loaded) = self.load_active(ledger, workspace_id)? else {
            return Ok(PublishReport::stateless());
        };
        let next = AnnouncementStatePatcher::new(ctx).apply(&loaded.state);
        let created_snapshot_id = self.commit(ledger, workspace_id, &loaded, &next, package, at)?;
        Ok(PublishReport {
            used_snapshot_id: Some(loaded.snapshot_id),
            created_snapshot_id,
            is_mutation: false,
            state: Some(next),
        })
    }

    /// The configured JSONL ledger.
    pub fn ledger_file(&self) -> LedgerFile {
        LedgerFile::new(self.config.ledger.path.clone())
    }

    /// [`Self::publish_act`] against the configured JSONL ledger, under its
    /// lock file.
    pub fn publish_act_jsonl(
        &self,
        workspace_id: Uuid,
        ctx: &mut PublicationBuildContext,
        package: PackageType,
        at: DateTime<Utc>,
    ) -> Result<PublishReport, PublishError> {
        Ok(self.ledger_file().mutate_workspace(workspace_id, |ledger| {
            self.publish_act(ledger, workspace_id, ctx, package, at)
        })?)
    }

    /// Record a delivery outcome in the configured JSONL ledger.
    pub fn apply_outcome_jsonl(
        &self,
        snapshot_id: Uuid,
        outcome: Outcome,
        at: DateTime<Utc>,
    ) -> Result<OutcomeEffect, PublishError> {
        Ok(self.ledger_file().record_outcome(snapshot_id, outcome, at)?)
    }

    fn commit(
        &self,
        ledger: &mut SnapshotLedger,
        workspace_id: Uuid,
        loaded: &LoadedState,
        next: &ActiveState,
        package: PackageType,
        at: DateTime<Utc>,
    ) -> Result<Option<Uuid>, PublishError> {
        if package == PackageType::Validation {
            debug!(%workspace_id, "validation package; derived state not recorded");
            return Ok(None);
        }
        let stored = self.registry.store(next)?;
        let record = SnapshotRecord::pending(workspace_id, Some(loaded.snapshot_id), stored, at);
        let snapshot_id = record.id;
        let digest = record.payload_digest();
        ledger.append_pending(record)?;
        info!(%workspace_id, %snapshot_id, %digest, "recorded pending snapshot");
        Ok(Some(snapshot_id))
    }
}
