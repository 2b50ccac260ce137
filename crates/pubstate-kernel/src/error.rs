//! Error types for snapshot migration, mutation, and publication decisions.

use serde::{Deserialize, Serialize};

/// Errors raised while loading, migrating, or mutating workspace state.
///
/// Every variant is fatal to the enclosing publish operation. Nothing is
/// retried internally and nothing is persisted once one of these is raised.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The stored snapshot declares a version with no registered schema.
    #[error("unknown schema version {0}")]
    UnknownSchemaVersion(u32),

    /// The upgrader ladder has a gap at this version.
    #[error("no upgrader registered for schema version {0}")]
    NoUpgraderRegistered(u32),

    /// The guard counter ran out before the terminal version was reached.
    #[error(
        "migration stuck at schema version {current}: terminal version {terminal} not reached within {steps} upgrade steps"
    )]
    MigrationNotTerminating {
        current: u32,
        terminal: u32,
        steps: usize,
    },

    /// An upgrader was handed a snapshot of a version it does not accept.
    #[error("unexpected state shape: expected schema version {expected}, got {actual}")]
    UnexpectedStateShape { expected: u32, actual: u32 },

    /// The mutator has no transition for this action at this version.
    #[error("action `{action}` has no transition in schema version {schema_version}")]
    UnhandledActionVariant {
        action: &'static str,
        schema_version: u32,
    },

    /// The incoming publication changes the legal work of an active act.
    #[error(
        "publication for `{act_key}` changes work-other from `{active_work_other}` to `{incoming_work_other}`; publishing a new legal work over an active act is not supported"
    )]
    UnsupportedNewWork {
        act_key: String,
        active_work_other: String,
        incoming_work_other: String,
    },

    /// A republication that does not move past the expression in force.
    #[error(
        "publication for `{act_key}` reuses expression version {incoming_version}; the act in force is at version {active_version}"
    )]
    ExpressionNotAdvanced {
        act_key: String,
        active_version: u32,
        incoming_version: u32,
    },

    /// A legal identifier that violates the Frbr invariants.
    #[error("invalid identifier in `{act_key}`: {message}")]
    InvalidIdentifier { act_key: String, message: String },

    /// The workspace is provisioned for versioned state but has none on record.
    #[error("workspace {0} carries versioned state but has no active snapshot")]
    MissingPriorStateForStatefulWorkspace(String),

    /// The payload does not parse as the schema it declares.
    #[error("invalid payload for schema version {version}: {message}")]
    InvalidPayload { version: u32, message: String },

    /// The stored blob is not a `{schema_version, payload}` envelope.
    #[error("invalid snapshot envelope: {0}")]
    InvalidEnvelope(String),

    /// Legacy data an upgrader cannot convert.
    #[error("upgrade to schema version {target} failed: {reason}")]
    UpgradeFailed { target: u32, reason: String },

    /// A provision graph reference that cannot be consumed.
    #[error("invalid reference in act `{act_key}`: {message}")]
    InvalidReference { act_key: String, message: String },
}

/// The stage of the publish operation an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Migration,
    Mutation,
    Decision,
    Provisioning,
}

impl StateError {
    /// Which stage raised this error, for operator triage.
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnknownSchemaVersion(_)
            | Self::NoUpgraderRegistered(_)
            | Self::MigrationNotTerminating { .. }
            | Self::UnexpectedStateShape { .. }
            | Self::InvalidPayload { .. }
            | Self::InvalidEnvelope(_)
            | Self::UpgradeFailed { .. } => Stage::Migration,
            Self::UnhandledActionVariant { .. } | Self::InvalidReference { .. } => {
                Stage::Mutation
            }
            Self::UnsupportedNewWork { .. }
            | Self::ExpressionNotAdvanced { .. }
            | Self::InvalidIdentifier { .. } => Stage::Decision,
            Self::MissingPriorStateForStatefulWorkspace(_) => Stage::Provisioning,
        }
    }
}
