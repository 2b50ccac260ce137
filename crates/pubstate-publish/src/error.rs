//! Errors of the publish workflow.

use pubstate_kernel::{Stage, StateError};
use pubstate_ledger::{LedgerError, LedgerFileError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("publication of `{act_key}` carries no rendered act text")]
    MissingActText { act_key: String },

    #[error("asset problem in `{act_key}`: {message}")]
    InvalidAsset { act_key: String, message: String },

    #[error("snapshot ledger {lock_path} is busy with {holder}")]
    LedgerBusy { lock_path: String, holder: String },

    #[error("failed to lock snapshot ledger {lock_path}: {source}")]
    LedgerLock {
        lock_path: String,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// The state stage that raised this error. Ledger, lock and config
    /// errors happen outside the state pipeline and have none.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::State(err) => Some(err.stage()),
            Self::MissingActText { .. } | Self::InvalidAsset { .. } => Some(Stage::Mutation),
            Self::Ledger(_)
            | Self::ReadFile { .. }
            | Self::ParseToml { .. }
            | Self::LedgerBusy { .. }
            | Self::LedgerLock { .. } => None,
        }
    }
}

impl<E: Into<PublishError>> From<LedgerFileError<E>> for PublishError {
    fn from(err: LedgerFileError<E>) -> Self {
        match err {
            LedgerFileError::Busy { lock_path, holder } => Self::LedgerBusy { lock_path, holder },
            LedgerFileError::Lock { lock_path, source } => Self::LedgerLock { lock_path, source },
            LedgerFileError::Ledger(err) => Self::Ledger(err),
            LedgerFileError::Mutation(err) => err.into(),
        }
    }
}
