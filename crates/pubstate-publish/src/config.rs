//! Engine configuration, read from TOML.
//!
//! ```toml
//! draft_procedure_types = ["draft"]
//! validate_graph = true
//! scan_act_text_for_wids = true
//!
//! [ledger]
//! path = "state/ledger.jsonl"
//! ```
//!
//! Every key is optional.

use crate::error::PublishError;
use pubstate_kernel::DRAFT_PROCEDURE_TYPE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Procedure types whose acts may carry unresolved graph references.
    /// Stored snapshots are migrated with the built-in draft type only.
    pub draft_procedure_types: Vec<String>,
    pub validate_graph: bool,
    /// Keep only the declared WIDs that actually occur in the act text.
    pub scan_act_text_for_wids: bool,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draft_procedure_types: vec![DRAFT_PROCEDURE_TYPE.to_string()],
            validate_graph: true,
            scan_act_text_for_wids: true,
            ledger: LedgerConfig::default(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("state/ledger.jsonl"),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, PublishError> {
        Self::parse(text, "<inline>")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PublishError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PublishError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    fn parse(text: &str, origin: &str) -> Result<Self, PublishError> {
        toml::from_str(text).map_err(|source| PublishError::ParseToml {
            path: origin.to_string(),
            source,
        })
    }

    pub fn is_draft(&self, procedure_type: &str) -> bool {
        self.draft_procedure_types
            .iter()
            .any(|draft| draft == procedure_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty toml parses");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.draft_procedure_types, vec![DRAFT_PROCEDURE_TYPE.to_string()]);
        assert!(!config.is_draft("final"));
    }

    #[test]
    fn partial_document_keeps_remaining_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
draft_procedure_types = ["draft", "concept"]

[ledger]
path = "/var/lib/pubstate/ledger.jsonl"
"#,
        )
        .expect("valid toml");
        assert!(config.is_draft("concept"));
        assert!(config.validate_graph);
        assert_eq!(config.ledger.path, PathBuf::from("/var/lib/pubstate/ledger.jsonl"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("validate_grpah = false").expect_err("typo");
        assert!(matches!(err, PublishError::ParseToml { ref path, .. } if path == "<inline>"));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = EngineConfig::load("/nonexistent/pubstate.toml").expect_err("no such file");
        assert!(err.to_string().contains("/nonexistent/pubstate.toml"));
    }
}
