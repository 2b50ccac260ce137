//! Version factory and migration runner.
//!
//! The registry knows how to parse every registered schema version and
//! which upgrader lifts each non-terminal version one step. Loading a
//! stored snapshot parses it at its declared version and walks the ladder
//! until the active version is reached.

use crate::error::StateError;
use crate::ladder::{StateUpgrader, standard_upgraders};
use crate::schema::{
    ACTIVE_SCHEMA_VERSION, ActiveState, StoredState, VersionedState, parse_v1, parse_v2, parse_v3,
    parse_v4, parse_v5, parse_v6, parse_v7,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Parses a payload of one schema version.
pub type ParseFn = fn(Value) -> Result<VersionedState, StateError>;

#[derive(Deserialize)]
struct VersionHeader {
    schema_version: u32,
}

pub struct StateRegistry {
    parsers: BTreeMap<u32, ParseFn>,
    upgraders: BTreeMap<u32, Box<dyn StateUpgrader>>,
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StateRegistry {
    /// A registry with nothing registered.
    pub fn new() -> Self {
        Self {
            parsers: BTreeMap::new(),
            upgraders: BTreeMap::new(),
        }
    }

    /// Schemas V1..V7 and the upgraders between them.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let parsers: [(u32, ParseFn); 7] = [
            (1, parse_v1),
            (2, parse_v2),
            (3, parse_v3),
            (4, parse_v4),
            (5, parse_v5),
            (6, parse_v6),
            (7, parse_v7),
        ];
        for (version, parse) in parsers {
            registry.register_schema(version, parse);
        }
        for upgrader in standard_upgraders() {
            registry.register_upgrader(upgrader);
        }
        registry
    }

    pub fn register_schema(&mut self, version: u32, parse: ParseFn) {
        self.parsers.insert(version, parse);
    }

    /// Register an upgrader under its input version, replacing any previous one.
    pub fn register_upgrader(&mut self, upgrader: Box<dyn StateUpgrader>) {
        self.upgraders.insert(upgrader.input_version(), upgrader);
    }

    pub fn schema_versions(&self) -> Vec<u32> {
        self.parsers.keys().copied().collect()
    }

    /// Parse a raw `{schema_version, payload}` envelope at its declared version.
    pub fn parse(&self, raw: &Value) -> Result<VersionedState, StateError> {
        let header = VersionHeader::deserialize(raw)
            .map_err(|e| StateError::InvalidEnvelope(e.to_string()))?;
        let parse = self
            .parsers
            .get(&header.schema_version)
            .ok_or(StateError::UnknownSchemaVersion(header.schema_version))?;
        let payload = raw
            .get("payload")
            .ok_or_else(|| StateError::InvalidEnvelope("missing `payload`".to_string()))?;
        parse(payload.clone())
    }

    pub fn parse_stored(&self, stored: &StoredState) -> Result<VersionedState, StateError> {
        let parse = self
            .parsers
            .get(&stored.schema_version)
            .ok_or(StateError::UnknownSchemaVersion(stored.schema_version))?;
        parse(stored.payload.clone())
    }

    /// Upgrade `state` to the active schema.
    ///
    /// At most one step per registered upgrader is taken; a ladder that
    /// needs more has a cycle.
    pub fn migrate(
        &self,
        state: VersionedState,
        workspace_id: &Uuid,
    ) -> Result<ActiveState, StateError> {
        let steps = self.upgraders.len();
        let mut remaining = steps;
        let mut state = state;
        let from = state.schema_version();

        while state.schema_version() != ACTIVE_SCHEMA_VERSION {
            let current = state.schema_version();
            let upgrader = self
                .upgraders
                .get(&current)
                .ok_or(StateError::NoUpgraderRegistered(current))?;
            if remaining == 0 {
                return Err(StateError::MigrationNotTerminating {
                    current,
                    terminal: ACTIVE_SCHEMA_VERSION,
                    steps,
                });
            }
            remaining -= 1;
            state = upgrader.upgrade(workspace_id, state)?;
            debug!(from = current, to = state.schema_version(), "upgraded snapshot");
        }

        if from != ACTIVE_SCHEMA_VERSION {
            info!(
                workspace_id = %workspace_id,
                from,
                to = ACTIVE_SCHEMA_VERSION,
                "migrated snapshot"
            );
        }
        state.into_active()
    }

    /// Parse and migrate a raw envelope.
    pub fn load(&self, raw: &Value, workspace_id: &Uuid) -> Result<ActiveState, StateError> {
        self.migrate(self.parse(raw)?, workspace_id)
    }

    pub fn load_stored(
        &self,
        stored: &StoredState,
        workspace_id: &Uuid,
    ) -> Result<ActiveState, StateError> {
        self.migrate(self.parse_stored(stored)?, workspace_id)
    }

    /// Envelope an active state at the terminal version.
    pub fn store(&self, state: &ActiveState) -> Result<StoredState, StateError> {
        let payload = serde_json::to_value(state).map_err(|e| StateError::InvalidPayload {
            version: ACTIVE_SCHEMA_VERSION,
            message: e.to_string(),
        })?;
        Ok(StoredState {
            schema_version: ACTIVE_SCHEMA_VERSION,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn standard_registry_knows_every_version() {
        assert_eq!(StateRegistry::standard().schema_versions(), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn unknown_version_is_rejected_before_parsing_payload() {
        let raw = json!({"schema_version": 42, "payload": "not a state"});
        let err = StateRegistry::standard()
            .parse(&raw)
            .expect_err("version 42 is not registered");
        assert!(matches!(err, StateError::UnknownSchemaVersion(42)));
    }

    #[test]
    fn envelope_without_version_is_invalid() {
        let err = StateRegistry::standard()
            .parse(&json!({"payload": {}}))
            .expect_err("missing version");
        assert!(matches!(err, StateError::InvalidEnvelope(_)));
    }

    #[test]
    fn malformed_payload_names_its_version() {
        let raw = json!({"schema_version": 3, "payload": {"purposes": []}});
        let err = StateRegistry::standard()
            .parse(&raw)
            .expect_err("purposes must be a map");
        assert!(matches!(err, StateError::InvalidPayload { version: 3, .. }));
    }

    #[test]
    fn empty_terminal_state_loads_without_upgrades() {
        let registry = StateRegistry::standard();
        let stored = registry.store(&ActiveState::default()).expect("store");
        let raw = serde_json::to_value(&stored).expect("envelope serializes");
        let loaded = registry.load(&raw, &Uuid::nil()).expect("load");
        assert_eq!(loaded, ActiveState::default());
    }

    #[test]
    fn empty_v1_state_migrates_to_empty_active_state() {
        let raw = json!({
            "schema_version": 1,
            "payload": {"purposes": {}, "acts": {}, "announcements": {}},
        });
        let loaded = StateRegistry::standard()
            .load(&raw, &Uuid::nil())
            .expect("v1 migrates");
        assert_eq!(loaded, ActiveState::default());
    }
}
