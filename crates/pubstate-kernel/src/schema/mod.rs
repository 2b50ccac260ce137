//! Snapshot schemas.
//!
//! Every stored snapshot is an envelope `{schema_version, payload}`. The
//! payload shape is defined entirely by the schema version. In memory the
//! versions form a closed sum type, [`VersionedState`]; only the terminal
//! version ([`ActiveState`]) accepts actions.
//!
//! ```text
//! V1  legacy areas + object id map
//! V2  ad hoc object-map-of-maps, documents, publication version
//! V3  + binary assets
//! V4  + synthesized area locations
//! V5  object map flattened into the provision graph
//! V6  legacy areas split into areas / area groups / area indications
//! V7  areas wrapped in geometry groups (terminal)
//! ```

pub mod common;
pub mod v1;
pub mod v2;
pub mod v3;
pub mod v4;
pub mod v5;
pub mod v6;
pub mod v7;

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use v7::ActiveState;

/// Schema version of [`ActiveState`].
pub const ACTIVE_SCHEMA_VERSION: u32 = 7;

/// The persisted envelope of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub schema_version: u32,
    pub payload: Value,
}

/// A parsed snapshot of any registered schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedState {
    V1(v1::StateV1),
    V2(v2::StateV2),
    V3(v3::StateV3),
    V4(v4::StateV4),
    V5(v5::StateV5),
    V6(v6::StateV6),
    V7(v7::StateV7),
}

impl VersionedState {
    pub fn schema_version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
            Self::V3(_) => 3,
            Self::V4(_) => 4,
            Self::V5(_) => 5,
            Self::V6(_) => 6,
            Self::V7(_) => 7,
        }
    }

    /// Serialize the payload back into its envelope.
    pub fn to_stored(&self) -> Result<StoredState, StateError> {
        let payload = match self {
            Self::V1(state) => serde_json::to_value(state),
            Self::V2(state) => serde_json::to_value(state),
            Self::V3(state) => serde_json::to_value(state),
            Self::V4(state) => serde_json::to_value(state),
            Self::V5(state) => serde_json::to_value(state),
            Self::V6(state) => serde_json::to_value(state),
            Self::V7(state) => serde_json::to_value(state),
        }
        .map_err(|e| StateError::InvalidPayload {
            version: self.schema_version(),
            message: e.to_string(),
        })?;
        Ok(StoredState {
            schema_version: self.schema_version(),
            payload,
        })
    }

    /// The terminal snapshot, or `UnexpectedStateShape` for older versions.
    pub fn into_active(self) -> Result<ActiveState, StateError> {
        match self {
            Self::V7(state) => Ok(state),
            other => Err(StateError::UnexpectedStateShape {
                expected: ACTIVE_SCHEMA_VERSION,
                actual: other.schema_version(),
            }),
        }
    }
}

/// Parse a payload declared as `version` into its registered shape.
pub(crate) fn parse_payload<T, F>(version: u32, payload: Value, wrap: F) -> Result<VersionedState, StateError>
where
    T: serde::de::DeserializeOwned,
    F: FnOnce(T) -> VersionedState,
{
    serde_json::from_value(payload)
        .map(wrap)
        .map_err(|e| StateError::InvalidPayload {
            version,
            message: e.to_string(),
        })
}

pub(crate) fn parse_v1(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(1, payload, VersionedState::V1)
}

pub(crate) fn parse_v2(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(2, payload, VersionedState::V2)
}

pub(crate) fn parse_v3(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(3, payload, VersionedState::V3)
}

pub(crate) fn parse_v4(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(4, payload, VersionedState::V4)
}

pub(crate) fn parse_v5(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(5, payload, VersionedState::V5)
}

pub(crate) fn parse_v6(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(6, payload, VersionedState::V6)
}

pub(crate) fn parse_v7(payload: Value) -> Result<VersionedState, StateError> {
    parse_payload(7, payload, VersionedState::V7)
}
