//! The upgrader ladder.
//!
//! Each upgrader takes a snapshot of exactly one schema version and produces
//! a snapshot of the next. Upgraders are pure: the only context they receive
//! besides the snapshot is the workspace id, which some use to derive stable
//! synthetic identifiers.
//!
//! ```text
//! V1 ──to_v2──▶ V2 ──to_v3──▶ V3 ──to_v4──▶ V4 ──to_v5──▶ V5 ──to_v6──▶ V6 ──to_v7──▶ V7
//! ```

mod to_v2;
mod to_v3;
mod to_v4;
mod to_v5;
mod to_v6;
mod to_v7;

pub use to_v2::{UpgradeToV2, synthetic_publication_version};
pub use to_v3::{UpgradeToV3, asset_uuids};
pub use to_v4::UpgradeToV4;
pub use to_v5::{INDICATIVE_IDEALIZATION, UpgradeToV5};
pub use to_v6::UpgradeToV6;
pub use to_v7::UpgradeToV7;

use crate::error::StateError;
use crate::schema::VersionedState;
use uuid::Uuid;

/// One rung of the ladder: `input_version()` → `input_version() + 1`.
pub trait StateUpgrader: Send + Sync {
    fn input_version(&self) -> u32;

    fn output_version(&self) -> u32 {
        self.input_version() + 1
    }

    /// Upgrade `state`, which must be of `input_version()`.
    fn upgrade(&self, workspace_id: &Uuid, state: VersionedState)
    -> Result<VersionedState, StateError>;
}

/// The six upgraders from V1 up to the active schema.
pub fn standard_upgraders() -> Vec<Box<dyn StateUpgrader>> {
    vec![
        Box::new(UpgradeToV2),
        Box::new(UpgradeToV3),
        Box::new(UpgradeToV4),
        Box::new(UpgradeToV5),
        Box::new(UpgradeToV6),
        Box::new(UpgradeToV7),
    ]
}

pub(crate) fn unexpected_shape(expected: u32, state: &VersionedState) -> StateError {
    StateError::UnexpectedStateShape {
        expected,
        actual: state.schema_version(),
    }
}
