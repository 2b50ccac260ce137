//! # pubstate-kernel
//!
//! Versioned workspace state for legal publications: which acts,
//! consolidation purposes, and announcements are currently in force.
//!
//! State is stored as an envelope `{schema_version, payload}`. Older
//! snapshots are lifted to the active schema by a ladder of pure upgraders;
//! only the active schema accepts actions, and applying an action always
//! produces a new state.
//!
//! ## Architecture
//!
//! ```text
//! StoredState            ← {schema_version, payload} as persisted
//!     │ StateRegistry::parse
//! VersionedState         ← closed sum of V1..V7
//!     │ StateUpgrader ×6 (ladder)
//! ActiveState (V7)       ← purposes, acts, announcements
//!     │ apply(Action)
//! ActiveState'           ← new value, receiver untouched
//! ```
//!
//! Acts carry a [`ProvisionGraph`]: typed legal-provision and geography
//! objects whose identifications are stable across publications of the
//! same work.

pub mod action;
pub mod error;
pub mod frbr;
pub mod graph;
pub mod hash;
pub mod ladder;
pub mod mutate;
pub mod registry;
pub mod schema;

pub use action::{Action, AddAnnouncement, AddPublication, AddPurpose};
pub use error::{Stage, StateError};
pub use frbr::{Frbr, WorkClass, WorkKey};
pub use graph::{
    AdministrativeAreaNode, AreaBoundaryNode, AreaGroupNode, AreaIndicationNode, AreaNode,
    DivisionNode, DivisionTextNode, GraphNode, IndicationRef, LocationRef, NodeKind, ObjectStatus,
    ProvisionGraph, TextRef, TextSegmentNode,
};
pub use hash::ContentHash;
pub use ladder::StateUpgrader;
pub use registry::StateRegistry;
pub use schema::common::{
    ActiveAnnouncement, AreaIndication, Asset, DRAFT_PROCEDURE_TYPE, Document, Purpose, PurposeType,
    WidData, act_key,
};
pub use schema::v7::{ActiveAct, AreaGroup, Gio, GioLocation, gio_key};
pub use schema::{ACTIVE_SCHEMA_VERSION, ActiveState, StoredState, VersionedState};
