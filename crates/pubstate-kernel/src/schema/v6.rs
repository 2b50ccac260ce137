//! Schema V6: legacy areas are normalized into areas, area groups and
//! area indications.

use crate::frbr::Frbr;
use crate::graph::ProvisionGraph;
use crate::schema::common::{
    ActiveAnnouncement, AreaIndication, Asset, Document, Purpose, WidData,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marks a record synthesized during migration rather than taken from a
/// source object.
pub const STALE_OBJECT_ID: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV6 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActV6>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActV6 {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub areas: BTreeMap<String, AreaV6>,
    pub area_groups: BTreeMap<String, AreaGroupV6>,
    pub area_indications: BTreeMap<String, AreaIndication>,
    pub documents: BTreeMap<i64, Document>,
    pub assets: BTreeMap<String, Asset>,
    pub wid_data: WidData,
    pub graph: ProvisionGraph,
    pub act_text: String,
    pub publication_version_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaV6 {
    pub uuid: String,
    pub identifier: String,
    pub gml_id: String,
    pub title: String,
    pub object_id: i64,
    pub code: String,
    pub hash: String,
    pub owner_act: String,
    pub background_reference: String,
    pub background_actuality: String,
    pub frbr: Frbr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaGroupV6 {
    pub uuid: String,
    pub identifier: String,
    pub code: String,
    pub object_id: i64,
    pub title: String,
    pub area_codes: Vec<String>,
}
