//! Schema V4: legacy areas carry explicit locations.

use crate::frbr::Frbr;
use crate::schema::common::{ActiveAnnouncement, Asset, Document, Purpose, WidData};
use crate::schema::v2::ObjectDataV2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateV4 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActV4>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActV4 {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub legacy_areas: BTreeMap<i64, LegacyAreaV4>,
    pub documents: BTreeMap<i64, Document>,
    pub assets: BTreeMap<String, Asset>,
    pub wid_data: WidData,
    pub object_data: ObjectDataV2,
    pub act_text: String,
    pub publication_version_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAreaV4 {
    pub uuid: String,
    pub identifier: String,
    pub object_id: i64,
    pub title: String,
    pub hash: String,
    pub owner_act: String,
    pub frbr: Frbr,
    pub locations: Vec<LocationV4>,
}

/// One geometry of a legacy area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationV4 {
    pub uuid: String,
    /// Geometry identifier, also used by the provision graph.
    pub identifier: String,
    pub gml_id: String,
    pub group_id: String,
    pub title: String,
}
