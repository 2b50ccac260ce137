//! Schema V3: acts record the binary assets their text references.

use crate::frbr::Frbr;
use crate::schema::common::{ActiveAnnouncement, Asset, Document, Purpose, WidData};
use crate::schema::v2::{LegacyAreaV2, ObjectDataV2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateV3 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActV3>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActV3 {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub legacy_areas: BTreeMap<i64, LegacyAreaV2>,
    pub documents: BTreeMap<i64, Document>,
    pub assets: BTreeMap<String, Asset>,
    pub wid_data: WidData,
    pub object_data: ObjectDataV2,
    pub act_text: String,
    pub publication_version_uuid: String,
}
