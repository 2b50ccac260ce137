//! Schema V1: the first persisted shape.
//!
//! Acts record their legacy areas ("werkingsgebieden") by numeric object id
//! and keep only an id mapping of the provision objects that were issued:
//! `id_mapping[category][source] = identification` and
//! `text_segment_mapping[identification] = {division, location}`.

use crate::frbr::Frbr;
use crate::schema::common::{ActiveAnnouncement, Purpose, WidData};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV1 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActV1>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActV1 {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub legacy_areas: BTreeMap<i64, LegacyAreaV1>,
    pub wid_data: WidData,
    pub object_map: ObjectMapV1,
    pub act_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAreaV1 {
    pub uuid: String,
    pub identifier: String,
    pub object_id: i64,
    pub owner_act: String,
    pub frbr: Frbr,
}

/// Categories used in [`ObjectMapV1::id_mapping`].
pub const CATEGORY_ADMINISTRATIVE_AREA: &str = "administrative_area";
pub const CATEGORY_AREA_BOUNDARY: &str = "area_boundary";
pub const CATEGORY_AREAS: &str = "areas";
pub const CATEGORY_AREA_GROUP: &str = "area_group";
pub const CATEGORY_WID: &str = "wid";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMapV1 {
    pub id_mapping: BTreeMap<String, BTreeMap<String, String>>,
    pub text_segment_mapping: BTreeMap<String, BTreeMap<String, String>>,
}

/// Legacy code of an area record, `werkingsgebied-{object_id}`.
pub fn legacy_area_code(object_id: i64) -> String {
    format!("werkingsgebied-{object_id}")
}
