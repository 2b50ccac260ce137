//! Schema V2.
//!
//! Legacy areas gain a title and content hash, acts gain documents and the
//! publication version they were built from, and the id mapping becomes an
//! ad hoc object map: identification → loosely typed JSON object tagged by
//! `object_type`.

use crate::frbr::Frbr;
use crate::schema::common::{ActiveAnnouncement, Document, Purpose, WidData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateV2 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActV2>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActV2 {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub legacy_areas: BTreeMap<i64, LegacyAreaV2>,
    pub documents: BTreeMap<i64, Document>,
    pub wid_data: WidData,
    pub object_data: ObjectDataV2,
    pub act_text: String,
    pub publication_version_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyAreaV2 {
    pub uuid: String,
    pub identifier: String,
    pub object_id: i64,
    pub title: String,
    pub hash: String,
    pub owner_act: String,
    pub frbr: Frbr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectDataV2 {
    pub objects: BTreeMap<String, Value>,
    pub terminated_ids: Vec<String>,
}

/// `object_type` tags used in [`ObjectDataV2::objects`].
pub const OBJECT_ADMINISTRATIVE_AREA: &str = "administrative_area";
pub const OBJECT_AREA_BOUNDARY: &str = "area_boundary";
pub const OBJECT_AREA: &str = "area";
pub const OBJECT_AREA_GROUP: &str = "area_group";
pub const OBJECT_DIVISION_TEXT: &str = "division_text";
pub const OBJECT_TEXT_SEGMENT: &str = "text_segment";
