//! Actions: complete, immutable requests to change the active state.
//!
//! Actions are built transiently while publishing and are never persisted;
//! only their effect, folded into a new snapshot, is. No action performs a
//! partial update: every variant carries the whole record it installs.

use crate::frbr::Frbr;
use crate::graph::ProvisionGraph;
use crate::schema::common::{
    AreaIndication, Asset, Document, Purpose, PurposeType, WidData, act_key,
};
use crate::schema::v7::{AreaGroup, Gio};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    AddPurpose(AddPurpose),
    AddPublication(Box<AddPublication>),
    AddAnnouncement(AddAnnouncement),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPurpose(_) => "add_purpose",
            Self::AddPublication(_) => "add_publication",
            Self::AddAnnouncement(_) => "add_announcement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPurpose {
    pub purpose_type: PurposeType,
    /// ISO date (`YYYY-MM-DD`) the purpose takes effect, if known.
    pub effective_date: Option<String>,
    pub work_province_id: String,
    pub work_date: String,
    pub work_other: String,
}

impl AddPurpose {
    pub fn to_purpose(&self) -> Purpose {
        Purpose {
            purpose_type: self.purpose_type,
            effective_date: self.effective_date.clone(),
            work_province_id: self.work_province_id.clone(),
            work_date: self.work_date.clone(),
            work_other: self.work_other.clone(),
        }
    }
}

impl From<&Purpose> for AddPurpose {
    fn from(purpose: &Purpose) -> Self {
        Self {
            purpose_type: purpose.purpose_type,
            effective_date: purpose.effective_date.clone(),
            work_province_id: purpose.work_province_id.clone(),
            work_date: purpose.work_date.clone(),
            work_other: purpose.work_other.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPublication {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub gios: BTreeMap<String, Gio>,
    pub area_groups: BTreeMap<String, AreaGroup>,
    pub area_indications: BTreeMap<String, AreaIndication>,
    pub documents: BTreeMap<i64, Document>,
    pub assets: BTreeMap<String, Asset>,
    pub wid_data: WidData,
    pub graph: ProvisionGraph,
    pub act_text: String,
    pub publication_version_uuid: String,
}

impl AddPublication {
    pub fn key(&self) -> String {
        act_key(&self.document_type, &self.procedure_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAnnouncement {
    pub doc_frbr: Frbr,
    pub about_act_frbr: Frbr,
    pub about_bill_frbr: Frbr,
    pub document_type: String,
    pub procedure_type: String,
}
