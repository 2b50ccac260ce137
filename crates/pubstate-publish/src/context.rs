//! What the rendering stage hands over for one publication.
//!
//! On the mutation path the context is patched in place (see
//! [`ActMutation::patch`](crate::decider::ActMutation::patch)) and handed
//! back, so the rendered package reuses the identifiers already published.

use crate::resolve::SourceObject;
use chrono::NaiveDate;
use pubstate_kernel::{
    AddPurpose, Document, Frbr, Gio, GioLocation, Purpose, PurposeType, WidData, act_key, gio_key,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

fn fresh() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeInput {
    pub purpose_type: PurposeType,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
    pub work_province_id: String,
    pub work_date: String,
    pub work_other: String,
}

impl PurposeInput {
    pub fn to_purpose(&self) -> Purpose {
        Purpose {
            purpose_type: self.purpose_type,
            effective_date: self
                .effective_date
                .map(|date| date.format("%Y-%m-%d").to_string()),
            work_province_id: self.work_province_id.clone(),
            work_date: self.work_date.clone(),
            work_other: self.work_other.clone(),
        }
    }

    pub fn to_action(&self) -> AddPurpose {
        AddPurpose::from(&self.to_purpose())
    }
}

/// A geometry information object as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedGio {
    /// Codes of the areas this gio covers, in any order.
    pub source_codes: Vec<String>,
    pub title: String,
    pub frbr: Frbr,
    pub owner_act: String,
    #[serde(default)]
    pub background_reference: String,
    #[serde(default)]
    pub background_actuality: String,
    pub locations: Vec<GioLocation>,
    /// Whether this gio is published as a new expression.
    #[serde(default = "fresh")]
    pub is_new: bool,
}

impl SubmittedGio {
    pub fn source_code_set(&self) -> BTreeSet<String> {
        self.source_codes.iter().cloned().collect()
    }

    /// Content key: identical geography yields an identical key.
    pub fn key(&self) -> String {
        gio_key(&self.source_code_set())
    }

    pub fn to_gio(&self) -> Gio {
        Gio {
            source_codes: self.source_code_set(),
            title: self.title.clone(),
            frbr: self.frbr.clone(),
            owner_act: self.owner_act.clone(),
            background_reference: self.background_reference.clone(),
            background_actuality: self.background_actuality.clone(),
            locations: self.locations.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedDocument {
    #[serde(flatten)]
    pub document: Document,
    #[serde(default = "fresh")]
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAreaGroup {
    pub uuid: String,
    pub code: String,
    pub title: String,
    pub source_area_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAreaIndication {
    pub uuid: String,
    pub indication_type: String,
    pub indication_group: String,
    pub title: String,
    pub source_target_codes: Vec<String>,
    pub source_area_codes: Vec<String>,
}

/// Everything the rendering stage resolved for one act publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationBuildContext {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub purpose: PurposeInput,
    pub document_type: String,
    pub procedure_type: String,
    pub publication_version_uuid: Uuid,
    pub act_text: String,
    #[serde(default)]
    pub gios: Vec<SubmittedGio>,
    #[serde(default)]
    pub area_groups: Vec<SubmittedAreaGroup>,
    #[serde(default)]
    pub area_indications: Vec<SubmittedAreaIndication>,
    #[serde(default)]
    pub documents: Vec<SubmittedDocument>,
    /// Assets available to the package.
    #[serde(default)]
    pub asset_uuids: BTreeSet<String>,
    /// Provision objects the text references, keyed by identification.
    #[serde(default)]
    pub source_objects: BTreeMap<String, SourceObject>,
    /// WIDs the rendering stage issued or reused.
    #[serde(default)]
    pub wid_usage: WidData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<MutationContext>,
}

impl PublicationBuildContext {
    pub fn act_key(&self) -> String {
        act_key(&self.document_type, &self.procedure_type)
    }
}

/// What a mutation carries forward from the act in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationContext {
    pub consolidated_act_frbr: Frbr,
    pub consolidated_act_text: String,
    pub known_wid_map: BTreeMap<String, String>,
    pub known_wids: Vec<String>,
    /// Gios in force but absent from this submission; they must be withdrawn.
    pub removed_gios: Vec<RemovedGio>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedGio {
    pub key: String,
    pub title: String,
    pub owner_act: String,
    pub frbr: Frbr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementContext {
    pub doc_frbr: Frbr,
    pub about_act_frbr: Frbr,
    pub about_bill_frbr: Frbr,
    pub document_type: String,
    pub procedure_type: String,
}
