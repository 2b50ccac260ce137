//! Schema V5: the object map is replaced by the typed provision graph.

use crate::frbr::Frbr;
use crate::graph::ProvisionGraph;
use crate::schema::common::{ActiveAnnouncement, Asset, Document, Purpose, WidData};
use crate::schema::v4::LegacyAreaV4;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV5 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActV5>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActV5 {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
    pub document_type: String,
    pub procedure_type: String,
    pub legacy_areas: BTreeMap<i64, LegacyAreaV4>,
    pub documents: BTreeMap<i64, Document>,
    pub assets: BTreeMap<String, Asset>,
    pub wid_data: WidData,
    pub graph: ProvisionGraph,
    pub act_text: String,
    pub publication_version_uuid: String,
}
