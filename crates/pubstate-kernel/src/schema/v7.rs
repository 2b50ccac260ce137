//! Schema V7, the terminal (active) schema.
//!
//! Areas are wrapped in geometry information objects (`Gio`). A gio is
//! identified by the set of area codes it covers, so the same geography
//! always lands under the same key.

use crate::frbr::Frbr;
use crate::graph::ProvisionGraph;
use crate::schema::common::{
    ActiveAnnouncement, AreaIndication, Asset, Document, Purpose, WidData, act_key,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type ActiveState = StateV7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateV7 {
    pub purposes: BTreeMap<String, Purpose>,
    pub acts: BTreeMap<String, ActiveAct>,
    pub announcements: BTreeMap<String, ActiveAnnouncement>,
}

impl StateV7 {
    pub fn act(&self, document_type: &str, procedure_type: &str) -> Option<&ActiveAct> {
        self.acts.get(&act_key(document_type, procedure_type))
    }

    pub fn announcement(
        &self,
        document_type: &str,
        procedure_type: &str,
    ) -> Option<&ActiveAnnouncement> {
        self.announcements
            .get(&act_key(document_type, procedure_type))
    }

    pub fn purpose(&self, work_key: &str) -> Option<&Purpose> {
        self.purposes.get(work_key)
    }
}

/// A consolidated act as currently in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAct {
    pub act_frbr: Frbr,
    pub bill_frbr: Frbr,
    pub consolidation_purpose: Purpose,
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

impl ActiveAct {
    pub fn key(&self) -> String {
        act_key(&self.document_type, &self.procedure_type)
    }
}

/// Geometry information object: one published geometry work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gio {
    /// Area codes covered by this gio, e.g. `{"gebied-1"}`.
    pub source_codes: BTreeSet<String>,
    pub title: String,
    pub frbr: Frbr,
    pub owner_act: String,
    pub background_reference: String,
    pub background_actuality: String,
    pub locations: Vec<GioLocation>,
}

impl Gio {
    /// Natural key: the sorted source codes joined with `_`.
    pub fn key(&self) -> String {
        gio_key(&self.source_codes)
    }
}

pub fn gio_key(source_codes: &BTreeSet<String>) -> String {
    source_codes
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GioLocation {
    pub title: String,
    /// Geometry identifier, shared with the provision graph.
    pub basisgeo_id: String,
    /// Hash of the geometry, so the geometry itself need not be stored.
    pub source_hash: String,
    pub source_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaGroup {
    pub uuid: String,
    pub code: String,
    pub title: String,
    pub source_area_codes: BTreeSet<String>,
    pub gio_keys: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gio_key_is_order_independent() {
        let codes: BTreeSet<String> = ["gebied-2", "gebied-1"].iter().map(|c| c.to_string()).collect();
        assert_eq!(gio_key(&codes), "gebied-1_gebied-2");
    }
}
