//! Records whose shape is shared by every schema version.

use crate::frbr::Frbr;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Procedure type of draft acts in stored snapshots.
///
/// Migration recognises only this literal; publishing may configure more
/// draft types on top of it.
pub const DRAFT_PROCEDURE_TYPE: &str = "draft";

/// Map key of acts and announcements: `"{document_type}-{procedure_type}"`.
pub fn act_key(document_type: &str, procedure_type: &str) -> String {
    format!("{document_type}-{procedure_type}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurposeType {
    Consolidation,
    Withdrawal,
}

impl PurposeType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consolidation => "consolidation",
            Self::Withdrawal => "withdrawal",
        }
    }
}

/// A consolidation or withdrawal intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purpose {
    pub purpose_type: PurposeType,
    pub effective_date: Option<String>,
    pub work_province_id: String,
    pub work_date: String,
    pub work_other: String,
}

impl Purpose {
    /// Work key of the purpose, e.g. `/join/id/proces/pv28/2024/w1`.
    pub fn work_key(&self) -> String {
        format!(
            "/join/id/proces/{}/{}/{}",
            self.work_province_id, self.work_date, self.work_other
        )
    }
}

/// A document (attachment) published with an act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub uuid: String,
    pub code: String,
    pub frbr: Frbr,
    pub filename: String,
    pub title: String,
    pub owner_act: String,
    pub content_type: String,
    pub object_id: i64,
    pub hash: String,
}

/// A binary asset (illustration) referenced by the act text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub uuid: String,
}

/// WID cross-references used by the rendered text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidData {
    /// Source object code → WID.
    pub known_wid_map: BTreeMap<String, String>,
    pub known_wids: Vec<String>,
}

impl WidData {
    /// The source code a WID was issued for, if any.
    pub fn code_for_wid(&self, wid: &str) -> Option<&str> {
        self.known_wid_map
            .iter()
            .find(|(_, known)| known.as_str() == wid)
            .map(|(code, _)| code.as_str())
    }
}

/// An area indication ("gebiedsaanwijzing"): a typed designation over areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaIndication {
    pub uuid: String,
    pub indication_type: String,
    pub indication_group: String,
    pub title: String,
    pub source_target_codes: BTreeSet<String>,
    pub source_area_codes: BTreeSet<String>,
    pub gio_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveAnnouncement {
    pub doc_frbr: Frbr,
    pub about_act_frbr: Frbr,
    pub about_bill_frbr: Frbr,
    pub document_type: String,
    pub procedure_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_work_key_uses_process_path() {
        let purpose = Purpose {
            purpose_type: PurposeType::Consolidation,
            effective_date: None,
            work_province_id: "pv28".to_string(),
            work_date: "2024".to_string(),
            work_other: "w1".to_string(),
        };
        assert_eq!(purpose.work_key(), "/join/id/proces/pv28/2024/w1");
    }

    #[test]
    fn code_for_wid_reverses_the_map() {
        let data = WidData {
            known_wid_map: BTreeMap::from([
                ("beleidskeuze-1".to_string(), "pv28_1__content_o_1".to_string()),
                ("beleidskeuze-2".to_string(), "pv28_1__content_o_2".to_string()),
            ]),
            known_wids: vec![],
        };
        assert_eq!(data.code_for_wid("pv28_1__content_o_2"), Some("beleidskeuze-2"));
        assert_eq!(data.code_for_wid("unknown"), None);
    }
}
