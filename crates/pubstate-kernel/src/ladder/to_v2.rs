//! V1 → V2: expand the id mapping into an object map.
//!
//! V1 only recorded which identification was issued for which source. V2
//! keeps a JSON object per identification, tagged by `object_type`, with the
//! source attributes that can be recovered from the act itself. Titles and
//! hashes that V1 never stored become empty strings.

use crate::error::StateError;
use crate::frbr::WorkClass;
use crate::ladder::{StateUpgrader, unexpected_shape};
use crate::schema::VersionedState;
use crate::schema::v1::{
    ActV1, CATEGORY_ADMINISTRATIVE_AREA, CATEGORY_AREA_BOUNDARY, CATEGORY_AREA_GROUP,
    CATEGORY_AREAS, CATEGORY_WID, LegacyAreaV1, StateV1, legacy_area_code,
};
use crate::schema::v2::{
    ActV2, LegacyAreaV2, OBJECT_ADMINISTRATIVE_AREA, OBJECT_AREA, OBJECT_AREA_BOUNDARY,
    OBJECT_AREA_GROUP, OBJECT_DIVISION_TEXT, OBJECT_TEXT_SEGMENT, ObjectDataV2, StateV2,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

pub struct UpgradeToV2;

impl StateUpgrader for UpgradeToV2 {
    fn input_version(&self) -> u32 {
        1
    }

    fn upgrade(
        &self,
        workspace_id: &Uuid,
        state: VersionedState,
    ) -> Result<VersionedState, StateError> {
        let VersionedState::V1(state) = state else {
            return Err(unexpected_shape(1, &state));
        };
        let StateV1 {
            purposes,
            acts,
            announcements,
        } = state;

        let acts = acts
            .into_iter()
            .map(|(key, act)| {
                let act = upgrade_act(workspace_id, &key, act);
                debug!(act_key = %key, objects = act.object_data.objects.len(), "expanded object map");
                (key, act)
            })
            .collect();

        Ok(VersionedState::V2(StateV2 {
            purposes,
            acts,
            announcements,
        }))
    }
}

/// Deterministic stand-in for the publication version an act was built from.
///
/// V1 did not record it; the UUIDv5 over the workspace and the act's
/// expression is stable across repeated migrations of the same snapshot.
pub fn synthetic_publication_version(workspace_id: &Uuid, act_key: &str, expression_uri: &str) -> Uuid {
    Uuid::new_v5(workspace_id, format!("{act_key}:{expression_uri}").as_bytes())
}

fn upgrade_act(workspace_id: &Uuid, key: &str, act: ActV1) -> ActV2 {
    let expression = act.act_frbr.expression_uri(WorkClass::Act);
    let publication_version_uuid =
        synthetic_publication_version(workspace_id, key, &expression).to_string();
    let objects = expand_object_map(&act);

    let legacy_areas = act
        .legacy_areas
        .into_iter()
        .map(|(object_id, area)| (object_id, upgrade_legacy_area(area)))
        .collect();

    ActV2 {
        act_frbr: act.act_frbr,
        bill_frbr: act.bill_frbr,
        consolidation_purpose: act.consolidation_purpose,
        document_type: act.document_type,
        procedure_type: act.procedure_type,
        legacy_areas,
        documents: BTreeMap::new(),
        wid_data: act.wid_data,
        object_data: ObjectDataV2 {
            objects,
            terminated_ids: Vec::new(),
        },
        act_text: act.act_text,
        publication_version_uuid,
    }
}

fn upgrade_legacy_area(area: LegacyAreaV1) -> LegacyAreaV2 {
    LegacyAreaV2 {
        uuid: area.uuid,
        identifier: area.identifier,
        object_id: area.object_id,
        title: String::new(),
        hash: String::new(),
        owner_act: area.owner_act,
        frbr: area.frbr,
    }
}

fn expand_object_map(act: &ActV1) -> BTreeMap<String, Value> {
    let empty = BTreeMap::new();
    let category = |name: &str| act.object_map.id_mapping.get(name).unwrap_or(&empty);
    let area_uuid = |code: &str| {
        act.legacy_areas
            .values()
            .find(|area| legacy_area_code(area.object_id) == code)
            .map(|area| area.uuid.clone())
            .unwrap_or_default()
    };

    let mut objects = BTreeMap::new();

    for (source_uuid, id) in category(CATEGORY_ADMINISTRATIVE_AREA) {
        objects.insert(
            id.clone(),
            json!({
                "object_type": OBJECT_ADMINISTRATIVE_AREA,
                "identification": id,
                "procedure_status": null,
                "source_uuid": source_uuid,
                "administrative_borders_id": "",
                "domain": "",
                "valid_on": "",
            }),
        );
    }

    for (administrative_area, id) in category(CATEGORY_AREA_BOUNDARY) {
        objects.insert(
            id.clone(),
            json!({
                "object_type": OBJECT_AREA_BOUNDARY,
                "identification": id,
                "procedure_status": null,
                "administrative_area": administrative_area,
            }),
        );
    }

    let areas = category(CATEGORY_AREAS);
    for (code, id) in areas {
        objects.insert(
            id.clone(),
            json!({
                "object_type": OBJECT_AREA,
                "identification": id,
                "procedure_status": null,
                "source_uuid": area_uuid(code),
                "title": "",
                "geo_code": code,
            }),
        );
    }

    for (code, id) in category(CATEGORY_AREA_GROUP) {
        let members: Vec<&String> = areas.get(code).into_iter().collect();
        objects.insert(
            id.clone(),
            json!({
                "object_type": OBJECT_AREA_GROUP,
                "identification": id,
                "procedure_status": null,
                "source_uuid": area_uuid(code),
                "title": "",
                "geo_code": code,
                "areas": members,
            }),
        );
    }

    for (wid, id) in category(CATEGORY_WID) {
        objects.insert(
            id.clone(),
            json!({
                "object_type": OBJECT_DIVISION_TEXT,
                "identification": id,
                "procedure_status": null,
                "wid": wid,
                "policy_object_code": act.wid_data.code_for_wid(wid).unwrap_or_default(),
            }),
        );
    }

    for (id, fields) in &act.object_map.text_segment_mapping {
        let locations: Vec<&String> = fields.get("location").into_iter().collect();
        objects.insert(
            id.clone(),
            json!({
                "object_type": OBJECT_TEXT_SEGMENT,
                "identification": id,
                "procedure_status": null,
                "division": fields.get("division").cloned().unwrap_or_default(),
                "locations": locations,
            }),
        );
    }

    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frbr::test_frbr;
    use crate::schema::common::{Purpose, PurposeType, WidData};
    use crate::schema::v1::ObjectMapV1;

    fn act_v1() -> ActV1 {
        let id_mapping = BTreeMap::from([
            (
                CATEGORY_ADMINISTRATIVE_AREA.to_string(),
                BTreeMap::from([("aoj-uuid".to_string(), "ow.ambtsgebied.1".to_string())]),
            ),
            (
                CATEGORY_AREAS.to_string(),
                BTreeMap::from([("werkingsgebied-12".to_string(), "ow.gebied.1".to_string())]),
            ),
            (
                CATEGORY_AREA_GROUP.to_string(),
                BTreeMap::from([("werkingsgebied-12".to_string(), "ow.groep.1".to_string())]),
            ),
            (
                CATEGORY_WID.to_string(),
                BTreeMap::from([("pv28_1__content_o_1".to_string(), "ow.divisietekst.1".to_string())]),
            ),
        ]);
        ActV1 {
            act_frbr: test_frbr("omgevingsvisie-1", 1),
            bill_frbr: test_frbr("besluit-1", 1),
            consolidation_purpose: Purpose {
                purpose_type: PurposeType::Consolidation,
                effective_date: None,
                work_province_id: "pv28".to_string(),
                work_date: "2024".to_string(),
                work_other: "omgevingsvisie-1".to_string(),
            },
            document_type: "vision".to_string(),
            procedure_type: "final".to_string(),
            legacy_areas: BTreeMap::from([(
                12,
                LegacyAreaV1 {
                    uuid: "area-uuid-12".to_string(),
                    identifier: "gio-12".to_string(),
                    object_id: 12,
                    owner_act: "omgevingsvisie-1".to_string(),
                    frbr: test_frbr("gio-12", 1),
                },
            )]),
            wid_data: WidData {
                known_wid_map: BTreeMap::from([(
                    "beleidskeuze-3".to_string(),
                    "pv28_1__content_o_1".to_string(),
                )]),
                known_wids: vec!["pv28_1__content_o_1".to_string()],
            },
            object_map: ObjectMapV1 {
                id_mapping,
                text_segment_mapping: BTreeMap::from([(
                    "ow.tekstdeel.1".to_string(),
                    BTreeMap::from([
                        ("division".to_string(), "ow.divisietekst.1".to_string()),
                        ("location".to_string(), "ow.groep.1".to_string()),
                    ]),
                )]),
            },
            act_text: "<Lichaam/>".to_string(),
        }
    }

    #[test]
    fn object_map_is_expanded_per_identification() {
        let objects = expand_object_map(&act_v1());
        assert_eq!(objects.len(), 5);
        assert_eq!(objects["ow.gebied.1"]["source_uuid"], "area-uuid-12");
        assert_eq!(objects["ow.groep.1"]["areas"], json!(["ow.gebied.1"]));
        assert_eq!(objects["ow.divisietekst.1"]["policy_object_code"], "beleidskeuze-3");
        assert_eq!(objects["ow.tekstdeel.1"]["locations"], json!(["ow.groep.1"]));
    }

    #[test]
    fn publication_version_is_stable_per_workspace() {
        let workspace = Uuid::from_u128(0x1234);
        let first = upgrade_act(&workspace, "vision-final", act_v1());
        let second = upgrade_act(&workspace, "vision-final", act_v1());
        let elsewhere = upgrade_act(&Uuid::from_u128(0x5678), "vision-final", act_v1());
        assert_eq!(first.publication_version_uuid, second.publication_version_uuid);
        assert_ne!(first.publication_version_uuid, elsewhere.publication_version_uuid);
        assert_eq!(first.legacy_areas[&12].title, "");
    }
}
