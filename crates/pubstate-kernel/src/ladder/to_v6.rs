//! V5 → V6: split legacy areas into areas and area groups.
//!
//! A legacy area acted as a group of its locations. Each location becomes an
//! area coded `werkingsgebied-{object_id}-{position}` (1-based), and the
//! legacy area itself becomes the group `werkingsgebied-{object_id}`. The
//! synthesized records carry [`STALE_OBJECT_ID`]: no source object has these
//! codes, so the next publication of the act deletes them.

use crate::error::StateError;
use crate::ladder::{StateUpgrader, unexpected_shape};
use crate::schema::VersionedState;
use crate::schema::v1::legacy_area_code;
use crate::schema::v4::LegacyAreaV4;
use crate::schema::v5::{ActV5, StateV5};
use crate::schema::v6::{ActV6, AreaGroupV6, AreaV6, STALE_OBJECT_ID, StateV6};
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct UpgradeToV6;

impl StateUpgrader for UpgradeToV6 {
    fn input_version(&self) -> u32 {
        5
    }

    fn upgrade(
        &self,
        _workspace_id: &Uuid,
        state: VersionedState,
    ) -> Result<VersionedState, StateError> {
        let VersionedState::V5(state) = state else {
            return Err(unexpected_shape(5, &state));
        };
        let StateV5 {
            purposes,
            acts,
            announcements,
        } = state;

        Ok(VersionedState::V6(StateV6 {
            purposes,
            acts: acts
                .into_iter()
                .map(|(key, act)| (key, upgrade_act(act)))
                .collect(),
            announcements,
        }))
    }
}

fn upgrade_act(act: ActV5) -> ActV6 {
    let mut areas = BTreeMap::new();
    let mut area_groups = BTreeMap::new();
    for legacy in act.legacy_areas.values() {
        let group = split_legacy_area(legacy, &mut areas);
        area_groups.insert(group.code.clone(), group);
    }

    ActV6 {
        act_frbr: act.act_frbr,
        bill_frbr: act.bill_frbr,
        consolidation_purpose: act.consolidation_purpose,
        document_type: act.document_type,
        procedure_type: act.procedure_type,
        areas,
        area_groups,
        area_indications: BTreeMap::new(),
        documents: act.documents,
        assets: act.assets,
        wid_data: act.wid_data,
        graph: act.graph,
        act_text: act.act_text,
        publication_version_uuid: act.publication_version_uuid,
    }
}

fn split_legacy_area(legacy: &LegacyAreaV4, areas: &mut BTreeMap<String, AreaV6>) -> AreaGroupV6 {
    let group_code = legacy_area_code(legacy.object_id);
    let mut area_codes = Vec::with_capacity(legacy.locations.len());

    for (index, location) in legacy.locations.iter().enumerate() {
        let code = format!("{group_code}-{}", index + 1);
        areas.insert(
            code.clone(),
            AreaV6 {
                uuid: location.uuid.clone(),
                identifier: location.identifier.clone(),
                gml_id: location.gml_id.clone(),
                title: location.title.clone(),
                object_id: STALE_OBJECT_ID,
                code: code.clone(),
                hash: legacy.hash.clone(),
                owner_act: legacy.owner_act.clone(),
                background_reference: String::new(),
                background_actuality: String::new(),
                frbr: legacy.frbr.clone(),
            },
        );
        area_codes.push(code);
    }

    AreaGroupV6 {
        uuid: legacy.uuid.clone(),
        identifier: legacy.identifier.clone(),
        code: group_code,
        object_id: STALE_OBJECT_ID,
        title: legacy.title.clone(),
        area_codes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frbr::test_frbr;
    use crate::schema::v4::LocationV4;

    fn location(n: u32) -> LocationV4 {
        LocationV4 {
            uuid: format!("loc-{n}"),
            identifier: format!("lo-{n}"),
            gml_id: format!("gml-lo-{n}"),
            group_id: format!("groep-lo-{n}"),
            title: format!("Locatie {n}"),
        }
    }

    #[test]
    fn locations_become_positionally_coded_areas() {
        let legacy = LegacyAreaV4 {
            uuid: "wg-uuid".to_string(),
            identifier: "gio-12".to_string(),
            object_id: 12,
            title: "Stad".to_string(),
            hash: "h12".to_string(),
            owner_act: "omgevingsvisie".to_string(),
            frbr: test_frbr("gio-12", 1),
            locations: vec![location(1), location(2)],
        };
        let mut areas = BTreeMap::new();
        let group = split_legacy_area(&legacy, &mut areas);

        assert_eq!(group.code, "werkingsgebied-12");
        assert_eq!(group.object_id, STALE_OBJECT_ID);
        assert_eq!(group.area_codes, vec!["werkingsgebied-12-1", "werkingsgebied-12-2"]);
        assert_eq!(areas.len(), 2);
        let second = &areas["werkingsgebied-12-2"];
        assert_eq!(second.identifier, "lo-2");
        assert_eq!(second.hash, "h12");
        assert_eq!(second.object_id, STALE_OBJECT_ID);
    }
}
