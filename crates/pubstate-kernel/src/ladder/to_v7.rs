//! V6 → V7: wrap every area in its own geometry information object.
//!
//! Each gio covers exactly one area and is keyed by that area's code, so
//! references by area code keep resolving.

use crate::error::StateError;
use crate::ladder::{StateUpgrader, unexpected_shape};
use crate::schema::VersionedState;
use crate::schema::v6::{ActV6, AreaGroupV6, AreaV6, StateV6};
use crate::schema::v7::{ActiveAct, AreaGroup, Gio, GioLocation, StateV7};
use std::collections::BTreeSet;
use uuid::Uuid;

pub struct UpgradeToV7;

impl StateUpgrader for UpgradeToV7 {
    fn input_version(&self) -> u32 {
        6
    }

    fn upgrade(
        &self,
        _workspace_id: &Uuid,
        state: VersionedState,
    ) -> Result<VersionedState, StateError> {
        let VersionedState::V6(state) = state else {
            return Err(unexpected_shape(6, &state));
        };
        let StateV6 {
            purposes,
            acts,
            announcements,
        } = state;

        Ok(VersionedState::V7(StateV7 {
            purposes,
            acts: acts
                .into_iter()
                .map(|(key, act)| (key, upgrade_act(act)))
                .collect(),
            announcements,
        }))
    }
}

fn upgrade_act(act: ActV6) -> ActiveAct {
    let gios = act
        .areas
        .into_values()
        .map(|area| {
            let gio = wrap_area(area);
            (gio.key(), gio)
        })
        .collect();
    let area_groups = act
        .area_groups
        .into_values()
        .map(|group| (group.code.clone(), upgrade_group(group)))
        .collect();

    ActiveAct {
        act_frbr: act.act_frbr,
        bill_frbr: act.bill_frbr,
        consolidation_purpose: act.consolidation_purpose,
        document_type: act.document_type,
        procedure_type: act.procedure_type,
        gios,
        area_groups,
        area_indications: act.area_indications,
        documents: act.documents,
        assets: act.assets,
        wid_data: act.wid_data,
        graph: act.graph,
        act_text: act.act_text,
        publication_version_uuid: act.publication_version_uuid,
    }
}

fn wrap_area(area: AreaV6) -> Gio {
    Gio {
        source_codes: BTreeSet::from([area.code.clone()]),
        locations: vec![GioLocation {
            title: area.title.clone(),
            basisgeo_id: area.identifier,
            source_hash: area.hash,
            source_code: area.code,
        }],
        title: area.title,
        frbr: area.frbr,
        owner_act: area.owner_act,
        background_reference: area.background_reference,
        background_actuality: area.background_actuality,
    }
}

fn upgrade_group(group: AreaGroupV6) -> AreaGroup {
    let source_area_codes: BTreeSet<String> = group.area_codes.into_iter().collect();
    AreaGroup {
        uuid: group.uuid,
        code: group.code,
        title: group.title,
        gio_keys: source_area_codes.clone(),
        source_area_codes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frbr::test_frbr;

    #[test]
    fn each_area_gets_a_gio_keyed_by_its_code() {
        let gio = wrap_area(AreaV6 {
            uuid: "loc-1".to_string(),
            identifier: "lo-1".to_string(),
            gml_id: "gml-lo-1".to_string(),
            title: "Stad".to_string(),
            object_id: -1,
            code: "werkingsgebied-12-1".to_string(),
            hash: "h12".to_string(),
            owner_act: "omgevingsvisie".to_string(),
            background_reference: String::new(),
            background_actuality: String::new(),
            frbr: test_frbr("gio-12", 1),
        });
        assert_eq!(gio.key(), "werkingsgebied-12-1");
        assert_eq!(gio.locations[0].basisgeo_id, "lo-1");
        assert_eq!(gio.locations[0].source_hash, "h12");
    }

    #[test]
    fn groups_point_at_the_gios_of_their_areas() {
        let group = upgrade_group(AreaGroupV6 {
            uuid: "wg-uuid".to_string(),
            identifier: "gio-12".to_string(),
            code: "werkingsgebied-12".to_string(),
            object_id: -1,
            title: "Stad".to_string(),
            area_codes: vec!["werkingsgebied-12-2".to_string(), "werkingsgebied-12-1".to_string()],
        });
        assert_eq!(group.gio_keys, group.source_area_codes);
        assert_eq!(
            group.gio_keys.iter().next().map(String::as_str),
            Some("werkingsgebied-12-1")
        );
    }
}
