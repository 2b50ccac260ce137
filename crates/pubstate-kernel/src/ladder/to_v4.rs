//! V3 → V4: give every legacy area exactly one location, itself.

use crate::error::StateError;
use crate::ladder::{StateUpgrader, unexpected_shape};
use crate::schema::VersionedState;
use crate::schema::v2::LegacyAreaV2;
use crate::schema::v3::{ActV3, StateV3};
use crate::schema::v4::{ActV4, LegacyAreaV4, LocationV4, StateV4};
use uuid::Uuid;

pub struct UpgradeToV4;

impl StateUpgrader for UpgradeToV4 {
    fn input_version(&self) -> u32 {
        3
    }

    fn upgrade(
        &self,
        _workspace_id: &Uuid,
        state: VersionedState,
    ) -> Result<VersionedState, StateError> {
        let VersionedState::V3(state) = state else {
            return Err(unexpected_shape(3, &state));
        };
        let StateV3 {
            purposes,
            acts,
            announcements,
        } = state;

        Ok(VersionedState::V4(StateV4 {
            purposes,
            acts: acts
                .into_iter()
                .map(|(key, act)| (key, upgrade_act(act)))
                .collect(),
            announcements,
        }))
    }
}

fn upgrade_act(act: ActV3) -> ActV4 {
    ActV4 {
        legacy_areas: act
            .legacy_areas
            .into_iter()
            .map(|(object_id, area)| (object_id, with_location(area)))
            .collect(),
        act_frbr: act.act_frbr,
        bill_frbr: act.bill_frbr,
        consolidation_purpose: act.consolidation_purpose,
        document_type: act.document_type,
        procedure_type: act.procedure_type,
        documents: act.documents,
        assets: act.assets,
        wid_data: act.wid_data,
        object_data: act.object_data,
        act_text: act.act_text,
        publication_version_uuid: act.publication_version_uuid,
    }
}

/// Location ids follow the legacy scheme `lo-{act id}-{area uuid}`, where
/// the act id is the first `-` segment of the area's work-other.
fn with_location(area: LegacyAreaV2) -> LegacyAreaV4 {
    let act_id = area.frbr.work_other.split('-').next().unwrap_or_default();
    let base_id = format!("lo-{act_id}-{}", area.uuid);
    let location = LocationV4 {
        uuid: area.uuid.clone(),
        identifier: base_id.clone(),
        gml_id: format!("gml-{base_id}"),
        group_id: format!("groep-{base_id}"),
        title: area.title.clone(),
    };
    LegacyAreaV4 {
        uuid: area.uuid,
        identifier: area.identifier,
        object_id: area.object_id,
        title: area.title,
        hash: area.hash,
        owner_act: area.owner_act,
        frbr: area.frbr,
        locations: vec![location],
    }
}
