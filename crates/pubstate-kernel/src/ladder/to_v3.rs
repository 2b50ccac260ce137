//! V2 → V3: record the binary assets the act text references.

use crate::error::StateError;
use crate::ladder::{StateUpgrader, unexpected_shape};
use crate::schema::VersionedState;
use crate::schema::common::Asset;
use crate::schema::v2::{ActV2, StateV2};
use crate::schema::v3::{ActV3, StateV3};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::debug;
use uuid::Uuid;

pub struct UpgradeToV3;

impl StateUpgrader for UpgradeToV3 {
    fn input_version(&self) -> u32 {
        2
    }

    fn upgrade(
        &self,
        _workspace_id: &Uuid,
        state: VersionedState,
    ) -> Result<VersionedState, StateError> {
        let VersionedState::V2(state) = state else {
            return Err(unexpected_shape(2, &state));
        };
        let StateV2 {
            purposes,
            acts,
            announcements,
        } = state;

        let mut upgraded = BTreeMap::new();
        for (key, act) in acts {
            let act = upgrade_act(act)?;
            debug!(act_key = %key, assets = act.assets.len(), "collected act assets");
            upgraded.insert(key, act);
        }

        Ok(VersionedState::V3(StateV3 {
            purposes,
            acts: upgraded,
            announcements,
        }))
    }
}

fn illustration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<Illustratie\b[^>]*\bnaam="([^"]*)""#)
            .expect("illustration regex must compile")
    })
}

fn asset_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"img_([a-f0-9\-]+)\.(png|jpg|jpeg|gif|bmp|tiff|webp)")
            .expect("asset name regex must compile")
    })
}

/// Asset uuids named by the illustrations in `act_text`.
///
/// Every illustration must carry an `img_{uuid}.{ext}` name.
pub fn asset_uuids(act_text: &str) -> Result<BTreeSet<String>, String> {
    let mut uuids = BTreeSet::new();
    for illustration in illustration_re().captures_iter(act_text) {
        let name = &illustration[1];
        let Some(asset) = asset_name_re().captures(name) else {
            return Err(format!("unable to find asset uuid in the name `{name}`"));
        };
        uuids.insert(asset[1].to_string());
    }
    Ok(uuids)
}

fn upgrade_act(act: ActV2) -> Result<ActV3, StateError> {
    let assets = asset_uuids(&act.act_text)
        .map_err(|reason| StateError::UpgradeFailed { target: 3, reason })?
        .into_iter()
        .map(|uuid| (uuid.clone(), Asset { uuid }))
        .collect();

    Ok(ActV3 {
        act_frbr: act.act_frbr,
        bill_frbr: act.bill_frbr,
        consolidation_purpose: act.consolidation_purpose,
        document_type: act.document_type,
        procedure_type: act.procedure_type,
        legacy_areas: act.legacy_areas,
        documents: act.documents,
        assets,
        wid_data: act.wid_data,
        object_data: act.object_data,
        act_text: act.act_text,
        publication_version_uuid: act.publication_version_uuid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_unique_asset_uuids_from_illustrations() {
        let text = r#"<Lichaam>
            <Figuur><Illustratie schaal="1" naam="img_0f1e2d3c-aaaa-4bbb-8ccc-000000000001.png"/></Figuur>
            <Figuur><Illustratie naam="img_0f1e2d3c-aaaa-4bbb-8ccc-000000000002.jpeg" dpi="150"/></Figuur>
            <Figuur><Illustratie naam="img_0f1e2d3c-aaaa-4bbb-8ccc-000000000001.png"/></Figuur>
        </Lichaam>"#;
        let uuids = asset_uuids(text).expect("names are well formed");
        assert_eq!(
            uuids.into_iter().collect::<Vec<_>>(),
            vec![
                "0f1e2d3c-aaaa-4bbb-8ccc-000000000001".to_string(),
                "0f1e2d3c-aaaa-4bbb-8ccc-000000000002".to_string(),
            ]
        );
    }

    #[test]
    fn text_without_illustrations_has_no_assets() {
        assert!(asset_uuids("<Lichaam><Al>tekst</Al></Lichaam>").expect("ok").is_empty());
    }

    #[test]
    fn malformed_asset_name_is_rejected() {
        let err = asset_uuids(r#"<Illustratie naam="kaart.svg"/>"#).expect_err("svg name has no uuid");
        assert!(err.contains("kaart.svg"));
    }
}
