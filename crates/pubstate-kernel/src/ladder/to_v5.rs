//! V4 → V5: flatten the ad hoc object map into the typed provision graph.
//!
//! Every JSON object becomes a node of the kind named by its `object_type`,
//! and every identification it points at becomes a resolved reference. All
//! converted nodes start out `unchanged`.
//!
//! Draft acts are never mutated, so a draft whose object map cannot be
//! converted gets an empty graph. Any other act fails the upgrade.

use crate::error::StateError;
use crate::graph::{
    AdministrativeAreaNode, AreaBoundaryNode, AreaGroupNode, AreaNode, DivisionTextNode,
    LocationRef, ObjectStatus, ProvisionGraph, TextRef, TextSegmentNode,
};
use crate::ladder::{StateUpgrader, unexpected_shape};
use crate::schema::VersionedState;
use crate::schema::common::DRAFT_PROCEDURE_TYPE;
use crate::schema::v2::{
    OBJECT_ADMINISTRATIVE_AREA, OBJECT_AREA, OBJECT_AREA_BOUNDARY, OBJECT_AREA_GROUP,
    OBJECT_DIVISION_TEXT, OBJECT_TEXT_SEGMENT,
};
use crate::schema::v4::{ActV4, StateV4};
use crate::schema::v5::{ActV5, StateV5};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use uuid::Uuid;

pub const INDICATIVE_IDEALIZATION: &str =
    "http://standaarden.omgevingswet.overheid.nl/idealisatie/id/concept/Indicatief";

pub struct UpgradeToV5;

impl StateUpgrader for UpgradeToV5 {
    fn input_version(&self) -> u32 {
        4
    }

    fn upgrade(
        &self,
        _workspace_id: &Uuid,
        state: VersionedState,
    ) -> Result<VersionedState, StateError> {
        let VersionedState::V4(state) = state else {
            return Err(unexpected_shape(4, &state));
        };
        let StateV4 {
            purposes,
            acts,
            announcements,
        } = state;

        let mut upgraded = BTreeMap::new();
        for (key, act) in acts {
            let graph = match convert_objects(&act.object_data.objects) {
                Ok(graph) => graph,
                Err(reason) if act.procedure_type == DRAFT_PROCEDURE_TYPE => {
                    warn!(act_key = %key, %reason, "dropping unconvertible object map of draft act");
                    ProvisionGraph::default()
                }
                Err(reason) => {
                    return Err(StateError::UpgradeFailed {
                        target: 5,
                        reason: format!("act `{key}`: {reason}"),
                    });
                }
            };
            debug!(act_key = %key, nodes = graph.len(), "built provision graph");
            upgraded.insert(key, with_graph(act, graph));
        }

        Ok(VersionedState::V5(StateV5 {
            purposes,
            acts: upgraded,
            announcements,
        }))
    }
}

fn with_graph(act: ActV4, graph: ProvisionGraph) -> ActV5 {
    ActV5 {
        act_frbr: act.act_frbr,
        bill_frbr: act.bill_frbr,
        consolidation_purpose: act.consolidation_purpose,
        document_type: act.document_type,
        procedure_type: act.procedure_type,
        legacy_areas: act.legacy_areas,
        documents: act.documents,
        assets: act.assets,
        wid_data: act.wid_data,
        graph,
        act_text: act.act_text,
        publication_version_uuid: act.publication_version_uuid,
    }
}

/// Areas are addressed by the code of their first location in V6 onwards.
fn area_code(geo_code: &str) -> String {
    format!("{geo_code}-1")
}

fn object_type(object: &Value) -> &str {
    object
        .get("object_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn text<'a>(object: &'a Value, id: &str, name: &str) -> Result<&'a str, String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("object `{id}` has no `{name}`"))
}

fn ids<'a>(object: &'a Value, id: &str, name: &str) -> Result<Vec<&'a str>, String> {
    object
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("object `{id}` has no `{name}` list"))?
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .ok_or_else(|| format!("object `{id}` has a non-string `{name}` entry"))
        })
        .collect()
}

fn procedure_status(object: &Value) -> Option<String> {
    object
        .get("procedure_status")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn lookup<'a>(objects: &'a BTreeMap<String, Value>, id: &str) -> Result<&'a Value, String> {
    objects
        .get(id)
        .ok_or_else(|| format!("reference to missing object `{id}`"))
}

fn location_ref(objects: &BTreeMap<String, Value>, id: &str) -> Result<LocationRef, String> {
    let target = lookup(objects, id)?;
    let reference = id.to_string();
    match object_type(target) {
        OBJECT_ADMINISTRATIVE_AREA => Ok(LocationRef::AdministrativeArea { reference }),
        OBJECT_AREA_GROUP => Ok(LocationRef::AreaGroup {
            target_code: text(target, id, "geo_code")?.to_string(),
            reference,
        }),
        OBJECT_AREA => Ok(LocationRef::Area {
            target_code: area_code(text(target, id, "geo_code")?),
            reference,
        }),
        other => Err(format!("object `{id}` of type `{other}` is not a location")),
    }
}

pub(crate) fn convert_objects(objects: &BTreeMap<String, Value>) -> Result<ProvisionGraph, String> {
    let mut graph = ProvisionGraph::default();

    for (id, object) in objects {
        let identification = id.clone();
        let object_status = ObjectStatus::Unchanged;
        let procedure_status = procedure_status(object);

        match object_type(object) {
            OBJECT_ADMINISTRATIVE_AREA => graph.administrative_areas.push(AdministrativeAreaNode {
                identification,
                object_status,
                procedure_status,
                source_uuid: text(object, id, "source_uuid")?.to_string(),
                administrative_borders_id: text(object, id, "administrative_borders_id")?
                    .to_string(),
                domain: text(object, id, "domain")?.to_string(),
                valid_on: text(object, id, "valid_on")?.to_string(),
                title: String::new(),
            }),
            OBJECT_AREA_BOUNDARY => {
                let administrative_area = text(object, id, "administrative_area")?;
                let source_uuid = text(lookup(objects, administrative_area)?, administrative_area, "source_uuid")?;
                graph.area_boundaries.push(AreaBoundaryNode {
                    identification,
                    object_status,
                    procedure_status,
                    source_uuid: source_uuid.to_string(),
                    location_ref: LocationRef::AdministrativeArea {
                        reference: administrative_area.to_string(),
                    },
                });
            }
            OBJECT_AREA => {
                let source_uuid = text(object, id, "source_uuid")?;
                graph.areas.push(AreaNode {
                    identification,
                    object_status,
                    procedure_status,
                    source_code: area_code(text(object, id, "geo_code")?),
                    title: text(object, id, "title")?.to_string(),
                    geometry_ref: source_uuid.to_string(),
                });
            }
            OBJECT_AREA_GROUP => {
                let geo_code = text(object, id, "geo_code")?;
                let area_refs = ids(object, id, "areas")?
                    .into_iter()
                    .map(|area| LocationRef::Area {
                        target_code: area_code(geo_code),
                        reference: area.to_string(),
                    })
                    .collect();
                graph.area_groups.push(AreaGroupNode {
                    identification,
                    object_status,
                    procedure_status,
                    source_code: geo_code.to_string(),
                    title: text(object, id, "title")?.to_string(),
                    area_refs,
                });
            }
            OBJECT_DIVISION_TEXT => graph.division_texts.push(DivisionTextNode {
                identification,
                object_status,
                procedure_status,
                source_uuid: String::new(),
                source_code: text(object, id, "policy_object_code")?.to_string(),
                wid: text(object, id, "wid")?.to_string(),
            }),
            OBJECT_TEXT_SEGMENT => {
                let division = text(object, id, "division")?;
                let division_object = lookup(objects, division)?;
                let location_refs = ids(object, id, "locations")?
                    .into_iter()
                    .map(|location| location_ref(objects, location))
                    .collect::<Result<Vec<_>, _>>()?;
                graph.text_segments.push(TextSegmentNode {
                    identification,
                    object_status,
                    procedure_status,
                    source_uuid: String::new(),
                    source_code: text(division_object, division, "policy_object_code")?.to_string(),
                    idealization: INDICATIVE_IDEALIZATION.to_string(),
                    text_ref: TextRef::DivisionText {
                        target_wid: text(division_object, division, "wid")?.to_string(),
                        reference: division.to_string(),
                    },
                    location_refs,
                    indication_refs: Vec::new(),
                });
            }
            other => return Err(format!("unknown object type `{other}` for `{id}`")),
        }
    }

    Ok(graph)
}
