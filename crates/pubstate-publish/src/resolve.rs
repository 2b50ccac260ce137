//! Two-pass resolution of submitted provision objects into a graph.
//!
//! The rendering stage hands over the objects its text references, keyed by
//! identification. References between them name the target's
//! identification, kind and natural key. The first pass indexes every
//! identification; the second turns each reference into the resolved
//! variant when its target is present in the same map, and into the
//! unresolved variant (natural key only) when it is not.

use pubstate_kernel::{
    AdministrativeAreaNode, AreaBoundaryNode, AreaGroupNode, AreaIndicationNode, AreaNode,
    DivisionNode, DivisionTextNode, IndicationRef, LocationRef, NodeKind, ObjectStatus,
    ProvisionGraph, StateError, TextRef, TextSegmentNode,
};
use pubstate_kernel::graph::{ADMINISTRATIVE_AREA_KEY, AREA_BOUNDARY_KEY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A reference from one submitted object to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub kind: NodeKind,
    /// Identification of the target.
    pub id: String,
    /// Natural key of the target: its code, or its WID for text nodes.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "object_type", rename_all = "snake_case")]
pub enum SourceObject {
    AdministrativeArea {
        source_uuid: String,
        administrative_borders_id: String,
        domain: String,
        valid_on: String,
        title: String,
    },
    AreaBoundary {
        source_uuid: String,
        administrative_area: SourceRef,
    },
    Area {
        source_code: String,
        title: String,
        geometry_ref: String,
    },
    AreaGroup {
        source_code: String,
        title: String,
        areas: Vec<SourceRef>,
    },
    AreaIndication {
        source_code: String,
        title: String,
        indication_type: String,
        indication_group: String,
        locations: Vec<SourceRef>,
    },
    Division {
        source_uuid: String,
        source_code: String,
        wid: String,
    },
    DivisionText {
        source_uuid: String,
        source_code: String,
        wid: String,
    },
    TextSegment {
        source_uuid: String,
        source_code: String,
        idealization: String,
        text: SourceRef,
        locations: Vec<SourceRef>,
        #[serde(default)]
        indications: Vec<SourceRef>,
    },
}

impl SourceObject {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::AdministrativeArea { .. } => NodeKind::AdministrativeArea,
            Self::AreaBoundary { .. } => NodeKind::AreaBoundary,
            Self::Area { .. } => NodeKind::Area,
            Self::AreaGroup { .. } => NodeKind::AreaGroup,
            Self::AreaIndication { .. } => NodeKind::AreaIndication,
            Self::Division { .. } => NodeKind::Division,
            Self::DivisionText { .. } => NodeKind::DivisionText,
            Self::TextSegment { .. } => NodeKind::TextSegment,
        }
    }

    /// The key the resulting graph node is matched by across publications.
    pub fn content_key(&self) -> &str {
        match self {
            Self::AdministrativeArea { .. } => ADMINISTRATIVE_AREA_KEY,
            Self::AreaBoundary { .. } => AREA_BOUNDARY_KEY,
            Self::Area { source_code, .. }
            | Self::AreaGroup { source_code, .. }
            | Self::AreaIndication { source_code, .. }
            | Self::TextSegment { source_code, .. } => source_code,
            Self::Division { wid, .. } | Self::DivisionText { wid, .. } => wid,
        }
    }

    fn refs_mut(&mut self) -> Vec<&mut SourceRef> {
        match self {
            Self::AdministrativeArea { .. }
            | Self::Area { .. }
            | Self::Division { .. }
            | Self::DivisionText { .. } => Vec::new(),
            Self::AreaBoundary {
                administrative_area,
                ..
            } => vec![administrative_area],
            Self::AreaGroup { areas, .. } => areas.iter_mut().collect(),
            Self::AreaIndication { locations, .. } => locations.iter_mut().collect(),
            Self::TextSegment {
                text,
                locations,
                indications,
                ..
            } => {
                let mut refs = vec![text];
                refs.extend(locations.iter_mut());
                refs.extend(indications.iter_mut());
                refs
            }
        }
    }
}

/// Rename identifications (map keys and the references naming them).
///
/// A rename whose new identification is already taken by another submitted
/// object is skipped.
pub fn rename_identifications(
    objects: BTreeMap<String, SourceObject>,
    renames: &BTreeMap<String, String>,
) -> BTreeMap<String, SourceObject> {
    let applicable: BTreeMap<&str, &str> = renames
        .iter()
        .filter(|(_, to)| !objects.contains_key(to.as_str()))
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();

    objects
        .into_iter()
        .map(|(id, mut object)| {
            for reference in object.refs_mut() {
                if let Some(to) = applicable.get(reference.id.as_str()) {
                    reference.id = to.to_string();
                }
            }
            let id = applicable
                .get(id.as_str())
                .map_or(id.clone(), |to| to.to_string());
            (id, object)
        })
        .collect()
}

/// Build the provision graph of `objects`. Every node starts out `New`.
pub fn resolve_graph(
    objects: &BTreeMap<String, SourceObject>,
    act_key: &str,
) -> Result<ProvisionGraph, StateError> {
    let resolver = Resolver {
        index: objects
            .iter()
            .map(|(id, object)| (id.as_str(), object.kind()))
            .collect(),
        act_key,
    };

    let mut graph = ProvisionGraph::default();
    for (id, object) in objects {
        let identification = id.clone();
        let object_status = ObjectStatus::New;
        match object {
            SourceObject::AdministrativeArea {
                source_uuid,
                administrative_borders_id,
                domain,
                valid_on,
                title,
            } => graph.administrative_areas.push(AdministrativeAreaNode {
                identification,
                object_status,
                procedure_status: None,
                source_uuid: source_uuid.clone(),
                administrative_borders_id: administrative_borders_id.clone(),
                domain: domain.clone(),
                valid_on: valid_on.clone(),
                title: title.clone(),
            }),
            SourceObject::AreaBoundary {
                source_uuid,
                administrative_area,
            } => graph.area_boundaries.push(AreaBoundaryNode {
                identification,
                object_status,
                procedure_status: None,
                source_uuid: source_uuid.clone(),
                location_ref: resolver.location(id, administrative_area)?,
            }),
            SourceObject::Area {
                source_code,
                title,
                geometry_ref,
            } => graph.areas.push(AreaNode {
                identification,
                object_status,
                procedure_status: None,
                source_code: source_code.clone(),
                title: title.clone(),
                geometry_ref: geometry_ref.clone(),
            }),
            SourceObject::AreaGroup {
                source_code,
                title,
                areas,
            } => graph.area_groups.push(AreaGroupNode {
                identification,
                object_status,
                procedure_status: None,
                source_code: source_code.clone(),
                title: title.clone(),
                area_refs: resolver.locations(id, areas)?,
            }),
            SourceObject::AreaIndication {
                source_code,
                title,
                indication_type,
                indication_group,
                locations,
            } => graph.area_indications.push(AreaIndicationNode {
                identification,
                object_status,
                procedure_status: None,
                source_code: source_code.clone(),
                title: title.clone(),
                indication_type: indication_type.clone(),
                indication_group: indication_group.clone(),
                location_refs: resolver.locations(id, locations)?,
            }),
            SourceObject::Division {
                source_uuid,
                source_code,
                wid,
            } => graph.divisions.push(DivisionNode {
                identification,
                object_status,
                procedure_status: None,
                source_uuid: source_uuid.clone(),
                source_code: source_code.clone(),
                wid: wid.clone(),
            }),
            SourceObject::DivisionText {
                source_uuid,
                source_code,
                wid,
            } => graph.division_texts.push(DivisionTextNode {
                identification,
                object_status,
                procedure_status: None,
                source_uuid: source_uuid.clone(),
                source_code: source_code.clone(),
                wid: wid.clone(),
            }),
            SourceObject::TextSegment {
                source_uuid,
                source_code,
                idealization,
                text,
                locations,
                indications,
            } => graph.text_segments.push(TextSegmentNode {
                identification,
                object_status,
                procedure_status: None,
                source_uuid: source_uuid.clone(),
                source_code: source_code.clone(),
                idealization: idealization.clone(),
                text_ref: resolver.text(id, text)?,
                location_refs: resolver.locations(id, locations)?,
                indication_refs: indications
                    .iter()
                    .map(|target| resolver.indication(id, target))
                    .collect::<Result<_, _>>()?,
            }),
        }
    }
    Ok(graph)
}

struct Resolver<'a> {
    index: BTreeMap<&'a str, NodeKind>,
    act_key: &'a str,
}

impl Resolver<'_> {
    fn invalid(&self, message: String) -> StateError {
        StateError::InvalidReference {
            act_key: self.act_key.to_string(),
            message,
        }
    }

    /// Whether `target` is present in the submission.
    fn is_present(&self, from: &str, target: &SourceRef) -> Result<bool, StateError> {
        match self.index.get(target.id.as_str()) {
            None => Ok(false),
            Some(kind) if *kind == target.kind => Ok(true),
            Some(kind) => Err(self.invalid(format!(
                "`{from}` refers to `{}` as {}, but it is {kind}",
                target.id, target.kind
            ))),
        }
    }

    fn location(&self, from: &str, target: &SourceRef) -> Result<LocationRef, StateError> {
        let present = self.is_present(from, target)?;
        let reference = target.id.clone();
        let target_code = target.key.clone();
        match (target.kind, present) {
            (NodeKind::AdministrativeArea, true) => Ok(LocationRef::AdministrativeArea { reference }),
            (NodeKind::AdministrativeArea, false) => Ok(LocationRef::UnresolvedAdministrativeArea),
            (NodeKind::Area, true) => Ok(LocationRef::Area {
                target_code,
                reference,
            }),
            (NodeKind::Area, false) => Ok(LocationRef::UnresolvedArea { target_code }),
            (NodeKind::AreaGroup, true) => Ok(LocationRef::AreaGroup {
                target_code,
                reference,
            }),
            (NodeKind::AreaGroup, false) => Ok(LocationRef::UnresolvedAreaGroup { target_code }),
            (other, _) => Err(self.invalid(format!(
                "`{from}` uses {other} `{}` as a location",
                target.id
            ))),
        }
    }

    fn locations(&self, from: &str, targets: &[SourceRef]) -> Result<Vec<LocationRef>, StateError> {
        targets
            .iter()
            .map(|target| self.location(from, target))
            .collect()
    }

    fn text(&self, from: &str, target: &SourceRef) -> Result<TextRef, StateError> {
        let present = self.is_present(from, target)?;
        let reference = target.id.clone();
        let target_wid = target.key.clone();
        match (target.kind, present) {
            (NodeKind::Division, true) => Ok(TextRef::Division {
                target_wid,
                reference,
            }),
            (NodeKind::Division, false) => Ok(TextRef::UnresolvedDivision { target_wid }),
            (NodeKind::DivisionText, true) => Ok(TextRef::DivisionText {
                target_wid,
                reference,
            }),
            (NodeKind::DivisionText, false) => Ok(TextRef::UnresolvedDivisionText { target_wid }),
            (other, _) => Err(self.invalid(format!(
                "`{from}` annotates {other} `{}` instead of a provision text",
                target.id
            ))),
        }
    }

    fn indication(&self, from: &str, target: &SourceRef) -> Result<IndicationRef, StateError> {
        if target.kind != NodeKind::AreaIndication {
            return Err(self.invalid(format!(
                "`{from}` uses {} `{}` as an area indication",
                target.kind, target.id
            )));
        }
        let target_key = target.key.clone();
        if self.is_present(from, target)? {
            Ok(IndicationRef::AreaIndication {
                target_key,
                reference: target.id.clone(),
            })
        } else {
            Ok(IndicationRef::UnresolvedAreaIndication { target_key })
        }
    }
}
