//! Provision graph: geographic and legal-provision objects held by an act.
//!
//! Nodes are typed (administrative area, area boundary, area, area group,
//! area indication, division, division text, text segment). Each carries an
//! `identification` assigned by the rendering stage, a lifecycle status,
//! and references to other nodes. References are closed variants: either
//! resolved (pointing at a node identification) or unresolved (carrying only
//! the target's natural key).
//!
//! Nodes are matched across publications by their *content key*, never by
//! identification or submission order.

use crate::error::StateError;
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const ADMINISTRATIVE_AREA_KEY: &str = "administrative_area";
pub const AREA_BOUNDARY_KEY: &str = "area_boundary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    AdministrativeArea,
    AreaBoundary,
    Area,
    AreaGroup,
    AreaIndication,
    Division,
    DivisionText,
    TextSegment,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdministrativeArea => "administrative_area",
            Self::AreaBoundary => "area_boundary",
            Self::Area => "area",
            Self::AreaGroup => "area_group",
            Self::AreaIndication => "area_indication",
            Self::Division => "division",
            Self::DivisionText => "division_text",
            Self::TextSegment => "text_segment",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a node relative to the previous publication of its act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    New,
    Changed,
    #[default]
    Unchanged,
    Deleted,
}

// ── References ──

/// Reference to a location: the administrative area, an area, or an area group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref_type", rename_all = "snake_case")]
pub enum LocationRef {
    AdministrativeArea {
        #[serde(rename = "ref")]
        reference: String,
    },
    UnresolvedAdministrativeArea,
    Area {
        target_code: String,
        #[serde(rename = "ref")]
        reference: String,
    },
    UnresolvedArea {
        target_code: String,
    },
    AreaGroup {
        target_code: String,
        #[serde(rename = "ref")]
        reference: String,
    },
    UnresolvedAreaGroup {
        target_code: String,
    },
}

/// Reference to an area indication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref_type", rename_all = "snake_case")]
pub enum IndicationRef {
    AreaIndication {
        target_key: String,
        #[serde(rename = "ref")]
        reference: String,
    },
    UnresolvedAreaIndication {
        target_key: String,
    },
}

/// Reference from a text segment to the provision text it annotates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref_type", rename_all = "snake_case")]
pub enum TextRef {
    Division {
        target_wid: String,
        #[serde(rename = "ref")]
        reference: String,
    },
    UnresolvedDivision {
        target_wid: String,
    },
    DivisionText {
        target_wid: String,
        #[serde(rename = "ref")]
        reference: String,
    },
    UnresolvedDivisionText {
        target_wid: String,
    },
}

/// A reference reduced to what validation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefTarget<'a> {
    pub kind: NodeKind,
    pub reference: Option<&'a str>,
    pub target_key: &'a str,
}

fn remap_id(reference: &mut String, remap: &BTreeMap<String, String>) {
    if let Some(replacement) = remap.get(reference.as_str()) {
        *reference = replacement.clone();
    }
}

impl LocationRef {
    pub fn target(&self) -> RefTarget<'_> {
        match self {
            Self::AdministrativeArea { reference } => RefTarget {
                kind: NodeKind::AdministrativeArea,
                reference: Some(reference),
                target_key: ADMINISTRATIVE_AREA_KEY,
            },
            Self::UnresolvedAdministrativeArea => RefTarget {
                kind: NodeKind::AdministrativeArea,
                reference: None,
                target_key: ADMINISTRATIVE_AREA_KEY,
            },
            Self::Area {
                target_code,
                reference,
            } => RefTarget {
                kind: NodeKind::Area,
                reference: Some(reference),
                target_key: target_code,
            },
            Self::UnresolvedArea { target_code } => RefTarget {
                kind: NodeKind::Area,
                reference: None,
                target_key: target_code,
            },
            Self::AreaGroup {
                target_code,
                reference,
            } => RefTarget {
                kind: NodeKind::AreaGroup,
                reference: Some(reference),
                target_key: target_code,
            },
            Self::UnresolvedAreaGroup { target_code } => RefTarget {
                kind: NodeKind::AreaGroup,
                reference: None,
                target_key: target_code,
            },
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target().reference.is_some()
    }

    fn remap(&mut self, remap: &BTreeMap<String, String>) {
        match self {
            Self::AdministrativeArea { reference }
            | Self::Area { reference, .. }
            | Self::AreaGroup { reference, .. } => remap_id(reference, remap),
            Self::UnresolvedAdministrativeArea
            | Self::UnresolvedArea { .. }
            | Self::UnresolvedAreaGroup { .. } => {}
        }
    }
}

impl IndicationRef {
    pub fn target(&self) -> RefTarget<'_> {
        match self {
            Self::AreaIndication {
                target_key,
                reference,
            } => RefTarget {
                kind: NodeKind::AreaIndication,
                reference: Some(reference),
                target_key,
            },
            Self::UnresolvedAreaIndication { target_key } => RefTarget {
                kind: NodeKind::AreaIndication,
                reference: None,
                target_key,
            },
        }
    }

    fn remap(&mut self, remap: &BTreeMap<String, String>) {
        if let Self::AreaIndication { reference, .. } = self {
            remap_id(reference, remap);
        }
    }
}

impl TextRef {
    pub fn target(&self) -> RefTarget<'_> {
        match self {
            Self::Division {
                target_wid,
                reference,
            } => RefTarget {
                kind: NodeKind::Division,
                reference: Some(reference),
                target_key: target_wid,
            },
            Self::UnresolvedDivision { target_wid } => RefTarget {
                kind: NodeKind::Division,
                reference: None,
                target_key: target_wid,
            },
            Self::DivisionText {
                target_wid,
                reference,
            } => RefTarget {
                kind: NodeKind::DivisionText,
                reference: Some(reference),
                target_key: target_wid,
            },
            Self::UnresolvedDivisionText { target_wid } => RefTarget {
                kind: NodeKind::DivisionText,
                reference: None,
                target_key: target_wid,
            },
        }
    }

    fn remap(&mut self, remap: &BTreeMap<String, String>) {
        match self {
            Self::Division { reference, .. } | Self::DivisionText { reference, .. } => {
                remap_id(reference, remap)
            }
            Self::UnresolvedDivision { .. } | Self::UnresolvedDivisionText { .. } => {}
        }
    }
}

// ── Nodes ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrativeAreaNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_uuid: String,
    pub administrative_borders_id: String,
    pub domain: String,
    pub valid_on: String,
    pub title: String,
}

/// The area a regulation as a whole applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaBoundaryNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_uuid: String,
    pub location_ref: LocationRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_code: String,
    pub title: String,
    pub geometry_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaGroupNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_code: String,
    pub title: String,
    pub area_refs: Vec<LocationRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaIndicationNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_code: String,
    pub title: String,
    pub indication_type: String,
    pub indication_group: String,
    pub location_refs: Vec<LocationRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_uuid: String,
    pub source_code: String,
    pub wid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionTextNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_uuid: String,
    pub source_code: String,
    pub wid: String,
}

/// Annotation binding a provision text to its locations and indications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegmentNode {
    pub identification: String,
    pub object_status: ObjectStatus,
    pub procedure_status: Option<String>,
    pub source_uuid: String,
    pub source_code: String,
    pub idealization: String,
    pub text_ref: TextRef,
    pub location_refs: Vec<LocationRef>,
    pub indication_refs: Vec<IndicationRef>,
}

/// Behavior shared by every node kind.
pub trait GraphNode: Clone + Serialize {
    const KIND: NodeKind;

    fn identification(&self) -> &str;
    fn set_identification(&mut self, identification: String);
    fn object_status(&self) -> ObjectStatus;
    fn set_object_status(&mut self, status: ObjectStatus);

    /// Natural key used to match this node across publications.
    fn content_key(&self) -> String;

    fn refs(&self) -> Vec<RefTarget<'_>> {
        Vec::new()
    }

    fn remap_refs(&mut self, _remap: &BTreeMap<String, String>) {}

    /// Hash of the substantive content: excludes identification and status.
    fn content_hash(&self) -> ContentHash {
        let mut value = serde_json::to_value(self).expect("graph node must serialize");
        if let Value::Object(map) = &mut value {
            map.remove("identification");
            map.remove("object_status");
            map.remove("procedure_status");
        }
        ContentHash::of_json(&value)
    }
}

macro_rules! node_accessors {
    ($kind:expr) => {
        const KIND: NodeKind = $kind;

        fn identification(&self) -> &str {
            &self.identification
        }

        fn set_identification(&mut self, identification: String) {
            self.identification = identification;
        }

        fn object_status(&self) -> ObjectStatus {
            self.object_status
        }

        fn set_object_status(&mut self, status: ObjectStatus) {
            self.object_status = status;
        }
    };
}

impl GraphNode for AdministrativeAreaNode {
    node_accessors!(NodeKind::AdministrativeArea);

    fn content_key(&self) -> String {
        ADMINISTRATIVE_AREA_KEY.to_string()
    }
}

impl GraphNode for AreaBoundaryNode {
    node_accessors!(NodeKind::AreaBoundary);

    fn content_key(&self) -> String {
        AREA_BOUNDARY_KEY.to_string()
    }

    fn refs(&self) -> Vec<RefTarget<'_>> {
        vec![self.location_ref.target()]
    }

    fn remap_refs(&mut self, remap: &BTreeMap<String, String>) {
        self.location_ref.remap(remap);
    }
}

impl GraphNode for AreaNode {
    node_accessors!(NodeKind::Area);

    fn content_key(&self) -> String {
        self.source_code.clone()
    }
}

impl GraphNode for AreaGroupNode {
    node_accessors!(NodeKind::AreaGroup);

    fn content_key(&self) -> String {
        self.source_code.clone()
    }

    fn refs(&self) -> Vec<RefTarget<'_>> {
        self.area_refs.iter().map(LocationRef::target).collect()
    }

    fn remap_refs(&mut self, remap: &BTreeMap<String, String>) {
        for location in &mut self.area_refs {
            location.remap(remap);
        }
    }
}

impl GraphNode for AreaIndicationNode {
    node_accessors!(NodeKind::AreaIndication);

    fn content_key(&self) -> String {
        self.source_code.clone()
    }

    fn refs(&self) -> Vec<RefTarget<'_>> {
        self.location_refs.iter().map(LocationRef::target).collect()
    }

    fn remap_refs(&mut self, remap: &BTreeMap<String, String>) {
        for location in &mut self.location_refs {
            location.remap(remap);
        }
    }
}

impl GraphNode for DivisionNode {
    node_accessors!(NodeKind::Division);

    fn content_key(&self) -> String {
        self.wid.clone()
    }
}

impl GraphNode for DivisionTextNode {
    node_accessors!(NodeKind::DivisionText);

    fn content_key(&self) -> String {
        self.wid.clone()
    }
}

impl GraphNode for TextSegmentNode {
    node_accessors!(NodeKind::TextSegment);

    fn content_key(&self) -> String {
        self.source_code.clone()
    }

    fn refs(&self) -> Vec<RefTarget<'_>> {
        let mut refs = vec![self.text_ref.target()];
        refs.extend(self.location_refs.iter().map(LocationRef::target));
        refs.extend(self.indication_refs.iter().map(IndicationRef::target));
        refs
    }

    fn remap_refs(&mut self, remap: &BTreeMap<String, String>) {
        self.text_ref.remap(remap);
        for location in &mut self.location_refs {
            location.remap(remap);
        }
        for indication in &mut self.indication_refs {
            indication.remap(remap);
        }
    }
}

// ── Graph ──

/// All provision objects of one act, grouped by kind. Empty kinds are
/// left out of the stored payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionGraph {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub administrative_areas: Vec<AdministrativeAreaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub area_boundaries: Vec<AreaBoundaryNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub areas: Vec<AreaNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub area_groups: Vec<AreaGroupNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub area_indications: Vec<AreaIndicationNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub divisions: Vec<DivisionNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub division_texts: Vec<DivisionTextNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_segments: Vec<TextSegmentNode>,
}

/// Visit every node list of a graph with one generic body.
macro_rules! each_kind {
    ($graph:expr, |$nodes:ident| $body:expr) => {{
        {
            let $nodes = &$graph.administrative_areas;
            $body;
        }
        {
            let $nodes = &$graph.area_boundaries;
            $body;
        }
        {
            let $nodes = &$graph.areas;
            $body;
        }
        {
            let $nodes = &$graph.area_groups;
            $body;
        }
        {
            let $nodes = &$graph.area_indications;
            $body;
        }
        {
            let $nodes = &$graph.divisions;
            $body;
        }
        {
            let $nodes = &$graph.division_texts;
            $body;
        }
        {
            let $nodes = &$graph.text_segments;
            $body;
        }
    }};
}

impl ProvisionGraph {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        let mut total = 0;
        each_kind!(self, |nodes| total += nodes.len());
        total
    }

    /// Set every node's status, e.g. `New` on a first publication.
    pub fn mark_all(&mut self, status: ObjectStatus) {
        fn mark<N: GraphNode>(nodes: &mut [N], status: ObjectStatus) {
            for node in nodes {
                node.set_object_status(status);
            }
        }
        mark(&mut self.administrative_areas, status);
        mark(&mut self.area_boundaries, status);
        mark(&mut self.areas, status);
        mark(&mut self.area_groups, status);
        mark(&mut self.area_indications, status);
        mark(&mut self.divisions, status);
        mark(&mut self.division_texts, status);
        mark(&mut self.text_segments, status);
    }

    /// Identification of the live (non-deleted) node with this content key.
    pub fn identification_for(&self, kind: NodeKind, content_key: &str) -> Option<&str> {
        fn find<'a, N: GraphNode>(nodes: &'a [N], content_key: &str) -> Option<&'a str> {
            nodes
                .iter()
                .find(|node| {
                    node.object_status() != ObjectStatus::Deleted
                        && node.content_key() == content_key
                })
                .map(GraphNode::identification)
        }
        match kind {
            NodeKind::AdministrativeArea => find(&self.administrative_areas, content_key),
            NodeKind::AreaBoundary => find(&self.area_boundaries, content_key),
            NodeKind::Area => find(&self.areas, content_key),
            NodeKind::AreaGroup => find(&self.area_groups, content_key),
            NodeKind::AreaIndication => find(&self.area_indications, content_key),
            NodeKind::Division => find(&self.divisions, content_key),
            NodeKind::DivisionText => find(&self.division_texts, content_key),
            NodeKind::TextSegment => find(&self.text_segments, content_key),
        }
    }

    /// `(kind, content key, status)` for every node, in graph order.
    pub fn statuses(&self) -> Vec<(NodeKind, String, ObjectStatus)> {
        fn collect<N: GraphNode>(nodes: &[N], out: &mut Vec<(NodeKind, String, ObjectStatus)>) {
            out.extend(
                nodes
                    .iter()
                    .map(|node| (N::KIND, node.content_key(), node.object_status())),
            );
        }
        let mut out = Vec::new();
        each_kind!(self, |nodes| collect(nodes, &mut out));
        out
    }

    /// Rewrite node identifications and every reference through `remap`.
    pub fn remap(&mut self, remap: &BTreeMap<String, String>) {
        fn apply<N: GraphNode>(nodes: &mut [N], remap: &BTreeMap<String, String>) {
            for node in nodes {
                if let Some(replacement) = remap.get(node.identification()) {
                    node.set_identification(replacement.clone());
                }
                node.remap_refs(remap);
            }
        }
        apply(&mut self.administrative_areas, remap);
        apply(&mut self.area_boundaries, remap);
        apply(&mut self.areas, remap);
        apply(&mut self.area_groups, remap);
        apply(&mut self.area_indications, remap);
        apply(&mut self.divisions, remap);
        apply(&mut self.division_texts, remap);
        apply(&mut self.text_segments, remap);
    }

    /// Reconcile a freshly submitted graph against the previous publication
    /// of the same act.
    ///
    /// Submitted nodes whose content key matches a live prior node take over
    /// the prior identification (references are rewritten accordingly) and
    /// become `Unchanged` or `Changed` depending on their content hash.
    /// Unmatched nodes are `New`. Live prior nodes missing from the
    /// submission are carried forward as `Deleted`.
    pub fn reconcile(mut self, prior: &ProvisionGraph) -> ProvisionGraph {
        let mut remap = BTreeMap::new();
        collect_remap(&self.administrative_areas, &prior.administrative_areas, &mut remap);
        collect_remap(&self.area_boundaries, &prior.area_boundaries, &mut remap);
        collect_remap(&self.areas, &prior.areas, &mut remap);
        collect_remap(&self.area_groups, &prior.area_groups, &mut remap);
        collect_remap(&self.area_indications, &prior.area_indications, &mut remap);
        collect_remap(&self.divisions, &prior.divisions, &mut remap);
        collect_remap(&self.division_texts, &prior.division_texts, &mut remap);
        collect_remap(&self.text_segments, &prior.text_segments, &mut remap);
        self.remap(&remap);

        ProvisionGraph {
            administrative_areas: settle(self.administrative_areas, &prior.administrative_areas),
            area_boundaries: settle(self.area_boundaries, &prior.area_boundaries),
            areas: settle(self.areas, &prior.areas),
            area_groups: settle(self.area_groups, &prior.area_groups),
            area_indications: settle(self.area_indications, &prior.area_indications),
            divisions: settle(self.divisions, &prior.divisions),
            division_texts: settle(self.division_texts, &prior.division_texts),
            text_segments: settle(self.text_segments, &prior.text_segments),
        }
    }

    /// Check that the graph can be consumed.
    ///
    /// Resolved references must point at a node of the referenced kind in
    /// this graph. Unresolved references are only accepted when
    /// `allow_unresolved` is set (draft procedures). References held by
    /// deleted nodes are not consumed and are not checked.
    pub fn validate(&self, act_key: &str, allow_unresolved: bool) -> Result<(), StateError> {
        let mut index: BTreeMap<NodeKind, BTreeSet<&str>> = BTreeMap::new();
        fn add<'a, N: GraphNode>(nodes: &'a [N], index: &mut BTreeMap<NodeKind, BTreeSet<&'a str>>) {
            let ids = index.entry(N::KIND).or_default();
            ids.extend(nodes.iter().map(GraphNode::identification));
        }
        each_kind!(self, |nodes| add(nodes, &mut index));

        let mut outcome = Ok(());
        each_kind!(self, |nodes| {
            if outcome.is_ok() {
                outcome = check_refs(nodes, &index, act_key, allow_unresolved);
            }
        });
        outcome
    }
}

fn live_by_key<N: GraphNode>(nodes: &[N]) -> BTreeMap<String, &N> {
    nodes
        .iter()
        .filter(|node| node.object_status() != ObjectStatus::Deleted)
        .map(|node| (node.content_key(), node))
        .collect()
}

fn collect_remap<N: GraphNode>(
    submitted: &[N],
    prior: &[N],
    remap: &mut BTreeMap<String, String>,
) {
    let prior_by_key = live_by_key(prior);
    for node in submitted {
        if let Some(previous) = prior_by_key.get(&node.content_key())
            && previous.identification() != node.identification()
        {
            remap.insert(
                node.identification().to_string(),
                previous.identification().to_string(),
            );
        }
    }
}

fn settle<N: GraphNode>(submitted: Vec<N>, prior: &[N]) -> Vec<N> {
    let prior_by_key = live_by_key(prior);
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(submitted.len());

    for mut node in submitted {
        let key = node.content_key();
        let status = match prior_by_key.get(&key) {
            Some(previous) if previous.content_hash() == node.content_hash() => {
                ObjectStatus::Unchanged
            }
            Some(_) => ObjectStatus::Changed,
            None => ObjectStatus::New,
        };
        node.set_object_status(status);
        seen.insert(key);
        out.push(node);
    }

    for (key, previous) in prior_by_key {
        if !seen.contains(&key) {
            let mut removed = previous.clone();
            removed.set_object_status(ObjectStatus::Deleted);
            out.push(removed);
        }
    }

    out.sort_by(|left, right| left.identification().cmp(right.identification()));
    out
}

fn check_refs<N: GraphNode>(
    nodes: &[N],
    index: &BTreeMap<NodeKind, BTreeSet<&str>>,
    act_key: &str,
    allow_unresolved: bool,
) -> Result<(), StateError> {
    for node in nodes {
        if node.object_status() == ObjectStatus::Deleted {
            continue;
        }
        for target in node.refs() {
            match target.reference {
                Some(reference) => {
                    let present = index
                        .get(&target.kind)
                        .is_some_and(|ids| ids.contains(reference));
                    if !present {
                        return Err(StateError::InvalidReference {
                            act_key: act_key.to_string(),
                            message: format!(
                                "{} `{}` references missing {} `{reference}`",
                                N::KIND,
                                node.identification(),
                                target.kind
                            ),
                        });
                    }
                }
                None if allow_unresolved => {}
                None => {
                    return Err(StateError::InvalidReference {
                        act_key: act_key.to_string(),
                        message: format!(
                            "{} `{}` holds an unresolved {} reference to `{}` outside a draft procedure",
                            N::KIND,
                            node.identification(),
                            target.kind,
                            target.target_key
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::{area, group};
    use super::*;

    fn graph(areas: Vec<AreaNode>, groups: Vec<AreaGroupNode>) -> ProvisionGraph {
        ProvisionGraph {
            areas,
            area_groups: groups,
            ..ProvisionGraph::default()
        }
    }

    #[test]
    fn reconcile_reuses_prior_identification_and_rewrites_refs() {
        let prior = graph(
            vec![area("gebied.old-a", "gebied-a", "A")],
            vec![group("groep.old", "groep-1", &[("gebied.old-a", "gebied-a")])],
        );
        let submitted = graph(
            vec![area("gebied.new-a", "gebied-a", "A")],
            vec![group("groep.new", "groep-1", &[("gebied.new-a", "gebied-a")])],
        );

        let reconciled = submitted.reconcile(&prior);
        assert_eq!(reconciled.areas[0].identification, "gebied.old-a");
        assert_eq!(reconciled.areas[0].object_status, ObjectStatus::Unchanged);
        assert_eq!(reconciled.area_groups[0].identification, "groep.old");
        assert_eq!(
            reconciled.area_groups[0].area_refs[0],
            LocationRef::Area {
                target_code: "gebied-a".to_string(),
                reference: "gebied.old-a".to_string(),
            }
        );
        assert_eq!(reconciled.area_groups[0].object_status, ObjectStatus::Unchanged);
    }

    #[test]
    fn reconcile_marks_changed_new_and_deleted() {
        let prior = graph(
            vec![
                area("gebied.1", "gebied-a", "A"),
                area("gebied.2", "gebied-b", "B"),
            ],
            vec![],
        );
        let submitted = graph(
            vec![
                area("gebied.x", "gebied-a", "A renamed"),
                area("gebied.y", "gebied-c", "C"),
            ],
            vec![],
        );

        let reconciled = submitted.reconcile(&prior);
        let statuses = reconciled.statuses();
        assert!(statuses.contains(&(NodeKind::Area, "gebied-a".to_string(), ObjectStatus::Changed)));
        assert!(statuses.contains(&(NodeKind::Area, "gebied-b".to_string(), ObjectStatus::Deleted)));
        assert!(statuses.contains(&(NodeKind::Area, "gebied-c".to_string(), ObjectStatus::New)));
        assert_eq!(reconciled.areas.len(), 3);
    }

    #[test]
    fn reconcile_drops_nodes_already_deleted() {
        let mut gone = area("gebied.2", "gebied-b", "B");
        gone.object_status = ObjectStatus::Deleted;
        let prior = graph(vec![area("gebied.1", "gebied-a", "A"), gone], vec![]);
        let submitted = graph(vec![area("gebied.1", "gebied-a", "A")], vec![]);

        let reconciled = submitted.reconcile(&prior);
        assert_eq!(reconciled.areas.len(), 1);
        assert_eq!(reconciled.areas[0].object_status, ObjectStatus::Unchanged);
    }

    #[test]
    fn validate_rejects_dangling_resolved_reference() {
        let graph = graph(vec![], vec![group("groep.1", "groep-1", &[("gebied.missing", "gebied-x")])]);
        let err = graph
            .validate("vision-final", true)
            .expect_err("dangling reference must fail");
        assert!(matches!(err, StateError::InvalidReference { .. }));
    }

    #[test]
    fn validate_accepts_unresolved_only_for_drafts() {
        let mut node = group("groep.1", "groep-1", &[]);
        node.area_refs.push(LocationRef::UnresolvedArea {
            target_code: "gebied-x".to_string(),
        });
        let graph = graph(vec![], vec![node]);

        assert!(graph.validate("vision-draft", true).is_ok());
        assert!(graph.validate("vision-final", false).is_err());
    }

    #[test]
    fn location_ref_serializes_with_ref_type_tag() {
        let value = serde_json::to_value(LocationRef::AreaGroup {
            target_code: "groep-1".to_string(),
            reference: "nl.imow-pv28.gebiedengroep.1".to_string(),
        })
        .expect("ref serializes");
        assert_eq!(
            value,
            serde_json::json!({
                "ref_type": "area_group",
                "target_code": "groep-1",
                "ref": "nl.imow-pv28.gebiedengroep.1",
            })
        );
        let unit = serde_json::to_value(LocationRef::UnresolvedAdministrativeArea).expect("ref serializes");
        assert_eq!(unit, serde_json::json!({"ref_type": "unresolved_administrative_area"}));
    }
}
