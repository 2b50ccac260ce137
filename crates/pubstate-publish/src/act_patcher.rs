//! Derive the next active state from an act publication.
//!
//! The patcher never merges: it assembles a complete `AddPublication` from
//! the build context (already patched on the mutation path) and an
//! `AddPurpose` for the consolidation purpose, and applies both to a copy of
//! the current state.

use crate::config::EngineConfig;
use crate::context::{PublicationBuildContext, SubmittedAreaIndication};
use crate::error::PublishError;
use crate::resolve::resolve_graph;
use pubstate_kernel::ladder::asset_uuids;
use pubstate_kernel::{
    Action, ActiveState, AddPublication, AreaGroup, AreaIndication, Asset, Document, Gio,
    ObjectStatus, ProvisionGraph, StateError, WidData, gio_key,
};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn wid_attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bwId="([^"]+)""#).expect("wId regex must compile"))
}

pub struct ActStatePatcher<'a> {
    ctx: &'a PublicationBuildContext,
    config: &'a EngineConfig,
}

impl<'a> ActStatePatcher<'a> {
    pub fn new(ctx: &'a PublicationBuildContext, config: &'a EngineConfig) -> Self {
        Self { ctx, config }
    }

    /// `AddPublication` followed by `AddPurpose`.
    pub fn actions(&self, state: &ActiveState) -> Result<Vec<Action>, PublishError> {
        let ctx = self.ctx;
        let key = ctx.act_key();
        if ctx.act_text.trim().is_empty() {
            return Err(PublishError::MissingActText { act_key: key });
        }
        for frbr in [&ctx.act_frbr, &ctx.bill_frbr] {
            frbr.validate()
                .map_err(|message| StateError::InvalidIdentifier {
                    act_key: key.clone(),
                    message,
                })?;
        }

        let gios: BTreeMap<String, Gio> = ctx
            .gios
            .iter()
            .map(|gio| (gio.key(), gio.to_gio()))
            .collect();
        let area_groups = self.area_groups(&gios);
        let area_indications = ctx
            .area_indications
            .iter()
            .map(|indication| (indication.uuid.clone(), area_indication(indication)))
            .collect();

        let graph = self.graph(state, &key)?;
        let publication = AddPublication {
            act_frbr: ctx.act_frbr.clone(),
            bill_frbr: ctx.bill_frbr.clone(),
            purpose: ctx.purpose.to_purpose(),
            document_type: ctx.document_type.clone(),
            procedure_type: ctx.procedure_type.clone(),
            gios,
            area_groups,
            area_indications,
            documents: self.documents(),
            assets: self.assets(&key)?,
            wid_data: self.wid_data(),
            graph,
            act_text: ctx.act_text.clone(),
            publication_version_uuid: ctx.publication_version_uuid.to_string(),
        };
        debug!(
            act_key = %key,
            gios = publication.gios.len(),
            documents = publication.documents.len(),
            nodes = publication.graph.len(),
            "assembled publication"
        );

        Ok(vec![
            Action::AddPublication(Box::new(publication)),
            Action::AddPurpose(ctx.purpose.to_action()),
        ])
    }

    pub fn apply(&self, state: &ActiveState) -> Result<ActiveState, PublishError> {
        Ok(state.apply_all(self.actions(state)?))
    }

    fn graph(&self, state: &ActiveState, key: &str) -> Result<ProvisionGraph, PublishError> {
        let mut graph = resolve_graph(&self.ctx.source_objects, key)?;
        match state.acts.get(key) {
            Some(prior) => graph = graph.reconcile(&prior.graph),
            None => graph.mark_all(ObjectStatus::New),
        }
        if self.config.validate_graph {
            graph.validate(key, self.config.is_draft(&self.ctx.procedure_type))?;
        }
        Ok(graph)
    }

    fn area_groups(&self, gios: &BTreeMap<String, Gio>) -> BTreeMap<String, AreaGroup> {
        self.ctx
            .area_groups
            .iter()
            .map(|group| {
                let source_area_codes: BTreeSet<String> =
                    group.source_area_codes.iter().cloned().collect();
                let gio_keys = gios
                    .iter()
                    .filter(|(_, gio)| !gio.source_codes.is_disjoint(&source_area_codes))
                    .map(|(key, _)| key.clone())
                    .collect();
                let resolved = AreaGroup {
                    uuid: group.uuid.clone(),
                    code: group.code.clone(),
                    title: group.title.clone(),
                    source_area_codes,
                    gio_keys,
                };
                (group.code.clone(), resolved)
            })
            .collect()
    }

    fn documents(&self) -> BTreeMap<i64, Document> {
        self.ctx
            .documents
            .iter()
            .map(|submitted| (submitted.document.object_id, submitted.document.clone()))
            .collect()
    }

    /// Assets named by the act text. Each must be available to the package.
    fn assets(&self, key: &str) -> Result<BTreeMap<String, Asset>, PublishError> {
        let used = asset_uuids(&self.ctx.act_text).map_err(|message| PublishError::InvalidAsset {
            act_key: key.to_string(),
            message,
        })?;
        if let Some(missing) = used.iter().find(|uuid| !self.ctx.asset_uuids.contains(*uuid)) {
            return Err(PublishError::InvalidAsset {
                act_key: key.to_string(),
                message: format!("act text uses asset `{missing}` which is not available"),
            });
        }
        Ok(used
            .into_iter()
            .map(|uuid| (uuid.clone(), Asset { uuid }))
            .collect())
    }

    fn wid_data(&self) -> WidData {
        let declared = &self.ctx.wid_usage;
        if !self.config.scan_act_text_for_wids {
            return declared.clone();
        }

        let in_text: BTreeSet<&str> = wid_attribute_re()
            .captures_iter(&self.ctx.act_text)
            .filter_map(|captures| captures.get(1))
            .map(|wid| wid.as_str())
            .collect();
        let known_wids: Vec<String> = declared
            .known_wids
            .iter()
            .filter(|wid| in_text.contains(wid.as_str()))
            .cloned()
            .collect();
        let dropped = declared.known_wids.len() - known_wids.len();
        if dropped > 0 {
            warn!(
                act_key = %self.ctx.act_key(),
                dropped,
                "declared WIDs missing from the act text"
            );
        }
        WidData {
            known_wid_map: declared
                .known_wid_map
                .iter()
                .filter(|(_, wid)| in_text.contains(wid.as_str()))
                .map(|(code, wid)| (code.clone(), wid.clone()))
                .collect(),
            known_wids,
        }
    }
}

fn area_indication(indication: &SubmittedAreaIndication) -> AreaIndication {
    let source_area_codes: BTreeSet<String> =
        indication.source_area_codes.iter().cloned().collect();
    AreaIndication {
        uuid: indication.uuid.clone(),
        indication_type: indication.indication_type.clone(),
        indication_group: indication.indication_group.clone(),
        title: indication.title.clone(),
        source_target_codes: indication.source_target_codes.iter().cloned().collect(),
        gio_key: gio_key(&source_area_codes),
        source_area_codes,
    }
}
