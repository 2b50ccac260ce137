//! Mutation or new work: how an incoming act relates to the act in force.

use crate::context::{MutationContext, PublicationBuildContext, RemovedGio, SubmittedGio};
use crate::resolve::rename_identifications;
use pubstate_kernel::{ActiveAct, ActiveState, Frbr, Gio, GioLocation, StateError, act_key};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationPath {
    /// Nothing is in force at the act's key.
    Fresh,
    /// The act in force is republished under the same work.
    Mutation(Box<ActMutation>),
}

impl PublicationPath {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Mutation(_))
    }
}

/// Decide the path of a publication of `act_frbr` at
/// `(document_type, procedure_type)`.
///
/// A different work-other at an occupied key is a new legal work, which is
/// not supported. A mutation must publish a later expression than the one
/// in force, so `(work key, expression version)` stays unique.
pub fn decide(
    state: &ActiveState,
    act_frbr: &Frbr,
    document_type: &str,
    procedure_type: &str,
) -> Result<PublicationPath, StateError> {
    let key = act_key(document_type, procedure_type);
    act_frbr
        .validate()
        .map_err(|message| StateError::InvalidIdentifier {
            act_key: key.clone(),
            message,
        })?;
    let Some(active) = state.act(document_type, procedure_type) else {
        debug!(act_key = %key, "no act in force; fresh publication");
        return Ok(PublicationPath::Fresh);
    };

    if active.act_frbr.work_other != act_frbr.work_other {
        return Err(StateError::UnsupportedNewWork {
            act_key: key,
            active_work_other: active.act_frbr.work_other.clone(),
            incoming_work_other: act_frbr.work_other.clone(),
        });
    }
    if act_frbr.expression_version <= active.act_frbr.expression_version {
        return Err(StateError::ExpressionNotAdvanced {
            act_key: key,
            active_version: active.act_frbr.expression_version,
            incoming_version: act_frbr.expression_version,
        });
    }

    info!(
        act_key = %key,
        work_other = %act_frbr.work_other,
        consolidated_version = active.act_frbr.expression_version,
        "publication mutates the act in force"
    );
    Ok(PublicationPath::Mutation(Box::new(ActMutation {
        active_act: active.clone(),
    })))
}

/// The act in force that a mutation continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActMutation {
    active_act: ActiveAct,
}

impl ActMutation {
    pub fn active_act(&self) -> &ActiveAct {
        &self.active_act
    }

    /// Splice the identifiers already in force into `ctx`.
    ///
    /// Documents are matched by object id and gios by key: unchanged content
    /// keeps its identity and expression, changed content keeps its work and
    /// gets the next expression. Provision objects take over the
    /// identification of the live prior node with the same content key.
    pub fn patch(&self, ctx: &mut PublicationBuildContext) {
        self.patch_gios(&mut ctx.gios);
        self.patch_documents(ctx);
        ctx.asset_uuids
            .extend(self.active_act.assets.keys().cloned());
        self.patch_identifications(ctx);

        let removed_gios = self.removed_gios(&ctx.gios);
        debug!(
            act_key = %ctx.act_key(),
            removed_gios = removed_gios.len(),
            "patched build context from the act in force"
        );
        ctx.mutation = Some(MutationContext {
            consolidated_act_frbr: self.active_act.act_frbr.clone(),
            consolidated_act_text: self.active_act.act_text.clone(),
            known_wid_map: self.active_act.wid_data.known_wid_map.clone(),
            known_wids: self.active_act.wid_data.known_wids.clone(),
            removed_gios,
        });
    }

    fn patch_gios(&self, gios: &mut [SubmittedGio]) {
        for gio in gios {
            let Some(existing) = self.active_act.gios.get(&gio.key()) else {
                continue;
            };
            gio.owner_act = existing.owner_act.clone();
            if same_geometry(existing, gio) {
                gio.is_new = false;
                gio.frbr = existing.frbr.clone();
                for location in &mut gio.locations {
                    if let Some(previous) = existing
                        .locations
                        .iter()
                        .find(|previous| previous.source_code == location.source_code)
                    {
                        location.basisgeo_id = previous.basisgeo_id.clone();
                    }
                }
            } else {
                gio.is_new = true;
                gio.frbr = continue_work(&existing.frbr, &gio.frbr);
            }
        }
    }

    fn patch_documents(&self, ctx: &mut PublicationBuildContext) {
        for submitted in &mut ctx.documents {
            let Some(existing) = self.active_act.documents.get(&submitted.document.object_id)
            else {
                continue;
            };
            let document = &mut submitted.document;
            document.owner_act = existing.owner_act.clone();
            if document.hash == existing.hash {
                submitted.is_new = false;
                document.uuid = existing.uuid.clone();
                document.frbr = existing.frbr.clone();
            } else {
                submitted.is_new = true;
                document.frbr = continue_work(&existing.frbr, &document.frbr);
            }
        }
    }

    fn patch_identifications(&self, ctx: &mut PublicationBuildContext) {
        let prior = &self.active_act.graph;
        let renames: BTreeMap<String, String> = ctx
            .source_objects
            .iter()
            .filter_map(|(id, object)| {
                prior
                    .identification_for(object.kind(), object.content_key())
                    .filter(|previous| *previous != id)
                    .map(|previous| (id.clone(), previous.to_string()))
            })
            .collect();
        if renames.is_empty() {
            return;
        }
        let objects = std::mem::take(&mut ctx.source_objects);
        ctx.source_objects = rename_identifications(objects, &renames);
    }

    fn removed_gios(&self, submitted: &[SubmittedGio]) -> Vec<RemovedGio> {
        let keys: BTreeSet<String> = submitted.iter().map(SubmittedGio::key).collect();
        self.active_act
            .gios
            .iter()
            .filter(|(key, _)| !keys.contains(*key))
            .map(|(key, gio)| RemovedGio {
                key: key.clone(),
                title: gio.title.clone(),
                owner_act: gio.owner_act.clone(),
                frbr: gio.frbr.clone(),
            })
            .collect()
    }
}

/// Same locations (by source code) with the same geometry hashes.
fn same_geometry(existing: &Gio, submitted: &SubmittedGio) -> bool {
    let hashes = |locations: &[GioLocation]| -> BTreeMap<String, String> {
        locations
            .iter()
            .map(|location| (location.source_code.clone(), location.source_hash.clone()))
            .collect()
    };
    existing.locations.len() == submitted.locations.len()
        && hashes(&existing.locations) == hashes(&submitted.locations)
}

/// The work of `existing`, at the next expression.
fn continue_work(existing: &Frbr, submitted: &Frbr) -> Frbr {
    Frbr {
        work_province_id: existing.work_province_id.clone(),
        work_country: existing.work_country.clone(),
        work_date: existing.work_date.clone(),
        work_other: existing.work_other.clone(),
        expression_language: submitted.expression_language.clone(),
        expression_date: submitted.expression_date.clone(),
        expression_version: existing.expression_version + 1,
    }
}
