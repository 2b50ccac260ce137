//! Active-state mutator.
//!
//! Applying an action never touches the receiver: the state is cloned, the
//! clone is mutated, and the clone is returned.

use crate::action::{Action, AddAnnouncement, AddPublication, AddPurpose};
use crate::error::StateError;
use crate::frbr::WorkClass;
use crate::schema::common::{ActiveAnnouncement, act_key};
use crate::schema::v7::{ActiveAct, ActiveState};
use crate::schema::VersionedState;
use tracing::debug;

impl ActiveState {
    /// The state that results from applying `action` to this one.
    pub fn apply(&self, action: Action) -> ActiveState {
        let mut next = self.clone();
        next.apply_in_place(action);
        next
    }

    /// Apply `actions` in order.
    pub fn apply_all(&self, actions: impl IntoIterator<Item = Action>) -> ActiveState {
        let mut next = self.clone();
        for action in actions {
            next.apply_in_place(action);
        }
        next
    }

    fn apply_in_place(&mut self, action: Action) {
        match action {
            Action::AddPurpose(purpose) => self.add_purpose(purpose),
            Action::AddPublication(publication) => self.add_publication(*publication),
            Action::AddAnnouncement(announcement) => self.add_announcement(announcement),
        }
    }

    fn add_purpose(&mut self, action: AddPurpose) {
        let purpose = action.to_purpose();
        let key = purpose.work_key();
        debug!(work_key = %key, purpose_type = purpose.purpose_type.as_str(), "upsert purpose");
        self.purposes.insert(key, purpose);
    }

    fn add_publication(&mut self, action: AddPublication) {
        let key = action.key();
        let replaced = self.acts.contains_key(&key);
        debug!(
            act_key = %key,
            expression = %action.act_frbr.expression_uri(WorkClass::Act),
            replaced,
            "install publication"
        );
        let act = ActiveAct {
            act_frbr: action.act_frbr,
            bill_frbr: action.bill_frbr,
            consolidation_purpose: action.purpose,
            document_type: action.document_type,
            procedure_type: action.procedure_type,
            gios: action.gios,
            area_groups: action.area_groups,
            area_indications: action.area_indications,
            documents: action.documents,
            assets: action.assets,
            wid_data: action.wid_data,
            graph: action.graph,
            act_text: action.act_text,
            publication_version_uuid: action.publication_version_uuid,
        };
        self.acts.insert(key, act);
    }

    fn add_announcement(&mut self, action: AddAnnouncement) {
        let key = act_key(&action.document_type, &action.procedure_type);
        debug!(announcement_key = %key, "upsert announcement");
        self.announcements.insert(
            key,
            ActiveAnnouncement {
                doc_frbr: action.doc_frbr,
                about_act_frbr: action.about_act_frbr,
                about_bill_frbr: action.about_bill_frbr,
                document_type: action.document_type,
                procedure_type: action.procedure_type,
            },
        );
    }
}

impl VersionedState {
    /// Apply an action to a snapshot of any version.
    ///
    /// Only the terminal version has transitions; older snapshots must be
    /// migrated first.
    pub fn apply(&self, action: Action) -> Result<VersionedState, StateError> {
        match self {
            Self::V7(state) => Ok(Self::V7(state.apply(action))),
            other => Err(StateError::UnhandledActionVariant {
                action: action.name(),
                schema_version: other.schema_version(),
            }),
        }
    }
}
