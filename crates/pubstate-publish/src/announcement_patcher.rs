//! Derive the next active state from an announcement.

use crate::context::AnnouncementContext;
use pubstate_kernel::{Action, ActiveState, AddAnnouncement};

pub struct AnnouncementStatePatcher<'a> {
    ctx: &'a AnnouncementContext,
}

impl<'a> AnnouncementStatePatcher<'a> {
    pub fn new(ctx: &'a AnnouncementContext) -> Self {
        Self { ctx }
    }

    pub fn action(&self) -> Action {
        Action::AddAnnouncement(AddAnnouncement {
            doc_frbr: self.ctx.doc_frbr.clone(),
            about_act_frbr: self.ctx.about_act_frbr.clone(),
            about_bill_frbr: self.ctx.about_bill_frbr.clone(),
            document_type: self.ctx.document_type.clone(),
            procedure_type: self.ctx.procedure_type.clone(),
        })
    }

    pub fn apply(&self, state: &ActiveState) -> ActiveState {
        state.apply(self.action())
    }
}
