//! # pubstate-publish
//!
//! The publication workflow around the state kernel: decide whether an
//! incoming act continues the act in force or is a new legal work, splice
//! the identifiers already published into the build context, derive the
//! next active state, and record it as a pending snapshot.
//!
//! Rendering, packaging and delivery are collaborators. They hand over a
//! [`PublicationBuildContext`] and later report the delivery outcome.

pub mod act_patcher;
pub mod announcement_patcher;
pub mod config;
pub mod context;
pub mod decider;
pub mod error;
pub mod publish;
pub mod resolve;

pub use act_patcher::ActStatePatcher;
pub use announcement_patcher::AnnouncementStatePatcher;
pub use config::{EngineConfig, LedgerConfig};
pub use context::{
    AnnouncementContext, MutationContext, PublicationBuildContext, PurposeInput, RemovedGio,
    SubmittedAreaGroup, SubmittedAreaIndication, SubmittedDocument, SubmittedGio,
};
pub use decider::{ActMutation, PublicationPath, decide};
pub use error::PublishError;
pub use publish::{LoadedState, PackageType, PublishReport, Publisher};
pub use resolve::{SourceObject, SourceRef, resolve_graph};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::context::*;
    use crate::resolve::{SourceObject, SourceRef};
    use pubstate_kernel::{Document, Frbr, GioLocation, NodeKind, PurposeType, WidData};
    use std::collections::{BTreeMap, BTreeSet};
    use uuid::Uuid;

    pub fn frbr(work_other: &str, version: u32) -> Frbr {
        Frbr {
            work_province_id: "pv28".to_string(),
            work_country: "nl".to_string(),
            work_date: "2024".to_string(),
            work_other: work_other.to_string(),
            expression_language: "nld".to_string(),
            expression_date: "2024-03-01".to_string(),
            expression_version: version,
        }
    }

    pub fn gio_location(code: &str, hash: &str) -> GioLocation {
        GioLocation {
            title: format!("Location {code}"),
            basisgeo_id: format!("basisgeo-{code}"),
            source_hash: hash.to_string(),
            source_code: code.to_string(),
        }
    }

    pub fn submitted_gio(codes: &[&str], locations: Vec<GioLocation>) -> SubmittedGio {
        SubmittedGio {
            source_codes: codes.iter().map(|code| code.to_string()).collect(),
            title: format!("Gio {}", codes.join(" ")),
            frbr: frbr(&format!("gio-{}", codes.join("-")), 1),
            owner_act: "/akn/nl/act/pv28/2024/w1".to_string(),
            background_reference: String::new(),
            background_actuality: String::new(),
            locations,
            is_new: true,
        }
    }

    fn reference(kind: NodeKind, id: &str, key: &str) -> SourceRef {
        SourceRef {
            kind,
            id: id.to_string(),
            key: key.to_string(),
        }
    }

    fn area(code: &str) -> SourceObject {
        SourceObject::Area {
            source_code: code.to_string(),
            title: format!("Area {code}"),
            geometry_ref: format!("basisgeo-{code}"),
        }
    }

    /// A complete publication of `vision-final` under `work_other`.
    pub fn act_context(work_other: &str) -> PublicationBuildContext {
        let wid = format!("pv28_{work_other}__content_o_1");
        let unused_wid = format!("pv28_{work_other}__content_o_2");
        let source_objects = BTreeMap::from([
            ("nl.imow-pv28.gebied.a".to_string(), area("gebied-a")),
            ("nl.imow-pv28.gebied.b".to_string(), area("gebied-b")),
            (
                "nl.imow-pv28.gebiedengroep.1".to_string(),
                SourceObject::AreaGroup {
                    source_code: "groep-1".to_string(),
                    title: "Kustzone".to_string(),
                    areas: vec![
                        reference(NodeKind::Area, "nl.imow-pv28.gebied.a", "gebied-a"),
                        reference(NodeKind::Area, "nl.imow-pv28.gebied.b", "gebied-b"),
                    ],
                },
            ),
            (
                "nl.imow-pv28.divisietekst.1".to_string(),
                SourceObject::DivisionText {
                    source_uuid: "6a0b1c2d-0000-4000-8000-000000000001".to_string(),
                    source_code: "beleidskeuze-1".to_string(),
                    wid: wid.clone(),
                },
            ),
            (
                "nl.imow-pv28.juridischeregel.1".to_string(),
                SourceObject::TextSegment {
                    source_uuid: "6a0b1c2d-0000-4000-8000-000000000002".to_string(),
                    source_code: "beleidskeuze-1".to_string(),
                    idealization: pubstate_kernel::ladder::INDICATIVE_IDEALIZATION.to_string(),
                    text: reference(
                        NodeKind::DivisionText,
                        "nl.imow-pv28.divisietekst.1",
                        &wid,
                    ),
                    locations: vec![reference(
                        NodeKind::AreaGroup,
                        "nl.imow-pv28.gebiedengroep.1",
                        "groep-1",
                    )],
                    indications: vec![],
                },
            ),
        ]);

        PublicationBuildContext {
            act_frbr: frbr(work_other, 1),
            bill_frbr: frbr(&format!("{work_other}-bill"), 1),
            purpose: PurposeInput {
                purpose_type: PurposeType::Consolidation,
                effective_date: None,
                work_province_id: "pv28".to_string(),
                work_date: "2024".to_string(),
                work_other: work_other.to_string(),
            },
            document_type: "vision".to_string(),
            procedure_type: "final".to_string(),
            publication_version_uuid: Uuid::from_u128(0x11),
            act_text: format!(
                "<Lichaam><Divisietekst wId=\"{wid}\"><Inhoud>Kust</Inhoud>\
                 <Illustratie naam=\"img_0f1e2d3c-aaaa-4bbb-8ccc-000000000001.png\"/>\
                 </Divisietekst></Lichaam>"
            ),
            gios: vec![
                submitted_gio(&["gebied-a"], vec![gio_location("gebied-a", "hash-a")]),
                submitted_gio(&["gebied-b"], vec![gio_location("gebied-b", "hash-b")]),
            ],
            area_groups: vec![SubmittedAreaGroup {
                uuid: "c0ffee00-0000-4000-8000-000000000001".to_string(),
                code: "groep-1".to_string(),
                title: "Kustzone".to_string(),
                source_area_codes: vec!["gebied-b".to_string(), "gebied-a".to_string()],
            }],
            area_indications: vec![SubmittedAreaIndication {
                uuid: "indication-1".to_string(),
                indication_type: "water".to_string(),
                indication_group: "kust".to_string(),
                title: "Kustwater".to_string(),
                source_target_codes: vec!["beleidskeuze-1".to_string()],
                source_area_codes: vec!["gebied-a".to_string()],
            }],
            documents: vec![SubmittedDocument {
                document: Document {
                    uuid: "d0c00000-0000-4000-8000-000000000005".to_string(),
                    code: "document-5".to_string(),
                    frbr: frbr("doc-5", 1),
                    filename: "bijlage.pdf".to_string(),
                    title: "Bijlage".to_string(),
                    owner_act: "/akn/nl/act/pv28/2024/w1".to_string(),
                    content_type: "application/pdf".to_string(),
                    object_id: 5,
                    hash: "doc-hash".to_string(),
                },
                is_new: true,
            }],
            asset_uuids: BTreeSet::from(["0f1e2d3c-aaaa-4bbb-8ccc-000000000001".to_string()]),
            source_objects,
            wid_usage: WidData {
                known_wid_map: BTreeMap::from([
                    ("beleidskeuze-1".to_string(), wid.clone()),
                    ("beleidskeuze-2".to_string(), unused_wid.clone()),
                ]),
                known_wids: vec![wid, unused_wid],
            },
            mutation: None,
        }
    }

    pub fn announcement_context(work_other: &str) -> AnnouncementContext {
        AnnouncementContext {
            doc_frbr: frbr(&format!("{work_other}-announcement"), 1),
            about_act_frbr: frbr(work_other, 1),
            about_bill_frbr: frbr(&format!("{work_other}-bill"), 1),
            document_type: "vision".to_string(),
            procedure_type: "final".to_string(),
        }
    }
}
