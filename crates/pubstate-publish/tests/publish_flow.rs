//! End-to-end publication flow against the snapshot ledger.

use chrono::{DateTime, Duration, Utc};
use pubstate_kernel::{NodeKind, ObjectStatus, StateError};
use pubstate_ledger::{LedgerError, Outcome, OutcomeEffect, SnapshotLedger};
use pubstate_publish::{
    EngineConfig, PackageType, PublicationBuildContext, PublishError, Publisher, SourceObject,
};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn fixture() -> PublicationBuildContext {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("publication_vision.json");
    let raw = std::fs::read_to_string(&path).expect("read fixture");
    serde_json::from_str(&raw).expect("parse fixture")
}

fn at(minutes: i64) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
        + Duration::minutes(minutes)
}

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// A stateful workspace with the fixture published and delivered.
fn published_workspace(publisher: &Publisher) -> (SnapshotLedger, Uuid) {
    let mut ledger = SnapshotLedger::default();
    let workspace_id = Uuid::new_v4();
    publisher
        .provision_workspace(&mut ledger, workspace_id, true, at(0))
        .expect("provision");
    let mut ctx = fixture();
    let report = publisher
        .publish_act(&mut ledger, workspace_id, &mut ctx, PackageType::Publication, at(1))
        .expect("publish");
    let snapshot_id = report.created_snapshot_id.expect("pending snapshot");
    assert_eq!(
        ledger
            .apply_outcome(snapshot_id, Outcome::Delivered, at(2))
            .expect("deliver"),
        OutcomeEffect::Activated
    );
    (ledger, workspace_id)
}

/// The fixture republished as expression 2, without `gebied-c` and with
/// `gebied-a` rendered under a fresh identification.
fn republication() -> PublicationBuildContext {
    let mut ctx = fixture();
    ctx.act_frbr.expression_version = 2;
    ctx.publication_version_uuid = Uuid::from_u128(0x2);
    ctx.gios.retain(|gio| gio.key() != "gebied-c");
    ctx.source_objects.remove("nl.imow-pv28.gebied.c");

    let area = ctx
        .source_objects
        .remove("nl.imow-pv28.gebied.a")
        .expect("fixture area");
    ctx.source_objects
        .insert("nl.imow-pv28.gebied.a-rerendered".to_string(), area);
    if let Some(SourceObject::AreaGroup { areas, .. }) =
        ctx.source_objects.get_mut("nl.imow-pv28.gebiedengroep.kust")
    {
        for area in areas.iter_mut().filter(|area| area.key == "gebied-a") {
            area.id = "nl.imow-pv28.gebied.a-rerendered".to_string();
        }
    }
    ctx
}

#[test]
fn first_publication_on_fresh_workspace_becomes_active_once_delivered() {
    let publisher = Publisher::new(EngineConfig::default());
    let mut ledger = SnapshotLedger::default();
    let workspace_id = Uuid::new_v4();
    publisher
        .provision_workspace(&mut ledger, workspace_id, true, at(0))
        .expect("provision");
    let genesis = ledger
        .active_snapshot(workspace_id)
        .expect("workspace")
        .expect("genesis")
        .id;

    let mut ctx = fixture();
    let report = publisher
        .publish_act(&mut ledger, workspace_id, &mut ctx, PackageType::Publication, at(1))
        .expect("publish");
    assert_eq!(report.used_snapshot_id, Some(genesis));
    assert!(!report.is_mutation);

    let state = report.state.expect("derived state");
    assert_eq!(state.acts.keys().collect::<Vec<_>>(), vec!["vision-final"]);
    assert_eq!(state.purposes.len(), 1);
    assert!(state.purpose("/join/id/proces/pv28/2024/w1").is_some());

    let snapshot_id = report.created_snapshot_id.expect("pending snapshot");
    let workspace = ledger.workspace(workspace_id).expect("workspace");
    assert!(workspace.is_locked);
    assert_eq!(workspace.active_snapshot_id, Some(genesis));

    ledger
        .apply_outcome(snapshot_id, Outcome::Delivered, at(2))
        .expect("deliver");
    let loaded = publisher
        .load_active(&ledger, workspace_id)
        .expect("load")
        .expect("stateful");
    assert_eq!(loaded.snapshot_id, snapshot_id);
    assert_eq!(loaded.state, state);
    assert_eq!(ledger.history(workspace_id).expect("history").len(), 2);
}

#[test]
fn republication_keeps_identifications_and_marks_the_dropped_area_deleted() {
    let publisher = Publisher::new(EngineConfig::default());
    let (mut ledger, workspace_id) = published_workspace(&publisher);

    let mut ctx = republication();
    let report = publisher
        .publish_act(&mut ledger, workspace_id, &mut ctx, PackageType::Publication, at(3))
        .expect("republish");
    assert!(report.is_mutation);

    let summary = ctx.mutation.as_ref().expect("mutation summary");
    assert_eq!(summary.consolidated_act_frbr.expression_version, 1);
    assert_eq!(
        summary.removed_gios.iter().map(|gio| gio.key.as_str()).collect::<Vec<_>>(),
        vec!["gebied-c"]
    );
    assert!(ctx.gios.iter().all(|gio| !gio.is_new));
    assert!(ctx.source_objects.contains_key("nl.imow-pv28.gebied.a"));

    let state = report.state.expect("derived state");
    let act = state.act("vision", "final").expect("act in force");
    assert_eq!(act.act_frbr.expression_version, 2);
    assert_eq!(
        act.graph.identification_for(NodeKind::Area, "gebied-a"),
        Some("nl.imow-pv28.gebied.a")
    );
    for (kind, key, status) in act.graph.statuses() {
        let expected = if key == "gebied-c" {
            ObjectStatus::Deleted
        } else {
            ObjectStatus::Unchanged
        };
        assert_eq!(status, expected, "{kind:?} {key}");
    }
}

#[test]
fn new_work_over_an_active_act_is_rejected_and_records_nothing() {
    let publisher = Publisher::new(EngineConfig::default());
    let (mut ledger, workspace_id) = published_workspace(&publisher);
    let snapshots_before = ledger.snapshots_of(workspace_id).len();

    let mut ctx = fixture();
    ctx.act_frbr.work_other = "w2".to_string();
    let err = publisher
        .publish_act(&mut ledger, workspace_id, &mut ctx, PackageType::Publication, at(3))
        .expect_err("new work");

    assert!(matches!(
        err,
        PublishError::State(StateError::UnsupportedNewWork { .. })
    ));
    insta::assert_snapshot!(err.to_string(), @"publication for `vision-final` changes work-other from `w1` to `w2`; publishing a new legal work over an active act is not supported");
    assert_eq!(ledger.snapshots_of(workspace_id).len(), snapshots_before);
    assert!(!ledger.workspace(workspace_id).expect("workspace").is_locked);
    assert!(ctx.mutation.is_none());
}

#[test]
fn republishing_the_expression_in_force_is_rejected() {
    let publisher = Publisher::new(EngineConfig::default());
    let (mut ledger, workspace_id) = published_workspace(&publisher);
    let snapshots_before = ledger.snapshots_of(workspace_id).len();

    let mut ctx = fixture();
    let err = publisher
        .publish_act(&mut ledger, workspace_id, &mut ctx, PackageType::Publication, at(3))
        .expect_err("expression version 1 is already in force");
    assert!(matches!(
        err,
        PublishError::State(StateError::ExpressionNotAdvanced {
            active_version: 1,
            incoming_version: 1,
            ..
        })
    ));
    assert_eq!(ledger.snapshots_of(workspace_id).len(), snapshots_before);
    assert!(ctx.mutation.is_none());
}

#[test]
fn fresh_publication_needs_a_positive_expression_version() {
    let publisher = Publisher::new(EngineConfig::default());
    let mut ledger = SnapshotLedger::default();
    let workspace_id = Uuid::new_v4();
    publisher
        .provision_workspace(&mut ledger, workspace_id, true, at(0))
        .expect("provision");

    let mut ctx = fixture();
    ctx.act_frbr.expression_version = 0;
    let err = publisher
        .publish_act(&mut ledger, workspace_id, &mut ctx, PackageType::Publication, at(1))
        .expect_err("version 0");
    assert!(matches!(
        err,
        PublishError::State(StateError::InvalidIdentifier { .. })
    ));
    assert_eq!(ledger.snapshots_of(workspace_id).len(), 1);
}

#[test]
fn pending_snapshot_blocks_publication_until_its_outcome_is_known() {
    let publisher = Publisher::new(EngineConfig::default());
    let mut ledger = SnapshotLedger::default();
    let workspace_id = Uuid::new_v4();
    publisher
        .provision_workspace(&mut ledger, workspace_id, true, at(0))
        .expect("provision");

    let first = publisher
        .publish_act(&mut ledger, workspace_id, &mut fixture(), PackageType::Publication, at(1))
        .expect("publish")
        .created_snapshot_id
        .expect("pending snapshot");

    let err = publisher
        .publish_act(&mut ledger, workspace_id, &mut fixture(), PackageType::Publication, at(2))
        .expect_err("locked");
    assert!(matches!(
        err,
        PublishError::Ledger(LedgerError::WorkspaceLocked { pending, .. }) if pending == Some(first)
    ));

    assert_eq!(
        ledger
            .apply_outcome(first, Outcome::Failed, at(3))
            .expect("fail"),
        OutcomeEffect::Released
    );
    let loaded = publisher
        .load_active(&ledger, workspace_id)
        .expect("load")
        .expect("stateful");
    assert!(loaded.state.acts.is_empty(), "failed snapshot never activates");

    let retry = publisher
        .publish_act(&mut ledger, workspace_id, &mut fixture(), PackageType::Publication, at(4))
        .expect("retry after failure");
    assert!(!retry.is_mutation);
    assert_eq!(retry.used_snapshot_id, Some(loaded.snapshot_id));
}

#[test]
fn jsonl_ledger_carries_the_flow_across_reloads() {
    let dir = temp_dir("pubstate-publish-flow");
    let ledger_path = dir.join("ledger.jsonl");
    let config = EngineConfig::from_toml_str(&format!(
        "[ledger]\npath = {:?}\n",
        ledger_path.display().to_string()
    ))
    .expect("config");
    let publisher = Publisher::new(config);
    let workspace_id = Uuid::new_v4();

    let mut ledger = SnapshotLedger::default();
    publisher
        .provision_workspace(&mut ledger, workspace_id, true, at(0))
        .expect("provision");
    ledger.save_jsonl(&ledger_path).expect("save");

    let report = publisher
        .publish_act_jsonl(workspace_id, &mut fixture(), PackageType::Publication, at(1))
        .expect("publish");
    let snapshot_id = report.created_snapshot_id.expect("pending snapshot");

    let effect = publisher
        .apply_outcome_jsonl(snapshot_id, Outcome::Delivered, at(2))
        .expect("deliver");
    assert_eq!(effect, OutcomeEffect::Activated);

    let reloaded = SnapshotLedger::load_jsonl(&ledger_path).expect("reload");
    let loaded = publisher
        .load_active(&reloaded, workspace_id)
        .expect("load")
        .expect("stateful");
    assert_eq!(loaded.snapshot_id, snapshot_id);
    assert!(loaded.state.act("vision", "final").is_some());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn busy_jsonl_ledger_is_reported_with_its_holder() {
    let dir = temp_dir("pubstate-publish-busy");
    let ledger_path = dir.join("ledger.jsonl");
    let config = EngineConfig::from_toml_str(&format!(
        "[ledger]\npath = {:?}\n",
        ledger_path.display().to_string()
    ))
    .expect("config");
    let publisher = Publisher::new(config);
    let workspace_id = Uuid::new_v4();

    let mut ledger = SnapshotLedger::default();
    publisher
        .provision_workspace(&mut ledger, workspace_id, true, at(0))
        .expect("provision");
    ledger.save_jsonl(&ledger_path).expect("save");
    let before = std::fs::read(&ledger_path).expect("read ledger");

    let lock_path = publisher.ledger_file().lock_path();
    std::fs::write(&lock_path, "holder=snapshot elsewhere\npid=0\n").expect("lock");

    let err = publisher
        .publish_act_jsonl(workspace_id, &mut fixture(), PackageType::Publication, at(1))
        .expect_err("ledger is busy");
    assert!(matches!(
        &err,
        PublishError::LedgerBusy { holder, .. } if holder == "snapshot elsewhere"
    ));
    assert_eq!(err.stage(), None);
    assert_eq!(std::fs::read(&ledger_path).expect("read ledger"), before);

    let _ = std::fs::remove_dir_all(&dir);
}
