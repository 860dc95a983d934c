use super::*;
use crate::domain::record::format_sheet_datetime;
use crate::errlog::ErrorLog;
use crate::sink::RecordingSink;
use crate::store::memory::{MemoryStore, StoreCall, StoreOp};
use crate::view::KeywordCategory;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

fn sheet_rows() -> Vec<Vec<String>> {
    vec![
        row(&[
            "ODP-1", "Budi", "Jl. Merdeka", "0811111111", "Nandi", "Visited", "", "Diterima", "",
            "2026-01-02 10:00:00",
        ]),
        row(&[]),
        row(&["ODP-3", "SDN 1 Bandung", "Jl. Dago", "0822222222", "Andi"]),
        row(&["ODP-4", "Citra", "Jl. Riau", "0833333333", "Nandi"]),
        row(&["ODP-5", "Rekap", "", "0844444444", "Overview"]),
    ]
}

fn forbidden() -> StoreError {
    StoreError::Api {
        code: Some(403),
        status: Some("PERMISSION_DENIED".to_string()),
        message: "The caller does not have permission".to_string(),
    }
}

fn dashboard(store: MemoryStore, sink: RecordingSink) -> Dashboard<MemoryStore, RecordingSink> {
    Dashboard::new(
        store,
        sink,
        Box::new(KeywordCategory::new(["sekolah", "sdn"])),
        DashboardSettings::default(),
    )
}

async fn loaded(sink: RecordingSink) -> Dashboard<MemoryStore, RecordingSink> {
    let mut dashboard = dashboard(MemoryStore::with_rows(sheet_rows()), sink);
    assert_eq!(dashboard.load().await, DataSource::Remote);
    dashboard.store().clear_calls();
    dashboard
}

fn valid_input() -> CustomerInput {
    CustomerInput {
        nearest_access_point: "ODP-9".to_string(),
        name: "Rina".to_string(),
        address: "Jl. Asia Afrika".to_string(),
        phone: "0812345678".to_string(),
        assigned_agent: "Yandi".to_string(),
        note: "minta dihubungi sore".to_string(),
        ..CustomerInput::default()
    }
}

fn unique_log() -> ErrorLog {
    ErrorLog::new(std::env::temp_dir().join(format!(
        "leadsheet-dashboard-{}.jsonl",
        uuid::Uuid::now_v7()
    )))
}

#[tokio::test]
async fn load_renders_normalized_records_and_assignees() {
    let dashboard = loaded(RecordingSink::approving()).await;

    assert_eq!(dashboard.records().len(), 4);
    let render = dashboard.sink().last_render().expect("rendered");
    assert_eq!(render.names, vec!["Budi", "SDN 1 Bandung", "Citra", "Rekap"]);
    assert_eq!(render.source, DataSource::Remote);
    let assignees: Vec<String> = dashboard.sink().assignees[0].iter().cloned().collect();
    assert_eq!(assignees, vec!["Andi".to_string(), "Nandi".to_string()]);
    assert!(dashboard.assignee_options().contains("Overview"));
    assert!(dashboard.sink().warnings.is_empty());
}

#[tokio::test]
async fn forbidden_read_falls_back_to_demo_with_warning() {
    let store = MemoryStore::with_rows(sheet_rows());
    store.fail_on_call(StoreOp::Fetch, 1, forbidden());
    let log = unique_log();
    let mut dashboard =
        dashboard(store, RecordingSink::approving()).with_error_log(log.clone());

    assert_eq!(dashboard.load().await, DataSource::Demo);

    assert_eq!(dashboard.records().len(), 5);
    let render = dashboard.sink().last_render().expect("rendered");
    assert_eq!(render.names.len(), 5);
    assert_eq!(render.names[0], "Budi Santoso");
    assert_eq!(dashboard.sink().warnings.len(), 1);
    assert!(dashboard.sink().warnings[0].contains("quota exceeded or access forbidden"));
    assert!(dashboard.sink().warnings[0].contains("demo data"));

    let entries = log.read_all().expect("error log readable");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].context, "load");
    let _ = std::fs::remove_file(log.path());
}

#[tokio::test]
async fn empty_sheet_falls_back_to_demo() {
    let mut dashboard = dashboard(MemoryStore::with_rows(Vec::new()), RecordingSink::approving());

    assert_eq!(dashboard.load().await, DataSource::Demo);
    assert_eq!(dashboard.records().len(), 5);
    assert!(dashboard.sink().warnings[0].contains("no customer rows"));
}

#[tokio::test]
async fn added_record_round_trips_through_reload() {
    let mut dashboard = loaded(RecordingSink::approving()).await;

    dashboard
        .add_record(valid_input())
        .await
        .expect("add should succeed");

    let calls = dashboard.store().calls();
    assert_eq!(calls.len(), 2);
    let StoreCall::Append(appended) = &calls[0] else {
        panic!("expected append first, got {:?}", calls[0]);
    };
    assert_eq!(appended.len(), 10);
    assert_eq!(appended[5], "Not Visited");
    assert_eq!(appended[7], "Pending");
    assert!(!appended[9].is_empty());
    assert_eq!(calls[1], StoreCall::Fetch);

    let added = dashboard.records().last().expect("record added");
    assert_eq!(added.sequence_id, 5);
    assert_eq!(added.name, "Rina");
    assert_eq!(added.note, "minta dihubungi sore");
    assert_eq!(added.assigned_agent, "Yandi");
    assert!(added.date_added.is_some());
    assert_eq!(dashboard.phase(), OperationPhase::Idle);
    assert_eq!(dashboard.last_outcome(), Some(OperationPhase::Succeeded));
    assert_eq!(dashboard.sink().notices, vec!["added customer 'Rina'".to_string()]);
}

#[tokio::test]
async fn short_phone_is_rejected_before_the_store() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let input = CustomerInput {
        phone: "12345".to_string(),
        ..valid_input()
    };

    let err = dashboard
        .add_record(input)
        .await
        .expect_err("five digit phone must fail");

    assert!(matches!(
        err,
        DashboardError::Validation(ValidationError::InvalidPhone(_))
    ));
    assert!(dashboard.store().calls().is_empty());
    assert_eq!(dashboard.last_outcome(), Some(OperationPhase::Failed));
    assert_eq!(dashboard.phase(), OperationPhase::Idle);
}

#[tokio::test]
async fn unreadable_date_is_rejected_before_the_store() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let input = CustomerInput {
        date_added: Some("kemarin".to_string()),
        ..valid_input()
    };

    let err = dashboard
        .add_record(input)
        .await
        .expect_err("a date that cannot be read back must fail");

    assert!(matches!(
        err,
        DashboardError::Validation(ValidationError::InvalidDate(_))
    ));
    assert!(dashboard.store().calls().is_empty());
}

#[tokio::test]
async fn explicit_date_survives_reload() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let input = CustomerInput {
        date_added: Some("2026-03-04 08:15:00".to_string()),
        ..valid_input()
    };

    dashboard
        .add_record(input)
        .await
        .expect("add should succeed");

    let added = dashboard.records().last().expect("record added");
    assert_eq!(
        added.date_added.map(format_sheet_datetime).as_deref(),
        Some("2026-03-04 08:15:00")
    );
}

#[tokio::test]
async fn edit_targets_source_row_even_after_blank_rows() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let patch = RecordPatch {
        status: Some("Tidak Diterima".to_string()),
        ..RecordPatch::default()
    };

    // Citra is sequence 3 but sits at data index 3 (sheet row 5).
    dashboard
        .edit_record(3, patch, None)
        .await
        .expect("edit should succeed");

    let writes = dashboard.store().writes();
    assert_eq!(writes.len(), 1);
    let StoreCall::Update(row_number, values) = &writes[0] else {
        panic!("expected update, got {:?}", writes[0]);
    };
    assert_eq!(*row_number, 5);
    assert_eq!(values.len(), 9);
    assert_eq!(values[1], "Citra");
    assert_eq!(values[7], "Tidak Diterima");
    assert_eq!(
        dashboard.record(3).map(|record| record.status.as_str()),
        Some("Tidak Diterima")
    );
}

#[tokio::test]
async fn edit_keeps_date_added_column() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let before = dashboard.record(1).and_then(|record| record.date_added);
    let patch = RecordPatch {
        note: Some("follow up".to_string()),
        ..RecordPatch::default()
    };

    dashboard
        .edit_record(1, patch, None)
        .await
        .expect("edit should succeed");

    assert!(before.is_some());
    assert_eq!(dashboard.record(1).and_then(|record| record.date_added), before);
    assert_eq!(dashboard.store().rows()[0][9], "2026-01-02 10:00:00");
}

#[tokio::test]
async fn edit_of_unknown_id_is_not_found() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let patch = RecordPatch {
        note: Some("x".to_string()),
        ..RecordPatch::default()
    };

    let err = dashboard
        .edit_record(42, patch, None)
        .await
        .expect_err("unknown id must fail");

    assert!(matches!(err, DashboardError::NotFound(42)));
    assert!(dashboard.store().calls().is_empty());
}

#[tokio::test]
async fn external_change_makes_edit_stale() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    dashboard.store().set_cell(3, 1, "Citra Dewi");
    let patch = RecordPatch {
        status: Some("Diterima".to_string()),
        ..RecordPatch::default()
    };

    let err = dashboard
        .edit_record(3, patch, None)
        .await
        .expect_err("changed row must be stale");

    assert!(matches!(err, DashboardError::Stale { sequence_id: 3 }));
    assert!(dashboard.store().writes().is_empty());
    assert_eq!(dashboard.record(3).map(|record| record.name.as_str()), Some("Citra"));
}

#[tokio::test]
async fn external_delete_above_target_makes_edit_stale() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    dashboard.store().remove_row(0);
    let patch = RecordPatch {
        status: Some("Diterima".to_string()),
        ..RecordPatch::default()
    };

    let err = dashboard
        .edit_record(3, patch, None)
        .await
        .expect_err("shifted row must be stale");

    assert!(matches!(err, DashboardError::Stale { .. }));
    assert!(dashboard.store().writes().is_empty());
}

#[tokio::test]
async fn mismatched_if_match_fails_without_store_calls() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let patch = RecordPatch {
        status: Some("Diterima".to_string()),
        ..RecordPatch::default()
    };

    let err = dashboard
        .edit_record(1, patch.clone(), Some("000000000000"))
        .await
        .expect_err("wrong etag must fail");
    assert!(matches!(err, DashboardError::Stale { sequence_id: 1 }));
    assert!(dashboard.store().calls().is_empty());

    let etag = dashboard.record(1).map(|record| record.etag.clone());
    dashboard
        .edit_record(1, patch, etag.as_deref())
        .await
        .expect("matching etag should succeed");
}

#[tokio::test]
async fn empty_patch_is_rejected() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let err = dashboard
        .edit_record(1, RecordPatch::default(), None)
        .await
        .expect_err("empty patch must fail");
    assert!(matches!(err, DashboardError::InvalidArgument(_)));
}

#[tokio::test]
async fn denied_delete_makes_no_store_calls() {
    let mut dashboard = loaded(RecordingSink::denying()).await;
    let renders_before = dashboard.sink().renders.len();
    let visible_before = dashboard.visible();

    let outcome = dashboard
        .delete_record(2, None)
        .await
        .expect("cancel is not an error");

    assert_eq!(outcome, MutationOutcome::Cancelled);
    assert!(dashboard.store().calls().is_empty());
    assert_eq!(dashboard.visible(), visible_before);
    assert_eq!(dashboard.sink().renders.len(), renders_before);
    assert_eq!(dashboard.sink().prompts.len(), 1);
    assert!(dashboard.sink().prompts[0].contains("SDN 1 Bandung"));
    assert_eq!(dashboard.phase(), OperationPhase::Idle);
}

#[tokio::test]
async fn confirmed_delete_removes_row_and_reindexes() {
    let mut dashboard = loaded(RecordingSink::approving()).await;

    let outcome = dashboard
        .handle(Intent::Delete {
            sequence_id: 2,
            if_match: None,
        })
        .await
        .expect("delete should succeed");

    assert_eq!(outcome, MutationOutcome::Applied);
    assert_eq!(
        dashboard.store().writes(),
        vec![StoreCall::Delete(4)],
        "SDN 1 Bandung lives at data index 2, sheet row 4"
    );
    let names: Vec<&str> = dashboard
        .records()
        .iter()
        .map(|record| record.name.as_str())
        .collect();
    assert_eq!(names, vec!["Budi", "Citra", "Rekap"]);
    assert_eq!(dashboard.record(2).map(|record| record.name.as_str()), Some("Citra"));
}

#[tokio::test]
async fn demo_data_is_read_only_but_add_still_appends() {
    let store = MemoryStore::with_rows(sheet_rows());
    store.fail_on_call(StoreOp::Fetch, 1, forbidden());
    let mut dashboard = dashboard(store, RecordingSink::approving());
    dashboard.load().await;

    let err = dashboard
        .delete_record(1, None)
        .await
        .expect_err("demo rows cannot be deleted");
    assert!(matches!(err, DashboardError::DemoReadOnly));
    assert!(dashboard.sink().prompts.is_empty());

    dashboard
        .add_record(valid_input())
        .await
        .expect("add works against the real store");
    assert_eq!(dashboard.source(), DataSource::Remote);
    assert_eq!(dashboard.records().len(), 5);
}

#[tokio::test]
async fn failed_write_surfaces_and_keeps_last_known_good() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    dashboard
        .store()
        .fail_on_call(StoreOp::Append, 1, forbidden());
    let before = dashboard.records().to_vec();

    let err = dashboard
        .add_record(valid_input())
        .await
        .expect_err("rejected append must fail");

    assert!(matches!(err, DashboardError::Store(StoreError::Api { .. })));
    assert!(err.to_string().contains("The caller does not have permission"));
    assert_eq!(dashboard.records(), before.as_slice());
    assert_eq!(dashboard.source(), DataSource::Remote);
    assert!(!dashboard.store().calls().contains(&StoreCall::Fetch));
    assert!(dashboard.sink().notices.is_empty());
}

#[tokio::test]
async fn failed_reload_after_write_warns_and_keeps_cache() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    // Fetch #1 was the initial load; #2 is the reload after the append.
    dashboard.store().fail_on_call(
        StoreOp::Fetch,
        2,
        StoreError::Transport {
            status: None,
            message: "connection reset".to_string(),
        },
    );

    dashboard
        .add_record(valid_input())
        .await
        .expect("write succeeded even though reload failed");

    assert_eq!(dashboard.records().len(), 4);
    assert_eq!(dashboard.source(), DataSource::Remote);
    let warning = dashboard.sink().warnings.last().expect("warned");
    assert!(warning.contains("change saved, but reloading failed"));
    assert_eq!(dashboard.last_outcome(), Some(OperationPhase::Succeeded));
}

#[tokio::test]
async fn filters_survive_refresh_and_fail_closed_on_missing_agent() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    dashboard.set_assignee_filter(AssigneeFilter::agent("Andi"));
    assert_eq!(
        dashboard.sink().last_render().map(|render| render.names.clone()),
        Some(vec!["SDN 1 Bandung".to_string()])
    );

    dashboard.store().set_cell(2, 4, "Nandi");
    dashboard.refresh().await;

    assert_eq!(dashboard.filters().assignee, AssigneeFilter::agent("Andi"));
    assert!(dashboard.visible().is_empty());
    let render = dashboard.sink().last_render().expect("rendered");
    assert!(render.names.is_empty());
    assert_eq!(render.total, 4);
}

#[tokio::test]
async fn category_and_assignee_filters_combine() {
    let mut dashboard = loaded(RecordingSink::approving()).await;

    dashboard
        .handle(Intent::Filter(FilterSelection::Category(
            CategoryFilter::NonSchool,
        )))
        .await
        .expect("filter intent");
    dashboard.set_assignee_filter(AssigneeFilter::agent("Nandi"));

    let names: Vec<String> = dashboard
        .visible()
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(names, vec!["Budi".to_string(), "Citra".to_string()]);

    dashboard.set_assignee_filter(AssigneeFilter::All);
    assert_eq!(dashboard.visible().len(), 3);
}

#[tokio::test]
async fn category_change_keeps_assignee_choice() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    dashboard.set_assignee_filter(AssigneeFilter::agent("Nandi"));

    dashboard.set_category_filter(CategoryFilter::School);
    assert_eq!(dashboard.filters().assignee, AssigneeFilter::agent("Nandi"));
    assert!(dashboard.visible().is_empty());

    dashboard.set_category_filter(CategoryFilter::All);
    assert_eq!(dashboard.visible().len(), 2);
}

#[tokio::test]
async fn agent_named_all_can_be_selected() {
    let mut rows = sheet_rows();
    rows[2][4] = "All".to_string();
    let mut dashboard = dashboard(MemoryStore::with_rows(rows), RecordingSink::approving());
    dashboard.load().await;

    let selected = dashboard.resolve_assignee("All");
    assert_eq!(selected, AssigneeFilter::Agent("All".to_string()));
    dashboard.set_assignee_filter(selected);
    let names: Vec<String> = dashboard
        .visible()
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(names, vec!["SDN 1 Bandung".to_string()]);

    assert_eq!(dashboard.resolve_assignee("all"), AssigneeFilter::All);
}

#[tokio::test]
async fn replacing_filters_renders_once() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let before = dashboard.sink().renders.len();

    dashboard.set_filters(FilterState {
        category: CategoryFilter::School,
        assignee: AssigneeFilter::agent("Andi"),
    });

    assert_eq!(dashboard.sink().renders.len(), before + 1);
    assert_eq!(
        dashboard.sink().last_render().map(|render| render.names.clone()),
        Some(vec!["SDN 1 Bandung".to_string()])
    );
}

#[tokio::test]
async fn bulk_edit_sends_one_batch() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let patch = RecordPatch {
        visit_state: Some("Scheduled".to_string()),
        ..RecordPatch::default()
    };

    let outcome = dashboard
        .handle(Intent::BulkEdit {
            sequence_ids: vec![1, 3, 1],
            patch,
        })
        .await
        .expect("bulk edit should succeed");

    assert_eq!(outcome, MutationOutcome::Applied);
    let writes = dashboard.store().writes();
    assert_eq!(writes.len(), 1);
    let StoreCall::Batch(rows) = &writes[0] else {
        panic!("expected batch, got {:?}", writes[0]);
    };
    let row_numbers: Vec<u32> = rows.iter().map(|(row, _)| *row).collect();
    assert_eq!(row_numbers, vec![2, 5]);
    assert!(dashboard
        .records()
        .iter()
        .filter(|record| record.sequence_id == 1 || record.sequence_id == 3)
        .all(|record| record.visit_state == "Scheduled"));
}

#[tokio::test]
async fn bulk_edit_with_unknown_id_writes_nothing() {
    let mut dashboard = loaded(RecordingSink::approving()).await;
    let patch = RecordPatch {
        status: Some("Pending".to_string()),
        ..RecordPatch::default()
    };

    let err = dashboard
        .bulk_edit(&[1, 99], patch)
        .await
        .expect_err("unknown id must fail");

    assert!(matches!(err, DashboardError::NotFound(99)));
    assert!(dashboard.store().calls().is_empty());
    assert!(dashboard.sink().prompts.is_empty());
}

#[test]
fn read_failures_are_classified() {
    assert!(describe_read_failure(&forbidden()).contains("access forbidden"));
    assert_eq!(
        describe_read_failure(&StoreError::Transport {
            status: Some(404),
            message: "Not Found".to_string()
        }),
        "spreadsheet not found; check the spreadsheet id"
    );
    assert!(describe_read_failure(&StoreError::Auth(crate::store::AuthError::Expired))
        .starts_with("access denied"));
    assert!(describe_read_failure(&StoreError::Config("spreadsheet id is not set".to_string()))
        .contains("spreadsheet id is not set"));
}
