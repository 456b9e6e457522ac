use super::ReportRequestRepository;
use crate::domain::report_request::ReportRequest;
use crate::domain::types::{
    Mapped, Priority, RendererType, RenderingMode, ReportDefinitionRef, RequestStatus,
};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{EntityKind, RepositoryError};
use crate::repository::filter::ReportRequestFilter;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::apply_schema(&conn).unwrap();
    conn
}

fn t(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn make_test_request(definition: &str, at: NaiveDateTime) -> ReportRequest {
    ReportRequest::requested_at(Mapped::new(ReportDefinitionRef::new(definition)), at)
}

/// 直接以指定状态落库 (插入不校验状态机)
fn insert_with_status(
    repo: &ReportRequestRepository,
    conn: &Connection,
    definition: &str,
    at: NaiveDateTime,
    status: RequestStatus,
) -> ReportRequest {
    let mut req = make_test_request(definition, at);
    req.status = status;
    repo.save(conn, req).unwrap()
}

fn sorted_uuids(requests: &[ReportRequest]) -> Vec<String> {
    let mut v: Vec<String> = requests.iter().map(|r| r.uuid.clone()).collect();
    v.sort();
    v
}

#[test]
fn test_insert_and_find_by_id() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let mut req = make_test_request("def-1", t(1, 8));
    req.report_definition = req
        .report_definition
        .clone()
        .with_parameter("startDate", "${start}")
        .with_parameter("endDate", "${end}");
    req.base_cohort = Some(Mapped::new(ReportDefinitionRef::new("cohort-1")));
    req.renderer = Some(RenderingMode::new(
        RendererType::new("CsvReportRenderer"),
        Some("design-uuid".to_string()),
    ));
    req.priority = Priority::High;
    req.requested_by = Some("admin".to_string());
    req.schedule = Some("0 0 2 * * ?".to_string());
    req.minimum_days_to_preserve = Some(30);
    req.process_automatically = true;

    let saved = repo.save(&conn, req.clone()).unwrap();
    let id = saved.id.expect("保存后应分配 id");

    let found = repo.get_by_id(&conn, id).unwrap().unwrap();
    assert_eq!(found, saved);
    assert_eq!(found.uuid, req.uuid);
    assert_eq!(found.report_definition.parameter_mappings.len(), 2);

    let by_uuid = repo.get_by_uuid(&conn, &req.uuid).unwrap();
    assert_eq!(by_uuid, Some(saved));
}

#[test]
fn test_new_ids_are_never_reused() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let first = repo.save(&conn, make_test_request("def-1", t(1, 8))).unwrap();
    repo.purge(&conn, &first).unwrap();
    let second = repo.save(&conn, make_test_request("def-1", t(1, 9))).unwrap();

    assert!(second.id.unwrap() > first.id.unwrap());
}

#[test]
fn test_upsert_updates_in_place() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let mut saved = repo.save(&conn, make_test_request("def-1", t(1, 8))).unwrap();
    saved.description = Some("rerun".to_string());
    saved.priority = Priority::Lowest;
    let updated = repo.save(&conn, saved.clone()).unwrap();

    assert_eq!(updated.id, saved.id);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM report_request", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(repo.get_by_id(&conn, saved.id.unwrap()).unwrap(), Some(updated));
}

#[test]
fn test_purge_then_not_found() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let saved = repo.save(&conn, make_test_request("def-1", t(1, 8))).unwrap();
    repo.purge(&conn, &saved).unwrap();

    assert!(repo.get_by_id(&conn, saved.id.unwrap()).unwrap().is_none());
    assert!(repo.get_by_uuid(&conn, &saved.uuid).unwrap().is_none());
}

#[test]
fn test_lifecycle_scenario() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let mut req = repo.save(&conn, make_test_request("def-1", t(2, 8))).unwrap();
    assert_eq!(req.status, RequestStatus::Pending);

    req.advance_to(RequestStatus::Processing, t(2, 9)).unwrap();
    let mut req = repo.save(&conn, req).unwrap();
    req.advance_to(RequestStatus::Completed, t(2, 10)).unwrap();
    let req = repo.save(&conn, req).unwrap();

    let pending = repo
        .list(&conn, &ReportRequestFilter::new().with_status(RequestStatus::Pending))
        .unwrap();
    assert!(pending.is_empty());

    let completed = repo
        .list(&conn, &ReportRequestFilter::new().with_status(RequestStatus::Completed))
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].uuid, req.uuid);
    assert_eq!(completed[0].render_complete_datetime, Some(t(2, 10)));
}

#[test]
fn test_terminal_request_cannot_be_resurrected() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let mut req = insert_with_status(&repo, &conn, "def-1", t(3, 8), RequestStatus::Completed);
    req.status = RequestStatus::Pending;

    match repo.save(&conn, req.clone()) {
        Err(RepositoryError::InvalidStateTransition { context, from, to }) => {
            assert_eq!(context.entity, EntityKind::ReportRequest);
            assert_eq!(from, RequestStatus::Completed);
            assert_eq!(to, RequestStatus::Pending);
        }
        other => panic!("unexpected: {:?}", other),
    }

    // 存储中的状态不变
    let stored = repo.get_by_id(&conn, req.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Completed);
}

#[test]
fn test_request_date_is_immutable() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let mut req = repo.save(&conn, make_test_request("def-1", t(3, 8))).unwrap();
    req.request_date = req.request_date + Duration::hours(1);

    let err = repo.save(&conn, req).unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::ImmutableField {
            field: "request_date",
            ..
        }
    ));
}

#[test]
fn test_list_by_status_set_is_union() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    insert_with_status(&repo, &conn, "def-1", t(4, 1), RequestStatus::Pending);
    let completed = insert_with_status(&repo, &conn, "def-1", t(4, 2), RequestStatus::Completed);
    let failed = insert_with_status(&repo, &conn, "def-1", t(4, 3), RequestStatus::Failed);
    insert_with_status(&repo, &conn, "def-1", t(4, 4), RequestStatus::Processing);

    let result = repo
        .list(
            &conn,
            &ReportRequestFilter::new()
                .with_statuses([RequestStatus::Completed, RequestStatus::Failed]),
        )
        .unwrap();

    assert_eq!(sorted_uuids(&result), sorted_uuids(&[completed, failed]));
}

#[test]
fn test_empty_status_set_is_unconstrained() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    for (i, status) in RequestStatus::ALL.iter().enumerate() {
        insert_with_status(&repo, &conn, "def-1", t(5, i as u32), *status);
    }

    let all = repo.list(&conn, &ReportRequestFilter::new()).unwrap();
    assert_eq!(all.len(), RequestStatus::ALL.len());
}

#[test]
fn test_date_bounds_are_inclusive_and_independent() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let early = repo.save(&conn, make_test_request("def-1", t(6, 8))).unwrap();
    let middle = repo.save(&conn, make_test_request("def-1", t(7, 8))).unwrap();
    let late = repo.save(&conn, make_test_request("def-1", t(8, 8))).unwrap();

    let after = repo
        .list(&conn, &ReportRequestFilter::new().on_or_after(t(7, 8)))
        .unwrap();
    assert_eq!(sorted_uuids(&after), sorted_uuids(&[middle.clone(), late.clone()]));

    let before = repo
        .list(&conn, &ReportRequestFilter::new().on_or_before(t(7, 8)))
        .unwrap();
    assert_eq!(sorted_uuids(&before), sorted_uuids(&[early, middle.clone()]));

    let exact = repo
        .list(
            &conn,
            &ReportRequestFilter::new().on_or_after(t(7, 8)).on_or_before(t(7, 8)),
        )
        .unwrap();
    assert_eq!(sorted_uuids(&exact), sorted_uuids(&[middle]));
}

#[test]
fn test_inverted_date_range_yields_empty() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    repo.save(&conn, make_test_request("def-1", t(9, 8))).unwrap();
    repo.save(&conn, make_test_request("def-1", t(10, 8))).unwrap();

    let filter = ReportRequestFilter::new().on_or_after(t(10, 8)).on_or_before(t(9, 8));
    assert!(filter.is_empty_range());
    assert!(repo.list(&conn, &filter).unwrap().is_empty());
}

#[test]
fn test_definition_filter_compares_by_uuid() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let mine = repo.save(&conn, make_test_request("def-1", t(11, 8))).unwrap();
    repo.save(&conn, make_test_request("def-2", t(11, 9))).unwrap();

    // 另一个内存表示,只要 UUID 相同即等价
    let same_definition = ReportDefinitionRef::new(String::from("def-1"));
    let result = repo
        .list(&conn, &ReportRequestFilter::new().for_definition(&same_definition))
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].uuid, mine.uuid);
}

#[test]
fn test_filters_combine_conjunctively() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    let hit = insert_with_status(&repo, &conn, "def-1", t(12, 8), RequestStatus::Failed);
    insert_with_status(&repo, &conn, "def-2", t(12, 8), RequestStatus::Failed);
    insert_with_status(&repo, &conn, "def-1", t(12, 8), RequestStatus::Completed);
    insert_with_status(&repo, &conn, "def-1", t(20, 8), RequestStatus::Failed);

    let result = repo
        .list(
            &conn,
            &ReportRequestFilter::new()
                .for_definition(&ReportDefinitionRef::new("def-1"))
                .on_or_after(t(12, 0))
                .on_or_before(t(13, 0))
                .with_status(RequestStatus::Failed),
        )
        .unwrap();

    assert_eq!(sorted_uuids(&result), vec![hit.uuid]);
}

#[test]
fn test_count_by_status() {
    let conn = setup_test_db();
    let repo = ReportRequestRepository::new();

    insert_with_status(&repo, &conn, "def-1", t(14, 1), RequestStatus::Pending);
    insert_with_status(&repo, &conn, "def-1", t(14, 2), RequestStatus::Pending);
    insert_with_status(&repo, &conn, "def-1", t(14, 3), RequestStatus::Failed);

    let counts = repo.count_by_status(&conn).unwrap();
    assert_eq!(counts.get(&RequestStatus::Pending), Some(&2));
    assert_eq!(counts.get(&RequestStatus::Failed), Some(&1));
    assert_eq!(counts.get(&RequestStatus::Completed), None);
}
