// ==========================================
// 报表请求生命周期集成测试
// ==========================================
// 测试目标: 提交 → 执行 → 完成 的完整流程,
//           每一步是一个独立事务 (文件数据库)
// ==========================================


use report_store::domain::types::RequestStatus;
use report_store::logging;
use report_store::{
    EntityRepository, ReportRequestFilter, ReportRequestRepository, RepositoryError,
};
use std::collections::BTreeSet;
use test_helpers::{at, create_test_db, definition, make_request};

#[test]
fn test_submit_process_complete() {
    logging::init_test();

    let (_temp_file, db) = create_test_db().expect("Failed to create test db");
    let repo = ReportRequestRepository::new();

    // 步骤 1: 提交请求
    let submitted = db
        .with_transaction(|tx| repo.save(tx, make_request("def-monthly", at(1, 8))))
        .unwrap();
    let id = submitted.id.expect("提交后应有 id");
    assert_eq!(submitted.status, RequestStatus::Pending);

    // 步骤 2: 调度器领取并开始执行
    db.with_transaction(|tx| {
        let mut request = repo.get_by_id(tx, id)?.expect("请求应存在");
        request
            .advance_to(RequestStatus::Processing, at(1, 9))
            .map_err(anyhow::Error::from)?;
        repo.save(tx, request)
    })
    .unwrap();

    // 步骤 3: 执行完成
    db.with_transaction(|tx| {
        let mut request = repo.get_by_id(tx, id)?.expect("请求应存在");
        request
            .advance_to(RequestStatus::Completed, at(1, 10))
            .map_err(anyhow::Error::from)?;
        repo.save(tx, request)
    })
    .unwrap();

    // 步骤 4: 查询
    let (pending, completed) = db
        .with_connection(|conn| {
            let pending = repo.list(
                conn,
                &ReportRequestFilter::new().with_status(RequestStatus::Pending),
            )?;
            let completed = repo.list(
                conn,
                &ReportRequestFilter::new().with_status(RequestStatus::Completed),
            )?;
            Ok((pending, completed))
        })
        .unwrap();

    assert!(pending.is_empty());
    assert_eq!(completed.len(), 1);
    let done = &completed[0];
    assert_eq!(done.uuid, submitted.uuid);
    assert_eq!(done.request_date, at(1, 8));
    assert_eq!(done.evaluate_start_datetime, Some(at(1, 9)));
    assert_eq!(done.render_complete_datetime, Some(at(1, 10)));
    assert!(done.is_finished());
}

#[test]
fn test_cancel_pending_request() {
    let (_temp_file, db) = create_test_db().unwrap();
    let repo = ReportRequestRepository::new();

    let saved = db
        .with_transaction(|tx| repo.save(tx, make_request("def-monthly", at(2, 8))))
        .unwrap();

    let cancelled = db
        .with_transaction(|tx| {
            let mut request = saved.clone();
            request
                .advance_to(RequestStatus::Cancelled, at(2, 9))
                .map_err(anyhow::Error::from)?;
            repo.save(tx, request)
        })
        .unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);

    // 已取消的请求不能重新开始执行
    let mut revived = cancelled.clone();
    revived.status = RequestStatus::Processing;
    let err = db.with_transaction(|tx| repo.save(tx, revived)).unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::InvalidStateTransition {
            from: RequestStatus::Cancelled,
            to: RequestStatus::Processing,
            ..
        }
    ));
}

#[test]
fn test_status_history_query_across_definitions() {
    let (_temp_file, db) = create_test_db().unwrap();
    let repo = ReportRequestRepository::new();

    // 两个报表定义,各自若干请求,分布在不同日期与状态
    let seeds = [
        ("def-a", 3, RequestStatus::Pending),
        ("def-a", 4, RequestStatus::Completed),
        ("def-a", 5, RequestStatus::Failed),
        ("def-b", 4, RequestStatus::Completed),
        ("def-b", 6, RequestStatus::Cancelled),
    ];

    db.with_transaction(|tx| {
        for (def, day, status) in seeds {
            let mut request = make_request(def, at(day, 12));
            request.status = status;
            repo.save(tx, request)?;
        }
        Ok(())
    })
    .unwrap();

    let finished: BTreeSet<RequestStatus> = [
        RequestStatus::Completed,
        RequestStatus::Failed,
        RequestStatus::Cancelled,
    ]
    .into_iter()
    .collect();

    let result = db
        .with_connection(|conn| {
            repo.list(
                conn,
                &ReportRequestFilter::new()
                    .for_definition(&definition("def-a"))
                    .on_or_after(at(4, 0))
                    .with_statuses(finished.clone()),
            )
        })
        .unwrap();

    let mut days: Vec<_> = result.iter().map(|r| r.request_date).collect();
    days.sort();
    assert_eq!(days, vec![at(4, 12), at(5, 12)]);

    let counts = db.with_connection(|conn| repo.count_by_status(conn)).unwrap();
    assert_eq!(counts.get(&RequestStatus::Completed), Some(&2));
    assert_eq!(counts.values().sum::<i64>(), 5);
}

#[test]
fn test_failed_unit_of_work_leaves_no_trace() {
    let (_temp_file, db) = create_test_db().unwrap();
    let repo = ReportRequestRepository::new();

    let existing = db
        .with_transaction(|tx| repo.save(tx, make_request("def-a", at(7, 8))))
        .unwrap();

    // 同一事务: 新增一条 + 非法更新一条 → 整体回滚
    let err = db
        .with_transaction(|tx| {
            repo.save(tx, make_request("def-a", at(7, 9)))?;
            let mut bad = existing.clone();
            bad.request_date = at(7, 23);
            repo.save(tx, bad)
        })
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ImmutableField { .. }));

    let all = db
        .with_connection(|conn| repo.list(conn, &ReportRequestFilter::new()))
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].uuid, existing.uuid);
}
