use super::core::{map_row, ReportRequestRepository, SELECT_COLUMNS, TABLE};
use crate::domain::report_request::ReportRequest;
use crate::domain::types::RequestStatus;
use crate::repository::columns::get_enum;
use crate::repository::error::{RepositoryResult, SqliteResultExt};
use crate::repository::filter::ReportRequestFilter;
use rusqlite::Connection;
use std::collections::BTreeMap;

impl ReportRequestRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按组合条件查询请求
    ///
    /// 所有条件 AND 组合;缺省条件不约束。
    /// 结果顺序不作约定,需要确定顺序的调用方自行排序。
    pub fn list(
        &self,
        conn: &Connection,
        filter: &ReportRequestFilter,
    ) -> RepositoryResult<Vec<ReportRequest>> {
        filter
            .to_criteria(TABLE)
            .list(conn, SELECT_COLUMNS, map_row)
            .with_context(|| Self::ctx("list", format!("{:?}", filter)))
    }

    /// 各状态的请求数量 (管理工具概览用);没有请求的状态不出现在结果中
    pub fn count_by_status(&self, conn: &Connection) -> RepositoryResult<BTreeMap<RequestStatus, i64>> {
        let ctx = || Self::ctx("count_by_status", "*");

        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM report_request GROUP BY status")
            .with_context(ctx)?;

        let counts = stmt
            .query_map([], |row| {
                Ok((get_enum(row, 0, RequestStatus::parse)?, row.get::<_, i64>(1)?))
            })
            .and_then(|rows| rows.collect::<rusqlite::Result<BTreeMap<_, _>>>())
            .with_context(ctx)?;

        Ok(counts)
    }
}
