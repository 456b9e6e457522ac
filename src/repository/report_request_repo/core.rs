use crate::domain::report_request::ReportRequest;
use crate::domain::types::{
    Mapped, Priority, RendererType, RenderingMode, ReportDefinitionRef, RequestStatus,
};
use crate::repository::columns::{
    bool_to_int, encode_json_map, format_datetime, format_opt_datetime, get_bool, get_datetime,
    get_enum, get_json_map, get_opt_datetime,
};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{
    EntityKind, ErrorContext, RepositoryError, RepositoryResult, SqliteResultExt,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) const TABLE: &str = "report_request";

pub(super) const SELECT_COLUMNS: &str = "id, uuid, report_definition_uuid, parameter_mappings_json, \
     base_cohort_uuid, base_cohort_mappings_json, renderer_type, renderer_argument, \
     priority, requested_by, request_date, status, description, schedule, \
     process_automatically, minimum_days_to_preserve, \
     evaluate_start_datetime, evaluate_complete_datetime, render_complete_datetime";

// ==========================================
// ReportRequestRepository - 报表请求仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射;
//       状态机合法性是数据完整性约束,在写入前校验
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRequestRepository;

/// 更新前读取的已持久化身份信息
struct StoredIdentity {
    uuid: String,
    request_date: NaiveDateTime,
    status: RequestStatus,
}

impl ReportRequestRepository {
    pub fn new() -> Self {
        Self
    }

    pub(super) fn ctx(operation: &'static str, key: impl ToString) -> ErrorContext {
        ErrorContext::new(<Self as EntityRepository>::KIND, operation, key)
    }

    fn load_identity(
        &self,
        conn: &Connection,
        id: i64,
        ctx: impl Fn() -> ErrorContext,
    ) -> RepositoryResult<Option<StoredIdentity>> {
        conn.query_row(
            "SELECT uuid, request_date, status FROM report_request WHERE id = ?1",
            params![id],
            |row| {
                Ok(StoredIdentity {
                    uuid: row.get(0)?,
                    request_date: get_datetime(row, 1)?,
                    status: get_enum(row, 2, RequestStatus::parse)?,
                })
            },
        )
        .optional()
        .with_context(ctx)
    }

    /// 校验更新的合法性
    ///
    /// - 行必须存在
    /// - uuid / request_date 不可修改
    /// - 状态转换必须合法 (终态之后不再变化)
    fn check_update(
        &self,
        conn: &Connection,
        id: i64,
        request: &ReportRequest,
        ctx: impl Fn() -> ErrorContext,
    ) -> RepositoryResult<()> {
        let stored = self
            .load_identity(conn, id, &ctx)?
            .ok_or_else(|| RepositoryError::NotFound { context: ctx() })?;

        if stored.uuid != request.uuid {
            return Err(RepositoryError::ImmutableField {
                context: ctx(),
                field: "uuid",
            });
        }
        if stored.request_date != request.request_date {
            return Err(RepositoryError::ImmutableField {
                context: ctx(),
                field: "request_date",
            });
        }
        if !stored.status.can_transition_to(request.status) {
            return Err(RepositoryError::InvalidStateTransition {
                context: ctx(),
                from: stored.status,
                to: request.status,
            });
        }
        Ok(())
    }
}

impl EntityRepository for ReportRequestRepository {
    type Entity = ReportRequest;

    const KIND: EntityKind = EntityKind::ReportRequest;

    fn get_by_id(&self, conn: &Connection, id: i64) -> RepositoryResult<Option<ReportRequest>> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", SELECT_COLUMNS, TABLE);
        conn.query_row(&sql, params![id], map_row)
            .optional()
            .with_context(|| Self::ctx("get_by_id", id))
    }

    fn get_by_uuid(&self, conn: &Connection, uuid: &str) -> RepositoryResult<Option<ReportRequest>> {
        let sql = format!("SELECT {} FROM {} WHERE uuid = ?1", SELECT_COLUMNS, TABLE);
        conn.query_row(&sql, params![uuid], map_row)
            .optional()
            .with_context(|| Self::ctx("get_by_uuid", uuid))
    }

    fn save(&self, conn: &Connection, mut request: ReportRequest) -> RepositoryResult<ReportRequest> {
        let key = request.uuid.clone();
        let ctx = || Self::ctx("save", &key);

        let parameter_mappings_json = encode_json_map(
            &request.report_definition.parameter_mappings,
            "parameter_mappings",
            ctx,
        )?;
        let base_cohort_mappings_json = match &request.base_cohort {
            Some(cohort) => Some(encode_json_map(
                &cohort.parameter_mappings,
                "base_cohort_mappings",
                ctx,
            )?),
            None => None,
        };
        let base_cohort_uuid = request.base_cohort.as_ref().map(|c| c.definition.uuid.clone());
        let renderer_type = request
            .renderer
            .as_ref()
            .map(|r| r.renderer_type.as_str().to_string());
        let renderer_argument = request.renderer.as_ref().and_then(|r| r.argument.clone());

        match request.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO report_request (
                        uuid, report_definition_uuid, parameter_mappings_json,
                        base_cohort_uuid, base_cohort_mappings_json,
                        renderer_type, renderer_argument,
                        priority, requested_by, request_date, status, description, schedule,
                        process_automatically, minimum_days_to_preserve,
                        evaluate_start_datetime, evaluate_complete_datetime, render_complete_datetime
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                    "#,
                    params![
                        request.uuid,
                        request.report_definition.definition.uuid,
                        parameter_mappings_json,
                        base_cohort_uuid,
                        base_cohort_mappings_json,
                        renderer_type,
                        renderer_argument,
                        request.priority.as_str(),
                        request.requested_by,
                        format_datetime(&request.request_date),
                        request.status.as_str(),
                        request.description,
                        request.schedule,
                        bool_to_int(request.process_automatically),
                        request.minimum_days_to_preserve,
                        format_opt_datetime(&request.evaluate_start_datetime),
                        format_opt_datetime(&request.evaluate_complete_datetime),
                        format_opt_datetime(&request.render_complete_datetime),
                    ],
                )
                .with_context(ctx)?;
                request.id = Some(conn.last_insert_rowid());
            }
            Some(id) => {
                self.check_update(conn, id, &request, ctx)?;
                // request_date 不在 SET 列表中
                conn.execute(
                    r#"
                    UPDATE report_request SET
                        report_definition_uuid = ?2, parameter_mappings_json = ?3,
                        base_cohort_uuid = ?4, base_cohort_mappings_json = ?5,
                        renderer_type = ?6, renderer_argument = ?7,
                        priority = ?8, requested_by = ?9, status = ?10,
                        description = ?11, schedule = ?12,
                        process_automatically = ?13, minimum_days_to_preserve = ?14,
                        evaluate_start_datetime = ?15, evaluate_complete_datetime = ?16,
                        render_complete_datetime = ?17
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        request.report_definition.definition.uuid,
                        parameter_mappings_json,
                        base_cohort_uuid,
                        base_cohort_mappings_json,
                        renderer_type,
                        renderer_argument,
                        request.priority.as_str(),
                        request.requested_by,
                        request.status.as_str(),
                        request.description,
                        request.schedule,
                        bool_to_int(request.process_automatically),
                        request.minimum_days_to_preserve,
                        format_opt_datetime(&request.evaluate_start_datetime),
                        format_opt_datetime(&request.evaluate_complete_datetime),
                        format_opt_datetime(&request.render_complete_datetime),
                    ],
                )
                .with_context(ctx)?;
            }
        }

        Ok(request)
    }

    fn purge(&self, conn: &Connection, request: &ReportRequest) -> RepositoryResult<()> {
        let Some(id) = request.id else {
            return Ok(());
        };

        conn.execute("DELETE FROM report_request WHERE id = ?1", params![id])
            .with_context(|| Self::ctx("purge", id))?;
        Ok(())
    }
}

fn get_opt_mapped(row: &Row, uuid_idx: usize, mappings_idx: usize) -> rusqlite::Result<Option<Mapped>> {
    let uuid: Option<String> = row.get(uuid_idx)?;
    match uuid {
        Some(uuid) => Ok(Some(Mapped {
            definition: ReportDefinitionRef::new(uuid),
            parameter_mappings: get_json_map(row, mappings_idx)?,
        })),
        None => Ok(None),
    }
}

pub(super) fn map_row(row: &Row) -> rusqlite::Result<ReportRequest> {
    let renderer_type: Option<String> = row.get(6)?;
    let renderer = renderer_type.map(|t| -> rusqlite::Result<RenderingMode> {
        Ok(RenderingMode::new(RendererType::new(t), row.get(7)?))
    });

    Ok(ReportRequest {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        report_definition: Mapped {
            definition: ReportDefinitionRef::new(row.get::<_, String>(2)?),
            parameter_mappings: get_json_map(row, 3)?,
        },
        base_cohort: get_opt_mapped(row, 4, 5)?,
        renderer: renderer.transpose()?,
        priority: get_enum(row, 8, Priority::parse)?,
        requested_by: row.get(9)?,
        request_date: get_datetime(row, 10)?,
        status: get_enum(row, 11, RequestStatus::parse)?,
        description: row.get(12)?,
        schedule: row.get(13)?,
        process_automatically: get_bool(row, 14)?,
        minimum_days_to_preserve: row.get(15)?,
        evaluate_start_datetime: get_opt_datetime(row, 16)?,
        evaluate_complete_datetime: get_opt_datetime(row, 17)?,
        render_complete_datetime: get_opt_datetime(row, 18)?,
    })
}
