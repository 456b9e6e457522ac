// ==========================================
// 报表产物存储 - 后处理配置仓储
// ==========================================
// 表: report_processor_configuration
// 不按报表定义/渲染器过滤,只有退役过滤 (+ 处理器类型)
// ==========================================

use crate::domain::processor_config::ReportProcessorConfiguration;
use crate::domain::types::ProcessorMode;
use crate::repository::columns::{
    bool_to_int, encode_json_map, ensure_same_identity, format_datetime, format_opt_datetime,
    get_audit, get_bool, get_enum, get_json_map, get_retirement, METADATA_COLUMNS,
};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{EntityKind, ErrorContext, RepositoryResult, SqliteResultExt};
use crate::repository::filter::ProcessorConfigurationFilter;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TABLE: &str = "report_processor_configuration";

fn select_columns() -> String {
    format!(
        "id, uuid, name, description, processor_type, configuration_json, \
         processor_mode, run_on_success, run_on_error, {}",
        METADATA_COLUMNS
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportProcessorConfigurationRepository;

impl ReportProcessorConfigurationRepository {
    pub fn new() -> Self {
        Self
    }

    fn ctx(operation: &'static str, key: impl ToString) -> ErrorContext {
        ErrorContext::new(<Self as EntityRepository>::KIND, operation, key)
    }

    /// 列出全部配置;include_retired=false 时排除已退役
    pub fn list(
        &self,
        conn: &Connection,
        include_retired: bool,
    ) -> RepositoryResult<Vec<ReportProcessorConfiguration>> {
        self.list_filtered(conn, &ProcessorConfigurationFilter::new(include_retired))
    }

    /// 按处理器类型列出 (自动处理器查找)
    pub fn list_by_type(
        &self,
        conn: &Connection,
        processor_type: &str,
        include_retired: bool,
    ) -> RepositoryResult<Vec<ReportProcessorConfiguration>> {
        self.list_filtered(
            conn,
            &ProcessorConfigurationFilter::new(include_retired).with_processor_type(processor_type),
        )
    }

    pub fn list_filtered(
        &self,
        conn: &Connection,
        filter: &ProcessorConfigurationFilter,
    ) -> RepositoryResult<Vec<ReportProcessorConfiguration>> {
        filter
            .to_criteria(TABLE)
            .list(conn, &select_columns(), map_row)
            .with_context(|| Self::ctx("list", format!("{:?}", filter)))
    }
}

impl EntityRepository for ReportProcessorConfigurationRepository {
    type Entity = ReportProcessorConfiguration;

    const KIND: EntityKind = EntityKind::ReportProcessorConfiguration;

    fn get_by_id(
        &self,
        conn: &Connection,
        id: i64,
    ) -> RepositoryResult<Option<ReportProcessorConfiguration>> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", select_columns(), TABLE);
        conn.query_row(&sql, params![id], map_row)
            .optional()
            .with_context(|| Self::ctx("get_by_id", id))
    }

    fn get_by_uuid(
        &self,
        conn: &Connection,
        uuid: &str,
    ) -> RepositoryResult<Option<ReportProcessorConfiguration>> {
        let sql = format!("SELECT {} FROM {} WHERE uuid = ?1", select_columns(), TABLE);
        conn.query_row(&sql, params![uuid], map_row)
            .optional()
            .with_context(|| Self::ctx("get_by_uuid", uuid))
    }

    fn save(
        &self,
        conn: &Connection,
        mut config: ReportProcessorConfiguration,
    ) -> RepositoryResult<ReportProcessorConfiguration> {
        let key = config.uuid.clone();
        let ctx = || Self::ctx("save", &key);
        let configuration_json = encode_json_map(&config.configuration, "configuration", ctx)?;

        match config.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO report_processor_configuration (
                        uuid, name, description, processor_type, configuration_json,
                        processor_mode, run_on_success, run_on_error,
                        creator, date_created, changed_by, date_changed,
                        retired, retired_by, date_retired, retire_reason
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                    "#,
                    params![
                        config.uuid,
                        config.name,
                        config.description,
                        config.processor_type,
                        configuration_json,
                        config.processor_mode.as_str(),
                        bool_to_int(config.run_on_success),
                        bool_to_int(config.run_on_error),
                        config.audit.creator,
                        format_datetime(&config.audit.date_created),
                        config.audit.changed_by,
                        format_opt_datetime(&config.audit.date_changed),
                        bool_to_int(config.retirement.retired),
                        config.retirement.retired_by,
                        format_opt_datetime(&config.retirement.date_retired),
                        config.retirement.retire_reason,
                    ],
                )
                .with_context(ctx)?;
                config.id = Some(conn.last_insert_rowid());
            }
            Some(id) => {
                let stored = ensure_same_identity(conn, TABLE, id, &config.uuid, ctx)?;
                stored.restore_creation(&mut config.audit);
                conn.execute(
                    r#"
                    UPDATE report_processor_configuration SET
                        name = ?2, description = ?3, processor_type = ?4, configuration_json = ?5,
                        processor_mode = ?6, run_on_success = ?7, run_on_error = ?8,
                        changed_by = ?9, date_changed = ?10,
                        retired = ?11, retired_by = ?12, date_retired = ?13, retire_reason = ?14
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        config.name,
                        config.description,
                        config.processor_type,
                        configuration_json,
                        config.processor_mode.as_str(),
                        bool_to_int(config.run_on_success),
                        bool_to_int(config.run_on_error),
                        config.audit.changed_by,
                        format_opt_datetime(&config.audit.date_changed),
                        bool_to_int(config.retirement.retired),
                        config.retirement.retired_by,
                        format_opt_datetime(&config.retirement.date_retired),
                        config.retirement.retire_reason,
                    ],
                )
                .with_context(ctx)?;
            }
        }

        Ok(config)
    }

    fn purge(&self, conn: &Connection, config: &ReportProcessorConfiguration) -> RepositoryResult<()> {
        let Some(id) = config.id else {
            return Ok(());
        };

        conn.execute(
            "DELETE FROM report_processor_configuration WHERE id = ?1",
            params![id],
        )
        .with_context(|| Self::ctx("purge", id))?;
        Ok(())
    }
}

fn map_row(row: &Row) -> rusqlite::Result<ReportProcessorConfiguration> {
    Ok(ReportProcessorConfiguration {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        processor_type: row.get(4)?,
        configuration: get_json_map(row, 5)?,
        processor_mode: get_enum(row, 6, ProcessorMode::parse)?,
        run_on_success: get_bool(row, 7)?,
        run_on_error: get_bool(row, 8)?,
        audit: get_audit(row, 9)?,
        retirement: get_retirement(row, 13)?,
    })
}
