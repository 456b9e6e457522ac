// ==========================================
// 报表产物存储 - 报表设计仓储
// ==========================================
// 表: report_design + report_design_resource (资源随设计保存/级联删除)
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::report_design::{ReportDesign, ReportDesignResource};
use crate::domain::types::{RendererType, ReportDefinitionRef};
use crate::repository::columns::{
    bool_to_int, encode_json_map, ensure_same_identity, format_datetime, format_opt_datetime,
    get_audit, get_json_map, get_retirement, METADATA_COLUMNS,
};
use crate::repository::entity_repo::EntityRepository;
use crate::repository::error::{
    EntityKind, ErrorContext, RepositoryError, RepositoryResult, SqliteResultExt,
};
use crate::repository::filter::ReportDesignFilter;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TABLE: &str = "report_design";
const RESOURCE_TABLE: &str = "report_design_resource";

fn select_columns() -> String {
    format!(
        "id, uuid, name, description, report_definition_uuid, renderer_type, properties_json, {}",
        METADATA_COLUMNS
    )
}

// ==========================================
// ReportDesignRepository - 报表设计仓储
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportDesignRepository;

impl ReportDesignRepository {
    pub fn new() -> Self {
        Self
    }

    fn ctx(operation: &'static str, key: impl ToString) -> ErrorContext {
        ErrorContext::new(<Self as EntityRepository>::KIND, operation, key)
    }

    /// 按过滤条件列出设计 (无序、不分页)
    pub fn list(
        &self,
        conn: &Connection,
        filter: &ReportDesignFilter,
    ) -> RepositoryResult<Vec<ReportDesign>> {
        let criteria = filter.to_criteria(TABLE);
        let mut designs = criteria
            .list(conn, &select_columns(), map_row)
            .with_context(|| Self::ctx("list", format!("{:?}", filter)))?;

        for design in designs.iter_mut() {
            if let Some(id) = design.id {
                design.resources = self.load_resources(conn, id)?;
            }
        }
        Ok(designs)
    }

    fn find_one(
        &self,
        conn: &Connection,
        column: &'static str,
        value: &dyn rusqlite::ToSql,
        key: String,
    ) -> RepositoryResult<Option<ReportDesign>> {
        let sql = format!("SELECT {} FROM {} WHERE {} = ?1", select_columns(), TABLE, column);
        let found = conn
            .query_row(&sql, params![value], map_row)
            .optional()
            .with_context(|| Self::ctx("get", &key))?;

        match found {
            Some(mut design) => {
                if let Some(id) = design.id {
                    design.resources = self.load_resources(conn, id)?;
                }
                Ok(Some(design))
            }
            None => Ok(None),
        }
    }

    // ==========================================
    // 资源 (子表)
    // ==========================================

    fn load_resources(
        &self,
        conn: &Connection,
        design_id: i64,
    ) -> RepositoryResult<Vec<ReportDesignResource>> {
        let ctx = || {
            ErrorContext::new(EntityKind::ReportDesignResource, "load", format!("design_id={}", design_id))
        };

        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, uuid, name, content_type, extension, contents
                FROM report_design_resource
                WHERE report_design_id = ?1
                ORDER BY id
                "#,
            )
            .with_context(ctx)?;

        let resources = stmt
            .query_map(params![design_id], map_resource_row)
            .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
            .with_context(ctx)?;
        Ok(resources)
    }

    /// 同步资源: 删除不再存在的,按 uuid 更新或插入其余的,回填 id
    ///
    /// uuid 已属于其他设计时返回 UniqueConstraintViolation
    fn save_resources(
        &self,
        conn: &Connection,
        design_id: i64,
        resources: Vec<ReportDesignResource>,
    ) -> RepositoryResult<Vec<ReportDesignResource>> {
        let uuids: Vec<&str> = resources.iter().map(|r| r.uuid.as_str()).collect();
        let delete_ctx = || {
            ErrorContext::new(EntityKind::ReportDesignResource, "save", format!("design_id={}", design_id))
        };

        if uuids.is_empty() {
            conn.execute(
                "DELETE FROM report_design_resource WHERE report_design_id = ?1",
                params![design_id],
            )
            .with_context(delete_ctx)?;
            return Ok(resources);
        }

        let placeholders = (0..uuids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "DELETE FROM {} WHERE report_design_id = ?1 AND uuid NOT IN ({})",
            RESOURCE_TABLE, placeholders
        );
        let mut values: Vec<&dyn rusqlite::ToSql> = vec![&design_id];
        values.extend(uuids.iter().map(|u| u as &dyn rusqlite::ToSql));
        conn.execute(&sql, params_from_iter(values))
            .with_context(delete_ctx)?;

        let mut saved = Vec::with_capacity(resources.len());
        for mut resource in resources {
            let ctx = || ErrorContext::new(EntityKind::ReportDesignResource, "save", &resource.uuid);

            // 资源 uuid 全局唯一: 已属于其他设计的资源不能被挪走
            let existing: Option<(i64, i64)> = conn
                .query_row(
                    "SELECT id, report_design_id FROM report_design_resource WHERE uuid = ?1",
                    params![resource.uuid],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .with_context(ctx)?;

            let id = match existing {
                Some((_, owner)) if owner != design_id => {
                    return Err(RepositoryError::UniqueConstraintViolation {
                        context: ctx(),
                        message: format!("资源 uuid 已属于其他设计 (report_design_id={})", owner),
                    });
                }
                Some((id, _)) => {
                    conn.execute(
                        r#"
                        UPDATE report_design_resource SET
                            name = ?2, content_type = ?3, extension = ?4, contents = ?5
                        WHERE id = ?1
                        "#,
                        params![
                            id,
                            resource.name,
                            resource.content_type,
                            resource.extension,
                            resource.contents,
                        ],
                    )
                    .with_context(ctx)?;
                    id
                }
                None => {
                    conn.execute(
                        r#"
                        INSERT INTO report_design_resource (
                            uuid, report_design_id, name, content_type, extension, contents
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                        "#,
                        params![
                            resource.uuid,
                            design_id,
                            resource.name,
                            resource.content_type,
                            resource.extension,
                            resource.contents,
                        ],
                    )
                    .with_context(ctx)?;
                    conn.last_insert_rowid()
                }
            };

            resource.id = Some(id);
            saved.push(resource);
        }
        Ok(saved)
    }
}

impl EntityRepository for ReportDesignRepository {
    type Entity = ReportDesign;

    const KIND: EntityKind = EntityKind::ReportDesign;

    fn get_by_id(&self, conn: &Connection, id: i64) -> RepositoryResult<Option<ReportDesign>> {
        self.find_one(conn, "id", &id, id.to_string())
    }

    fn get_by_uuid(&self, conn: &Connection, uuid: &str) -> RepositoryResult<Option<ReportDesign>> {
        self.find_one(conn, "uuid", &uuid, uuid.to_string())
    }

    fn save(&self, conn: &Connection, mut design: ReportDesign) -> RepositoryResult<ReportDesign> {
        let key = design.uuid.clone();
        let ctx = || Self::ctx("save", &key);
        let properties_json = encode_json_map(&design.properties, "properties", ctx)?;

        let design_id = match design.id {
            None => {
                conn.execute(
                    r#"
                    INSERT INTO report_design (
                        uuid, name, description, report_definition_uuid, renderer_type,
                        properties_json, creator, date_created, changed_by, date_changed,
                        retired, retired_by, date_retired, retire_reason
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                    "#,
                    params![
                        design.uuid,
                        design.name,
                        design.description,
                        design.report_definition.uuid,
                        design.renderer_type.as_str(),
                        properties_json,
                        design.audit.creator,
                        format_datetime(&design.audit.date_created),
                        design.audit.changed_by,
                        format_opt_datetime(&design.audit.date_changed),
                        bool_to_int(design.retirement.retired),
                        design.retirement.retired_by,
                        format_opt_datetime(&design.retirement.date_retired),
                        design.retirement.retire_reason,
                    ],
                )
                .with_context(ctx)?;
                conn.last_insert_rowid()
            }
            Some(id) => {
                let stored = ensure_same_identity(conn, TABLE, id, &design.uuid, ctx)?;
                // creator / date_created 只在插入时写入
                stored.restore_creation(&mut design.audit);
                conn.execute(
                    r#"
                    UPDATE report_design SET
                        name = ?2, description = ?3, report_definition_uuid = ?4,
                        renderer_type = ?5, properties_json = ?6,
                        changed_by = ?7, date_changed = ?8,
                        retired = ?9, retired_by = ?10, date_retired = ?11, retire_reason = ?12
                    WHERE id = ?1
                    "#,
                    params![
                        id,
                        design.name,
                        design.description,
                        design.report_definition.uuid,
                        design.renderer_type.as_str(),
                        properties_json,
                        design.audit.changed_by,
                        format_opt_datetime(&design.audit.date_changed),
                        bool_to_int(design.retirement.retired),
                        design.retirement.retired_by,
                        format_opt_datetime(&design.retirement.date_retired),
                        design.retirement.retire_reason,
                    ],
                )
                .with_context(ctx)?;
                id
            }
        };

        design.id = Some(design_id);
        let resources = std::mem::take(&mut design.resources);
        design.resources = self.save_resources(conn, design_id, resources)?;
        Ok(design)
    }

    fn purge(&self, conn: &Connection, design: &ReportDesign) -> RepositoryResult<()> {
        let Some(id) = design.id else {
            return Ok(());
        };
        let ctx = || Self::ctx("purge", id);

        conn.execute(
            "DELETE FROM report_design_resource WHERE report_design_id = ?1",
            params![id],
        )
        .with_context(ctx)?;
        conn.execute("DELETE FROM report_design WHERE id = ?1", params![id])
            .with_context(ctx)?;
        Ok(())
    }
}

fn map_row(row: &Row) -> rusqlite::Result<ReportDesign> {
    Ok(ReportDesign {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        report_definition: ReportDefinitionRef::new(row.get::<_, String>(4)?),
        renderer_type: RendererType::new(row.get::<_, String>(5)?),
        properties: get_json_map(row, 6)?,
        resources: Vec::new(),
        audit: get_audit(row, 7)?,
        retirement: get_retirement(row, 11)?,
    })
}

fn map_resource_row(row: &Row) -> rusqlite::Result<ReportDesignResource> {
    Ok(ReportDesignResource {
        id: Some(row.get(0)?),
        uuid: row.get(1)?,
        name: row.get(2)?,
        content_type: row.get(3)?,
        extension: row.get(4)?,
        contents: row.get(5)?,
    })
}
