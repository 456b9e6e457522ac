// ==========================================
// 报表产物存储 - 列编解码工具
// ==========================================
// 时间: 定宽文本 "YYYY-MM-DD HH:MM:SS.fffffffff",字典序即时间序
// 映射: JSON 文本
// 布尔: INTEGER 0/1
// ==========================================

use crate::domain::metadata::{AuditInfo, Retirement};
use crate::repository::error::{ErrorContext, RepositoryError, RepositoryResult, SqliteResultExt};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

pub const DATETIME_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";
const DATETIME_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_WRITE_FORMAT).to_string()
}

pub fn format_opt_datetime(ts: &Option<NaiveDateTime>) -> Option<String> {
    ts.as_ref().map(format_datetime)
}

fn conversion_error<E>(idx: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

pub fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_READ_FORMAT)
        .map_err(|e| conversion_error(idx, Type::Text, e))
}

pub fn get_opt_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDateTime::parse_from_str(&s, DATETIME_READ_FORMAT)
            .map_err(|e| conversion_error(idx, Type::Text, e))
    })
    .transpose()
}

pub fn get_bool(row: &Row, idx: usize) -> rusqlite::Result<bool> {
    Ok(row.get::<_, i64>(idx)? != 0)
}

pub fn get_json_map(row: &Row, idx: usize) -> rusqlite::Result<BTreeMap<String, String>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) if !s.trim().is_empty() => {
            serde_json::from_str(&s).map_err(|e| conversion_error(idx, Type::Text, e))
        }
        _ => Ok(BTreeMap::new()),
    }
}

/// 枚举文本列解码;未知取值视为列转换失败
pub fn get_enum<T, F>(row: &Row, idx: usize, parse: F) -> rusqlite::Result<T>
where
    F: FnOnce(&str) -> Option<T>,
{
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        conversion_error(
            idx,
            Type::Text,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("未知枚举取值: {}", raw),
            ),
        )
    })
}

pub fn encode_json_map(
    map: &BTreeMap<String, String>,
    field: &'static str,
    context: impl FnOnce() -> ErrorContext,
) -> RepositoryResult<String> {
    serde_json::to_string(map).map_err(|source| RepositoryError::Serialization {
        context: context(),
        field,
        source,
    })
}

pub fn bool_to_int(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

// ==========================================
// 通用元数据列 (审计 4 列 + 退役 4 列)
// ==========================================
// 列顺序: creator, date_created, changed_by, date_changed,
//         retired, retired_by, date_retired, retire_reason
pub const METADATA_COLUMNS: &str = "creator, date_created, changed_by, date_changed, \
     retired, retired_by, date_retired, retire_reason";

pub fn get_audit(row: &Row, start: usize) -> rusqlite::Result<AuditInfo> {
    Ok(AuditInfo {
        creator: row.get(start)?,
        date_created: get_datetime(row, start + 1)?,
        changed_by: row.get(start + 2)?,
        date_changed: get_opt_datetime(row, start + 3)?,
    })
}

pub fn get_retirement(row: &Row, start: usize) -> rusqlite::Result<Retirement> {
    Ok(Retirement {
        retired: get_bool(row, start)?,
        retired_by: row.get(start + 1)?,
        date_retired: get_opt_datetime(row, start + 2)?,
        retire_reason: row.get(start + 3)?,
    })
}

// ==========================================
// 身份校验 (upsert 更新前)
// ==========================================

/// 已持久化行的身份与创建信息 (更新时不可改写)
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIdentity {
    pub uuid: String,
    pub creator: Option<String>,
    pub date_created: NaiveDateTime,
}

impl StoredIdentity {
    /// 用库中的创建信息覆盖调用方传入的值
    pub fn restore_creation(&self, audit: &mut AuditInfo) {
        audit.creator = self.creator.clone();
        audit.date_created = self.date_created;
    }
}

/// 读取已持久化行的身份,行不存在时返回 None
pub fn stored_identity(
    conn: &Connection,
    table: &'static str,
    id: i64,
    context: impl Fn() -> ErrorContext,
) -> RepositoryResult<Option<StoredIdentity>> {
    let sql = format!("SELECT uuid, creator, date_created FROM {} WHERE id = ?1", table);
    conn.query_row(&sql, params![id], |row| {
        Ok(StoredIdentity {
            uuid: row.get(0)?,
            creator: row.get(1)?,
            date_created: get_datetime(row, 2)?,
        })
    })
    .optional()
    .with_context(&context)
}

/// 更新前校验: 行必须存在,且 uuid 未被修改
pub fn ensure_same_identity(
    conn: &Connection,
    table: &'static str,
    id: i64,
    uuid: &str,
    context: impl Fn() -> ErrorContext,
) -> RepositoryResult<StoredIdentity> {
    match stored_identity(conn, table, id, &context)? {
        None => Err(RepositoryError::NotFound { context: context() }),
        Some(stored) if stored.uuid != uuid => Err(RepositoryError::ImmutableField {
            context: context(),
            field: "uuid",
        }),
        Some(stored) => Ok(stored),
    }
}
