// ==========================================
// 报表产物存储 - SQLite 连接与会话
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键、busy_timeout)
// - 建表/升级 schema,记录 schema_version
// - 提供"一次工作单元 = 一个事务"的会话入口:
//   Ok 提交,Err 回滚,panic 时 Transaction drop 自动回滚
// ==========================================

use crate::config::{default_db_path, StoreConfig};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS report_design (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  uuid TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  description TEXT,
  report_definition_uuid TEXT NOT NULL,
  renderer_type TEXT NOT NULL,
  properties_json TEXT NOT NULL DEFAULT '{}',
  creator TEXT,
  date_created TEXT NOT NULL,
  changed_by TEXT,
  date_changed TEXT,
  retired INTEGER NOT NULL DEFAULT 0,
  retired_by TEXT,
  date_retired TEXT,
  retire_reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_report_design_definition ON report_design(report_definition_uuid);
CREATE INDEX IF NOT EXISTS idx_report_design_renderer ON report_design(renderer_type);

CREATE TABLE IF NOT EXISTS report_design_resource (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  uuid TEXT NOT NULL UNIQUE,
  report_design_id INTEGER NOT NULL REFERENCES report_design(id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  content_type TEXT,
  extension TEXT,
  contents BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_report_design_resource_design ON report_design_resource(report_design_id);

CREATE TABLE IF NOT EXISTS report_processor_configuration (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  uuid TEXT NOT NULL UNIQUE,
  name TEXT NOT NULL,
  description TEXT,
  processor_type TEXT NOT NULL,
  configuration_json TEXT NOT NULL DEFAULT '{}',
  processor_mode TEXT NOT NULL
    CHECK(processor_mode IN ('DISABLED', 'AUTOMATIC', 'ON_DEMAND', 'ON_DEMAND_AND_AUTOMATIC')),
  run_on_success INTEGER NOT NULL DEFAULT 1,
  run_on_error INTEGER NOT NULL DEFAULT 0,
  creator TEXT,
  date_created TEXT NOT NULL,
  changed_by TEXT,
  date_changed TEXT,
  retired INTEGER NOT NULL DEFAULT 0,
  retired_by TEXT,
  date_retired TEXT,
  retire_reason TEXT
);

CREATE INDEX IF NOT EXISTS idx_processor_config_type ON report_processor_configuration(processor_type);

CREATE TABLE IF NOT EXISTS report_request (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  uuid TEXT NOT NULL UNIQUE,
  report_definition_uuid TEXT NOT NULL,
  parameter_mappings_json TEXT NOT NULL DEFAULT '{}',
  base_cohort_uuid TEXT,
  base_cohort_mappings_json TEXT,
  renderer_type TEXT,
  renderer_argument TEXT,
  priority TEXT NOT NULL
    CHECK(priority IN ('HIGHEST', 'HIGH', 'NORMAL', 'LOW', 'LOWEST')),
  requested_by TEXT,
  request_date TEXT NOT NULL,
  status TEXT NOT NULL
    CHECK(status IN ('PENDING', 'SCHEDULED', 'PROCESSING', 'COMPLETED', 'FAILED', 'CANCELLED')),
  description TEXT,
  schedule TEXT,
  process_automatically INTEGER NOT NULL DEFAULT 0,
  minimum_days_to_preserve INTEGER,
  evaluate_start_datetime TEXT,
  evaluate_complete_datetime TEXT,
  render_complete_datetime TEXT
);

CREATE INDEX IF NOT EXISTS idx_report_request_definition ON report_request(report_definition_uuid);
CREATE INDEX IF NOT EXISTS idx_report_request_status ON report_request(status);
CREATE INDEX IF NOT EXISTS idx_report_request_date ON report_request(request_date);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启 (设计资源依赖级联删除)
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    configure_sqlite_connection_with_timeout(conn, DEFAULT_BUSY_TIMEOUT_MS)
}

pub fn configure_sqlite_connection_with_timeout(
    conn: &Connection,
    busy_timeout_ms: u64,
) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表并登记 schema_version (幂等)
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<i64> {
    let before = read_schema_version(conn)?;

    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        params![CURRENT_SCHEMA_VERSION],
    )?;

    match before {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                "数据库 schema_version={} 高于当前代码期望的 {}",
                v,
                CURRENT_SCHEMA_VERSION
            );
        }
        Some(v) if v == CURRENT_SCHEMA_VERSION => {
            tracing::debug!("schema 已是最新: version={}", v);
        }
        _ => {
            tracing::info!(
                "schema 已应用: {:?} -> {}",
                before,
                CURRENT_SCHEMA_VERSION
            );
        }
    }

    Ok(read_schema_version(conn)?.unwrap_or(CURRENT_SCHEMA_VERSION))
}

/// 仅当 db_path 就是默认路径时创建其父目录,返回是否执行了创建
///
/// 调用方自行指定的路径不做任何目录操作
pub fn ensure_default_db_dir(db_path: &str, default_path: &str) -> std::io::Result<bool> {
    if db_path != default_path {
        return Ok(false);
    }
    match Path::new(db_path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
            std::fs::create_dir_all(dir)?;
            tracing::info!("已创建默认数据目录: {}", dir.display());
            Ok(true)
        }
        _ => Ok(false),
    }
}

// ==========================================
// Database - 会话工厂
// ==========================================
// 仓储本身无状态;并发调用方各自通过 with_transaction 获取独立工作单元
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 按配置打开数据库文件
    ///
    /// 使用默认路径时先创建其所在目录
    pub fn open(config: &StoreConfig) -> RepositoryResult<Self> {
        if let Err(e) = ensure_default_db_dir(&config.db_path, &default_db_path()) {
            // 目录创建失败时由打开数据库报告具体错误
            tracing::warn!("默认数据目录创建失败: {}", e);
        }

        let conn = Connection::open(&config.db_path).map_err(|source| {
            RepositoryError::Connection {
                path: config.db_path.clone(),
                source,
            }
        })?;
        configure_sqlite_connection_with_timeout(&conn, config.busy_timeout_ms).map_err(
            |source| RepositoryError::Connection {
                path: config.db_path.clone(),
                source,
            },
        )?;

        tracing::info!("数据库已打开: {}", config.db_path);
        Ok(Self::from_connection(conn))
    }

    /// 内存数据库 (测试/临时使用)
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| RepositoryError::Connection {
            path: ":memory:".to_string(),
            source,
        })?;
        configure_sqlite_connection(&conn).map_err(|source| RepositoryError::Connection {
            path: ":memory:".to_string(),
            source,
        })?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// 获取连接
    ///
    /// 持锁方 panic 时锁会中毒;此时 Transaction 的 drop 已经回滚,
    /// 连接本身可继续使用,因此取回连接并清除中毒标记。
    /// 若连接仍处于未结束的事务中,先补一次回滚。
    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let guard = poisoned.into_inner();
                tracing::warn!("连接锁因工作单元 panic 中毒,恢复后继续使用");
                if !guard.is_autocommit() {
                    if let Err(e) = guard.execute_batch("ROLLBACK") {
                        tracing::warn!("残留事务回滚失败: {}", e);
                    }
                }
                self.conn.clear_poison();
                guard
            }
        }
    }

    /// 建表/升级,返回当前 schema_version
    pub fn migrate(&self) -> RepositoryResult<i64> {
        let conn = self.lock();
        apply_schema(&conn).map_err(|source| RepositoryError::Session {
            operation: "apply_schema",
            source,
        })
    }

    /// 在单个事务中执行一次工作单元
    ///
    /// - 使用 IMMEDIATE 事务,写锁在开始时获取,避免读后写升级锁失败
    /// - f 返回 Ok 则提交;返回 Err 则回滚并原样返回错误
    pub fn with_transaction<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> RepositoryResult<T>,
    {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| RepositoryError::Session {
                operation: "begin",
                source,
            })?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(|source| RepositoryError::Session {
                    operation: "commit",
                    source,
                })?;
                tracing::debug!("事务已提交");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!("事务回滚失败: {}", rollback_err);
                }
                tracing::debug!("事务已回滚: {}", err);
                Err(err)
            }
        }
    }

    /// 只读访问 (不开启显式事务)
    pub fn with_connection<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Connection) -> RepositoryResult<T>,
    {
        let conn = self.lock();
        f(&conn)
    }
}
