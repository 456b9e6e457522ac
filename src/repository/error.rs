// ==========================================
// 报表产物存储 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: "未找到" 用 Ok(None) 表达,不是错误
//       基础设施错误携带 实体/操作/键 上下文,仓储内不重试、不记日志
// ==========================================

use crate::domain::types::RequestStatus;
use std::fmt;
use thiserror::Error;

/// 实体种类 (用于错误上下文)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    ReportDesign,
    ReportDesignResource,
    ReportProcessorConfiguration,
    ReportRequest,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::ReportDesign => "ReportDesign",
            EntityKind::ReportDesignResource => "ReportDesignResource",
            EntityKind::ReportProcessorConfiguration => "ReportProcessorConfiguration",
            EntityKind::ReportRequest => "ReportRequest",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 错误上下文: 哪个实体、哪个操作、哪个键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub entity: EntityKind,
    pub operation: &'static str,
    pub key: String,
}

impl ErrorContext {
    pub fn new(entity: EntityKind, operation: &'static str, key: impl ToString) -> Self {
        Self {
            entity,
            operation,
            key: key.to_string(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(key={})", self.entity, self.operation, self.key)
    }
}

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {context}")]
    NotFound { context: ErrorContext },

    #[error("数据库操作失败: {context}: {source}")]
    Database {
        context: ErrorContext,
        #[source]
        source: rusqlite::Error,
    },

    #[error("唯一约束违反: {context}: {message}")]
    UniqueConstraintViolation {
        context: ErrorContext,
        message: String,
    },

    #[error("外键约束违反: {context}: {message}")]
    ForeignKeyViolation {
        context: ErrorContext,
        message: String,
    },

    #[error("数据库连接失败: path={path}: {source}")]
    Connection {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("数据库会话操作失败: {operation}: {source}")]
    Session {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    // ===== 生命周期错误 =====
    #[error("无效的状态转换: {context} from={from} to={to}")]
    InvalidStateTransition {
        context: ErrorContext,
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("字段创建后不可修改 (field={field}): {context}")]
    ImmutableField {
        context: ErrorContext,
        field: &'static str,
    },

    // ===== 数据质量错误 =====
    #[error("字段序列化失败 (field={field}): {context}: {source}")]
    Serialization {
        context: ErrorContext,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RepositoryError {
    /// 按 SQLite 错误信息归类基础设施错误
    pub fn from_sqlite(err: rusqlite::Error, context: ErrorContext) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("UNIQUE") => {
                RepositoryError::UniqueConstraintViolation {
                    context,
                    message: msg.clone(),
                }
            }
            rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.contains("FOREIGN KEY") => {
                RepositoryError::ForeignKeyViolation {
                    context,
                    message: msg.clone(),
                }
            }
            _ => RepositoryError::Database {
                context,
                source: err,
            },
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            RepositoryError::NotFound { context }
            | RepositoryError::Database { context, .. }
            | RepositoryError::UniqueConstraintViolation { context, .. }
            | RepositoryError::ForeignKeyViolation { context, .. }
            | RepositoryError::InvalidStateTransition { context, .. }
            | RepositoryError::ImmutableField { context, .. }
            | RepositoryError::Serialization { context, .. } => Some(context),
            _ => None,
        }
    }

    /// 是否为存储/连接层故障 (调用方据此决定重试或放弃)
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            RepositoryError::Database { .. }
                | RepositoryError::UniqueConstraintViolation { .. }
                | RepositoryError::ForeignKeyViolation { .. }
                | RepositoryError::Connection { .. }
                | RepositoryError::Session { .. }
        )
    }
}

/// 为 rusqlite 结果补充错误上下文
pub trait SqliteResultExt<T> {
    fn with_context<F>(self, context: F) -> RepositoryResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T> SqliteResultExt<T> for rusqlite::Result<T> {
    fn with_context<F>(self, context: F) -> RepositoryResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| RepositoryError::from_sqlite(e, context()))
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
