// ==========================================
// 报表产物存储 - 存储配置
// ==========================================
// 加载顺序 (后者覆盖前者):
// 1. 内置默认值
// 2. REPORT_STORE_CONFIG 指向的 JSON 文件 (可选)
// 3. 环境变量 REPORT_STORE_DB_PATH / REPORT_STORE_BUSY_TIMEOUT_MS / RUST_LOG
// ==========================================

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "REPORT_STORE_CONFIG";
pub const ENV_DB_PATH: &str = "REPORT_STORE_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "REPORT_STORE_BUSY_TIMEOUT_MS";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置值非法: {key}={value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// 存储配置
///
/// JSON 文件中缺省的字段取默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite 数据库文件路径
    pub db_path: String,

    /// 等待其他会话释放锁的时间 (毫秒)
    pub busy_timeout_ms: u64,

    /// tracing EnvFilter 表达式
    pub log_filter: String,

    /// 以 JSON 行格式输出日志
    pub log_json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
        }
    }
}

impl StoreConfig {
    /// 从进程环境加载配置
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// 使用给定的变量查找函数加载配置 (测试中可替换环境)
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match non_empty(lookup(ENV_CONFIG_PATH)) {
            Some(path) => {
                tracing::debug!("加载配置文件: {}", path);
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        let config = base.apply_overrides(&lookup)?;
        config.validate()?;
        tracing::debug!(
            db_path = %config.db_path,
            busy_timeout_ms = config.busy_timeout_ms,
            "存储配置已解析"
        );
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 指定数据库路径,其余取默认值
    pub fn with_db_path(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    fn apply_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = non_empty(lookup(ENV_DB_PATH)) {
            self.db_path = path;
        }

        if let Some(raw) = non_empty(lookup(ENV_BUSY_TIMEOUT_MS)) {
            self.busy_timeout_ms = raw.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: ENV_BUSY_TIMEOUT_MS.to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        if let Some(filter) = non_empty(lookup(ENV_LOG_FILTER)) {
            self.log_filter = filter;
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "db_path".to_string(),
                value: self.db_path.clone(),
                reason: "不能为空".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "log_filter".to_string(),
                value: self.log_filter.clone(),
                reason: "不能为空".to_string(),
            });
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 默认数据库路径: <用户数据目录>/report-store/report_store.db
///
/// 拿不到用户数据目录时回退到当前目录。
/// 只解析路径,不触碰文件系统;目录在 Database::open 时按需创建
pub fn default_db_path() -> String {
    let path = match dirs::data_dir() {
        Some(data_dir) => data_dir.join("report-store").join("report_store.db"),
        None => PathBuf::from("./report_store.db"),
    };
    path.to_string_lossy().to_string()
}
