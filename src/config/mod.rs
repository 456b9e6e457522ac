// ==========================================
// 报表产物存储 - 配置层
// ==========================================
// 职责: 存储配置加载 (默认值 → JSON 文件 → 环境变量)
// ==========================================

pub mod store_config;

pub use store_config::{default_db_path, ConfigError, StoreConfig};
