// ==========================================
// 报表产物存储 - 核心库
// ==========================================
// 持久化报表设计 / 后处理配置 / 报表请求,
// 并提供按定义、时间范围、状态组合的请求查询
// 技术栈: Rust + SQLite (rusqlite)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 存储配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/事务）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    Mapped, Priority, ProcessorMode, RendererType, RenderingMode, ReportDefinitionRef,
    RequestStatus,
};

// 领域实体
pub use domain::{ReportDesign, ReportDesignResource, ReportProcessorConfiguration, ReportRequest};

// 仓储
pub use repository::{
    EntityRepository, ProcessorConfigurationFilter, ReportDesignFilter,
    ReportDesignRepository, ReportProcessorConfigurationRepository, ReportRequestFilter,
    ReportRequestRepository, RepositoryError, RepositoryResult,
};

// 基础设施
pub use config::StoreConfig;
pub use db::Database;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "report-store";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
