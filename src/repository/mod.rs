// ==========================================
// 报表产物存储 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑,不持有会话,不提交事务
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod columns;
pub mod criteria;
pub mod entity_repo;
pub mod error;
pub mod filter;
pub mod processor_config_repo;
pub mod report_design_repo;
pub mod report_request_repo;

// 重导出核心仓储
pub use criteria::{Criteria, Restriction};
pub use entity_repo::EntityRepository;
pub use error::{EntityKind, ErrorContext, RepositoryError, RepositoryResult};
pub use filter::{ProcessorConfigurationFilter, ReportDesignFilter, ReportRequestFilter};
pub use processor_config_repo::ReportProcessorConfigurationRepository;
pub use report_design_repo::ReportDesignRepository;
pub use report_request_repo::ReportRequestRepository;
