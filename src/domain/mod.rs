// ==========================================
// 报表产物存储 - 领域层
// ==========================================
// 实体均为纯数据记录;修改必须经仓储 save 持久化
// ==========================================

pub mod metadata;
pub mod processor_config;
pub mod report_design;
pub mod report_request;
pub mod types;

pub use metadata::{AuditInfo, Retirement};
pub use processor_config::ReportProcessorConfiguration;
pub use report_design::{ReportDesign, ReportDesignResource};
pub use report_request::{ReportRequest, StatusTransitionError};
pub use types::{
    Mapped, Priority, ProcessorMode, RendererType, RenderingMode, ReportDefinitionRef,
    RequestStatus,
};
