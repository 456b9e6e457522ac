// ==========================================
// 报表产物存储 - 领域类型定义
// ==========================================
// 状态/优先级/处理模式均为封闭枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// 报表请求状态 (Request Status)
// ==========================================
// 状态机:
//   PENDING → SCHEDULED → PROCESSING → {COMPLETED | FAILED}
//   任一非终态 → CANCELLED
//   PENDING/SCHEDULED → FAILED (执行前失败)
// 终态: COMPLETED / FAILED / CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,    // 已提交,等待执行
    Scheduled,  // 已排期(定时执行)
    Processing, // 执行中
    Completed,  // 执行成功
    Failed,     // 执行失败
    Cancelled,  // 已取消
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 6] = [
        RequestStatus::Pending,
        RequestStatus::Scheduled,
        RequestStatus::Processing,
        RequestStatus::Completed,
        RequestStatus::Failed,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Scheduled => "SCHEDULED",
            RequestStatus::Processing => "PROCESSING",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Failed => "FAILED",
            RequestStatus::Cancelled => "CANCELLED",
        }
    }

    /// 解析数据库/命令行中的状态文本 (大小写不敏感)
    pub fn parse(s: &str) -> Option<RequestStatus> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(RequestStatus::Pending),
            "SCHEDULED" => Some(RequestStatus::Scheduled),
            "PROCESSING" => Some(RequestStatus::Processing),
            "COMPLETED" => Some(RequestStatus::Completed),
            "FAILED" => Some(RequestStatus::Failed),
            "CANCELLED" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Failed | RequestStatus::Cancelled
        )
    }

    /// 判断状态转换是否合法
    ///
    /// 相同状态视为合法 (仅更新其他字段)。终态之后不允许任何转换。
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        if *self == next {
            return true;
        }

        match (self, next) {
            (RequestStatus::Pending, RequestStatus::Scheduled)
            | (RequestStatus::Pending, RequestStatus::Processing)
            | (RequestStatus::Scheduled, RequestStatus::Processing)
            | (RequestStatus::Processing, RequestStatus::Completed) => true,
            (from, RequestStatus::Failed) | (from, RequestStatus::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 请求优先级 (Priority)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Highest => "HIGHEST",
            Priority::High => "HIGH",
            Priority::Normal => "NORMAL",
            Priority::Low => "LOW",
            Priority::Lowest => "LOWEST",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s.trim().to_uppercase().as_str() {
            "HIGHEST" => Some(Priority::Highest),
            "HIGH" => Some(Priority::High),
            "NORMAL" => Some(Priority::Normal),
            "LOW" => Some(Priority::Low),
            "LOWEST" => Some(Priority::Lowest),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 后处理模式 (Processor Mode)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessorMode {
    Disabled,
    #[default]
    Automatic,
    OnDemand,
    OnDemandAndAutomatic,
}

impl ProcessorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorMode::Disabled => "DISABLED",
            ProcessorMode::Automatic => "AUTOMATIC",
            ProcessorMode::OnDemand => "ON_DEMAND",
            ProcessorMode::OnDemandAndAutomatic => "ON_DEMAND_AND_AUTOMATIC",
        }
    }

    pub fn parse(s: &str) -> Option<ProcessorMode> {
        match s.trim().to_uppercase().as_str() {
            "DISABLED" => Some(ProcessorMode::Disabled),
            "AUTOMATIC" => Some(ProcessorMode::Automatic),
            "ON_DEMAND" => Some(ProcessorMode::OnDemand),
            "ON_DEMAND_AND_AUTOMATIC" => Some(ProcessorMode::OnDemandAndAutomatic),
            _ => None,
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(
            self,
            ProcessorMode::Automatic | ProcessorMode::OnDemandAndAutomatic
        )
    }

    pub fn is_on_demand(&self) -> bool {
        matches!(
            self,
            ProcessorMode::OnDemand | ProcessorMode::OnDemandAndAutomatic
        )
    }
}

impl fmt::Display for ProcessorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 渲染器类型鉴别符 (Renderer Type)
// ==========================================
// 渲染器实现在别处解析,这里只保存鉴别字符串
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RendererType(String);

impl RendererType {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self(discriminator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RendererType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ==========================================
// 报表定义引用 (Report Definition Reference)
// ==========================================
// 按 UUID 松耦合引用,不是所有权关系
// 两个 UUID 相同的引用在过滤时等价
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportDefinitionRef {
    pub uuid: String,
}

impl ReportDefinitionRef {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }
}

// ==========================================
// 带参数映射的定义引用 (Mapped)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mapped {
    pub definition: ReportDefinitionRef,
    /// 参数名 → 表达式 (如 "startDate" → "${start_date}")
    pub parameter_mappings: BTreeMap<String, String>,
}

impl Mapped {
    pub fn new(definition: ReportDefinitionRef) -> Self {
        Self {
            definition,
            parameter_mappings: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.parameter_mappings.insert(name.into(), expression.into());
        self
    }

    pub fn references(&self, definition: &ReportDefinitionRef) -> bool {
        self.definition.uuid == definition.uuid
    }
}

impl Default for ReportDefinitionRef {
    fn default() -> Self {
        Self::new(String::new())
    }
}

// ==========================================
// 渲染方式 (Rendering Mode)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderingMode {
    pub renderer_type: RendererType,
    /// 渲染器参数 (通常为 ReportDesign 的 uuid)
    pub argument: Option<String>,
}

impl RenderingMode {
    pub fn new(renderer_type: RendererType, argument: Option<String>) -> Self {
        Self {
            renderer_type,
            argument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_are_allowed() {
        use RequestStatus::*;

        assert!(Pending.can_transition_to(Scheduled));
        assert!(Pending.can_transition_to(Processing));
        assert!(Scheduled.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Scheduled.can_transition_to(Failed));
    }

    #[test]
    fn test_backward_and_terminal_transitions_are_rejected() {
        use RequestStatus::*;

        assert!(!Processing.can_transition_to(Pending));
        assert!(!Scheduled.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));

        for terminal in [Completed, Failed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in RequestStatus::ALL {
                if next != terminal {
                    assert!(
                        !terminal.can_transition_to(next),
                        "{} -> {} 不应允许",
                        terminal,
                        next
                    );
                }
            }
        }
    }

    #[test]
    fn test_same_status_is_allowed() {
        for status in RequestStatus::ALL {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_status_parse_round_trips_as_str() {
        for status in RequestStatus::ALL {
            assert_eq!(RequestStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RequestStatus::parse(" completed "), Some(RequestStatus::Completed));
        assert_eq!(RequestStatus::parse("SAVED"), None);
    }

    #[test]
    fn test_status_serde_matches_db_text() {
        let json = serde_json::to_string(&RequestStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
    }

    #[test]
    fn test_processor_mode_flags() {
        assert!(ProcessorMode::OnDemandAndAutomatic.is_automatic());
        assert!(ProcessorMode::OnDemandAndAutomatic.is_on_demand());
        assert!(!ProcessorMode::Disabled.is_automatic());
        assert_eq!(
            ProcessorMode::parse("on_demand"),
            Some(ProcessorMode::OnDemand)
        );
    }

    #[test]
    fn test_mapped_references_by_uuid() {
        let mapped = Mapped::new(ReportDefinitionRef::new("def-1"))
            .with_parameter("startDate", "${start}");

        assert!(mapped.references(&ReportDefinitionRef::new("def-1")));
        assert!(!mapped.references(&ReportDefinitionRef::new("def-2")));
        assert_eq!(mapped.parameter_mappings.len(), 1);
    }
}
