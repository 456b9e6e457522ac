// ==========================================
// 报表产物存储 - 列表过滤条件
// ==========================================
// 约定:
// - 每个过滤项都是可选的,缺省 = 不约束 (全集,而不是空集)
// - include_retired=false 追加 retired = 0;true 表示"不按退役过滤",不是"只看退役"
// - 状态集合为空 = 不约束;非空时集合内 OR,与其他条件 AND
// - 时间上下界各自独立、闭区间;after > before 是合法调用,结果为空
// ==========================================

use crate::domain::types::{RendererType, ReportDefinitionRef, RequestStatus};
use crate::repository::columns::format_datetime;
use crate::repository::criteria::Criteria;
use chrono::NaiveDateTime;
use std::collections::BTreeSet;

fn with_retirement(criteria: Criteria, include_retired: bool) -> Criteria {
    if include_retired {
        criteria
    } else {
        criteria.eq("retired", 0i64)
    }
}

// ==========================================
// 报表设计过滤
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDesignFilter {
    pub definition: Option<ReportDefinitionRef>,
    pub renderer_type: Option<RendererType>,
    pub include_retired: bool,
}

impl ReportDesignFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_definition(mut self, definition: &ReportDefinitionRef) -> Self {
        self.definition = Some(definition.clone());
        self
    }

    pub fn with_renderer_type(mut self, renderer_type: RendererType) -> Self {
        self.renderer_type = Some(renderer_type);
        self
    }

    pub fn include_retired(mut self, include_retired: bool) -> Self {
        self.include_retired = include_retired;
        self
    }

    pub fn to_criteria(&self, table: &'static str) -> Criteria {
        let mut criteria = Criteria::new(table);
        if let Some(definition) = &self.definition {
            criteria = criteria.eq("report_definition_uuid", definition.uuid.clone());
        }
        if let Some(renderer_type) = &self.renderer_type {
            criteria = criteria.eq("renderer_type", renderer_type.as_str().to_string());
        }
        with_retirement(criteria, self.include_retired)
    }
}

// ==========================================
// 后处理配置过滤
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessorConfigurationFilter {
    pub processor_type: Option<String>,
    pub include_retired: bool,
}

impl ProcessorConfigurationFilter {
    pub fn new(include_retired: bool) -> Self {
        Self {
            processor_type: None,
            include_retired,
        }
    }

    pub fn with_processor_type(mut self, processor_type: impl Into<String>) -> Self {
        self.processor_type = Some(processor_type.into());
        self
    }

    pub fn to_criteria(&self, table: &'static str) -> Criteria {
        let mut criteria = Criteria::new(table);
        if let Some(processor_type) = &self.processor_type {
            criteria = criteria.eq("processor_type", processor_type.clone());
        }
        with_retirement(criteria, self.include_retired)
    }
}

// ==========================================
// 报表请求过滤
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRequestFilter {
    pub definition: Option<ReportDefinitionRef>,
    pub requested_on_or_after: Option<NaiveDateTime>,
    pub requested_on_or_before: Option<NaiveDateTime>,
    pub statuses: BTreeSet<RequestStatus>,
}

impl ReportRequestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_definition(mut self, definition: &ReportDefinitionRef) -> Self {
        self.definition = Some(definition.clone());
        self
    }

    pub fn on_or_after(mut self, ts: NaiveDateTime) -> Self {
        self.requested_on_or_after = Some(ts);
        self
    }

    pub fn on_or_before(mut self, ts: NaiveDateTime) -> Self {
        self.requested_on_or_before = Some(ts);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = RequestStatus>,
    {
        self.statuses.extend(statuses);
        self
    }

    /// 时间窗口是否必然为空
    pub fn is_empty_range(&self) -> bool {
        matches!(
            (self.requested_on_or_after, self.requested_on_or_before),
            (Some(after), Some(before)) if after > before
        )
    }

    pub fn to_criteria(&self, table: &'static str) -> Criteria {
        let mut criteria = Criteria::new(table);
        if let Some(definition) = &self.definition {
            criteria = criteria.eq("report_definition_uuid", definition.uuid.clone());
        }
        if let Some(after) = &self.requested_on_or_after {
            criteria = criteria.ge("request_date", format_datetime(after));
        }
        if let Some(before) = &self.requested_on_or_before {
            criteria = criteria.le("request_date", format_datetime(before));
        }
        if !self.statuses.is_empty() {
            criteria = criteria.is_in(
                "status",
                self.statuses.iter().map(|s| s.as_str().to_string()),
            );
        }
        criteria
    }
}
