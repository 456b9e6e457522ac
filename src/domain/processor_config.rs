// ==========================================
// 报表产物存储 - 后处理配置实体
// ==========================================
// 独立生命周期,不归属任何 ReportDesign
// ==========================================

use crate::domain::metadata::{new_uuid, AuditInfo, Retirement};
use crate::domain::types::ProcessorMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProcessorConfiguration {
    pub id: Option<i64>,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    /// 处理器实现的鉴别符 (如 "EmailReportProcessor")
    pub processor_type: String,
    pub configuration: BTreeMap<String, String>,
    pub processor_mode: ProcessorMode,
    pub run_on_success: bool,
    pub run_on_error: bool,
    pub audit: AuditInfo,
    pub retirement: Retirement,
}

impl ReportProcessorConfiguration {
    pub fn new(name: impl Into<String>, processor_type: impl Into<String>) -> Self {
        Self {
            id: None,
            uuid: new_uuid(),
            name: name.into(),
            description: None,
            processor_type: processor_type.into(),
            configuration: BTreeMap::new(),
            processor_mode: ProcessorMode::default(),
            run_on_success: true,
            run_on_error: false,
            audit: AuditInfo::default(),
            retirement: Retirement::default(),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retirement.retired
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.configuration.insert(key.into(), value.into());
        self
    }
}
