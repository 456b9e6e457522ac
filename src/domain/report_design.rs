// ==========================================
// 报表产物存储 - 报表设计实体
// ==========================================
// ReportDesign: 报表定义 × 渲染器实现 的绑定
// 资源(模板文件等)归属于设计,随设计保存/删除
// ==========================================

use crate::domain::metadata::{new_uuid, AuditInfo, Retirement};
use crate::domain::types::{RendererType, ReportDefinitionRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDesign {
    pub id: Option<i64>,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub report_definition: ReportDefinitionRef,
    pub renderer_type: RendererType,
    pub properties: BTreeMap<String, String>,
    pub resources: Vec<ReportDesignResource>,
    pub audit: AuditInfo,
    pub retirement: Retirement,
}

impl ReportDesign {
    pub fn new(
        name: impl Into<String>,
        report_definition: ReportDefinitionRef,
        renderer_type: RendererType,
    ) -> Self {
        Self {
            id: None,
            uuid: new_uuid(),
            name: name.into(),
            description: None,
            report_definition,
            renderer_type,
            properties: BTreeMap::new(),
            resources: Vec::new(),
            audit: AuditInfo::default(),
            retirement: Retirement::default(),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retirement.retired
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn add_resource(&mut self, resource: ReportDesignResource) {
        self.resources.push(resource);
    }

    pub fn resource_by_name(&self, name: &str) -> Option<&ReportDesignResource> {
        self.resources.iter().find(|r| r.name == name)
    }
}

// ==========================================
// 设计资源 (模板/附件)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDesignResource {
    pub id: Option<i64>,
    pub uuid: String,
    pub name: String,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    pub contents: Vec<u8>,
}

impl ReportDesignResource {
    pub fn new(name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            id: None,
            uuid: new_uuid(),
            name: name.into(),
            content_type: None,
            extension: None,
            contents,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>, extension: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self.extension = Some(extension.into());
        self
    }
}
