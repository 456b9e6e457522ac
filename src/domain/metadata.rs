// ==========================================
// 报表产物存储 - 通用元数据
// ==========================================
// 审计字段 + 退役(软删除)标记,所有实体共用
// 退役只是字段修改,经 save 持久化;物理删除走 purge
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// 当前 UTC 时间 (无时区)
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// 新实体的外部标识
pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ==========================================
// 审计信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub creator: Option<String>,
    pub date_created: NaiveDateTime,
    pub changed_by: Option<String>,
    pub date_changed: Option<NaiveDateTime>,
}

impl AuditInfo {
    pub fn created_by(creator: Option<String>, at: NaiveDateTime) -> Self {
        Self {
            creator,
            date_created: at,
            changed_by: None,
            date_changed: None,
        }
    }

    /// 记录一次修改 (调用方在 save 之前调用);创建信息保持不变
    pub fn touch(&mut self, changed_by: Option<String>, at: NaiveDateTime) {
        self.changed_by = changed_by;
        self.date_changed = Some(at);
    }
}

impl Default for AuditInfo {
    fn default() -> Self {
        Self::created_by(None, now())
    }
}

// ==========================================
// 退役信息 (软删除)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Retirement {
    pub retired: bool,
    pub retired_by: Option<String>,
    pub date_retired: Option<NaiveDateTime>,
    pub retire_reason: Option<String>,
}

impl Retirement {
    pub fn retire(&mut self, by: Option<String>, reason: Option<String>, at: NaiveDateTime) {
        self.retired = true;
        self.retired_by = by;
        self.retire_reason = reason;
        self.date_retired = Some(at);
    }

    pub fn unretire(&mut self) {
        *self = Retirement::default();
    }
}
