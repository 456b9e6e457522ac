// ==========================================
// 报表产物存储 - 报表请求实体
// ==========================================
// 一次"现在或稍后生成该报表"的请求
// 红线: request_date 创建后不可变;状态只能单向前进
// ==========================================

use crate::domain::metadata::{new_uuid, now};
use crate::domain::types::{Mapped, Priority, RenderingMode, RequestStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("无效的状态转换: from={from} to={to}")]
pub struct StatusTransitionError {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub id: Option<i64>,
    pub uuid: String,
    /// 被请求的报表定义 (按 UUID 引用) 及参数映射
    pub report_definition: Mapped,
    pub base_cohort: Option<Mapped>,
    pub renderer: Option<RenderingMode>,
    pub priority: Priority,
    pub requested_by: Option<String>,
    pub request_date: NaiveDateTime,
    pub status: RequestStatus,
    pub description: Option<String>,
    /// cron 表达式,仅存储,不在此解析
    pub schedule: Option<String>,
    pub process_automatically: bool,
    pub minimum_days_to_preserve: Option<i32>,
    pub evaluate_start_datetime: Option<NaiveDateTime>,
    pub evaluate_complete_datetime: Option<NaiveDateTime>,
    pub render_complete_datetime: Option<NaiveDateTime>,
}

impl ReportRequest {
    /// 创建新请求,初始状态 PENDING,请求时间为当前时间
    pub fn new(report_definition: Mapped) -> Self {
        Self::requested_at(report_definition, now())
    }

    pub fn requested_at(report_definition: Mapped, request_date: NaiveDateTime) -> Self {
        Self {
            id: None,
            uuid: new_uuid(),
            report_definition,
            base_cohort: None,
            renderer: None,
            priority: Priority::default(),
            requested_by: None,
            request_date,
            status: RequestStatus::Pending,
            description: None,
            schedule: None,
            process_automatically: false,
            minimum_days_to_preserve: None,
            evaluate_start_datetime: None,
            evaluate_complete_datetime: None,
            render_complete_datetime: None,
        }
    }

    /// 推进状态并记录对应的执行时间戳
    ///
    /// - PROCESSING: 记录 evaluate_start_datetime
    /// - COMPLETED: 补齐 evaluate_complete_datetime / render_complete_datetime
    /// - FAILED: 补齐 evaluate_complete_datetime
    pub fn advance_to(
        &mut self,
        next: RequestStatus,
        at: NaiveDateTime,
    ) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                from: self.status,
                to: next,
            });
        }

        match next {
            RequestStatus::Processing => {
                self.evaluate_start_datetime.get_or_insert(at);
            }
            RequestStatus::Completed => {
                self.evaluate_complete_datetime.get_or_insert(at);
                self.render_complete_datetime.get_or_insert(at);
            }
            RequestStatus::Failed => {
                self.evaluate_complete_datetime.get_or_insert(at);
            }
            _ => {}
        }

        self.status = next;
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ReportDefinitionRef;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = ReportRequest::new(Mapped::new(ReportDefinitionRef::new("def-1")));
        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.id.is_none());
        assert!(!req.is_finished());
    }

    #[test]
    fn test_advance_stamps_timestamps() {
        let mut req = ReportRequest::requested_at(Mapped::new(ReportDefinitionRef::new("def-1")), at(8));

        req.advance_to(RequestStatus::Processing, at(9)).unwrap();
        assert_eq!(req.evaluate_start_datetime, Some(at(9)));

        req.advance_to(RequestStatus::Completed, at(10)).unwrap();
        assert_eq!(req.evaluate_complete_datetime, Some(at(10)));
        assert_eq!(req.render_complete_datetime, Some(at(10)));
        assert!(req.is_finished());
    }

    #[test]
    fn test_advance_rejects_resurrection() {
        let mut req = ReportRequest::requested_at(Mapped::new(ReportDefinitionRef::new("def-1")), at(8));
        req.advance_to(RequestStatus::Processing, at(9)).unwrap();
        req.advance_to(RequestStatus::Failed, at(9)).unwrap();

        let err = req.advance_to(RequestStatus::Pending, at(10)).unwrap_err();
        assert_eq!(err.from, RequestStatus::Failed);
        assert_eq!(err.to, RequestStatus::Pending);
        assert_eq!(req.status, RequestStatus::Failed);
    }
}
