// ==========================================
// 报表产物存储 - 报表请求数据仓储
// ==========================================
// 表: report_request
// 红线: 状态只能单向前进,request_date / uuid 创建后不可变
//       (在 save 中校验,违例返回类型化错误)
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use self::core::ReportRequestRepository;
