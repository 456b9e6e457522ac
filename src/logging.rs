// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 过滤表达式来自 StoreConfig.log_filter (RUST_LOG 可覆盖)
// ==========================================

use crate::config::StoreConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志系统
///
/// 过滤表达式非法时回退到 info
///
/// # 示例
/// ```no_run
/// use report_store::{config::StoreConfig, logging};
/// let config = StoreConfig::load().unwrap();
/// logging::init(&config);
/// ```
pub fn init(config: &StoreConfig) {
    let filter = build_filter(&config.log_filter);

    if config.log_json {
        let _ = fmt().with_env_filter(filter).json().with_target(true).try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .try_init();
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

fn build_filter(expr: &str) -> EnvFilter {
    EnvFilter::try_new(expr).unwrap_or_else(|_| EnvFilter::new("info"))
}
