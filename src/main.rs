// ==========================================
// 报表产物存储 - 管理命令行
// ==========================================
// 用法:
//   report-store migrate
//   report-store requests [STATUS,...]
//   report-store request-counts
//   report-store designs [--all]
//   report-store purge-request <uuid>
//
// 数据库路径等配置见 StoreConfig (REPORT_STORE_CONFIG / REPORT_STORE_DB_PATH)
// ==========================================

use anyhow::{bail, Context, Result};
use report_store::{
    config::StoreConfig, logging, Database, EntityRepository, ReportDesignFilter,
    ReportDesignRepository, ReportRequestFilter, ReportRequestRepository, RequestStatus,
};
use serde::Serialize;
use std::collections::BTreeSet;

const USAGE: &str = "用法: report-store <migrate | requests [STATUS,...] | request-counts | designs [--all] | purge-request <uuid>>";

fn main() -> Result<()> {
    let config = StoreConfig::load().context("加载配置失败")?;
    logging::init(&config);

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        bail!(USAGE);
    };
    let rest: Vec<String> = args.collect();

    tracing::info!("{} v{}: {}", report_store::APP_NAME, report_store::VERSION, command);

    let db = Database::open(&config).context("打开数据库失败")?;
    let version = db.migrate().context("建表/升级失败")?;

    match command.as_str() {
        "migrate" => {
            println!("schema_version={}", version);
        }
        "requests" => {
            let statuses = parse_statuses(rest.first().map(String::as_str))?;
            let filter = ReportRequestFilter::new().with_statuses(statuses);
            let requests =
                db.with_connection(|conn| ReportRequestRepository::new().list(conn, &filter))?;
            print_json(&requests)?;
        }
        "request-counts" => {
            let counts =
                db.with_connection(|conn| ReportRequestRepository::new().count_by_status(conn))?;
            print_json(&counts)?;
        }
        "designs" => {
            let include_retired = rest.iter().any(|a| a == "--all");
            let filter = ReportDesignFilter::new().include_retired(include_retired);
            let designs =
                db.with_connection(|conn| ReportDesignRepository::new().list(conn, &filter))?;
            print_json(&designs)?;
        }
        "purge-request" => {
            let Some(uuid) = rest.first() else {
                bail!(USAGE);
            };
            let purged = db.with_transaction(|tx| {
                let repo = ReportRequestRepository::new();
                match repo.get_by_uuid(tx, uuid)? {
                    Some(request) => {
                        repo.purge(tx, &request)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            })?;

            if !purged {
                bail!("报表请求不存在: {}", uuid);
            }
            tracing::info!("已删除报表请求: {}", uuid);
            println!("purged {}", uuid);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

/// 解析逗号分隔的状态列表;缺省表示不约束
fn parse_statuses(raw: Option<&str>) -> Result<BTreeSet<RequestStatus>> {
    let mut statuses = BTreeSet::new();
    for part in raw.unwrap_or_default().split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match RequestStatus::parse(part) {
            Some(status) => {
                statuses.insert(status);
            }
            None => bail!("未知状态: {}", part),
        }
    }
    Ok(statuses)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
