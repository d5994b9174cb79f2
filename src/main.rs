// ==========================================
// 室内设计订单流程系统 - 命令行入口
// ==========================================
// 用法:
//   interior-workflow status <order_id>
//   interior-workflow history <order_id>
//   interior-workflow export-workplan <order_id> [out.csv]
//   interior-workflow check-deadlines
//   interior-workflow settings
//
// 数据库路径: INTERIOR_WORKFLOW_DB_PATH 或用户数据目录
// ==========================================

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use interior_workflow::app::{get_default_db_path, AppState};
use interior_workflow::logging;

const USAGE: &str = "用法: interior-workflow <status|history|export-workplan|check-deadlines|settings> [参数]";

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().ok_or_else(|| anyhow!(USAGE))?;

    let db_path = get_default_db_path();
    tracing::info!(version = interior_workflow::VERSION, db_path = %db_path, "{}", interior_workflow::APP_NAME);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e)).context("初始化失败")?;
    let api = &state.workflow_api;

    match command.as_str() {
        "status" => {
            let order_id = required_arg(args.next(), "order_id")?;
            let status = api.get_order_status(&order_id)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        "history" => {
            let order_id = required_arg(args.next(), "order_id")?;
            let logs = api.list_action_logs(&order_id)?;
            println!("{}", serde_json::to_string_pretty(&logs)?);
        }
        "export-workplan" => {
            let order_id = required_arg(args.next(), "order_id")?;
            match args.next() {
                Some(out) => {
                    let path = PathBuf::from(out);
                    let rows = api.export_workplan_to_file(&order_id, &path)?;
                    println!("已导出 {} 行到 {}", rows, path.display());
                }
                None => print!("{}", api.export_workplan_csv(&order_id)?),
            }
        }
        "check-deadlines" => {
            let report = api.check_deadlines()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "settings" => {
            let settings = state
                .config_manager
                .load_workflow_settings()
                .map_err(|e| anyhow!("无法加载流程配置: {}", e))?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn required_arg(arg: Option<String>, name: &str) -> Result<String> {
    arg.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("缺少参数 <{}>\n{}", name, USAGE))
}
