// ==========================================
// 室内设计订单流程系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、配置和 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::WorkflowApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::engine::events::{OptionalEventPublisher, StageEventPublisher};
use crate::engine::WorkflowOrchestrator;
use crate::repository::action_log_repo::ActionLogRepository;

/// 应用状态
///
/// 所有组件共享同一个连接, 写操作由编排器在事务内串行执行
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 订单流程API
    pub workflow_api: Arc<WorkflowApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例 (不发布阶段事件)
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, OptionalEventPublisher::none())
    }

    /// 创建带事件发布者的AppState实例
    pub fn with_publisher(db_path: String, publisher: Arc<dyn StageEventPublisher>) -> Result<Self, String> {
        Self::build(db_path, OptionalEventPublisher::with_publisher(publisher))
    }

    fn build(db_path: String, publisher: OptionalEventPublisher) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        match read_schema_version(&conn).map_err(|e| format!("无法读取schema_version: {}", e))? {
            Some(v) if v > CURRENT_SCHEMA_VERSION => {
                return Err(format!(
                    "数据库schema_version={} 高于程序支持的版本 {}",
                    v, CURRENT_SCHEMA_VERSION
                ));
            }
            Some(v) => tracing::debug!(schema_version = v, "schema 版本检查通过"),
            None => return Err("数据库缺少schema_version表".to_string()),
        }

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let settings = config_manager
            .load_workflow_settings()
            .map_err(|e| format!("无法加载流程配置: {}", e))?;
        tracing::info!(
            response_days = settings.response_days,
            input_days = settings.input_days,
            kontrak_response_days = settings.kontrak_response_days,
            max_extension_days = settings.max_extension_days,
            "流程期限配置已加载"
        );

        // ==========================================
        // 编排器与API
        // ==========================================
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let orchestrator = Arc::new(WorkflowOrchestrator::new(conn, settings, publisher));
        let workflow_api = Arc::new(WorkflowApi::new(orchestrator, action_log_repo.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            workflow_api,
            config_manager,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// 优先级: 环境变量 INTERIOR_WORKFLOW_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("INTERIOR_WORKFLOW_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./interior_workflow.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("interior-workflow");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("interior_workflow.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_state_initializes_fresh_db() {
        let file = NamedTempFile::new().unwrap();
        let db_path = file.path().to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.get_db_path(), db_path);

        // 重复打开同一数据库 (建表幂等)
        let again = AppState::new(db_path);
        assert!(again.is_ok());
    }
}
