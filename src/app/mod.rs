// ==========================================
// 室内设计订单流程系统 - 应用层
// ==========================================
// 职责: 组装连接、配置、编排器与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
