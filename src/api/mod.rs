// ==========================================
// 室内设计订单流程系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供 CLI 及上层应用调用
// ==========================================

pub mod dto;
pub mod error;
pub mod workflow_api;

// 重导出核心类型
pub use dto::{ActorDto, ExtensionRequest, OrderStatusView, StageProgress};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use workflow_api::WorkflowApi;
