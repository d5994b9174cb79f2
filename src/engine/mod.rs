// ==========================================
// 室内设计订单流程系统 - 引擎层
// ==========================================
// 职责: 阶段转换守卫、RAB 派生计算、任务追踪、流程编排
// 红线: 守卫与计算引擎不拼 SQL; 写入只经由编排器的事务
// ==========================================

pub mod error;
pub mod events;
pub mod guard;
pub mod orchestrator;
pub mod rab_generator;
pub mod task_tracker;
pub mod workplan_export;

// 重导出核心引擎
pub use error::{WorkflowError, WorkflowResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, StageEvent, StageEventPublisher, StageEventType,
};
pub use guard::{Transition, TransitionGuard};
pub use orchestrator::{
    NewInvoice, NewKontrak, NewOrder, NewProduk, RabLineInput, WorkflowOrchestrator, WorkplanEntry,
};
pub use rab_generator::RabGenerator;
pub use task_tracker::{DeadlineReport, TaskTracker};
pub use workplan_export::WorkplanExport;
