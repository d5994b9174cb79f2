// ==========================================
// 室内设计订单流程系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单生命周期状态机 (Moodboard -> Kontrak -> Gambar Kerja)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 阶段守卫、RAB 计算、流程编排
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{RabVariant, Tahap, TaskStatus, WorkflowStage};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Actor, CommitmentFee, Estimasi, GambarKerja, ItemPekerjaan, Kontrak,
    Moodboard, Order, OrderAggregate, RabInternal, RabVariantSet, TaskResponse,
};

// 引擎
pub use engine::{RabGenerator, TaskTracker, TransitionGuard, WorkflowError, WorkflowOrchestrator};

// API
pub use api::{ApiError, WorkflowApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "室内设计订单流程系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
