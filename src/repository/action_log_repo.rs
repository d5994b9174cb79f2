// ==========================================
// 室内设计订单流程系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有状态变更必须记录
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;
