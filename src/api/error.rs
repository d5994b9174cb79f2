// ==========================================
// 室内设计订单流程系统 - API层错误类型
// ==========================================
// 职责: 把引擎/仓储错误转换为带类别与阶段的用户可读错误
// ==========================================

use crate::domain::types::Tahap;
use crate::engine::error::WorkflowError;
use crate::repository::error::RepositoryError;
use serde::Serialize;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 流程规则错误
    // ==========================================
    #[error("前置条件不满足 [{stage}]: {reason}")]
    PrerequisiteNotMet { stage: Tahap, reason: String },

    #[error("阶段已响应: {0}")]
    AlreadyResponded(Tahap),

    #[error("阶段已审批: {0}")]
    AlreadyApproved(Tahap),

    #[error("阶段尚未响应: {0}")]
    NotYetResponded(Tahap),

    #[error("来源未锁定 (RAB Internal 尚未提交): {0}")]
    SourceNotLocked(Tahap),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 错误类别 (供前端区分处理)
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::PrerequisiteNotMet { .. } => "PREREQUISITE_NOT_MET",
            ApiError::AlreadyResponded(_) => "ALREADY_RESPONDED",
            ApiError::AlreadyApproved(_) => "ALREADY_APPROVED",
            ApiError::NotYetResponded(_) => "NOT_YET_RESPONDED",
            ApiError::SourceNotLocked(_) => "SOURCE_NOT_LOCKED",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    pub fn stage(&self) -> Option<Tahap> {
        match self {
            ApiError::PrerequisiteNotMet { stage, .. } => Some(*stage),
            ApiError::AlreadyResponded(s)
            | ApiError::AlreadyApproved(s)
            | ApiError::NotYetResponded(s)
            | ApiError::SourceNotLocked(s) => Some(*s),
            _ => None,
        }
    }

    /// 转换为可序列化的响应体
    pub fn to_response(&self) -> ApiErrorResponse {
        ApiErrorResponse {
            kind: self.kind(),
            stage: self.stage(),
            message: self.to_string(),
        }
    }
}

/// 错误响应体
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub kind: &'static str,
    pub stage: Option<Tahap>,
    pub message: String,
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 WorkflowError 转换
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::PrerequisiteNotMet { stage, reason } => {
                ApiError::PrerequisiteNotMet { stage, reason }
            }
            WorkflowError::AlreadyResponded(s) => ApiError::AlreadyResponded(s),
            WorkflowError::AlreadyApproved(s) => ApiError::AlreadyApproved(s),
            WorkflowError::NotYetResponded(s) => ApiError::NotYetResponded(s),
            WorkflowError::SourceNotLocked(s) => ApiError::SourceNotLocked(s),
            WorkflowError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            WorkflowError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            WorkflowError::Repository(err) => err.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
