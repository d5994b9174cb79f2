// ==========================================
// 室内设计订单流程系统 - 流程引擎错误类型
// ==========================================
// 全部为可恢复的业务拒绝: 校验先于写入, 失败时事务回滚
// ==========================================

use crate::domain::stage::StageError;
use crate::domain::types::Tahap;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
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

    #[error("记录不存在: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("输入无效: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    pub fn prerequisite(stage: Tahap, reason: impl Into<String>) -> Self {
        WorkflowError::PrerequisiteNotMet {
            stage,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        WorkflowError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 出错的阶段 (持久化错误无阶段)
    pub fn stage(&self) -> Option<Tahap> {
        match self {
            WorkflowError::PrerequisiteNotMet { stage, .. } => Some(*stage),
            WorkflowError::AlreadyResponded(s)
            | WorkflowError::AlreadyApproved(s)
            | WorkflowError::NotYetResponded(s)
            | WorkflowError::SourceNotLocked(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<StageError> for WorkflowError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::AlreadyResponded(s) => WorkflowError::AlreadyResponded(s),
            StageError::AlreadyApproved(s) => WorkflowError::AlreadyApproved(s),
            StageError::NotYetResponded(s) => WorkflowError::NotYetResponded(s),
            StageError::NotProjectManager(s) => {
                WorkflowError::prerequisite(s, "PM 响应仅限项目经理")
            }
            StageError::EmptyRevisionNotes(s) => {
                WorkflowError::InvalidInput(format!("{}: 修改说明不能为空", s))
            }
        }
    }
}

impl From<rusqlite::Error> for WorkflowError {
    fn from(err: rusqlite::Error) -> Self {
        WorkflowError::Repository(err.into())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
