// ==========================================
// 室内设计订单流程系统 - 阶段记录 (Stage Record)
// ==========================================
// 职责: 每个阶段共用的响应/审批/修改/PM响应字段及其变更规则
// 红线: 任何校验都在写入之前完成, 失败时记录保持不变
// ==========================================

use crate::domain::types::Tahap;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// Actor - 操作人
// ==========================================
// 由请求层显式传入, 用于写 response_by / approved_by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<String>,
    pub name: String,
    pub is_project_manager: bool,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            user_id: None,
            name: name.into(),
            is_project_manager: false,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// 标记为项目经理 (可做 PM 响应)
    pub fn project_manager(mut self) -> Self {
        self.is_project_manager = true;
        self
    }
}

// ==========================================
// StageError - 阶段记录变更错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("阶段已响应: {0}")]
    AlreadyResponded(Tahap),

    #[error("阶段已审批: {0}")]
    AlreadyApproved(Tahap),

    #[error("阶段尚未响应: {0}")]
    NotYetResponded(Tahap),

    #[error("PM 响应仅限项目经理: {0}")]
    NotProjectManager(Tahap),

    #[error("修改说明不能为空: {0}")]
    EmptyRevisionNotes(Tahap),
}

// ==========================================
// StageResponse - 阶段响应字段块
// ==========================================
// 对齐: 各阶段表的 response_* / approved_* / revisi_notes / pm_response_* 列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageResponse {
    pub response_time: Option<NaiveDateTime>,
    pub response_by: Option<String>,
    pub approved_time: Option<NaiveDateTime>,
    pub approved_by: Option<String>,
    pub revisi_notes: Option<String>,
    pub pm_response_time: Option<NaiveDateTime>,
    pub pm_response_by: Option<String>,
}

impl StageResponse {
    pub fn is_responded(&self) -> bool {
        self.response_time.is_some()
    }

    pub fn is_approved(&self) -> bool {
        self.approved_time.is_some()
    }

    pub fn has_pm_response(&self) -> bool {
        self.pm_response_time.is_some()
    }

    /// 记录响应
    ///
    /// 重复调用返回 AlreadyResponded, 首次的 response_time 不变
    pub fn respond(&mut self, tahap: Tahap, actor: &Actor, now: NaiveDateTime) -> Result<(), StageError> {
        if self.response_time.is_some() {
            return Err(StageError::AlreadyResponded(tahap));
        }
        self.response_time = Some(now);
        self.response_by = Some(actor.name.clone());
        Ok(())
    }

    /// 记录修改说明 (仅限未审批)
    pub fn revise(&mut self, tahap: Tahap, notes: &str) -> Result<(), StageError> {
        if self.is_approved() {
            return Err(StageError::AlreadyApproved(tahap));
        }
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(StageError::EmptyRevisionNotes(tahap));
        }
        self.revisi_notes = Some(notes.to_string());
        Ok(())
    }

    /// 审批
    pub fn approve(&mut self, tahap: Tahap, actor: &Actor, now: NaiveDateTime) -> Result<(), StageError> {
        if self.response_time.is_none() {
            return Err(StageError::NotYetResponded(tahap));
        }
        if self.is_approved() {
            return Err(StageError::AlreadyApproved(tahap));
        }
        self.approved_time = Some(now);
        self.approved_by = Some(actor.name.clone());
        Ok(())
    }

    /// 项目经理响应 (与普通响应相互独立)
    pub fn pm_respond(&mut self, tahap: Tahap, actor: &Actor, now: NaiveDateTime) -> Result<(), StageError> {
        if !actor.is_project_manager {
            return Err(StageError::NotProjectManager(tahap));
        }
        if self.pm_response_time.is_some() {
            return Err(StageError::AlreadyResponded(tahap));
        }
        self.pm_response_time = Some(now);
        self.pm_response_by = Some(actor.name.clone());
        Ok(())
    }

    /// 撤销审批 (Moodboard 修改回路使用)
    pub fn reopen(&mut self) {
        self.approved_time = None;
        self.approved_by = None;
    }
}
