// ==========================================
// 室内设计订单流程系统 - 任务响应追踪
// ==========================================
// 职责: 阶段进入/响应/完成时维护 task_responses, 延期与超期扫描
// 约定: 所有写入在调用方的事务内完成
// ==========================================

use crate::config::WorkflowSettings;
use crate::domain::task_response::TaskResponse;
use crate::domain::types::{Tahap, TaskStatus};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::repository::TaskResponseRepository;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;

// ==========================================
// DeadlineReport - 超期扫描结果
// ==========================================
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeadlineReport {
    /// 本次被标记为 telat 的任务
    pub overdue: Vec<TaskResponse>,
    /// 明天到期的任务 (H-1 提醒)
    pub due_tomorrow: Vec<TaskResponse>,
}

// ==========================================
// TaskTracker
// ==========================================
pub struct TaskTracker {
    settings: WorkflowSettings,
}

impl TaskTracker {
    pub fn new(settings: WorkflowSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> WorkflowSettings {
        self.settings
    }

    /// 阶段等待响应的天数
    fn response_days_for(&self, tahap: Tahap) -> i64 {
        match tahap {
            Tahap::Kontrak => self.settings.kontrak_response_days,
            _ => self.settings.response_days,
        }
    }

    /// 进入阶段: 该阶段尚无任务时创建
    ///
    /// # 返回
    /// - Some(task): 新建的任务
    /// - None: 已存在, 跳过
    pub fn open_tx(
        &self,
        conn: &Connection,
        order_id: &str,
        tahap: Tahap,
        now: NaiveDateTime,
    ) -> WorkflowResult<Option<TaskResponse>> {
        if TaskResponseRepository::find_current_tx(conn, order_id, tahap)?.is_some() {
            return Ok(None);
        }
        let task = TaskResponse::open(order_id, tahap, self.response_days_for(tahap), now);
        TaskResponseRepository::insert_tx(conn, &task)?;
        tracing::debug!(order_id, tahap = %tahap, deadline = %task.deadline, "任务已创建");
        Ok(Some(task))
    }

    /// 阶段已响应: 进入录入期
    pub fn respond_tx(
        &self,
        conn: &Connection,
        order_id: &str,
        tahap: Tahap,
        user_id: Option<String>,
        now: NaiveDateTime,
    ) -> WorkflowResult<()> {
        if let Some(mut task) = TaskResponseRepository::find_current_tx(conn, order_id, tahap)? {
            task.mark_responded(user_id, self.settings.input_days, now);
            TaskResponseRepository::update_tx(conn, &task)?;
        }
        Ok(())
    }

    /// 阶段已完成
    pub fn complete_tx(
        &self,
        conn: &Connection,
        order_id: &str,
        tahap: Tahap,
        now: NaiveDateTime,
    ) -> WorkflowResult<()> {
        if let Some(mut task) = TaskResponseRepository::find_current_tx(conn, order_id, tahap)? {
            if task.status.is_open() || task.status == TaskStatus::Telat {
                task.mark_completed(now);
                TaskResponseRepository::update_tx(conn, &task)?;
            }
        }
        Ok(())
    }

    /// 申请延期
    ///
    /// # 规则
    /// - days 取值 [1, max_extension_days]
    /// - reason 不能为空
    /// - 只能对当前任务延期, 已完成 (selesai / telat_submit) 的任务拒绝
    pub fn extend_tx(
        &self,
        conn: &Connection,
        order_id: &str,
        tahap: Tahap,
        days: i64,
        reason: &str,
    ) -> WorkflowResult<TaskResponse> {
        let max = self.settings.max_extension_days;
        if days < 1 || days > max {
            return Err(WorkflowError::InvalidInput(format!(
                "延期天数必须在 1 到 {} 之间: {}",
                max, days
            )));
        }
        if reason.trim().is_empty() {
            return Err(WorkflowError::InvalidInput("延期原因不能为空".to_string()));
        }

        let mut task = TaskResponseRepository::find_current_tx(conn, order_id, tahap)?
            .ok_or_else(|| WorkflowError::not_found("TaskResponse", &format!("{}/{}", order_id, tahap)))?;
        if !(task.status.is_open() || task.status == TaskStatus::Telat) {
            return Err(WorkflowError::prerequisite(
                tahap,
                format!("任务已完成 ({}), 不能延期", task.status.as_str()),
            ));
        }
        task.extend(days, reason);
        TaskResponseRepository::update_tx(conn, &task)?;
        Ok(task)
    }

    /// 超期扫描
    ///
    /// 进行中且 deadline < now 的任务标记为 telat; 同时收集明天到期的任务
    pub fn check_deadlines_tx(&self, conn: &Connection, now: NaiveDateTime) -> WorkflowResult<DeadlineReport> {
        let mut report = DeadlineReport::default();
        for mut task in TaskResponseRepository::list_open_tx(conn)? {
            if task.is_overdue(now) {
                task.status = TaskStatus::Telat;
                TaskResponseRepository::update_tx(conn, &task)?;
                report.overdue.push(task);
            } else if task.is_due_tomorrow(now) {
                report.due_tomorrow.push(task);
            }
        }
        Ok(report)
    }
}
