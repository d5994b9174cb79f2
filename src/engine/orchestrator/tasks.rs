// ==========================================
// 编排器 - 任务延期与超期扫描
// ==========================================

use super::WorkflowOrchestrator;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::stage::Actor;
use crate::domain::task_response::TaskResponse;
use crate::domain::types::Tahap;
use crate::engine::error::WorkflowResult;
use crate::engine::events::{StageEvent, StageEventType};
use crate::engine::task_tracker::DeadlineReport;
use crate::repository::TaskResponseRepository;
use chrono::NaiveDateTime;
use serde_json::json;

/// 系统操作人 (定时扫描)
pub const SYSTEM_ACTOR: &str = "system";

impl WorkflowOrchestrator {
    /// 申请延期: 天数 [1, max_extension_days], 原因必填
    pub fn request_extension(
        &self,
        order_id: &str,
        tahap: Tahap,
        days: i64,
        reason: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<TaskResponse> {
        self.in_tx("request_extension", |tx, events| {
            Self::load_order(tx, order_id)?;
            let task = self.tracker.extend_tx(tx, order_id, tahap, days, reason)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::ExtendTask, tahap, actor, now)
                    .with_payload(&json!({ "days": days, "extend_count": task.extend_count }))
                    .with_detail(reason.trim()),
            )?;
            events.push(StageEvent::new(
                order_id,
                tahap,
                StageEventType::DeadlineExtended,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, tahap = %tahap, days, deadline = %task.deadline, "任务已延期");
            Ok(task)
        })
    }

    /// 超期扫描: 标记 telat 并发出超期/到期提醒事件
    pub fn check_deadlines(&self, now: NaiveDateTime) -> WorkflowResult<DeadlineReport> {
        self.in_tx("check_deadlines", |tx, events| {
            let report = self.tracker.check_deadlines_tx(tx, now)?;

            let log = ActionLog::new(None, ActionType::CheckDeadlines, None, SYSTEM_ACTOR, now).with_payload(
                &json!({ "overdue": report.overdue.len(), "due_tomorrow": report.due_tomorrow.len() }),
            );
            Self::audit(tx, log)?;

            for task in &report.overdue {
                events.push(StageEvent::new(
                    &task.order_id,
                    task.tahap,
                    StageEventType::TaskOverdue,
                    SYSTEM_ACTOR,
                    now,
                ));
            }
            for task in &report.due_tomorrow {
                events.push(StageEvent::new(
                    &task.order_id,
                    task.tahap,
                    StageEventType::DeadlineReminder,
                    SYSTEM_ACTOR,
                    now,
                ));
            }
            tracing::info!(
                overdue = report.overdue.len(),
                due_tomorrow = report.due_tomorrow.len(),
                "任务超期扫描完成"
            );
            Ok(report)
        })
    }

    /// 订单的全部任务记录 (按创建顺序)
    pub fn list_tasks(&self, order_id: &str) -> WorkflowResult<Vec<TaskResponse>> {
        let conn = self.get_conn()?;
        Self::load_order(&conn, order_id)?;
        Ok(TaskResponseRepository::list_by_order_tx(&conn, order_id)?)
    }
}
