// ==========================================
// 室内设计订单流程系统 - 任务响应追踪领域模型
// ==========================================
// 依据: task_responses 表
// 说明: 同一 (order_id, tahap) 可有多条历史记录, 最新一条为当前记录
// ==========================================

use crate::domain::types::{Tahap, TaskStatus};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub order_id: String,
    pub tahap: Tahap,
    pub user_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub response_time: Option<NaiveDateTime>,
    pub update_data_time: Option<NaiveDateTime>,
    pub deadline: NaiveDateTime,
    pub duration_days: i64,
    pub extend_count: i64,
    pub extend_reason: Option<String>,
    pub status: TaskStatus,
    pub created_at: NaiveDateTime,
}

impl TaskResponse {
    /// 创建等待响应的任务
    pub fn open(order_id: &str, tahap: Tahap, duration_days: i64, now: NaiveDateTime) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            tahap,
            user_id: None,
            start_time: now,
            response_time: None,
            update_data_time: None,
            deadline: now + Duration::days(duration_days),
            duration_days,
            extend_count: 0,
            extend_reason: None,
            status: TaskStatus::MenungguResponse,
            created_at: now,
        }
    }

    /// 是否已超期
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.deadline < now && self.status != TaskStatus::Selesai
    }

    /// 是否为截止前一天 (H-1)
    pub fn is_due_tomorrow(&self, now: NaiveDateTime) -> bool {
        let tomorrow = now.date() + Duration::days(1);
        self.status.is_open() && self.deadline.date() == tomorrow
    }

    /// 响应: 进入录入期, 截止时间重新计算
    pub fn mark_responded(&mut self, user_id: Option<String>, input_days: i64, now: NaiveDateTime) {
        if self.status == TaskStatus::MenungguResponse {
            self.user_id = user_id;
            self.response_time = Some(now);
            self.deadline = now + Duration::days(input_days);
            self.duration_days = input_days;
            self.status = TaskStatus::MenungguInput;
        } else if self.is_overdue(now) {
            // 超期后补响应: 只记录响应人和时间
            self.user_id = user_id;
            self.response_time = Some(now);
        }
    }

    /// 完成: 超期则记为 telat_submit
    pub fn mark_completed(&mut self, now: NaiveDateTime) {
        self.update_data_time = Some(now);
        self.status = if self.is_overdue(now) {
            TaskStatus::TelatSubmit
        } else {
            TaskStatus::Selesai
        };
    }

    /// 延期
    pub fn extend(&mut self, days: i64, reason: &str) {
        self.deadline += Duration::days(days);
        self.duration_days += days;
        self.extend_count += 1;
        let entry = format!("Perpanjangan #{}: {}", self.extend_count, reason.trim());
        self.extend_reason = Some(match self.extend_reason.take() {
            Some(prev) => format!("{}\n\n{}", prev, entry),
            None => entry,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_respond_then_complete_on_time() {
        let mut task = TaskResponse::open("o1", Tahap::Moodboard, 3, at(1, 9));
        assert_eq!(task.deadline, at(4, 9));

        task.mark_responded(Some("u1".to_string()), 6, at(2, 9));
        assert_eq!(task.status, TaskStatus::MenungguInput);
        assert_eq!(task.deadline, at(8, 9));
        assert_eq!(task.duration_days, 6);

        task.mark_completed(at(5, 9));
        assert_eq!(task.status, TaskStatus::Selesai);
        assert_eq!(task.update_data_time, Some(at(5, 9)));
    }

    #[test]
    fn test_complete_after_deadline_is_late_submit() {
        let mut task = TaskResponse::open("o1", Tahap::CommitmentFee, 3, at(1, 9));
        task.mark_completed(at(10, 9));
        assert_eq!(task.status, TaskStatus::TelatSubmit);
    }

    #[test]
    fn test_extend_appends_reason() {
        let mut task = TaskResponse::open("o1", Tahap::RabInternal, 3, at(1, 9));
        task.extend(2, "menunggu harga vendor");
        task.extend(1, "revisi klien");

        assert_eq!(task.deadline, at(7, 9));
        assert_eq!(task.duration_days, 6);
        assert_eq!(task.extend_count, 2);
        assert_eq!(
            task.extend_reason.as_deref(),
            Some("Perpanjangan #1: menunggu harga vendor\n\nPerpanjangan #2: revisi klien")
        );
    }

    #[test]
    fn test_due_tomorrow() {
        let task = TaskResponse::open("o1", Tahap::Kontrak, 3, at(1, 9));
        assert!(task.is_due_tomorrow(at(3, 20)));
        assert!(!task.is_due_tomorrow(at(2, 20)));
    }
}
