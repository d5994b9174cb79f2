// ==========================================
// 室内设计订单流程系统 - 引擎层事件发布
// ==========================================
// 职责: 定义阶段事件发布 trait, 实现依赖倒置
// 说明: Engine 层定义 trait, 通知渠道 (站内/推送) 由外部实现
// 时机: 事务提交之后发布; 发布失败只记日志, 不影响已提交的变更
// ==========================================

use crate::domain::types::{Tahap, WorkflowStage};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 阶段事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageEventType {
    /// 进入新阶段 (创建了阶段记录)
    StageOpened,
    /// 阶段已响应
    Responded,
    /// 上传了文件
    FileUploaded,
    /// 提出修改
    RevisionRequested,
    /// 阶段已审批/接受
    Approved,
    /// 项目经理响应
    PmResponded,
    /// 付款完成
    PaymentCompleted,
    /// 数据录入/提交
    DataSubmitted,
    /// RAB 派生版本已生成
    VariantGenerated,
    /// 任务延期
    DeadlineExtended,
    /// 任务超期
    TaskOverdue,
    /// 截止前一天提醒
    DeadlineReminder,
}

impl StageEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            StageEventType::StageOpened => "StageOpened",
            StageEventType::Responded => "Responded",
            StageEventType::FileUploaded => "FileUploaded",
            StageEventType::RevisionRequested => "RevisionRequested",
            StageEventType::Approved => "Approved",
            StageEventType::PmResponded => "PmResponded",
            StageEventType::PaymentCompleted => "PaymentCompleted",
            StageEventType::DataSubmitted => "DataSubmitted",
            StageEventType::VariantGenerated => "VariantGenerated",
            StageEventType::DeadlineExtended => "DeadlineExtended",
            StageEventType::TaskOverdue => "TaskOverdue",
            StageEventType::DeadlineReminder => "DeadlineReminder",
        }
    }
}

/// 阶段事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    pub order_id: String,
    pub tahap: Tahap,
    pub event_type: StageEventType,
    /// 事件后订单所处阶段 (未推进时为 None)
    pub workflow_stage: Option<WorkflowStage>,
    pub actor: String,
    pub occurred_at: NaiveDateTime,
}

impl StageEvent {
    pub fn new(
        order_id: &str,
        tahap: Tahap,
        event_type: StageEventType,
        actor: &str,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            order_id: order_id.to_string(),
            tahap,
            event_type,
            workflow_stage: None,
            actor: actor.to_string(),
            occurred_at,
        }
    }

    pub fn with_stage(mut self, stage: WorkflowStage) -> Self {
        self.workflow_stage = Some(stage);
        self
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 阶段事件发布者 Trait
///
/// # 返回
/// - `Ok(delivery_id)`: 投递 ID (如果支持) 或空字符串
/// - `Err`: 发布失败
pub trait StageEventPublisher: Send + Sync {
    fn publish(&self, event: StageEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要通知的场景 (如单元测试、命令行)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl StageEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: StageEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - order_id={}, tahap={}, event_type={}",
            event.order_id,
            event.tahap,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn StageEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn StageEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn StageEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例 (不发布事件)
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件 (如果有发布者)
    pub fn publish(&self, event: StageEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者, 跳过事件 - order_id={}, event_type={}",
                    event.order_id,
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 发布并吞掉错误 (只记 warn 日志)
    pub fn publish_logged(&self, event: StageEvent) {
        let order_id = event.order_id.clone();
        let event_type = event.event_type;
        if let Err(e) = self.publish(event) {
            tracing::warn!(
                order_id = %order_id,
                event_type = event_type.as_str(),
                error = %e,
                "阶段事件发布失败"
            );
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    struct FailingPublisher {
        calls: Mutex<usize>,
    }

    impl StageEventPublisher for FailingPublisher {
        fn publish(&self, _event: StageEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            *self.calls.lock().unwrap() += 1;
            Err("channel down".into())
        }
    }

    #[test]
    fn test_stage_event_with_stage() {
        let event = StageEvent::new("o1", Tahap::Moodboard, StageEventType::Approved, "pm", now())
            .with_stage(WorkflowStage::MoodboardAccepted);
        assert_eq!(event.workflow_stage, Some(WorkflowStage::MoodboardAccepted));
        assert_eq!(event.event_type.as_str(), "Approved");
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = StageEvent::new("o1", Tahap::Order, StageEventType::StageOpened, "admin", now());
        let result = publisher.publish(event);
        assert!(result.is_ok());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        let event = StageEvent::new("o1", Tahap::Order, StageEventType::StageOpened, "admin", now());
        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_publish_logged_swallows_errors() {
        let failing = Arc::new(FailingPublisher { calls: Mutex::new(0) });
        let publisher = OptionalEventPublisher::with_publisher(failing.clone());
        assert!(publisher.is_configured());

        publisher.publish_logged(StageEvent::new(
            "o1",
            Tahap::Kontrak,
            StageEventType::StageOpened,
            "admin",
            now(),
        ));
        assert_eq!(*failing.calls.lock().unwrap(), 1);
    }
}
