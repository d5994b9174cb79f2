// ==========================================
// 室内设计订单流程系统 - 操作日志领域模型
// ==========================================
// 红线: 所有状态变更必须在同一事务内记录
// 用途: 审计追踪, 订单时间线
// 对齐: action_log 表
// ==========================================

use crate::domain::types::Tahap;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub order_id: Option<String>, // 配置更新等系统操作可为None
    pub action_type: String,
    pub stage: Option<Tahap>,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateOrder,
    StartDesign,
    Respond,
    UploadFile,
    Revise,
    Approve,
    PmRespond,
    StoreEstimasi,
    SetCommitmentFee,
    PayCommitmentFee,
    ResetCommitmentFee,
    AddProduk,
    Publish,
    SetRabLines,
    SubmitRab,
    ReopenRab,
    GenerateVariant,
    CreateKontrak,
    OpenGambarKerja,
    CreateInvoice,
    PayInvoice,
    SetWorkplan,
    ExtendTask,
    CheckDeadlines,
    UpdateConfig,
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateOrder => "CreateOrder",
            ActionType::StartDesign => "StartDesign",
            ActionType::Respond => "Respond",
            ActionType::UploadFile => "UploadFile",
            ActionType::Revise => "Revise",
            ActionType::Approve => "Approve",
            ActionType::PmRespond => "PmRespond",
            ActionType::StoreEstimasi => "StoreEstimasi",
            ActionType::SetCommitmentFee => "SetCommitmentFee",
            ActionType::PayCommitmentFee => "PayCommitmentFee",
            ActionType::ResetCommitmentFee => "ResetCommitmentFee",
            ActionType::AddProduk => "AddProduk",
            ActionType::Publish => "Publish",
            ActionType::SetRabLines => "SetRabLines",
            ActionType::SubmitRab => "SubmitRab",
            ActionType::ReopenRab => "ReopenRab",
            ActionType::GenerateVariant => "GenerateVariant",
            ActionType::CreateKontrak => "CreateKontrak",
            ActionType::OpenGambarKerja => "OpenGambarKerja",
            ActionType::CreateInvoice => "CreateInvoice",
            ActionType::PayInvoice => "PayInvoice",
            ActionType::SetWorkplan => "SetWorkplan",
            ActionType::ExtendTask => "ExtendTask",
            ActionType::CheckDeadlines => "CheckDeadlines",
            ActionType::UpdateConfig => "UpdateConfig",
        }
    }
}

impl ActionLog {
    /// 创建新的操作日志 (ID 自动生成)
    pub fn new(
        order_id: Option<&str>,
        action_type: ActionType,
        stage: Option<Tahap>,
        actor: &str,
        action_ts: NaiveDateTime,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.map(str::to_string),
            action_type: action_type.as_str().to_string(),
            stage,
            action_ts,
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
