// ==========================================
// 室内设计订单流程系统 - Estimasi 领域模型
// ==========================================
// 依据: estimasis 表
// 规范路径: Order -> Moodboard -> Estimasi (唯一数据来源)
// ==========================================

use crate::domain::stage::StageResponse;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimasi {
    pub estimasi_id: String,
    pub moodboard_id: String,
    pub estimated_cost: Option<String>, // 估价文件引用
    pub response: StageResponse,
    pub created_at: NaiveDateTime,
}

impl Estimasi {
    pub fn new(moodboard_id: &str, estimated_cost: Option<String>, now: NaiveDateTime) -> Self {
        Self {
            estimasi_id: uuid::Uuid::new_v4().to_string(),
            moodboard_id: moodboard_id.to_string(),
            estimated_cost,
            response: StageResponse::default(),
            created_at: now,
        }
    }
}
