// ==========================================
// 室内设计订单流程系统 - Commitment Fee 领域模型
// ==========================================
// 依据: commitment_fees 表
// ==========================================

use crate::domain::stage::StageResponse;
use crate::domain::types::PaymentStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentFee {
    pub commitment_fee_id: String,
    pub moodboard_id: String,
    pub total_fee: Option<f64>,
    pub payment_status: PaymentStatus,
    pub payment_proof: Option<String>, // 付款凭证引用
    pub response: StageResponse,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl CommitmentFee {
    pub fn new(moodboard_id: &str, now: NaiveDateTime) -> Self {
        Self {
            commitment_fee_id: uuid::Uuid::new_v4().to_string(),
            moodboard_id: moodboard_id.to_string(),
            total_fee: None,
            payment_status: PaymentStatus::Pending,
            payment_proof: None,
            response: StageResponse::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }
}
