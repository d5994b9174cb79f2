// ==========================================
// 室内设计订单流程系统 - Gambar Kerja 领域模型
// ==========================================
// 依据: gambar_kerjas / gambar_kerja_files 表
// 状态: pending -> uploaded -> approved; revisi 回到 pending
// ==========================================

use crate::domain::moodboard::DesignFile;
use crate::domain::stage::StageResponse;
use crate::domain::types::GambarKerjaStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GambarKerja {
    pub gambar_kerja_id: String,
    pub order_id: String,
    pub status: GambarKerjaStatus,
    pub response: StageResponse,
    pub files: Vec<DesignFile>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl GambarKerja {
    pub fn new(order_id: &str, now: NaiveDateTime) -> Self {
        Self {
            gambar_kerja_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            status: GambarKerjaStatus::Pending,
            response: StageResponse::default(),
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
