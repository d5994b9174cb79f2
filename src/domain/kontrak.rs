// ==========================================
// 室内设计订单流程系统 - Kontrak 领域模型
// ==========================================
// 依据: kontraks 表
// 约束: 每个 Item Pekerjaan 最多一份合同
// ==========================================

use crate::domain::stage::StageResponse;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kontrak {
    pub kontrak_id: String,
    pub order_id: String,
    pub item_pekerjaan_id: String,
    pub durasi_kontrak: i64, // 天
    pub harga_kontrak: f64,
    pub termin_count: i64,
    pub response: StageResponse,
    pub created_at: NaiveDateTime,
}
