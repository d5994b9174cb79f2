// ==========================================
// 室内设计订单流程系统 - Item Pekerjaan 领域模型
// ==========================================
// 依据: item_pekerjaans / item_pekerjaan_produks / workplan_items / invoices 表
// 约束: 导出工作计划需要至少一张 termin_step >= 1 且已付款的发票
// ==========================================

use crate::domain::stage::StageResponse;
use crate::domain::types::ItemPekerjaanStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// ItemPekerjaan - 工作项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPekerjaan {
    pub item_pekerjaan_id: String,
    pub moodboard_id: String,
    pub status: ItemPekerjaanStatus,
    pub response: StageResponse,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ItemPekerjaan {
    pub fn new(moodboard_id: &str, now: NaiveDateTime) -> Self {
        Self {
            item_pekerjaan_id: uuid::Uuid::new_v4().to_string(),
            moodboard_id: moodboard_id.to_string(),
            status: ItemPekerjaanStatus::Draft,
            response: StageResponse::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_published(&self) -> bool {
        self.status == ItemPekerjaanStatus::Published
    }
}

// ==========================================
// Produk - 产品行 (按房间归组)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Produk {
    pub produk_id: String,
    pub item_pekerjaan_id: String,
    pub nama_produk: String,
    pub nama_ruangan: String,
    pub quantity: i64,
    pub panjang: Option<f64>,
    pub lebar: Option<f64>,
    pub tinggi: Option<f64>,
    pub sort_order: i64,
    pub workplan_items: Vec<WorkplanItem>,
}

impl Produk {
    /// 工作计划最早开始日期
    pub fn workplan_start(&self) -> Option<NaiveDate> {
        self.workplan_items.iter().filter_map(|w| w.start_date).min()
    }

    /// 工作计划最晚结束日期
    pub fn workplan_end(&self) -> Option<NaiveDate> {
        self.workplan_items.iter().filter_map(|w| w.end_date).max()
    }
}

// ==========================================
// WorkplanItem - 工作计划条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkplanItem {
    pub workplan_item_id: String,
    pub produk_id: String,
    pub nama_tahapan: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub sort_order: i64,
}

// ==========================================
// Invoice - 分期发票
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub item_pekerjaan_id: String,
    pub termin_step: i64,
    pub amount: f64,
    pub paid_at: Option<NaiveDateTime>,
    pub payment_proof: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Invoice {
    /// 已付款且属于正式分期 (termin_step >= 1)
    pub fn unlocks_workplan(&self) -> bool {
        self.paid_at.is_some() && self.termin_step >= 1
    }
}

// ==========================================
// ItemPekerjaanDetail - 工作项完整读模型
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPekerjaanDetail {
    pub item: ItemPekerjaan,
    pub produks: Vec<Produk>,
    pub invoices: Vec<Invoice>,
}

impl ItemPekerjaanDetail {
    pub fn has_paid_termin(&self) -> bool {
        self.invoices.iter().any(Invoice::unlocks_workplan)
    }

    pub fn find_produk(&self, produk_id: &str) -> Option<&Produk> {
        self.produks.iter().find(|p| p.produk_id == produk_id)
    }
}
