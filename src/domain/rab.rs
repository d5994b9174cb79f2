// ==========================================
// 室内设计订单流程系统 - RAB 领域模型
// ==========================================
// 依据: rab_internals / rab_internal_lines / rab_variants / rab_variant_rows 表
// 红线: RAB Internal 是唯一价格来源, 派生版本只读取不回写
// ==========================================

use crate::domain::stage::StageResponse;
use crate::domain::types::RabVariant;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ==========================================
// RabInternal - 内部预算表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RabInternal {
    pub rab_internal_id: String,
    pub item_pekerjaan_id: String,
    pub is_submitted: bool,
    pub submitted_at: Option<NaiveDateTime>,
    pub submitted_by: Option<String>,
    pub response: StageResponse,
    pub lines: Vec<RabInternalLine>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RabInternal {
    pub fn new(item_pekerjaan_id: &str, now: NaiveDateTime) -> Self {
        Self {
            rab_internal_id: uuid::Uuid::new_v4().to_string(),
            item_pekerjaan_id: item_pekerjaan_id.to_string(),
            is_submitted: false,
            submitted_at: None,
            submitted_by: None,
            response: StageResponse::default(),
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn aksesoris_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_aksesoris).count()
    }
}

// ==========================================
// RabInternalLine - 预算行
// ==========================================
// markup_pct: [0, 100), 加价公式 harga_dasar / (1 - markup/100)
// harga_jasa: 服务单价 (可选), RAB Jasa 优先使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RabInternalLine {
    pub line_id: String,
    pub line_no: i64,
    pub produk_id: Option<String>,
    pub nama_item: String,
    pub is_aksesoris: bool,
    pub quantity: f64,
    pub harga_dasar: f64,
    pub markup_pct: f64,
    pub diskon_pct: f64,
    pub harga_jasa: Option<f64>,
}

impl RabInternalLine {
    /// 加价后单价 (面向客户)
    pub fn marked_up_unit_price(&self) -> f64 {
        self.harga_dasar / (1.0 - self.markup_pct / 100.0)
    }
}

// ==========================================
// RabVariantSet - 派生版本 (整组替换)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RabVariantSet {
    pub item_pekerjaan_id: String,
    pub variant: RabVariant,
    pub rab_internal_id: String,
    pub generated_at: NaiveDateTime,
    pub generated_by: String,
    pub rows: Vec<RabVariantRow>,
}

impl RabVariantSet {
    /// 行合计 (两位小数)
    pub fn total(&self) -> f64 {
        round2(self.rows.iter().map(|r| r.harga_total).sum())
    }
}

// ==========================================
// RabVariantRow - 派生行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RabVariantRow {
    pub row_id: String,
    pub line_no: i64,
    pub nama_item: String,
    pub is_aksesoris: bool,
    pub quantity: f64,
    pub harga_satuan: f64,
    pub diskon_pct: f64,
    pub harga_total: f64,
}

impl RabVariantRow {
    /// 去掉行ID后的内容, 用于比较两次生成结果
    pub fn content_key(&self) -> (i64, String, bool, String, String, String, String) {
        (
            self.line_no,
            self.nama_item.clone(),
            self.is_aksesoris,
            format!("{:.4}", self.quantity),
            format!("{:.2}", self.harga_satuan),
            format!("{:.2}", self.diskon_pct),
            format!("{:.2}", self.harga_total),
        )
    }
}
