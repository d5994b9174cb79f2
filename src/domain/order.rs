// ==========================================
// 室内设计订单流程系统 - 订单领域模型
// ==========================================
// 依据: orders 表
// 说明: OrderAggregate 为显式读取的完整阶段链, 不做延迟加载
// ==========================================

use crate::domain::commitment_fee::CommitmentFee;
use crate::domain::desain_final::DesainFinal;
use crate::domain::estimasi::Estimasi;
use crate::domain::gambar_kerja::GambarKerja;
use crate::domain::item_pekerjaan::ItemPekerjaanDetail;
use crate::domain::kontrak::Kontrak;
use crate::domain::moodboard::Moodboard;
use crate::domain::rab::{RabInternal, RabVariantSet};
use crate::domain::types::{RabVariant, WorkflowStage};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Order - 订单
// ==========================================
// 身份字段 (nama_project / company_name / customer_name) 创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub nama_project: String,
    pub company_name: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub tahapan: WorkflowStage,
    pub payment_status: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Order {
    pub fn new(
        nama_project: String,
        company_name: String,
        customer_name: String,
        customer_phone: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            order_id: uuid::Uuid::new_v4().to_string(),
            nama_project,
            company_name,
            customer_name,
            customer_phone,
            tahapan: WorkflowStage::Created,
            payment_status: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ==========================================
// OrderAggregate - 订单及其阶段链
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    pub order: Order,
    pub moodboard: Option<Moodboard>,
    pub estimasi: Option<Estimasi>,
    pub commitment_fee: Option<CommitmentFee>,
    pub desain_final: Option<DesainFinal>,
    pub item_pekerjaan: Option<ItemPekerjaanDetail>,
    pub rab_internal: Option<RabInternal>,
    pub rab_variants: Vec<RabVariantSet>,
    pub kontrak: Option<Kontrak>,
    pub gambar_kerja: Option<GambarKerja>,
}

impl OrderAggregate {
    /// 按版本查找已生成的 RAB
    pub fn variant(&self, variant: RabVariant) -> Option<&RabVariantSet> {
        self.rab_variants.iter().find(|v| v.variant == variant)
    }

    /// 三个 RAB 派生版本是否均已生成
    pub fn all_variants_generated(&self) -> bool {
        RabVariant::ALL.iter().all(|v| self.variant(*v).is_some())
    }
}
