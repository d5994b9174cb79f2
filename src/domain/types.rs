// ==========================================
// 室内设计订单流程系统 - 领域类型定义
// ==========================================
// 职责: 阶段、状态枚举及其数据库字符串映射
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单流程阶段 (Workflow Stage)
// ==========================================
// 顺序即状态机推进顺序; revise 可从 MoodboardAccepted 回退到 MoodboardResponded,
// Desain Final 的 revise 可从 DesainFinalAccepted 回退到 DesainFinalResponded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Created,
    MoodboardPending,
    MoodboardResponded,
    MoodboardAccepted,
    EstimasiResponded,
    CommitmentFeePaid,
    DesainFinalResponded,
    DesainFinalAccepted,
    ItemPekerjaanDefined,
    RabInternalSubmitted,
    RabVariantsGenerated,
    KontrakCreated,
}

impl WorkflowStage {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Created => "created",
            WorkflowStage::MoodboardPending => "moodboard_pending",
            WorkflowStage::MoodboardResponded => "moodboard_responded",
            WorkflowStage::MoodboardAccepted => "moodboard_accepted",
            WorkflowStage::EstimasiResponded => "estimasi_responded",
            WorkflowStage::CommitmentFeePaid => "commitment_fee_paid",
            WorkflowStage::DesainFinalResponded => "desain_final_responded",
            WorkflowStage::DesainFinalAccepted => "desain_final_accepted",
            WorkflowStage::ItemPekerjaanDefined => "item_pekerjaan_defined",
            WorkflowStage::RabInternalSubmitted => "rab_internal_submitted",
            WorkflowStage::RabVariantsGenerated => "rab_variants_generated",
            WorkflowStage::KontrakCreated => "kontrak_created",
        }
    }

    /// 从数据库字符串解析
    pub fn parse(raw: &str) -> Option<Self> {
        let stage = match raw.trim() {
            "created" => WorkflowStage::Created,
            "moodboard_pending" => WorkflowStage::MoodboardPending,
            "moodboard_responded" => WorkflowStage::MoodboardResponded,
            "moodboard_accepted" => WorkflowStage::MoodboardAccepted,
            "estimasi_responded" => WorkflowStage::EstimasiResponded,
            "commitment_fee_paid" => WorkflowStage::CommitmentFeePaid,
            "desain_final_responded" => WorkflowStage::DesainFinalResponded,
            "desain_final_accepted" => WorkflowStage::DesainFinalAccepted,
            "item_pekerjaan_defined" => WorkflowStage::ItemPekerjaanDefined,
            "rab_internal_submitted" => WorkflowStage::RabInternalSubmitted,
            "rab_variants_generated" => WorkflowStage::RabVariantsGenerated,
            "kontrak_created" => WorkflowStage::KontrakCreated,
            _ => return None,
        };
        Some(stage)
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 阶段名称 (Tahap)
// ==========================================
// 用于错误提示、操作日志、任务响应追踪
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tahap {
    Order,
    Moodboard,
    Estimasi,
    CommitmentFee,
    DesainFinal,
    ItemPekerjaan,
    RabInternal,
    RabKontrak,
    RabVendor,
    RabJasa,
    Kontrak,
    Invoice,
    Workplan,
    GambarKerja,
}

impl Tahap {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tahap::Order => "order",
            Tahap::Moodboard => "moodboard",
            Tahap::Estimasi => "estimasi",
            Tahap::CommitmentFee => "cm_fee",
            Tahap::DesainFinal => "desain_final",
            Tahap::ItemPekerjaan => "item_pekerjaan",
            Tahap::RabInternal => "rab_internal",
            Tahap::RabKontrak => "rab_kontrak",
            Tahap::RabVendor => "rab_vendor",
            Tahap::RabJasa => "rab_jasa",
            Tahap::Kontrak => "kontrak",
            Tahap::Invoice => "invoice",
            Tahap::Workplan => "workplan",
            Tahap::GambarKerja => "gambar_kerja",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let tahap = match raw.trim() {
            "order" => Tahap::Order,
            "moodboard" => Tahap::Moodboard,
            "estimasi" => Tahap::Estimasi,
            "cm_fee" => Tahap::CommitmentFee,
            "desain_final" => Tahap::DesainFinal,
            "item_pekerjaan" => Tahap::ItemPekerjaan,
            "rab_internal" => Tahap::RabInternal,
            "rab_kontrak" => Tahap::RabKontrak,
            "rab_vendor" => Tahap::RabVendor,
            "rab_jasa" => Tahap::RabJasa,
            "kontrak" => Tahap::Kontrak,
            "invoice" => Tahap::Invoice,
            "workplan" => Tahap::Workplan,
            "gambar_kerja" => Tahap::GambarKerja,
            _ => return None,
        };
        Some(tahap)
    }
}

impl fmt::Display for Tahap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Moodboard 状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodboardStatus {
    Pending,  // 已响应, 等待设计稿
    Uploaded, // 设计稿已上传
    Revisi,   // 客户要求修改
    Approved, // 客户已接受
}

impl MoodboardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodboardStatus::Pending => "pending",
            MoodboardStatus::Uploaded => "uploaded",
            MoodboardStatus::Revisi => "revisi",
            MoodboardStatus::Approved => "approved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(MoodboardStatus::Pending),
            "uploaded" => Some(MoodboardStatus::Uploaded),
            "revisi" => Some(MoodboardStatus::Revisi),
            "approved" => Some(MoodboardStatus::Approved),
            _ => None,
        }
    }
}

// ==========================================
// 付款状态 (Commitment Fee)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            _ => None,
        }
    }
}

// ==========================================
// Item Pekerjaan 状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemPekerjaanStatus {
    Draft,
    Published,
}

impl ItemPekerjaanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemPekerjaanStatus::Draft => "draft",
            ItemPekerjaanStatus::Published => "published",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "draft" => Some(ItemPekerjaanStatus::Draft),
            "published" => Some(ItemPekerjaanStatus::Published),
            _ => None,
        }
    }
}

// ==========================================
// Gambar Kerja 状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GambarKerjaStatus {
    Pending,
    Uploaded,
    Approved,
}

impl GambarKerjaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GambarKerjaStatus::Pending => "pending",
            GambarKerjaStatus::Uploaded => "uploaded",
            GambarKerjaStatus::Approved => "approved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(GambarKerjaStatus::Pending),
            "uploaded" => Some(GambarKerjaStatus::Uploaded),
            "approved" => Some(GambarKerjaStatus::Approved),
            _ => None,
        }
    }
}

// ==========================================
// RAB 派生版本
// ==========================================
// Kontrak: 加价后价格 (面向客户), 含配件
// Vendor:  原始价格, 含配件
// Jasa:    原始价格 (服务价), 不含配件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RabVariant {
    Kontrak,
    Vendor,
    Jasa,
}

impl RabVariant {
    pub const ALL: [RabVariant; 3] = [RabVariant::Kontrak, RabVariant::Vendor, RabVariant::Jasa];

    pub fn as_str(&self) -> &'static str {
        match self {
            RabVariant::Kontrak => "kontrak",
            RabVariant::Vendor => "vendor",
            RabVariant::Jasa => "jasa",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "kontrak" => Some(RabVariant::Kontrak),
            "vendor" => Some(RabVariant::Vendor),
            "jasa" => Some(RabVariant::Jasa),
            _ => None,
        }
    }

    /// 该版本是否包含配件行
    pub fn includes_aksesoris(&self) -> bool {
        !matches!(self, RabVariant::Jasa)
    }

    /// 对应的阶段名称
    pub fn tahap(&self) -> Tahap {
        match self {
            RabVariant::Kontrak => Tahap::RabKontrak,
            RabVariant::Vendor => Tahap::RabVendor,
            RabVariant::Jasa => Tahap::RabJasa,
        }
    }
}

impl fmt::Display for RabVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 任务响应状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    MenungguResponse, // 等待响应
    MenungguInput,    // 已响应, 等待录入
    Selesai,          // 完成
    Telat,            // 超期未完成
    TelatSubmit,      // 超期后完成
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::MenungguResponse => "menunggu_response",
            TaskStatus::MenungguInput => "menunggu_input",
            TaskStatus::Selesai => "selesai",
            TaskStatus::Telat => "telat",
            TaskStatus::TelatSubmit => "telat_submit",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "menunggu_response" => Some(TaskStatus::MenungguResponse),
            "menunggu_input" => Some(TaskStatus::MenungguInput),
            "selesai" => Some(TaskStatus::Selesai),
            "telat" => Some(TaskStatus::Telat),
            "telat_submit" => Some(TaskStatus::TelatSubmit),
            _ => None,
        }
    }

    /// 是否仍在进行中 (参与超期检查)
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::MenungguResponse | TaskStatus::MenungguInput)
    }
}
