// ==========================================
// 室内设计订单流程系统 - 领域模型层
// ==========================================
// 职责: 定义订单及各阶段实体、类型、阶段记录规则
// 红线: 不含数据访问逻辑, 不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod commitment_fee;
pub mod desain_final;
pub mod estimasi;
pub mod gambar_kerja;
pub mod item_pekerjaan;
pub mod kontrak;
pub mod moodboard;
pub mod order;
pub mod rab;
pub mod stage;
pub mod task_response;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use commitment_fee::CommitmentFee;
pub use desain_final::DesainFinal;
pub use estimasi::Estimasi;
pub use gambar_kerja::GambarKerja;
pub use item_pekerjaan::{Invoice, ItemPekerjaan, ItemPekerjaanDetail, Produk, WorkplanItem};
pub use kontrak::Kontrak;
pub use moodboard::{DesignFile, Moodboard};
pub use order::{Order, OrderAggregate};
pub use rab::{RabInternal, RabInternalLine, RabVariantRow, RabVariantSet};
pub use stage::{Actor, StageError, StageResponse};
pub use task_response::TaskResponse;
pub use types::{
    GambarKerjaStatus, ItemPekerjaanStatus, MoodboardStatus, PaymentStatus, RabVariant, Tahap,
    TaskStatus, WorkflowStage,
};
