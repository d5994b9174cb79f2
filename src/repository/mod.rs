// ==========================================
// 室内设计订单流程系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口, 屏蔽数据库细节
// 约束: 所有查询使用参数化, 防止 SQL 注入
// 约定: `*_tx` 关联函数接收已打开事务的连接, 由编排器统一提交
// ==========================================

pub mod action_log_repo;
pub mod commitment_fee_repo;
pub mod desain_final_repo;
pub mod error;
pub mod estimasi_repo;
pub mod gambar_kerja_repo;
pub mod item_pekerjaan_repo;
pub mod kontrak_repo;
pub mod moodboard_repo;
pub mod order_repo;
pub mod rab_repo;
pub mod stage_columns;
pub mod task_response_repo;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use commitment_fee_repo::CommitmentFeeRepository;
pub use desain_final_repo::DesainFinalRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use estimasi_repo::EstimasiRepository;
pub use gambar_kerja_repo::GambarKerjaRepository;
pub use item_pekerjaan_repo::ItemPekerjaanRepository;
pub use kontrak_repo::KontrakRepository;
pub use moodboard_repo::MoodboardRepository;
pub use order_repo::OrderRepository;
pub use rab_repo::RabRepository;
pub use task_response_repo::TaskResponseRepository;
