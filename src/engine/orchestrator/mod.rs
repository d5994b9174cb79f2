// ==========================================
// 室内设计订单流程系统 - 流程编排器
// ==========================================
// 职责: 协调 守卫 -> 变更 -> 持久化 -> 审计 -> 提交 -> 事件
// 红线: 一次请求一个事务 (BEGIN IMMEDIATE); 守卫失败时不写任何数据
// 红线: 事件在提交之后发布, 发布失败不影响已提交的变更
// ==========================================
// 子模块:
// - design:       订单 / Moodboard / Estimasi / Commitment Fee
// - desain_final: Desain Final
// - production:   Item Pekerjaan / RAB / Kontrak / Invoice / Workplan
// - drawings:     Gambar Kerja
// - tasks:        任务延期与超期扫描
// ==========================================

mod desain_final;
mod design;
mod drawings;
mod inputs;
mod production;
mod tasks;

#[cfg(test)]
mod tests;

pub use design::PAYMENT_STATUS_COMMITMENT_FEE;
pub use inputs::{NewInvoice, NewKontrak, NewOrder, NewProduk, RabLineInput, WorkplanEntry};
pub use tasks::SYSTEM_ACTOR;

use crate::config::WorkflowSettings;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::item_pekerjaan::ItemPekerjaanDetail;
use crate::domain::moodboard::Moodboard;
use crate::domain::order::{Order, OrderAggregate};
use crate::domain::stage::Actor;
use crate::domain::types::{Tahap, WorkflowStage};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{OptionalEventPublisher, StageEvent};
use crate::engine::guard::TransitionGuard;
use crate::engine::task_tracker::TaskTracker;
use crate::engine::workplan_export::WorkplanExport;
use crate::repository::error::RepositoryError;
use crate::repository::{
    ActionLogRepository, CommitmentFeeRepository, DesainFinalRepository, EstimasiRepository,
    GambarKerjaRepository,
    ItemPekerjaanRepository, KontrakRepository, MoodboardRepository, OrderRepository,
    RabRepository,
};
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// WorkflowOrchestrator
// ==========================================
pub struct WorkflowOrchestrator {
    conn: Arc<Mutex<Connection>>,
    tracker: TaskTracker,
    publisher: OptionalEventPublisher,
}

impl WorkflowOrchestrator {
    /// 创建编排器
    ///
    /// # 参数
    /// - conn: 共享连接 (串行化同进程内的写入)
    /// - settings: 流程期限配置
    /// - publisher: 事件发布者 (可为空)
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        settings: WorkflowSettings,
        publisher: OptionalEventPublisher,
    ) -> Self {
        Self {
            conn,
            tracker: TaskTracker::new(settings),
            publisher,
        }
    }

    pub fn settings(&self) -> WorkflowSettings {
        self.tracker.settings()
    }

    fn get_conn(&self) -> WorkflowResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }

    /// 在 IMMEDIATE 事务内执行一次操作
    ///
    /// 闭包返回 Err 时事务随 drop 回滚, 事件不发布
    fn in_tx<T, F>(&self, operation: &'static str, f: F) -> WorkflowResult<T>
    where
        F: FnOnce(&Transaction<'_>, &mut Vec<StageEvent>) -> WorkflowResult<T>,
    {
        let mut events = Vec::new();
        let result = {
            let mut conn = self.get_conn()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            match f(&tx, &mut events) {
                Ok(value) => {
                    tx.commit()?;
                    Ok(value)
                }
                Err(e) => Err(e),
            }
        };

        match &result {
            Ok(_) => {
                for event in events {
                    self.publisher.publish_logged(event);
                }
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, stage = ?e.stage(), "操作被拒绝, 事务已回滚");
            }
        }
        result
    }

    // ==========================================
    // 事务内公共步骤
    // ==========================================

    fn load_order(conn: &Connection, order_id: &str) -> WorkflowResult<Order> {
        OrderRepository::find_by_id_tx(conn, order_id)?
            .ok_or_else(|| WorkflowError::not_found("Order", order_id))
    }

    /// 读取 Moodboard; 不存在时按目标阶段报前置条件不满足
    fn require_moodboard(conn: &Connection, order_id: &str, target: Tahap) -> WorkflowResult<Moodboard> {
        MoodboardRepository::find_by_order_tx(conn, order_id)?
            .ok_or_else(|| WorkflowError::prerequisite(target, "Moodboard 尚未创建"))
    }

    fn require_item_pekerjaan(
        conn: &Connection,
        order_id: &str,
        target: Tahap,
    ) -> WorkflowResult<ItemPekerjaanDetail> {
        let moodboard = Self::require_moodboard(conn, order_id, target)?;
        ItemPekerjaanRepository::find_detail_by_moodboard_tx(conn, &moodboard.moodboard_id)?
            .ok_or_else(|| WorkflowError::prerequisite(target, "Item Pekerjaan 尚未创建"))
    }

    /// 订单阶段只前进: 目标高于当前时才更新
    fn advance(
        conn: &Connection,
        order: &mut Order,
        target: WorkflowStage,
        now: NaiveDateTime,
    ) -> WorkflowResult<Option<WorkflowStage>> {
        if target <= order.tahapan {
            return Ok(None);
        }
        OrderRepository::update_stage_tx(conn, &order.order_id, target, now)?;
        tracing::info!(
            order_id = %order.order_id,
            from = %order.tahapan,
            to = %target,
            "订单阶段推进"
        );
        order.tahapan = target;
        order.updated_at = now;
        Ok(Some(target))
    }

    /// 构建操作日志
    fn action(
        order_id: &str,
        action: ActionType,
        tahap: Tahap,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> ActionLog {
        ActionLog::new(Some(order_id), action, Some(tahap), &actor.name, now)
    }

    /// 写审计日志 (与变更同一事务)
    fn audit(conn: &Connection, log: ActionLog) -> WorkflowResult<()> {
        ActionLogRepository::insert_tx(conn, &log)?;
        Ok(())
    }

    // ==========================================
    // 只读
    // ==========================================

    /// 读取订单及完整阶段链
    pub fn load_order_aggregate(&self, order_id: &str) -> WorkflowResult<OrderAggregate> {
        let conn = self.get_conn()?;
        let order = Self::load_order(&conn, order_id)?;
        let moodboard = MoodboardRepository::find_by_order_tx(&conn, order_id)?;

        let (estimasi, commitment_fee, desain_final, item_pekerjaan) = match &moodboard {
            Some(mb) => (
                EstimasiRepository::find_by_moodboard_tx(&conn, &mb.moodboard_id)?,
                CommitmentFeeRepository::find_by_moodboard_tx(&conn, &mb.moodboard_id)?,
                DesainFinalRepository::find_by_moodboard_tx(&conn, &mb.moodboard_id)?,
                ItemPekerjaanRepository::find_detail_by_moodboard_tx(&conn, &mb.moodboard_id)?,
            ),
            None => (None, None, None, None),
        };

        let (rab_internal, rab_variants, kontrak) = match &item_pekerjaan {
            Some(detail) => {
                let ip_id = &detail.item.item_pekerjaan_id;
                (
                    RabRepository::find_internal_tx(&conn, ip_id)?,
                    RabRepository::list_variants_tx(&conn, ip_id)?,
                    KontrakRepository::find_by_item_pekerjaan_tx(&conn, ip_id)?,
                )
            }
            None => (None, Vec::new(), None),
        };

        let gambar_kerja = GambarKerjaRepository::find_by_order_tx(&conn, order_id)?;

        Ok(OrderAggregate {
            order,
            moodboard,
            estimasi,
            commitment_fee,
            desain_final,
            item_pekerjaan,
            rab_internal,
            rab_variants,
            kontrak,
            gambar_kerja,
        })
    }

    /// 构建工作计划导出 (需要已付款的正式分期)
    pub fn build_workplan_export(&self, order_id: &str) -> WorkflowResult<WorkplanExport> {
        let conn = self.get_conn()?;
        let order = Self::load_order(&conn, order_id)?;
        let detail = match MoodboardRepository::find_by_order_tx(&conn, order_id)? {
            Some(mb) => ItemPekerjaanRepository::find_detail_by_moodboard_tx(&conn, &mb.moodboard_id)?,
            None => None,
        };
        let detail = TransitionGuard::check_workplan_export(detail.as_ref())?;
        let export = WorkplanExport::build(&order, detail);
        tracing::info!(order_id, rows = export.body().len(), "工作计划导出已生成");
        Ok(export)
    }
}
