// ==========================================
// 编排器 - 设计阶段 (订单 / Moodboard / Estimasi / Commitment Fee)
// ==========================================

use super::{NewOrder, WorkflowOrchestrator};
use crate::domain::action_log::ActionType;
use crate::domain::commitment_fee::CommitmentFee;
use crate::domain::estimasi::Estimasi;
use crate::domain::moodboard::{DesignFile, Moodboard};
use crate::domain::order::Order;
use crate::domain::stage::Actor;
use crate::domain::types::{MoodboardStatus, PaymentStatus, Tahap, WorkflowStage};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{StageEvent, StageEventType};
use crate::engine::guard::TransitionGuard;
use crate::repository::{
    CommitmentFeeRepository, DesainFinalRepository, EstimasiRepository, MoodboardRepository,
    OrderRepository,
};
use chrono::NaiveDateTime;
use serde_json::json;

/// 订单付款状态: Commitment Fee 已付
pub const PAYMENT_STATUS_COMMITMENT_FEE: &str = "Commitment Fee";

pub(super) fn required(field: &str, value: &str) -> WorkflowResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkflowError::InvalidInput(format!("{} 不能为空", field)));
    }
    Ok(value.to_string())
}

impl WorkflowOrchestrator {
    // ==========================================
    // 订单
    // ==========================================

    pub fn create_order(&self, input: NewOrder, actor: &Actor, now: NaiveDateTime) -> WorkflowResult<Order> {
        let order = Order::new(
            required("nama_project", &input.nama_project)?,
            required("company_name", &input.company_name)?,
            required("customer_name", &input.customer_name)?,
            input
                .customer_phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty()),
            now,
        );

        self.in_tx("create_order", |tx, events| {
            OrderRepository::insert_tx(tx, &order)?;
            Self::audit(
                tx,
                Self::action(&order.order_id, ActionType::CreateOrder, Tahap::Order, actor, now)
                    .with_payload(&json!({ "nama_project": order.nama_project })),
            )?;
            events.push(
                StageEvent::new(&order.order_id, Tahap::Order, StageEventType::StageOpened, &actor.name, now)
                    .with_stage(WorkflowStage::Created),
            );
            tracing::info!(order_id = %order.order_id, nama_project = %order.nama_project, "订单已创建");
            Ok(order.clone())
        })
    }

    /// 开始设计: 创建 Moodboard, 订单进入 moodboard_pending
    pub fn start_design(&self, order_id: &str, actor: &Actor, now: NaiveDateTime) -> WorkflowResult<Moodboard> {
        self.in_tx("start_design", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            TransitionGuard::check_start_design(&order)?;

            let moodboard = Moodboard::new(order_id, now);
            MoodboardRepository::insert_tx(tx, &moodboard)?;
            Self::advance(tx, &mut order, WorkflowStage::MoodboardPending, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::Moodboard, now)?;

            Self::audit(tx, Self::action(order_id, ActionType::StartDesign, Tahap::Moodboard, actor, now))?;
            events.push(
                StageEvent::new(order_id, Tahap::Moodboard, StageEventType::StageOpened, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, moodboard_id = %moodboard.moodboard_id, "设计阶段已开始");
            Ok(moodboard)
        })
    }

    // ==========================================
    // Moodboard
    // ==========================================

    pub fn respond_moodboard(&self, order_id: &str, actor: &Actor, now: NaiveDateTime) -> WorkflowResult<Moodboard> {
        self.in_tx("respond_moodboard", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let found = MoodboardRepository::find_by_order_tx(tx, order_id)?;
            let mut moodboard = TransitionGuard::check_moodboard_respond(&order, found.as_ref())?.clone();

            moodboard.response.respond(Tahap::Moodboard, actor, now)?;
            moodboard.updated_at = now;
            MoodboardRepository::update_tx(tx, &moodboard)?;
            Self::advance(tx, &mut order, WorkflowStage::MoodboardResponded, now)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::Moodboard, actor.user_id.clone(), now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Respond, Tahap::Moodboard, actor, now))?;
            events.push(
                StageEvent::new(order_id, Tahap::Moodboard, StageEventType::Responded, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, actor = %actor.name, "Moodboard 已响应");
            Ok(moodboard)
        })
    }

    /// 上传设计稿 (已响应且未接受)
    pub fn upload_moodboard_file(
        &self,
        order_id: &str,
        file_path: &str,
        original_name: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesignFile> {
        let file_path = required("file_path", file_path)?;
        let original_name = required("original_name", original_name)?;

        self.in_tx("upload_moodboard_file", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut moodboard = Self::require_moodboard(tx, order_id, Tahap::Moodboard)?;
            if !moodboard.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::Moodboard));
            }
            if moodboard.accepted {
                return Err(WorkflowError::AlreadyApproved(Tahap::Moodboard));
            }

            let file = DesignFile::new(&file_path, &original_name, &actor.name, now);
            MoodboardRepository::insert_file_tx(tx, &moodboard.moodboard_id, &file)?;
            moodboard.status = MoodboardStatus::Uploaded;
            moodboard.updated_at = now;
            MoodboardRepository::update_tx(tx, &moodboard)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::UploadFile, Tahap::Moodboard, actor, now)
                    .with_payload(&json!({ "file_id": file.file_id, "original_name": file.original_name })),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::Moodboard,
                StageEventType::FileUploaded,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, file_id = %file.file_id, "Moodboard 设计稿已上传");
            Ok(file)
        })
    }

    /// 客户要求修改
    ///
    /// 已接受的 Moodboard 仅在 Estimasi 尚未创建时可重新打开, 订单回到 moodboard_responded
    pub fn revise_moodboard(
        &self,
        order_id: &str,
        notes: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Moodboard> {
        self.in_tx("revise_moodboard", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let mut moodboard = Self::require_moodboard(tx, order_id, Tahap::Moodboard)?;
            if !moodboard.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::Moodboard));
            }

            if moodboard.accepted {
                if EstimasiRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)?.is_some() {
                    return Err(WorkflowError::AlreadyApproved(Tahap::Moodboard));
                }
                moodboard.accepted = false;
                moodboard.selected_file = None;
                moodboard.response.reopen();
            }
            moodboard.response.revise(Tahap::Moodboard, notes)?;
            moodboard.notes = moodboard.response.revisi_notes.clone();
            moodboard.status = MoodboardStatus::Revisi;
            moodboard.updated_at = now;
            MoodboardRepository::update_tx(tx, &moodboard)?;

            if order.tahapan == WorkflowStage::MoodboardAccepted {
                OrderRepository::update_stage_tx(tx, order_id, WorkflowStage::MoodboardResponded, now)?;
                order.tahapan = WorkflowStage::MoodboardResponded;
                tracing::info!(order_id, "Moodboard 重新打开, 订单回到 moodboard_responded");
            }

            Self::audit(
                tx,
                Self::action(order_id, ActionType::Revise, Tahap::Moodboard, actor, now)
                    .with_detail(moodboard.response.revisi_notes.clone().unwrap_or_default()),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::Moodboard, StageEventType::RevisionRequested, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            Ok(moodboard)
        })
    }

    /// 客户接受设计稿
    ///
    /// # 参数
    /// - file_id: 选定的设计文件; None 时取最新上传的文件
    pub fn accept_moodboard(
        &self,
        order_id: &str,
        file_id: Option<&str>,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Moodboard> {
        self.in_tx("accept_moodboard", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let mut moodboard = Self::require_moodboard(tx, order_id, Tahap::Moodboard)?;
            TransitionGuard::check_moodboard_accept(&moodboard)?;

            let selected = match file_id {
                Some(id) => moodboard
                    .find_file(id)
                    .ok_or_else(|| WorkflowError::not_found("DesignFile", id))?
                    .file_id
                    .clone(),
                None => moodboard
                    .files
                    .iter()
                    .max_by_key(|f| f.uploaded_at)
                    .map(|f| f.file_id.clone())
                    .ok_or_else(|| WorkflowError::prerequisite(Tahap::Moodboard, "没有可接受的设计文件"))?,
            };

            moodboard.response.approve(Tahap::Moodboard, actor, now)?;
            moodboard.accepted = true;
            moodboard.selected_file = Some(selected.clone());
            moodboard.status = MoodboardStatus::Approved;
            moodboard.updated_at = now;
            MoodboardRepository::update_tx(tx, &moodboard)?;
            Self::advance(tx, &mut order, WorkflowStage::MoodboardAccepted, now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::Moodboard, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::Estimasi, now)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::Approve, Tahap::Moodboard, actor, now)
                    .with_payload(&json!({ "selected_file": selected })),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::Moodboard, StageEventType::Approved, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, selected_file = %selected, "Moodboard 已接受");
            Ok(moodboard)
        })
    }

    pub fn pm_respond_moodboard(&self, order_id: &str, actor: &Actor, now: NaiveDateTime) -> WorkflowResult<Moodboard> {
        self.in_tx("pm_respond_moodboard", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut moodboard = Self::require_moodboard(tx, order_id, Tahap::Moodboard)?;
            moodboard.response.pm_respond(Tahap::Moodboard, actor, now)?;
            moodboard.updated_at = now;
            MoodboardRepository::update_tx(tx, &moodboard)?;

            Self::audit(tx, Self::action(order_id, ActionType::PmRespond, Tahap::Moodboard, actor, now))?;
            events.push(StageEvent::new(
                order_id,
                Tahap::Moodboard,
                StageEventType::PmResponded,
                &actor.name,
                now,
            ));
            Ok(moodboard)
        })
    }

    // ==========================================
    // Estimasi
    // ==========================================

    /// 录入估价: 创建 Estimasi 并记为已响应
    pub fn store_estimasi(
        &self,
        order_id: &str,
        estimated_cost: Option<String>,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Estimasi> {
        self.in_tx("store_estimasi", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let found = MoodboardRepository::find_by_order_tx(tx, order_id)?;
            let existing = match &found {
                Some(mb) => EstimasiRepository::find_by_moodboard_tx(tx, &mb.moodboard_id)?,
                None => None,
            };
            let moodboard = TransitionGuard::check_estimasi_store(found.as_ref(), existing.as_ref())?;

            let cost = estimated_cost.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
            let mut estimasi = Estimasi::new(&moodboard.moodboard_id, cost, now);
            estimasi.response.respond(Tahap::Estimasi, actor, now)?;
            EstimasiRepository::insert_tx(tx, &estimasi)?;
            Self::advance(tx, &mut order, WorkflowStage::EstimasiResponded, now)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::Estimasi, actor.user_id.clone(), now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::Estimasi, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::CommitmentFee, now)?;

            Self::audit(tx, Self::action(order_id, ActionType::StoreEstimasi, Tahap::Estimasi, actor, now))?;
            events.push(
                StageEvent::new(order_id, Tahap::Estimasi, StageEventType::Responded, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, estimasi_id = %estimasi.estimasi_id, "Estimasi 已录入");
            Ok(estimasi)
        })
    }

    // ==========================================
    // Commitment Fee
    // ==========================================

    fn require_fee(conn: &rusqlite::Connection, order_id: &str) -> WorkflowResult<CommitmentFee> {
        let moodboard = Self::require_moodboard(conn, order_id, Tahap::CommitmentFee)?;
        CommitmentFeeRepository::find_by_moodboard_tx(conn, &moodboard.moodboard_id)?
            .ok_or_else(|| WorkflowError::prerequisite(Tahap::CommitmentFee, "Commitment Fee 尚未响应"))
    }

    pub fn respond_commitment_fee(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<CommitmentFee> {
        self.in_tx("respond_commitment_fee", |tx, events| {
            Self::load_order(tx, order_id)?;
            let moodboard = Self::require_moodboard(tx, order_id, Tahap::CommitmentFee)?;
            let estimasi = EstimasiRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)?;
            TransitionGuard::check_commitment_fee_respond(estimasi.as_ref())?;

            let mut fee = match CommitmentFeeRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)? {
                Some(fee) => fee,
                None => {
                    let fee = CommitmentFee::new(&moodboard.moodboard_id, now);
                    CommitmentFeeRepository::insert_tx(tx, &fee)?;
                    fee
                }
            };
            fee.response.respond(Tahap::CommitmentFee, actor, now)?;
            fee.updated_at = now;
            CommitmentFeeRepository::update_tx(tx, &fee)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::CommitmentFee, actor.user_id.clone(), now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Respond, Tahap::CommitmentFee, actor, now))?;
            events.push(StageEvent::new(
                order_id,
                Tahap::CommitmentFee,
                StageEventType::Responded,
                &actor.name,
                now,
            ));
            Ok(fee)
        })
    }

    /// 填写 Commitment Fee 金额 (付款前可修改)
    pub fn set_commitment_fee(
        &self,
        order_id: &str,
        total_fee: f64,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<CommitmentFee> {
        if !total_fee.is_finite() || total_fee <= 0.0 {
            return Err(WorkflowError::InvalidInput(format!("total_fee 必须大于 0: {}", total_fee)));
        }

        self.in_tx("set_commitment_fee", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut fee = Self::require_fee(tx, order_id)?;
            if !fee.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::CommitmentFee));
            }
            if fee.is_paid() {
                return Err(WorkflowError::AlreadyApproved(Tahap::CommitmentFee));
            }
            fee.total_fee = Some(total_fee);
            fee.updated_at = now;
            CommitmentFeeRepository::update_tx(tx, &fee)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::SetCommitmentFee, Tahap::CommitmentFee, actor, now)
                    .with_payload(&json!({ "total_fee": total_fee })),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::CommitmentFee,
                StageEventType::DataSubmitted,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, total_fee, "Commitment Fee 金额已填写");
            Ok(fee)
        })
    }

    /// 付款: 订单进入 commitment_fee_paid
    pub fn pay_commitment_fee(
        &self,
        order_id: &str,
        payment_proof: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<CommitmentFee> {
        let payment_proof = required("payment_proof", payment_proof)?;

        self.in_tx("pay_commitment_fee", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let mut fee = Self::require_fee(tx, order_id)?;
            TransitionGuard::check_commitment_fee_pay(&fee)?;

            fee.payment_status = PaymentStatus::Completed;
            fee.payment_proof = Some(payment_proof.clone());
            fee.updated_at = now;
            CommitmentFeeRepository::update_tx(tx, &fee)?;
            OrderRepository::update_payment_status_tx(tx, order_id, Some(PAYMENT_STATUS_COMMITMENT_FEE), now)?;
            Self::advance(tx, &mut order, WorkflowStage::CommitmentFeePaid, now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::CommitmentFee, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::DesainFinal, now)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::PayCommitmentFee, Tahap::CommitmentFee, actor, now)
                    .with_payload(&json!({ "total_fee": fee.total_fee, "payment_proof": payment_proof })),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::CommitmentFee, StageEventType::PaymentCompleted, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, total_fee = ?fee.total_fee, "Commitment Fee 已付款");
            Ok(fee)
        })
    }

    /// 重置 Commitment Fee (金额/凭证/付款状态清空)
    ///
    /// Desain Final 已存在时拒绝; 订单处于 commitment_fee_paid 时回到 estimasi_responded
    pub fn reset_commitment_fee(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<CommitmentFee> {
        self.in_tx("reset_commitment_fee", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let mut fee = Self::require_fee(tx, order_id)?;
            if DesainFinalRepository::find_by_moodboard_tx(tx, &fee.moodboard_id)?.is_some() {
                return Err(WorkflowError::prerequisite(
                    Tahap::CommitmentFee,
                    "Desain Final 已创建, 不能重置 Commitment Fee",
                ));
            }

            fee.total_fee = None;
            fee.payment_proof = None;
            fee.payment_status = PaymentStatus::Pending;
            fee.updated_at = now;
            CommitmentFeeRepository::update_tx(tx, &fee)?;
            OrderRepository::update_payment_status_tx(tx, order_id, None, now)?;
            if order.tahapan == WorkflowStage::CommitmentFeePaid {
                OrderRepository::update_stage_tx(tx, order_id, WorkflowStage::EstimasiResponded, now)?;
                order.tahapan = WorkflowStage::EstimasiResponded;
            }

            Self::audit(
                tx,
                Self::action(order_id, ActionType::ResetCommitmentFee, Tahap::CommitmentFee, actor, now),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::CommitmentFee, StageEventType::RevisionRequested, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, stage = %order.tahapan, "Commitment Fee 已重置");
            Ok(fee)
        })
    }
}
