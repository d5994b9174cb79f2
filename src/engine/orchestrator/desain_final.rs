// ==========================================
// 编排器 - Desain Final
// ==========================================
// Commitment Fee 付款后的最终设计: 响应 -> 上传 -> (修改) -> 接受
// 接受后才开放 Item Pekerjaan
// ==========================================

use super::design::required;
use super::WorkflowOrchestrator;
use crate::domain::action_log::ActionType;
use crate::domain::desain_final::DesainFinal;
use crate::domain::moodboard::DesignFile;
use crate::domain::stage::Actor;
use crate::domain::types::{MoodboardStatus, Tahap, WorkflowStage};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{StageEvent, StageEventType};
use crate::engine::guard::TransitionGuard;
use crate::repository::{
    CommitmentFeeRepository, DesainFinalRepository, ItemPekerjaanRepository, OrderRepository,
};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde_json::json;

impl WorkflowOrchestrator {
    fn require_desain_final(conn: &Connection, order_id: &str) -> WorkflowResult<DesainFinal> {
        let moodboard = Self::require_moodboard(conn, order_id, Tahap::DesainFinal)?;
        DesainFinalRepository::find_by_moodboard_tx(conn, &moodboard.moodboard_id)?
            .ok_or_else(|| WorkflowError::prerequisite(Tahap::DesainFinal, "Desain Final 尚未响应"))
    }

    /// 响应: 首次调用时创建 Desain Final, 订单进入 desain_final_responded
    pub fn respond_desain_final(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesainFinal> {
        self.in_tx("respond_desain_final", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let moodboard = Self::require_moodboard(tx, order_id, Tahap::DesainFinal)?;
            let fee = CommitmentFeeRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)?;
            TransitionGuard::check_desain_final_respond(&moodboard, fee.as_ref())?;

            let mut df = match DesainFinalRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)? {
                Some(df) => df,
                None => {
                    let df = DesainFinal::new(&moodboard.moodboard_id, now);
                    DesainFinalRepository::insert_tx(tx, &df)?;
                    df
                }
            };
            df.response.respond(Tahap::DesainFinal, actor, now)?;
            df.updated_at = now;
            DesainFinalRepository::update_tx(tx, &df)?;
            Self::advance(tx, &mut order, WorkflowStage::DesainFinalResponded, now)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::DesainFinal, actor.user_id.clone(), now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Respond, Tahap::DesainFinal, actor, now))?;
            events.push(
                StageEvent::new(order_id, Tahap::DesainFinal, StageEventType::Responded, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, desain_final_id = %df.desain_final_id, "Desain Final 已响应");
            Ok(df)
        })
    }

    /// 上传最终设计文件 (已响应且未接受)
    pub fn upload_desain_final_file(
        &self,
        order_id: &str,
        file_path: &str,
        original_name: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesignFile> {
        let file_path = required("file_path", file_path)?;
        let original_name = required("original_name", original_name)?;

        self.in_tx("upload_desain_final_file", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut df = Self::require_desain_final(tx, order_id)?;
            if !df.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::DesainFinal));
            }
            if df.is_accepted() {
                return Err(WorkflowError::AlreadyApproved(Tahap::DesainFinal));
            }

            let file = DesignFile::new(&file_path, &original_name, &actor.name, now);
            DesainFinalRepository::insert_file_tx(tx, &df.desain_final_id, &file)?;
            df.status = MoodboardStatus::Uploaded;
            df.updated_at = now;
            DesainFinalRepository::update_tx(tx, &df)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::UploadFile, Tahap::DesainFinal, actor, now)
                    .with_payload(&json!({ "file_id": file.file_id, "original_name": file.original_name })),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::DesainFinal,
                StageEventType::FileUploaded,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, file_id = %file.file_id, "Desain Final 文件已上传");
            Ok(file)
        })
    }

    /// 客户要求修改最终设计
    ///
    /// 已接受的 Desain Final 仅在 Item Pekerjaan 尚未创建时可重新打开, 订单回到 desain_final_responded
    pub fn revise_desain_final(
        &self,
        order_id: &str,
        notes: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesainFinal> {
        self.in_tx("revise_desain_final", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let mut df = Self::require_desain_final(tx, order_id)?;
            if !df.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::DesainFinal));
            }

            if df.is_accepted() {
                if ItemPekerjaanRepository::find_by_moodboard_tx(tx, &df.moodboard_id)?.is_some() {
                    return Err(WorkflowError::AlreadyApproved(Tahap::DesainFinal));
                }
                df.selected_file = None;
                df.response.reopen();
            }
            df.response.revise(Tahap::DesainFinal, notes)?;
            df.notes = df.response.revisi_notes.clone();
            df.status = MoodboardStatus::Revisi;
            df.updated_at = now;
            DesainFinalRepository::update_tx(tx, &df)?;

            if order.tahapan == WorkflowStage::DesainFinalAccepted {
                OrderRepository::update_stage_tx(tx, order_id, WorkflowStage::DesainFinalResponded, now)?;
                order.tahapan = WorkflowStage::DesainFinalResponded;
                tracing::info!(order_id, "Desain Final 重新打开, 订单回到 desain_final_responded");
            }

            Self::audit(
                tx,
                Self::action(order_id, ActionType::Revise, Tahap::DesainFinal, actor, now)
                    .with_detail(df.response.revisi_notes.clone().unwrap_or_default()),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::DesainFinal, StageEventType::RevisionRequested, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            Ok(df)
        })
    }

    /// 客户接受最终设计; file_id 为空时取最近上传的文件
    pub fn accept_desain_final(
        &self,
        order_id: &str,
        file_id: Option<&str>,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesainFinal> {
        self.in_tx("accept_desain_final", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let mut df = Self::require_desain_final(tx, order_id)?;
            TransitionGuard::check_desain_final_accept(&df)?;

            let selected = match file_id {
                Some(id) => df
                    .find_file(id)
                    .ok_or_else(|| WorkflowError::not_found("DesignFile", id))?
                    .file_id
                    .clone(),
                None => df
                    .latest_file()
                    .map(|f| f.file_id.clone())
                    .ok_or_else(|| WorkflowError::prerequisite(Tahap::DesainFinal, "没有可接受的最终设计文件"))?,
            };

            df.response.approve(Tahap::DesainFinal, actor, now)?;
            df.selected_file = Some(selected.clone());
            df.status = MoodboardStatus::Approved;
            df.updated_at = now;
            DesainFinalRepository::update_tx(tx, &df)?;
            Self::advance(tx, &mut order, WorkflowStage::DesainFinalAccepted, now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::DesainFinal, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::ItemPekerjaan, now)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::Approve, Tahap::DesainFinal, actor, now)
                    .with_payload(&json!({ "selected_file": selected })),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::DesainFinal, StageEventType::Approved, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, selected_file = %selected, "Desain Final 已接受");
            Ok(df)
        })
    }

    pub fn pm_respond_desain_final(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesainFinal> {
        self.in_tx("pm_respond_desain_final", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut df = Self::require_desain_final(tx, order_id)?;
            df.response.pm_respond(Tahap::DesainFinal, actor, now)?;
            df.updated_at = now;
            DesainFinalRepository::update_tx(tx, &df)?;

            Self::audit(tx, Self::action(order_id, ActionType::PmRespond, Tahap::DesainFinal, actor, now))?;
            events.push(StageEvent::new(
                order_id,
                Tahap::DesainFinal,
                StageEventType::PmResponded,
                &actor.name,
                now,
            ));
            Ok(df)
        })
    }
}
