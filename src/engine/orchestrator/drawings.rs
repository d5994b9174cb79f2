// ==========================================
// 编排器 - Gambar Kerja (施工图)
// ==========================================
// 状态: pending -> uploaded -> approved; revisi 回到 pending
// ==========================================

use super::WorkflowOrchestrator;
use crate::domain::action_log::ActionType;
use crate::domain::gambar_kerja::GambarKerja;
use crate::domain::moodboard::DesignFile;
use crate::domain::stage::Actor;
use crate::domain::types::{GambarKerjaStatus, Tahap};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{StageEvent, StageEventType};
use crate::engine::guard::TransitionGuard;
use crate::repository::{GambarKerjaRepository, KontrakRepository};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde_json::json;

impl WorkflowOrchestrator {
    fn require_gambar_kerja(conn: &Connection, order_id: &str) -> WorkflowResult<GambarKerja> {
        GambarKerjaRepository::find_by_order_tx(conn, order_id)?
            .ok_or_else(|| WorkflowError::prerequisite(Tahap::GambarKerja, "Gambar Kerja 尚未创建"))
    }

    fn event(order_id: &str, kind: StageEventType, actor: &Actor, now: NaiveDateTime) -> StageEvent {
        StageEvent::new(order_id, Tahap::GambarKerja, kind, &actor.name, now)
    }

    /// 合同签订后开启施工图阶段
    pub fn open_gambar_kerja(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<GambarKerja> {
        self.in_tx("open_gambar_kerja", |tx, events| {
            Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::GambarKerja)?;
            let kontrak = KontrakRepository::find_by_item_pekerjaan_tx(tx, &detail.item.item_pekerjaan_id)?;
            let existing = GambarKerjaRepository::find_by_order_tx(tx, order_id)?;
            TransitionGuard::check_gambar_kerja_open(kontrak.as_ref(), existing.as_ref())?;

            let gk = GambarKerja::new(order_id, now);
            GambarKerjaRepository::insert_tx(tx, &gk)?;
            self.tracker.open_tx(tx, order_id, Tahap::GambarKerja, now)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::OpenGambarKerja, Tahap::GambarKerja, actor, now),
            )?;
            events.push(Self::event(order_id, StageEventType::StageOpened, actor, now));
            tracing::info!(order_id, gambar_kerja_id = %gk.gambar_kerja_id, "Gambar Kerja 阶段已开启");
            Ok(gk)
        })
    }

    pub fn respond_gambar_kerja(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<GambarKerja> {
        self.in_tx("respond_gambar_kerja", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut gk = Self::require_gambar_kerja(tx, order_id)?;
            gk.response.respond(Tahap::GambarKerja, actor, now)?;
            gk.updated_at = now;
            GambarKerjaRepository::update_tx(tx, &gk)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::GambarKerja, actor.user_id.clone(), now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Respond, Tahap::GambarKerja, actor, now))?;
            events.push(Self::event(order_id, StageEventType::Responded, actor, now));
            Ok(gk)
        })
    }

    pub fn upload_gambar_kerja_file(
        &self,
        order_id: &str,
        file_path: &str,
        original_name: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<DesignFile> {
        let (file_path, original_name) = (file_path.trim(), original_name.trim());
        if file_path.is_empty() || original_name.is_empty() {
            return Err(WorkflowError::InvalidInput("文件路径与文件名不能为空".to_string()));
        }

        self.in_tx("upload_gambar_kerja_file", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut gk = Self::require_gambar_kerja(tx, order_id)?;
            if !gk.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::GambarKerja));
            }
            if gk.response.is_approved() {
                return Err(WorkflowError::AlreadyApproved(Tahap::GambarKerja));
            }

            let file = DesignFile::new(file_path, original_name, &actor.name, now);
            GambarKerjaRepository::insert_file_tx(tx, &gk.gambar_kerja_id, &file)?;
            gk.files.push(file.clone());
            gk.status = GambarKerjaStatus::Uploaded;
            gk.updated_at = now;
            GambarKerjaRepository::update_tx(tx, &gk)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::UploadFile, Tahap::GambarKerja, actor, now)
                    .with_payload(&json!({ "file_id": file.file_id, "original_name": file.original_name })),
            )?;
            events.push(Self::event(order_id, StageEventType::FileUploaded, actor, now));
            Ok(file)
        })
    }

    pub fn revise_gambar_kerja(
        &self,
        order_id: &str,
        notes: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<GambarKerja> {
        self.in_tx("revise_gambar_kerja", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut gk = Self::require_gambar_kerja(tx, order_id)?;
            if !gk.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::GambarKerja));
            }
            gk.response.revise(Tahap::GambarKerja, notes)?;
            gk.status = GambarKerjaStatus::Pending;
            gk.updated_at = now;
            GambarKerjaRepository::update_tx(tx, &gk)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::Revise, Tahap::GambarKerja, actor, now)
                    .with_detail(gk.response.revisi_notes.clone().unwrap_or_default()),
            )?;
            events.push(Self::event(order_id, StageEventType::RevisionRequested, actor, now));
            Ok(gk)
        })
    }

    pub fn approve_gambar_kerja(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<GambarKerja> {
        self.in_tx("approve_gambar_kerja", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut gk = Self::require_gambar_kerja(tx, order_id)?;
            TransitionGuard::check_gambar_kerja_approve(&gk)?;

            gk.response.approve(Tahap::GambarKerja, actor, now)?;
            gk.status = GambarKerjaStatus::Approved;
            gk.updated_at = now;
            GambarKerjaRepository::update_tx(tx, &gk)?;
            self.tracker.complete_tx(tx, order_id, Tahap::GambarKerja, now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Approve, Tahap::GambarKerja, actor, now))?;
            events.push(Self::event(order_id, StageEventType::Approved, actor, now));
            tracing::info!(order_id, files = gk.files.len(), "Gambar Kerja 已审批");
            Ok(gk)
        })
    }

    pub fn pm_respond_gambar_kerja(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<GambarKerja> {
        self.in_tx("pm_respond_gambar_kerja", |tx, events| {
            Self::load_order(tx, order_id)?;
            let mut gk = Self::require_gambar_kerja(tx, order_id)?;
            gk.response.pm_respond(Tahap::GambarKerja, actor, now)?;
            gk.updated_at = now;
            GambarKerjaRepository::update_tx(tx, &gk)?;

            Self::audit(tx, Self::action(order_id, ActionType::PmRespond, Tahap::GambarKerja, actor, now))?;
            events.push(Self::event(order_id, StageEventType::PmResponded, actor, now));
            Ok(gk)
        })
    }
}
