// ==========================================
// 室内设计订单流程系统 - 订单流程 API
// ==========================================
// 职责: 对外暴露各阶段操作, 统一取当前时间并转换错误
// 说明: 所有写操作在编排器内以单事务执行
// ==========================================

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::api::dto::{ExtensionRequest, OrderStatusView};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::commitment_fee::CommitmentFee;
use crate::domain::desain_final::DesainFinal;
use crate::domain::estimasi::Estimasi;
use crate::domain::gambar_kerja::GambarKerja;
use crate::domain::item_pekerjaan::{Invoice, ItemPekerjaan, Produk, WorkplanItem};
use crate::domain::kontrak::Kontrak;
use crate::domain::moodboard::{DesignFile, Moodboard};
use crate::domain::order::{Order, OrderAggregate};
use crate::domain::rab::{RabInternal, RabVariantSet};
use crate::domain::stage::Actor;
use crate::domain::task_response::TaskResponse;
use crate::domain::types::RabVariant;
use crate::engine::{
    DeadlineReport, NewInvoice, NewKontrak, NewOrder, NewProduk, RabLineInput,
    WorkflowOrchestrator, WorkplanEntry,
};
use crate::repository::action_log_repo::ActionLogRepository;

/// 当前本地时间
fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

// ==========================================
// WorkflowApi - 订单流程 API
// ==========================================
pub struct WorkflowApi {
    orchestrator: Arc<WorkflowOrchestrator>,
    action_log_repo: Arc<ActionLogRepository>,
    clock: fn() -> NaiveDateTime,
}

impl WorkflowApi {
    pub fn new(
        orchestrator: Arc<WorkflowOrchestrator>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            orchestrator,
            action_log_repo,
            clock: local_now,
        }
    }

    /// 替换时钟 (测试固定时间用)
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    // ==========================================
    // 订单与设计阶段
    // ==========================================

    pub fn create_order(&self, input: NewOrder, actor: &Actor) -> ApiResult<Order> {
        Ok(self.orchestrator.create_order(input, actor, self.now())?)
    }

    pub fn start_design(&self, order_id: &str, actor: &Actor) -> ApiResult<Moodboard> {
        Ok(self.orchestrator.start_design(order_id, actor, self.now())?)
    }

    pub fn respond_moodboard(&self, order_id: &str, actor: &Actor) -> ApiResult<Moodboard> {
        Ok(self.orchestrator.respond_moodboard(order_id, actor, self.now())?)
    }

    pub fn upload_moodboard_file(
        &self,
        order_id: &str,
        file_path: &str,
        original_name: &str,
        actor: &Actor,
    ) -> ApiResult<DesignFile> {
        Ok(self
            .orchestrator
            .upload_moodboard_file(order_id, file_path, original_name, actor, self.now())?)
    }

    pub fn revise_moodboard(&self, order_id: &str, notes: &str, actor: &Actor) -> ApiResult<Moodboard> {
        Ok(self.orchestrator.revise_moodboard(order_id, notes, actor, self.now())?)
    }

    /// 接受设计稿; file_id 为空时取最近上传的文件
    pub fn accept_moodboard(
        &self,
        order_id: &str,
        file_id: Option<&str>,
        actor: &Actor,
    ) -> ApiResult<Moodboard> {
        Ok(self.orchestrator.accept_moodboard(order_id, file_id, actor, self.now())?)
    }

    pub fn pm_respond_moodboard(&self, order_id: &str, actor: &Actor) -> ApiResult<Moodboard> {
        Ok(self.orchestrator.pm_respond_moodboard(order_id, actor, self.now())?)
    }

    pub fn store_estimasi(
        &self,
        order_id: &str,
        estimated_cost: Option<String>,
        actor: &Actor,
    ) -> ApiResult<Estimasi> {
        Ok(self.orchestrator.store_estimasi(order_id, estimated_cost, actor, self.now())?)
    }

    // ==========================================
    // Commitment Fee
    // ==========================================

    pub fn respond_commitment_fee(&self, order_id: &str, actor: &Actor) -> ApiResult<CommitmentFee> {
        Ok(self.orchestrator.respond_commitment_fee(order_id, actor, self.now())?)
    }

    pub fn set_commitment_fee(&self, order_id: &str, total_fee: f64, actor: &Actor) -> ApiResult<CommitmentFee> {
        Ok(self.orchestrator.set_commitment_fee(order_id, total_fee, actor, self.now())?)
    }

    pub fn pay_commitment_fee(
        &self,
        order_id: &str,
        payment_proof: &str,
        actor: &Actor,
    ) -> ApiResult<CommitmentFee> {
        Ok(self.orchestrator.pay_commitment_fee(order_id, payment_proof, actor, self.now())?)
    }

    pub fn reset_commitment_fee(&self, order_id: &str, actor: &Actor) -> ApiResult<CommitmentFee> {
        Ok(self.orchestrator.reset_commitment_fee(order_id, actor, self.now())?)
    }

    // ==========================================
    // Desain Final
    // ==========================================

    pub fn respond_desain_final(&self, order_id: &str, actor: &Actor) -> ApiResult<DesainFinal> {
        Ok(self.orchestrator.respond_desain_final(order_id, actor, self.now())?)
    }

    pub fn upload_desain_final_file(
        &self,
        order_id: &str,
        file_path: &str,
        original_name: &str,
        actor: &Actor,
    ) -> ApiResult<DesignFile> {
        Ok(self
            .orchestrator
            .upload_desain_final_file(order_id, file_path, original_name, actor, self.now())?)
    }

    pub fn revise_desain_final(&self, order_id: &str, notes: &str, actor: &Actor) -> ApiResult<DesainFinal> {
        Ok(self.orchestrator.revise_desain_final(order_id, notes, actor, self.now())?)
    }

    pub fn accept_desain_final(
        &self,
        order_id: &str,
        file_id: Option<&str>,
        actor: &Actor,
    ) -> ApiResult<DesainFinal> {
        Ok(self.orchestrator.accept_desain_final(order_id, file_id, actor, self.now())?)
    }

    pub fn pm_respond_desain_final(&self, order_id: &str, actor: &Actor) -> ApiResult<DesainFinal> {
        Ok(self.orchestrator.pm_respond_desain_final(order_id, actor, self.now())?)
    }

    // ==========================================
    // Item Pekerjaan / RAB / Kontrak
    // ==========================================

    pub fn respond_item_pekerjaan(&self, order_id: &str, actor: &Actor) -> ApiResult<ItemPekerjaan> {
        Ok(self.orchestrator.respond_item_pekerjaan(order_id, actor, self.now())?)
    }

    pub fn add_produk(&self, order_id: &str, input: NewProduk, actor: &Actor) -> ApiResult<Produk> {
        Ok(self.orchestrator.add_produk(order_id, input, actor, self.now())?)
    }

    pub fn publish_item_pekerjaan(&self, order_id: &str, actor: &Actor) -> ApiResult<ItemPekerjaan> {
        Ok(self.orchestrator.publish_item_pekerjaan(order_id, actor, self.now())?)
    }

    pub fn respond_rab_internal(&self, order_id: &str, actor: &Actor) -> ApiResult<RabInternal> {
        Ok(self.orchestrator.respond_rab_internal(order_id, actor, self.now())?)
    }

    pub fn set_rab_internal_lines(
        &self,
        order_id: &str,
        lines: Vec<RabLineInput>,
        actor: &Actor,
    ) -> ApiResult<RabInternal> {
        Ok(self.orchestrator.set_rab_internal_lines(order_id, lines, actor, self.now())?)
    }

    pub fn submit_rab_internal(&self, order_id: &str, actor: &Actor) -> ApiResult<RabInternal> {
        Ok(self.orchestrator.submit_rab_internal(order_id, actor, self.now())?)
    }

    /// 撤回已提交的 RAB Internal (Kontrak 创建前)
    pub fn reopen_rab_internal(&self, order_id: &str, actor: &Actor) -> ApiResult<RabInternal> {
        Ok(self.orchestrator.reopen_rab_internal(order_id, actor, self.now())?)
    }

    pub fn generate_rab_variant(
        &self,
        order_id: &str,
        variant: RabVariant,
        actor: &Actor,
    ) -> ApiResult<RabVariantSet> {
        Ok(self.orchestrator.generate_rab_variant(order_id, variant, actor, self.now())?)
    }

    /// 依次生成 Kontrak / Vendor / Jasa 三个版本 (每个版本独立事务)
    pub fn generate_all_rab_variants(&self, order_id: &str, actor: &Actor) -> ApiResult<Vec<RabVariantSet>> {
        RabVariant::ALL
            .iter()
            .map(|variant| self.generate_rab_variant(order_id, *variant, actor))
            .collect()
    }

    pub fn create_kontrak(&self, order_id: &str, input: NewKontrak, actor: &Actor) -> ApiResult<Kontrak> {
        Ok(self.orchestrator.create_kontrak(order_id, input, actor, self.now())?)
    }

    pub fn create_invoice(&self, order_id: &str, input: NewInvoice, actor: &Actor) -> ApiResult<Invoice> {
        Ok(self.orchestrator.create_invoice(order_id, input, actor, self.now())?)
    }

    pub fn pay_invoice(
        &self,
        order_id: &str,
        invoice_id: &str,
        payment_proof: &str,
        actor: &Actor,
    ) -> ApiResult<Invoice> {
        Ok(self
            .orchestrator
            .pay_invoice(order_id, invoice_id, payment_proof, actor, self.now())?)
    }

    pub fn set_workplan(
        &self,
        order_id: &str,
        produk_id: &str,
        entries: Vec<WorkplanEntry>,
        actor: &Actor,
    ) -> ApiResult<Vec<WorkplanItem>> {
        Ok(self
            .orchestrator
            .set_workplan(order_id, produk_id, entries, actor, self.now())?)
    }

    // ==========================================
    // Gambar Kerja
    // ==========================================

    pub fn open_gambar_kerja(&self, order_id: &str, actor: &Actor) -> ApiResult<GambarKerja> {
        Ok(self.orchestrator.open_gambar_kerja(order_id, actor, self.now())?)
    }

    pub fn respond_gambar_kerja(&self, order_id: &str, actor: &Actor) -> ApiResult<GambarKerja> {
        Ok(self.orchestrator.respond_gambar_kerja(order_id, actor, self.now())?)
    }

    pub fn upload_gambar_kerja_file(
        &self,
        order_id: &str,
        file_path: &str,
        original_name: &str,
        actor: &Actor,
    ) -> ApiResult<DesignFile> {
        Ok(self
            .orchestrator
            .upload_gambar_kerja_file(order_id, file_path, original_name, actor, self.now())?)
    }

    pub fn revise_gambar_kerja(&self, order_id: &str, notes: &str, actor: &Actor) -> ApiResult<GambarKerja> {
        Ok(self.orchestrator.revise_gambar_kerja(order_id, notes, actor, self.now())?)
    }

    pub fn approve_gambar_kerja(&self, order_id: &str, actor: &Actor) -> ApiResult<GambarKerja> {
        Ok(self.orchestrator.approve_gambar_kerja(order_id, actor, self.now())?)
    }

    pub fn pm_respond_gambar_kerja(&self, order_id: &str, actor: &Actor) -> ApiResult<GambarKerja> {
        Ok(self.orchestrator.pm_respond_gambar_kerja(order_id, actor, self.now())?)
    }

    // ==========================================
    // 任务追踪
    // ==========================================

    pub fn request_extension(
        &self,
        order_id: &str,
        request: &ExtensionRequest,
        actor: &Actor,
    ) -> ApiResult<TaskResponse> {
        request.validate()?;
        Ok(self.orchestrator.request_extension(
            order_id,
            request.tahap,
            request.days,
            &request.reason,
            actor,
            self.now(),
        )?)
    }

    pub fn check_deadlines(&self) -> ApiResult<DeadlineReport> {
        Ok(self.orchestrator.check_deadlines(self.now())?)
    }

    pub fn list_tasks(&self, order_id: &str) -> ApiResult<Vec<TaskResponse>> {
        Ok(self.orchestrator.list_tasks(order_id)?)
    }

    // ==========================================
    // 查询与导出
    // ==========================================

    pub fn get_order(&self, order_id: &str) -> ApiResult<OrderAggregate> {
        Ok(self.orchestrator.load_order_aggregate(order_id)?)
    }

    pub fn get_order_status(&self, order_id: &str) -> ApiResult<OrderStatusView> {
        let agg = self.orchestrator.load_order_aggregate(order_id)?;
        let tasks = self.orchestrator.list_tasks(order_id)?;
        Ok(OrderStatusView::build(&agg, tasks))
    }

    /// 订单操作历史 (按时间顺序)
    pub fn list_action_logs(&self, order_id: &str) -> ApiResult<Vec<ActionLog>> {
        self.orchestrator.load_order_aggregate(order_id)?;
        Ok(self.action_log_repo.find_by_order(order_id)?)
    }

    pub fn export_workplan_csv(&self, order_id: &str) -> ApiResult<String> {
        let export = self.orchestrator.build_workplan_export(order_id)?;
        export
            .to_csv_string()
            .map_err(|e| ApiError::InternalError(format!("CSV 生成失败: {}", e)))
    }

    /// 导出工作计划到文件
    pub fn export_workplan_to_file(&self, order_id: &str, path: &Path) -> ApiResult<usize> {
        let export = self.orchestrator.build_workplan_export(order_id)?;
        let file = std::fs::File::create(path)
            .map_err(|e| ApiError::InternalError(format!("无法创建文件 {}: {}", path.display(), e)))?;
        export
            .write_csv(file)
            .map_err(|e| ApiError::InternalError(format!("CSV 写入失败: {}", e)))?;
        tracing::info!(order_id, path = %path.display(), rows = export.body().len(), "工作计划已导出");
        Ok(export.body().len())
    }
}
