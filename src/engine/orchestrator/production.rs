// ==========================================
// 编排器 - 生产阶段
// ==========================================
// Item Pekerjaan -> RAB Internal -> RAB 派生版本 -> Kontrak -> Invoice / Workplan
// ==========================================

use super::{NewInvoice, NewKontrak, NewProduk, RabLineInput, WorkflowOrchestrator, WorkplanEntry};
use crate::domain::action_log::ActionType;
use crate::domain::item_pekerjaan::{Invoice, ItemPekerjaan, Produk, WorkplanItem};
use crate::domain::kontrak::Kontrak;
use crate::domain::rab::{RabInternal, RabInternalLine, RabVariantSet};
use crate::domain::stage::{Actor, StageResponse};
use crate::domain::types::{ItemPekerjaanStatus, RabVariant, Tahap, WorkflowStage};
use crate::engine::error::{WorkflowError, WorkflowResult};
use crate::engine::events::{StageEvent, StageEventType};
use crate::engine::guard::TransitionGuard;
use crate::engine::rab_generator::{round2, RabGenerator};
use crate::repository::{
    CommitmentFeeRepository, DesainFinalRepository, ItemPekerjaanRepository, KontrakRepository,
    OrderRepository, RabRepository,
};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde_json::json;

const DEFAULT_WORKPLAN_STATUS: &str = "not_started";

fn invalid(message: impl Into<String>) -> WorkflowError {
    WorkflowError::InvalidInput(message.into())
}

fn validate_produk(input: &NewProduk) -> WorkflowResult<()> {
    if input.nama_produk.trim().is_empty() {
        return Err(invalid("nama_produk 不能为空"));
    }
    if input.nama_ruangan.trim().is_empty() {
        return Err(invalid("nama_ruangan 不能为空"));
    }
    if input.quantity < 1 {
        return Err(invalid(format!("quantity 必须 >= 1: {}", input.quantity)));
    }
    for (name, value) in [("panjang", input.panjang), ("lebar", input.lebar), ("tinggi", input.tinggi)] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(invalid(format!("{} 不能为负数: {}", name, v)));
            }
        }
    }
    Ok(())
}

fn validate_rab_line(no: usize, line: &RabLineInput) -> WorkflowResult<()> {
    let err = |msg: String| invalid(format!("第 {} 行: {}", no, msg));
    if line.nama_item.trim().is_empty() {
        return Err(err("nama_item 不能为空".to_string()));
    }
    if !line.quantity.is_finite() || line.quantity <= 0.0 {
        return Err(err(format!("quantity 必须大于 0: {}", line.quantity)));
    }
    if !line.harga_dasar.is_finite() || line.harga_dasar < 0.0 {
        return Err(err(format!("harga_dasar 不能为负数: {}", line.harga_dasar)));
    }
    if !(0.0..100.0).contains(&line.markup_pct) {
        return Err(err(format!("markup_pct 必须在 [0, 100) 内: {}", line.markup_pct)));
    }
    if !(0.0..=100.0).contains(&line.diskon_pct) {
        return Err(err(format!("diskon_pct 必须在 [0, 100] 内: {}", line.diskon_pct)));
    }
    if let Some(jasa) = line.harga_jasa {
        if !jasa.is_finite() || jasa < 0.0 {
            return Err(err(format!("harga_jasa 不能为负数: {}", jasa)));
        }
    }
    Ok(())
}

impl WorkflowOrchestrator {
    fn require_rab_internal(conn: &Connection, item_pekerjaan_id: &str) -> WorkflowResult<RabInternal> {
        RabRepository::find_internal_tx(conn, item_pekerjaan_id)?
            .ok_or_else(|| WorkflowError::prerequisite(Tahap::RabInternal, "RAB Internal 尚未响应"))
    }

    // ==========================================
    // Item Pekerjaan
    // ==========================================

    pub fn respond_item_pekerjaan(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<ItemPekerjaan> {
        self.in_tx("respond_item_pekerjaan", |tx, events| {
            Self::load_order(tx, order_id)?;
            let moodboard = Self::require_moodboard(tx, order_id, Tahap::ItemPekerjaan)?;
            let fee = CommitmentFeeRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)?;
            let desain_final = DesainFinalRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)?;
            TransitionGuard::check_item_pekerjaan_respond(fee.as_ref(), desain_final.as_ref())?;

            let mut item = match ItemPekerjaanRepository::find_by_moodboard_tx(tx, &moodboard.moodboard_id)? {
                Some(item) => item,
                None => {
                    let item = ItemPekerjaan::new(&moodboard.moodboard_id, now);
                    ItemPekerjaanRepository::insert_tx(tx, &item)?;
                    item
                }
            };
            item.response.respond(Tahap::ItemPekerjaan, actor, now)?;
            item.updated_at = now;
            ItemPekerjaanRepository::update_tx(tx, &item)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::ItemPekerjaan, actor.user_id.clone(), now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Respond, Tahap::ItemPekerjaan, actor, now))?;
            events.push(StageEvent::new(
                order_id,
                Tahap::ItemPekerjaan,
                StageEventType::Responded,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, item_pekerjaan_id = %item.item_pekerjaan_id, "Item Pekerjaan 已响应");
            Ok(item)
        })
    }

    /// 添加产品 (发布前)
    pub fn add_produk(
        &self,
        order_id: &str,
        input: NewProduk,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Produk> {
        validate_produk(&input)?;

        self.in_tx("add_produk", |tx, events| {
            Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::ItemPekerjaan)?;
            if !detail.item.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::ItemPekerjaan));
            }
            if detail.item.is_published() {
                return Err(WorkflowError::AlreadyApproved(Tahap::ItemPekerjaan));
            }

            let ip_id = detail.item.item_pekerjaan_id.clone();
            let produk = Produk {
                produk_id: uuid::Uuid::new_v4().to_string(),
                sort_order: ItemPekerjaanRepository::next_produk_sort_order_tx(tx, &ip_id)?,
                item_pekerjaan_id: ip_id,
                nama_produk: input.nama_produk.trim().to_string(),
                nama_ruangan: input.nama_ruangan.trim().to_string(),
                quantity: input.quantity,
                panjang: input.panjang,
                lebar: input.lebar,
                tinggi: input.tinggi,
                workplan_items: Vec::new(),
            };
            ItemPekerjaanRepository::insert_produk_tx(tx, &produk)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::AddProduk, Tahap::ItemPekerjaan, actor, now).with_payload(
                    &json!({ "produk_id": produk.produk_id, "nama_produk": produk.nama_produk, "nama_ruangan": produk.nama_ruangan }),
                ),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::ItemPekerjaan,
                StageEventType::DataSubmitted,
                &actor.name,
                now,
            ));
            Ok(produk)
        })
    }

    /// 发布: 订单进入 item_pekerjaan_defined
    pub fn publish_item_pekerjaan(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<ItemPekerjaan> {
        self.in_tx("publish_item_pekerjaan", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::ItemPekerjaan)?;
            TransitionGuard::check_item_pekerjaan_publish(&detail)?;

            let mut item = detail.item;
            item.status = ItemPekerjaanStatus::Published;
            item.updated_at = now;
            ItemPekerjaanRepository::update_tx(tx, &item)?;
            Self::advance(tx, &mut order, WorkflowStage::ItemPekerjaanDefined, now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::ItemPekerjaan, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::RabInternal, now)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::Publish, Tahap::ItemPekerjaan, actor, now)
                    .with_payload(&json!({ "produk_count": detail.produks.len() })),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::ItemPekerjaan, StageEventType::Approved, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, produk_count = detail.produks.len(), "Item Pekerjaan 已发布");
            Ok(item)
        })
    }

    // ==========================================
    // RAB Internal
    // ==========================================

    pub fn respond_rab_internal(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<RabInternal> {
        self.in_tx("respond_rab_internal", |tx, events| {
            Self::load_order(tx, order_id)?;
            let moodboard = Self::require_moodboard(tx, order_id, Tahap::RabInternal)?;
            let detail = ItemPekerjaanRepository::find_detail_by_moodboard_tx(tx, &moodboard.moodboard_id)?;
            TransitionGuard::check_rab_internal_respond(detail.as_ref())?;
            let ip_id = detail
                .map(|d| d.item.item_pekerjaan_id)
                .unwrap_or_default();

            let mut rab = match RabRepository::find_internal_tx(tx, &ip_id)? {
                Some(rab) => rab,
                None => {
                    let rab = RabInternal::new(&ip_id, now);
                    RabRepository::insert_internal_tx(tx, &rab)?;
                    rab
                }
            };
            rab.response.respond(Tahap::RabInternal, actor, now)?;
            rab.updated_at = now;
            RabRepository::update_internal_tx(tx, &rab)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::RabInternal, actor.user_id.clone(), now)?;

            Self::audit(tx, Self::action(order_id, ActionType::Respond, Tahap::RabInternal, actor, now))?;
            events.push(StageEvent::new(
                order_id,
                Tahap::RabInternal,
                StageEventType::Responded,
                &actor.name,
                now,
            ));
            Ok(rab)
        })
    }

    /// 整组替换 RAB Internal 行 (提交前), line_no 按输入顺序从 1 编号
    pub fn set_rab_internal_lines(
        &self,
        order_id: &str,
        lines: Vec<RabLineInput>,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<RabInternal> {
        for (idx, line) in lines.iter().enumerate() {
            validate_rab_line(idx + 1, line)?;
        }

        self.in_tx("set_rab_internal_lines", |tx, events| {
            Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::RabInternal)?;
            let mut rab = Self::require_rab_internal(tx, &detail.item.item_pekerjaan_id)?;
            if !rab.response.is_responded() {
                return Err(WorkflowError::NotYetResponded(Tahap::RabInternal));
            }
            if rab.is_submitted {
                return Err(WorkflowError::prerequisite(Tahap::RabInternal, "RAB Internal 已提交, 不可修改"));
            }

            let mut new_lines = Vec::with_capacity(lines.len());
            for (idx, input) in lines.iter().enumerate() {
                if let Some(produk_id) = &input.produk_id {
                    if detail.find_produk(produk_id).is_none() {
                        return Err(WorkflowError::not_found("Produk", produk_id));
                    }
                }
                new_lines.push(RabInternalLine {
                    line_id: uuid::Uuid::new_v4().to_string(),
                    line_no: idx as i64 + 1,
                    produk_id: input.produk_id.clone(),
                    nama_item: input.nama_item.trim().to_string(),
                    is_aksesoris: input.is_aksesoris,
                    quantity: input.quantity,
                    harga_dasar: input.harga_dasar,
                    markup_pct: input.markup_pct,
                    diskon_pct: input.diskon_pct,
                    harga_jasa: input.harga_jasa,
                });
            }
            RabRepository::replace_lines_tx(tx, &rab.rab_internal_id, &new_lines)?;
            rab.lines = new_lines;
            rab.updated_at = now;
            RabRepository::update_internal_tx(tx, &rab)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::SetRabLines, Tahap::RabInternal, actor, now).with_payload(
                    &json!({ "line_count": rab.lines.len(), "aksesoris_count": rab.aksesoris_count() }),
                ),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::RabInternal,
                StageEventType::DataSubmitted,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, line_count = rab.lines.len(), "RAB Internal 行已更新");
            Ok(rab)
        })
    }

    /// 提交: 锁定 RAB Internal, 订单进入 rab_internal_submitted
    pub fn submit_rab_internal(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<RabInternal> {
        self.in_tx("submit_rab_internal", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::RabInternal)?;
            let mut rab = Self::require_rab_internal(tx, &detail.item.item_pekerjaan_id)?;
            TransitionGuard::check_rab_internal_submit(&rab)?;

            rab.is_submitted = true;
            rab.submitted_at = Some(now);
            rab.submitted_by = Some(actor.name.clone());
            rab.updated_at = now;
            RabRepository::update_internal_tx(tx, &rab)?;
            Self::advance(tx, &mut order, WorkflowStage::RabInternalSubmitted, now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::RabInternal, now)?;
            self.tracker.open_tx(tx, order_id, Tahap::Kontrak, now)?;

            Self::audit(tx, Self::action(order_id, ActionType::SubmitRab, Tahap::RabInternal, actor, now))?;
            events.push(
                StageEvent::new(order_id, Tahap::RabInternal, StageEventType::DataSubmitted, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, rab_internal_id = %rab.rab_internal_id, "RAB Internal 已提交");
            Ok(rab)
        })
    }

    /// 撤回提交: RAB Internal 回到可编辑状态, 已生成的派生版本一并删除
    ///
    /// Kontrak 创建后拒绝; 订单回到 item_pekerjaan_defined
    pub fn reopen_rab_internal(
        &self,
        order_id: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<RabInternal> {
        self.in_tx("reopen_rab_internal", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::RabInternal)?;
            let ip_id = &detail.item.item_pekerjaan_id;
            let mut rab = Self::require_rab_internal(tx, ip_id)?;
            if !rab.is_submitted {
                return Err(WorkflowError::prerequisite(Tahap::RabInternal, "RAB Internal 尚未提交"));
            }
            if KontrakRepository::find_by_item_pekerjaan_tx(tx, ip_id)?.is_some() {
                return Err(WorkflowError::prerequisite(
                    Tahap::RabInternal,
                    "Kontrak 已创建, 不能撤回 RAB Internal",
                ));
            }

            rab.is_submitted = false;
            rab.submitted_at = None;
            rab.submitted_by = None;
            rab.updated_at = now;
            RabRepository::update_internal_tx(tx, &rab)?;
            let removed = RabRepository::delete_variants_tx(tx, ip_id)?;

            if order.tahapan > WorkflowStage::ItemPekerjaanDefined {
                OrderRepository::update_stage_tx(tx, order_id, WorkflowStage::ItemPekerjaanDefined, now)?;
                order.tahapan = WorkflowStage::ItemPekerjaanDefined;
            }

            Self::audit(
                tx,
                Self::action(order_id, ActionType::ReopenRab, Tahap::RabInternal, actor, now)
                    .with_payload(&json!({ "removed_variants": removed })),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::RabInternal, StageEventType::RevisionRequested, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, removed_variants = removed, "RAB Internal 已撤回提交");
            Ok(rab)
        })
    }

    // ==========================================
    // RAB 派生版本
    // ==========================================

    /// 生成 (或重新生成) 一个派生版本; 三个版本齐全后订单进入 rab_variants_generated
    pub fn generate_rab_variant(
        &self,
        order_id: &str,
        variant: RabVariant,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<RabVariantSet> {
        self.in_tx("generate_rab_variant", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, variant.tahap())?;
            let ip_id = &detail.item.item_pekerjaan_id;
            let found = RabRepository::find_internal_tx(tx, ip_id)?;
            let source = TransitionGuard::check_variant_generate(variant, found.as_ref())?;

            let set = RabGenerator::generate(source, variant, &actor.name, now)?;
            let written = RabRepository::replace_variant_tx(tx, &set)?;

            let generated = RabRepository::list_variants_tx(tx, ip_id)?;
            if RabVariant::ALL.iter().all(|v| generated.iter().any(|s| s.variant == *v)) {
                Self::advance(tx, &mut order, WorkflowStage::RabVariantsGenerated, now)?;
            }

            Self::audit(
                tx,
                Self::action(order_id, ActionType::GenerateVariant, variant.tahap(), actor, now).with_payload(
                    &json!({ "variant": variant.as_str(), "rows": written, "total": set.total() }),
                ),
            )?;
            events.push(
                StageEvent::new(order_id, variant.tahap(), StageEventType::VariantGenerated, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, variant = %variant, rows = written, total = set.total(), "RAB 派生版本已生成");
            Ok(set)
        })
    }

    // ==========================================
    // Kontrak / Invoice
    // ==========================================

    /// 创建合同: 合同金额取 RAB Kontrak 合计
    pub fn create_kontrak(
        &self,
        order_id: &str,
        input: NewKontrak,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Kontrak> {
        if input.durasi_kontrak < 1 {
            return Err(invalid(format!("durasi_kontrak 必须 >= 1: {}", input.durasi_kontrak)));
        }
        if input.termin_count < 1 {
            return Err(invalid(format!("termin_count 必须 >= 1: {}", input.termin_count)));
        }

        self.in_tx("create_kontrak", |tx, events| {
            let mut order = Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::Kontrak)?;
            let ip_id = &detail.item.item_pekerjaan_id;
            let variants = RabRepository::list_variants_tx(tx, ip_id)?;
            let existing = KontrakRepository::find_by_item_pekerjaan_tx(tx, ip_id)?;
            TransitionGuard::check_kontrak_create(&variants, existing.as_ref())?;

            let harga_kontrak = variants
                .iter()
                .find(|s| s.variant == RabVariant::Kontrak)
                .map(|s| s.total())
                .unwrap_or_default();
            let mut response = StageResponse::default();
            response.respond(Tahap::Kontrak, actor, now)?;
            let kontrak = Kontrak {
                kontrak_id: uuid::Uuid::new_v4().to_string(),
                order_id: order_id.to_string(),
                item_pekerjaan_id: ip_id.clone(),
                durasi_kontrak: input.durasi_kontrak,
                harga_kontrak,
                termin_count: input.termin_count,
                response,
                created_at: now,
            };
            KontrakRepository::insert_tx(tx, &kontrak)?;
            Self::advance(tx, &mut order, WorkflowStage::KontrakCreated, now)?;
            self.tracker
                .respond_tx(tx, order_id, Tahap::Kontrak, actor.user_id.clone(), now)?;
            self.tracker.complete_tx(tx, order_id, Tahap::Kontrak, now)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::CreateKontrak, Tahap::Kontrak, actor, now).with_payload(
                    &json!({ "harga_kontrak": harga_kontrak, "durasi_kontrak": input.durasi_kontrak, "termin_count": input.termin_count }),
                ),
            )?;
            events.push(
                StageEvent::new(order_id, Tahap::Kontrak, StageEventType::StageOpened, &actor.name, now)
                    .with_stage(order.tahapan),
            );
            tracing::info!(order_id, kontrak_id = %kontrak.kontrak_id, harga_kontrak, "Kontrak 已创建");
            Ok(kontrak)
        })
    }

    /// 开具分期发票; termin_step 取 [0, termin_count], 同一分期只能开一次
    pub fn create_invoice(
        &self,
        order_id: &str,
        input: NewInvoice,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Invoice> {
        if !input.amount.is_finite() || input.amount <= 0.0 {
            return Err(invalid(format!("amount 必须大于 0: {}", input.amount)));
        }

        self.in_tx("create_invoice", |tx, events| {
            Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::Invoice)?;
            let ip_id = &detail.item.item_pekerjaan_id;
            let found = KontrakRepository::find_by_item_pekerjaan_tx(tx, ip_id)?;
            let kontrak = TransitionGuard::check_invoice_create(found.as_ref())?;

            if input.termin_step < 0 || input.termin_step > kontrak.termin_count {
                return Err(invalid(format!(
                    "termin_step 必须在 0 到 {} 之间: {}",
                    kontrak.termin_count, input.termin_step
                )));
            }
            if detail.invoices.iter().any(|i| i.termin_step == input.termin_step) {
                return Err(invalid(format!("分期 {} 已开具发票", input.termin_step)));
            }

            let invoice = Invoice {
                invoice_id: uuid::Uuid::new_v4().to_string(),
                item_pekerjaan_id: ip_id.clone(),
                termin_step: input.termin_step,
                amount: round2(input.amount),
                paid_at: None,
                payment_proof: None,
                created_at: now,
            };
            ItemPekerjaanRepository::insert_invoice_tx(tx, &invoice)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::CreateInvoice, Tahap::Invoice, actor, now).with_payload(
                    &json!({ "invoice_id": invoice.invoice_id, "termin_step": invoice.termin_step, "amount": invoice.amount }),
                ),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::Invoice,
                StageEventType::StageOpened,
                &actor.name,
                now,
            ));
            Ok(invoice)
        })
    }

    pub fn pay_invoice(
        &self,
        order_id: &str,
        invoice_id: &str,
        payment_proof: &str,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Invoice> {
        let payment_proof = payment_proof.trim();
        if payment_proof.is_empty() {
            return Err(invalid("payment_proof 不能为空"));
        }

        self.in_tx("pay_invoice", |tx, events| {
            Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::Invoice)?;
            let mut invoice = detail
                .invoices
                .iter()
                .find(|i| i.invoice_id == invoice_id)
                .cloned()
                .ok_or_else(|| WorkflowError::not_found("Invoice", invoice_id))?;
            if invoice.paid_at.is_some() {
                return Err(WorkflowError::AlreadyApproved(Tahap::Invoice));
            }

            invoice.paid_at = Some(now);
            invoice.payment_proof = Some(payment_proof.to_string());
            ItemPekerjaanRepository::update_invoice_payment_tx(tx, &invoice)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::PayInvoice, Tahap::Invoice, actor, now)
                    .with_payload(&json!({ "invoice_id": invoice_id, "termin_step": invoice.termin_step })),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::Invoice,
                StageEventType::PaymentCompleted,
                &actor.name,
                now,
            ));
            tracing::info!(order_id, invoice_id, termin_step = invoice.termin_step, "发票已付款");
            Ok(invoice)
        })
    }

    // ==========================================
    // Workplan
    // ==========================================

    /// 整组替换某产品的工作计划 (Item Pekerjaan 发布后)
    pub fn set_workplan(
        &self,
        order_id: &str,
        produk_id: &str,
        entries: Vec<WorkplanEntry>,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> WorkflowResult<Vec<WorkplanItem>> {
        for entry in &entries {
            if entry.nama_tahapan.trim().is_empty() {
                return Err(invalid("nama_tahapan 不能为空"));
            }
            if let (Some(start), Some(end)) = (entry.start_date, entry.end_date) {
                if start > end {
                    return Err(invalid(format!(
                        "{}: 开始日期 {} 晚于结束日期 {}",
                        entry.nama_tahapan, start, end
                    )));
                }
            }
        }

        self.in_tx("set_workplan", |tx, events| {
            Self::load_order(tx, order_id)?;
            let detail = Self::require_item_pekerjaan(tx, order_id, Tahap::Workplan)?;
            if !detail.item.is_published() {
                return Err(WorkflowError::prerequisite(Tahap::Workplan, "Item Pekerjaan 尚未发布"));
            }
            if detail.find_produk(produk_id).is_none() {
                return Err(WorkflowError::not_found("Produk", produk_id));
            }

            let items: Vec<WorkplanItem> = entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| WorkplanItem {
                    workplan_item_id: uuid::Uuid::new_v4().to_string(),
                    produk_id: produk_id.to_string(),
                    nama_tahapan: entry.nama_tahapan.trim().to_string(),
                    start_date: entry.start_date,
                    end_date: entry.end_date,
                    status: entry
                        .status
                        .clone()
                        .unwrap_or_else(|| DEFAULT_WORKPLAN_STATUS.to_string()),
                    sort_order: idx as i64,
                })
                .collect();
            ItemPekerjaanRepository::replace_workplan_tx(tx, produk_id, &items)?;

            Self::audit(
                tx,
                Self::action(order_id, ActionType::SetWorkplan, Tahap::Workplan, actor, now)
                    .with_payload(&json!({ "produk_id": produk_id, "items": items.len() })),
            )?;
            events.push(StageEvent::new(
                order_id,
                Tahap::Workplan,
                StageEventType::DataSubmitted,
                &actor.name,
                now,
            ));
            Ok(items)
        })
    }
}
