// ==========================================
// 室内设计订单流程系统 - 阶段转换守卫
// ==========================================
// 职责: 校验目标转换的前置阶段是否已完成
// 红线: 守卫只读, 不做任何写入; 失败即拒绝, 不是崩溃
// ==========================================

use crate::domain::commitment_fee::CommitmentFee;
use crate::domain::desain_final::DesainFinal;
use crate::domain::estimasi::Estimasi;
use crate::domain::gambar_kerja::GambarKerja;
use crate::domain::item_pekerjaan::ItemPekerjaanDetail;
use crate::domain::kontrak::Kontrak;
use crate::domain::moodboard::Moodboard;
use crate::domain::order::Order;
use crate::domain::rab::{RabInternal, RabVariantSet};
use crate::domain::types::{PaymentStatus, RabVariant, Tahap, WorkflowStage};
use crate::engine::error::{WorkflowError, WorkflowResult};

// ==========================================
// Transition - 受守卫的转换
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    StartDesign,
    RespondMoodboard,
    AcceptMoodboard,
    StoreEstimasi,
    RespondCommitmentFee,
    PayCommitmentFee,
    RespondDesainFinal,
    AcceptDesainFinal,
    RespondItemPekerjaan,
    PublishItemPekerjaan,
    RespondRabInternal,
    SubmitRabInternal,
    GenerateVariant(RabVariant),
    CreateKontrak,
    CreateInvoice,
    OpenGambarKerja,
    ApproveGambarKerja,
    ExportWorkplan,
}

impl Transition {
    /// 目标阶段名称
    pub fn tahap(&self) -> Tahap {
        match self {
            Transition::StartDesign
            | Transition::RespondMoodboard
            | Transition::AcceptMoodboard => Tahap::Moodboard,
            Transition::StoreEstimasi => Tahap::Estimasi,
            Transition::RespondCommitmentFee | Transition::PayCommitmentFee => Tahap::CommitmentFee,
            Transition::RespondDesainFinal | Transition::AcceptDesainFinal => Tahap::DesainFinal,
            Transition::RespondItemPekerjaan | Transition::PublishItemPekerjaan => Tahap::ItemPekerjaan,
            Transition::RespondRabInternal | Transition::SubmitRabInternal => Tahap::RabInternal,
            Transition::GenerateVariant(v) => v.tahap(),
            Transition::CreateKontrak => Tahap::Kontrak,
            Transition::CreateInvoice => Tahap::Invoice,
            Transition::OpenGambarKerja | Transition::ApproveGambarKerja => Tahap::GambarKerja,
            Transition::ExportWorkplan => Tahap::Workplan,
        }
    }

    /// 守卫说明 (用于日志)
    pub fn description(&self) -> &'static str {
        match self {
            Transition::StartDesign => "订单必须处于 created 阶段",
            Transition::RespondMoodboard => "订单必须已进入设计阶段",
            Transition::AcceptMoodboard => "Moodboard 必须已响应且至少有一个设计文件",
            Transition::StoreEstimasi => "Moodboard 必须已被接受",
            Transition::RespondCommitmentFee => "Estimasi 必须已响应",
            Transition::PayCommitmentFee => "Commitment Fee 必须已响应且已填写金额",
            Transition::RespondDesainFinal => "Moodboard 必须已接受且 Commitment Fee 必须已付款",
            Transition::AcceptDesainFinal => "Desain Final 必须已响应且至少有一个最终设计文件",
            Transition::RespondItemPekerjaan => "Commitment Fee 必须已付款且 Desain Final 必须已接受",
            Transition::PublishItemPekerjaan => "Item Pekerjaan 至少需要一个产品",
            Transition::RespondRabInternal => "Item Pekerjaan 必须已发布",
            Transition::SubmitRabInternal => "RAB Internal 至少需要一行且尚未提交",
            Transition::GenerateVariant(_) => "RAB Internal 必须已提交",
            Transition::CreateKontrak => "三个 RAB 派生版本必须均已生成",
            Transition::CreateInvoice => "Kontrak 必须已创建",
            Transition::OpenGambarKerja => "Kontrak 必须已创建",
            Transition::ApproveGambarKerja => "Gambar Kerja 必须已响应且至少有一个文件",
            Transition::ExportWorkplan => "至少需要一张已付款且 termin_step >= 1 的发票",
        }
    }

    fn reject(&self, reason: impl Into<String>) -> WorkflowError {
        WorkflowError::prerequisite(self.tahap(), reason)
    }
}

// ==========================================
// TransitionGuard - 各转换的前置判定
// ==========================================
pub struct TransitionGuard;

impl TransitionGuard {
    pub fn check_start_design(order: &Order) -> WorkflowResult<()> {
        let t = Transition::StartDesign;
        if order.tahapan != WorkflowStage::Created {
            return Err(t.reject(format!("订单当前阶段为 {}", order.tahapan)));
        }
        Ok(())
    }

    /// Moodboard 响应: 订单阶段 >= moodboard_pending 且记录存在
    pub fn check_moodboard_respond<'a>(
        order: &Order,
        moodboard: Option<&'a Moodboard>,
    ) -> WorkflowResult<&'a Moodboard> {
        let t = Transition::RespondMoodboard;
        if order.tahapan < WorkflowStage::MoodboardPending {
            return Err(t.reject(t.description()));
        }
        moodboard.ok_or_else(|| t.reject("Moodboard 尚未创建"))
    }

    /// Moodboard 接受: 先判响应与重复审批, 再判文件
    pub fn check_moodboard_accept(moodboard: &Moodboard) -> WorkflowResult<()> {
        let t = Transition::AcceptMoodboard;
        if !moodboard.response.is_responded() {
            return Err(WorkflowError::NotYetResponded(Tahap::Moodboard));
        }
        if moodboard.accepted {
            return Err(WorkflowError::AlreadyApproved(Tahap::Moodboard));
        }
        if moodboard.files.is_empty() {
            return Err(t.reject("没有可接受的设计文件"));
        }
        Ok(())
    }

    /// Estimasi 创建: Moodboard 已接受, 且 Estimasi 尚不存在
    pub fn check_estimasi_store<'a>(
        moodboard: Option<&'a Moodboard>,
        existing: Option<&Estimasi>,
    ) -> WorkflowResult<&'a Moodboard> {
        let t = Transition::StoreEstimasi;
        let moodboard = moodboard.ok_or_else(|| t.reject("Moodboard 尚未创建"))?;
        if !moodboard.accepted {
            return Err(t.reject(t.description()));
        }
        if existing.is_some() {
            return Err(WorkflowError::AlreadyResponded(Tahap::Estimasi));
        }
        Ok(moodboard)
    }

    pub fn check_commitment_fee_respond(estimasi: Option<&Estimasi>) -> WorkflowResult<()> {
        let t = Transition::RespondCommitmentFee;
        match estimasi {
            Some(e) if e.response.is_responded() => Ok(()),
            _ => Err(t.reject(t.description())),
        }
    }

    pub fn check_commitment_fee_pay(fee: &CommitmentFee) -> WorkflowResult<()> {
        let t = Transition::PayCommitmentFee;
        if !fee.response.is_responded() {
            return Err(WorkflowError::NotYetResponded(Tahap::CommitmentFee));
        }
        if fee.is_paid() {
            return Err(WorkflowError::AlreadyApproved(Tahap::CommitmentFee));
        }
        match fee.total_fee {
            Some(_) => Ok(()),
            None => Err(t.reject("尚未填写 Commitment Fee 金额")),
        }
    }

    /// Desain Final 响应: Moodboard 已接受, Commitment Fee 已付款
    pub fn check_desain_final_respond(
        moodboard: &Moodboard,
        fee: Option<&CommitmentFee>,
    ) -> WorkflowResult<()> {
        let t = Transition::RespondDesainFinal;
        if !moodboard.accepted {
            return Err(t.reject("Moodboard 尚未被接受"));
        }
        match fee {
            Some(f) if f.payment_status == PaymentStatus::Completed => Ok(()),
            _ => Err(t.reject("Commitment Fee 尚未付款")),
        }
    }

    pub fn check_desain_final_accept(df: &DesainFinal) -> WorkflowResult<()> {
        let t = Transition::AcceptDesainFinal;
        if !df.response.is_responded() {
            return Err(WorkflowError::NotYetResponded(Tahap::DesainFinal));
        }
        if df.is_accepted() {
            return Err(WorkflowError::AlreadyApproved(Tahap::DesainFinal));
        }
        if df.files.is_empty() {
            return Err(t.reject("没有可接受的最终设计文件"));
        }
        Ok(())
    }

    pub fn check_item_pekerjaan_respond(
        fee: Option<&CommitmentFee>,
        desain_final: Option<&DesainFinal>,
    ) -> WorkflowResult<()> {
        let t = Transition::RespondItemPekerjaan;
        match fee {
            Some(f) if f.payment_status == PaymentStatus::Completed => {}
            _ => return Err(t.reject("Commitment Fee 尚未付款")),
        }
        match desain_final {
            Some(df) if df.is_accepted() => Ok(()),
            _ => Err(t.reject("Desain Final 尚未被接受")),
        }
    }

    pub fn check_item_pekerjaan_publish(detail: &ItemPekerjaanDetail) -> WorkflowResult<()> {
        let t = Transition::PublishItemPekerjaan;
        if !detail.item.response.is_responded() {
            return Err(WorkflowError::NotYetResponded(Tahap::ItemPekerjaan));
        }
        if detail.item.is_published() {
            return Err(WorkflowError::AlreadyApproved(Tahap::ItemPekerjaan));
        }
        if detail.produks.is_empty() {
            return Err(t.reject(t.description()));
        }
        Ok(())
    }

    pub fn check_rab_internal_respond(detail: Option<&ItemPekerjaanDetail>) -> WorkflowResult<()> {
        let t = Transition::RespondRabInternal;
        match detail {
            Some(d) if d.item.is_published() => Ok(()),
            _ => Err(t.reject(t.description())),
        }
    }

    pub fn check_rab_internal_submit(rab: &RabInternal) -> WorkflowResult<()> {
        let t = Transition::SubmitRabInternal;
        if !rab.response.is_responded() {
            return Err(WorkflowError::NotYetResponded(Tahap::RabInternal));
        }
        if rab.is_submitted {
            return Err(t.reject("RAB Internal 已提交"));
        }
        if rab.lines.is_empty() {
            return Err(t.reject("RAB Internal 没有任何行"));
        }
        Ok(())
    }

    /// 派生版本生成: 来源必须已锁定
    pub fn check_variant_generate<'a>(
        variant: RabVariant,
        rab: Option<&'a RabInternal>,
    ) -> WorkflowResult<&'a RabInternal> {
        let t = Transition::GenerateVariant(variant);
        let rab = rab.ok_or_else(|| t.reject("RAB Internal 尚未创建"))?;
        if !rab.is_submitted {
            return Err(WorkflowError::SourceNotLocked(variant.tahap()));
        }
        Ok(rab)
    }

    pub fn check_kontrak_create(
        variants: &[RabVariantSet],
        existing: Option<&Kontrak>,
    ) -> WorkflowResult<()> {
        let t = Transition::CreateKontrak;
        let missing: Vec<&str> = RabVariant::ALL
            .iter()
            .filter(|v| !variants.iter().any(|s| s.variant == **v))
            .map(|v| v.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(t.reject(format!("缺少 RAB 版本: {}", missing.join(", "))));
        }
        if existing.is_some() {
            return Err(t.reject("该工作项已存在 Kontrak"));
        }
        Ok(())
    }

    pub fn check_invoice_create(kontrak: Option<&Kontrak>) -> WorkflowResult<&Kontrak> {
        let t = Transition::CreateInvoice;
        kontrak.ok_or_else(|| t.reject(t.description()))
    }

    pub fn check_gambar_kerja_open(
        kontrak: Option<&Kontrak>,
        existing: Option<&GambarKerja>,
    ) -> WorkflowResult<()> {
        let t = Transition::OpenGambarKerja;
        if kontrak.is_none() {
            return Err(t.reject(t.description()));
        }
        if existing.is_some() {
            return Err(t.reject("Gambar Kerja 已创建"));
        }
        Ok(())
    }

    pub fn check_gambar_kerja_approve(gk: &GambarKerja) -> WorkflowResult<()> {
        let t = Transition::ApproveGambarKerja;
        if !gk.response.is_responded() {
            return Err(WorkflowError::NotYetResponded(Tahap::GambarKerja));
        }
        if gk.response.is_approved() {
            return Err(WorkflowError::AlreadyApproved(Tahap::GambarKerja));
        }
        if gk.files.is_empty() {
            return Err(t.reject("没有已上传的图纸文件"));
        }
        Ok(())
    }

    pub fn check_workplan_export(detail: Option<&ItemPekerjaanDetail>) -> WorkflowResult<&ItemPekerjaanDetail> {
        let t = Transition::ExportWorkplan;
        match detail {
            Some(d) if d.has_paid_termin() => Ok(d),
            _ => Err(t.reject(t.description())),
        }
    }
}
