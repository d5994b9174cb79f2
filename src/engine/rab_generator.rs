// ==========================================
// 室内设计订单流程系统 - RAB 派生版本生成引擎
// ==========================================
// 职责: 由已提交的 RAB Internal 计算 Kontrak / Vendor / Jasa 三个版本
// 红线: 来源未提交不得生成; 来源只读, 不回写
// 输出: 完整的 RabVariantSet (由仓储整组替换)
// ==========================================

use crate::domain::rab::{RabInternal, RabInternalLine, RabVariantRow, RabVariantSet};
use crate::domain::types::RabVariant;
use crate::engine::error::{WorkflowError, WorkflowResult};
use chrono::NaiveDateTime;
use tracing::instrument;

pub use crate::domain::rab::round2;

// ==========================================
// RabGenerator - 派生版本生成器
// ==========================================
// 红线: 不直接写库, 只计算并返回结果
pub struct RabGenerator;

impl RabGenerator {
    /// 生成单个派生版本
    ///
    /// # 参数
    /// - source: RAB Internal (必须已提交)
    /// - variant: 目标版本
    /// - generated_by: 操作人
    ///
    /// # 返回
    /// - Ok(RabVariantSet): 按 line_no 排序的完整行集
    /// - Err(SourceNotLocked): 来源未提交
    #[instrument(skip(source), fields(rab_internal_id = %source.rab_internal_id, variant = %variant))]
    pub fn generate(
        source: &RabInternal,
        variant: RabVariant,
        generated_by: &str,
        now: NaiveDateTime,
    ) -> WorkflowResult<RabVariantSet> {
        if !source.is_submitted {
            return Err(WorkflowError::SourceNotLocked(variant.tahap()));
        }

        let mut lines: Vec<&RabInternalLine> = source
            .lines
            .iter()
            .filter(|l| variant.includes_aksesoris() || !l.is_aksesoris)
            .collect();
        lines.sort_by_key(|l| l.line_no);

        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            rows.push(Self::derive_row(line, variant)?);
        }

        tracing::debug!(row_count = rows.len(), "RAB 派生版本计算完成");

        Ok(RabVariantSet {
            item_pekerjaan_id: source.item_pekerjaan_id.clone(),
            variant,
            rab_internal_id: source.rab_internal_id.clone(),
            generated_at: now,
            generated_by: generated_by.to_string(),
            rows,
        })
    }

    /// 计算单行
    fn derive_row(line: &RabInternalLine, variant: RabVariant) -> WorkflowResult<RabVariantRow> {
        if !(0.0..100.0).contains(&line.markup_pct) {
            return Err(WorkflowError::InvalidInput(format!(
                "第 {} 行 markup_pct 超出范围 [0, 100): {}",
                line.line_no, line.markup_pct
            )));
        }

        let (harga_satuan, diskon_pct) = match variant {
            RabVariant::Kontrak => (line.marked_up_unit_price(), line.diskon_pct),
            RabVariant::Vendor => (line.harga_dasar, 0.0),
            RabVariant::Jasa => (line.harga_jasa.unwrap_or(line.harga_dasar), 0.0),
        };
        let harga_total = round2(harga_satuan * line.quantity * (1.0 - diskon_pct / 100.0));

        Ok(RabVariantRow {
            row_id: uuid::Uuid::new_v4().to_string(),
            line_no: line.line_no,
            nama_item: line.nama_item.clone(),
            is_aksesoris: line.is_aksesoris,
            quantity: line.quantity,
            harga_satuan: round2(harga_satuan),
            diskon_pct,
            harga_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn line(no: i64, aksesoris: bool, dasar: f64, markup: f64, diskon: f64) -> RabInternalLine {
        RabInternalLine {
            line_id: format!("l{}", no),
            line_no: no,
            produk_id: None,
            nama_item: format!("Item {}", no),
            is_aksesoris: aksesoris,
            quantity: 2.0,
            harga_dasar: dasar,
            markup_pct: markup,
            diskon_pct: diskon,
            harga_jasa: None,
        }
    }

    fn submitted(lines: Vec<RabInternalLine>) -> RabInternal {
        let mut rab = RabInternal::new("ip1", now());
        rab.lines = lines;
        rab.is_submitted = true;
        rab
    }

    #[test]
    fn test_unsubmitted_source_rejected() {
        let mut rab = submitted(vec![line(1, false, 100.0, 20.0, 0.0)]);
        rab.is_submitted = false;
        let err = RabGenerator::generate(&rab, RabVariant::Kontrak, "admin", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::SourceNotLocked(crate::domain::Tahap::RabKontrak)));
    }

    #[test]
    fn test_kontrak_applies_markup_and_discount() {
        let rab = submitted(vec![line(1, false, 100.0, 20.0, 10.0)]);
        let set = RabGenerator::generate(&rab, RabVariant::Kontrak, "admin", now()).unwrap();

        assert_eq!(set.rows.len(), 1);
        assert_eq!(set.rows[0].harga_satuan, 125.0);
        // 125 * 2 * 0.9
        assert_eq!(set.rows[0].harga_total, 225.0);
    }

    #[test]
    fn test_vendor_uses_base_price_without_discount() {
        let rab = submitted(vec![line(1, false, 100.0, 20.0, 10.0), line(2, true, 15.5, 0.0, 0.0)]);
        let set = RabGenerator::generate(&rab, RabVariant::Vendor, "admin", now()).unwrap();

        assert_eq!(set.rows.len(), 2);
        assert_eq!(set.rows[0].harga_total, 200.0);
        assert_eq!(set.rows[0].diskon_pct, 0.0);
        assert_eq!(set.rows[1].harga_total, 31.0);
        assert_eq!(set.total(), 231.0);
    }

    #[test]
    fn test_jasa_excludes_aksesoris() {
        let mut with_jasa = line(3, false, 300.0, 10.0, 0.0);
        with_jasa.harga_jasa = Some(50.0);
        let rab = submitted(vec![
            line(1, false, 100.0, 20.0, 0.0),
            line(2, true, 40.0, 0.0, 0.0),
            with_jasa,
            line(4, true, 10.0, 0.0, 0.0),
        ]);
        let set = RabGenerator::generate(&rab, RabVariant::Jasa, "admin", now()).unwrap();

        assert_eq!(set.rows.len(), rab.lines.len() - rab.aksesoris_count());
        assert!(set.rows.iter().all(|r| !r.is_aksesoris));
        assert_eq!(set.rows[1].harga_satuan, 50.0);
        assert_eq!(set.rows[1].harga_total, 100.0);
    }

    #[test]
    fn test_regeneration_is_content_identical() {
        let rab = submitted(vec![line(2, false, 99.99, 33.0, 5.0), line(1, true, 10.0, 15.0, 0.0)]);
        let first = RabGenerator::generate(&rab, RabVariant::Kontrak, "admin", now()).unwrap();
        let second = RabGenerator::generate(&rab, RabVariant::Kontrak, "admin", now()).unwrap();

        let keys = |s: &RabVariantSet| s.rows.iter().map(|r| r.content_key()).collect::<Vec<_>>();
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first.rows[0].line_no, 1);
    }

    #[test]
    fn test_markup_out_of_range_rejected() {
        let rab = submitted(vec![line(1, false, 100.0, 100.0, 0.0)]);
        let err = RabGenerator::generate(&rab, RabVariant::Kontrak, "admin", now()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidInput(_)));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(2.344), 2.34);
    }
}
