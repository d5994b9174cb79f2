// ==========================================
// 室内设计订单流程系统 - 工作计划导出
// ==========================================
// 职责: 把 Item Pekerjaan 的产品工作计划整理为表格行
// 格式: 3 行表头信息 + 列标题 + 按房间归组的产品行
// 日期: dd/mm/yyyy; 同一房间的后续行房间名留空
// ==========================================

use crate::domain::item_pekerjaan::{ItemPekerjaanDetail, Produk};
use crate::domain::order::Order;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

const EXPORT_DATE_FORMAT: &str = "%d/%m/%Y";

pub const COLUMN_HEADER: [&str; 4] = ["Ruangan", "Produk", "Mulai", "Selesai"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkplanExport {
    pub rows: Vec<Vec<String>>,
}

impl WorkplanExport {
    /// 构建导出行
    ///
    /// 房间顺序取产品首次出现顺序, 房间内保持产品排序
    pub fn build(order: &Order, detail: &ItemPekerjaanDetail) -> Self {
        let mut rows = vec![
            vec!["Project".to_string(), order.nama_project.clone()],
            vec!["Company".to_string(), order.company_name.clone()],
            vec!["Customer".to_string(), order.customer_name.clone()],
            COLUMN_HEADER.iter().map(|s| s.to_string()).collect(),
        ];

        for (ruangan, produks) in group_by_room(&detail.produks) {
            for (idx, produk) in produks.iter().enumerate() {
                let label = if idx == 0 { ruangan.to_string() } else { String::new() };
                rows.push(vec![
                    label,
                    produk.nama_produk.clone(),
                    fmt_date(produk.workplan_start()),
                    fmt_date(produk.workplan_end()),
                ]);
            }
        }

        Self { rows }
    }

    /// 产品行 (不含表头)
    pub fn body(&self) -> &[Vec<String>] {
        self.rows.get(4..).unwrap_or(&[])
    }

    /// 写出为 CSV
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| {
            csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

fn group_by_room(produks: &[Produk]) -> Vec<(&str, Vec<&Produk>)> {
    let mut groups: Vec<(&str, Vec<&Produk>)> = Vec::new();
    for produk in produks {
        match groups.iter_mut().find(|(room, _)| *room == produk.nama_ruangan) {
            Some((_, list)) => list.push(produk),
            None => groups.push((produk.nama_ruangan.as_str(), vec![produk])),
        }
    }
    groups
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(EXPORT_DATE_FORMAT).to_string())
        .unwrap_or_default()
}
