// ==========================================
// 室内设计订单流程系统 - Item Pekerjaan 数据仓储
// ==========================================
// 对齐: item_pekerjaans / item_pekerjaan_produks / workplan_items / invoices 表
// ==========================================

use crate::db::{format_date, format_opt_ts, format_ts, invalid_enum, parse_opt_date, parse_opt_ts, parse_ts};
use crate::domain::item_pekerjaan::{Invoice, ItemPekerjaan, ItemPekerjaanDetail, Produk, WorkplanItem};
use crate::domain::types::ItemPekerjaanStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, ITEM_PEKERJAANS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct ItemPekerjaanRepository;

impl ItemPekerjaanRepository {
    // ==========================================
    // ItemPekerjaan
    // ==========================================

    pub fn insert_tx(conn: &Connection, item: &ItemPekerjaan) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO item_pekerjaans (item_pekerjaan_id, moodboard_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                item.item_pekerjaan_id,
                item.moodboard_id,
                item.status.as_str(),
                format_ts(&item.created_at),
                format_ts(&item.updated_at),
            ],
        )?;
        write_stage_response_tx(conn, ITEM_PEKERJAANS, &item.item_pekerjaan_id, &item.response)?;
        Ok(())
    }

    pub fn update_tx(conn: &Connection, item: &ItemPekerjaan) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE item_pekerjaans SET status = ?1, updated_at = ?2 WHERE item_pekerjaan_id = ?3",
            params![item.status.as_str(), format_ts(&item.updated_at), item.item_pekerjaan_id],
        )?;
        write_stage_response_tx(conn, ITEM_PEKERJAANS, &item.item_pekerjaan_id, &item.response)?;
        Ok(())
    }

    pub fn find_by_moodboard_tx(
        conn: &Connection,
        moodboard_id: &str,
    ) -> RepositoryResult<Option<ItemPekerjaan>> {
        let sql = format!(
            "SELECT item_pekerjaan_id, moodboard_id, status, created_at, updated_at, {} \
             FROM item_pekerjaans WHERE moodboard_id = ?1",
            STAGE_COLUMNS
        );
        let item = conn
            .query_row(&sql, params![moodboard_id], map_item_row)
            .optional()?;
        Ok(item)
    }

    /// 读取完整工作项 (产品 + 工作计划 + 发票)
    pub fn find_detail_by_moodboard_tx(
        conn: &Connection,
        moodboard_id: &str,
    ) -> RepositoryResult<Option<ItemPekerjaanDetail>> {
        let item = match Self::find_by_moodboard_tx(conn, moodboard_id)? {
            Some(item) => item,
            None => return Ok(None),
        };
        let mut produks = Self::list_produks_tx(conn, &item.item_pekerjaan_id)?;
        for produk in produks.iter_mut() {
            produk.workplan_items = Self::list_workplan_tx(conn, &produk.produk_id)?;
        }
        let invoices = Self::list_invoices_tx(conn, &item.item_pekerjaan_id)?;
        Ok(Some(ItemPekerjaanDetail { item, produks, invoices }))
    }

    // ==========================================
    // Produk
    // ==========================================

    pub fn insert_produk_tx(conn: &Connection, produk: &Produk) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO item_pekerjaan_produks (
                produk_id, item_pekerjaan_id, nama_produk, nama_ruangan, quantity,
                panjang, lebar, tinggi, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                produk.produk_id,
                produk.item_pekerjaan_id,
                produk.nama_produk,
                produk.nama_ruangan,
                produk.quantity,
                produk.panjang,
                produk.lebar,
                produk.tinggi,
                produk.sort_order,
            ],
        )?;
        Ok(())
    }

    pub fn next_produk_sort_order_tx(conn: &Connection, item_pekerjaan_id: &str) -> RepositoryResult<i64> {
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM item_pekerjaan_produks WHERE item_pekerjaan_id = ?1",
            params![item_pekerjaan_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    pub fn list_produks_tx(conn: &Connection, item_pekerjaan_id: &str) -> RepositoryResult<Vec<Produk>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT produk_id, item_pekerjaan_id, nama_produk, nama_ruangan, quantity,
                   panjang, lebar, tinggi, sort_order
            FROM item_pekerjaan_produks
            WHERE item_pekerjaan_id = ?1
            ORDER BY sort_order, produk_id
            "#,
        )?;
        let produks = stmt
            .query_map(params![item_pekerjaan_id], |row| {
                Ok(Produk {
                    produk_id: row.get(0)?,
                    item_pekerjaan_id: row.get(1)?,
                    nama_produk: row.get(2)?,
                    nama_ruangan: row.get(3)?,
                    quantity: row.get(4)?,
                    panjang: row.get(5)?,
                    lebar: row.get(6)?,
                    tinggi: row.get(7)?,
                    sort_order: row.get(8)?,
                    workplan_items: Vec::new(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(produks)
    }

    // ==========================================
    // WorkplanItem
    // ==========================================

    /// 整组替换某产品的工作计划
    pub fn replace_workplan_tx(
        conn: &Connection,
        produk_id: &str,
        items: &[WorkplanItem],
    ) -> RepositoryResult<usize> {
        conn.execute("DELETE FROM workplan_items WHERE produk_id = ?1", params![produk_id])?;
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO workplan_items (
                workplan_item_id, produk_id, nama_tahapan, start_date, end_date, status, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;
        for item in items {
            stmt.execute(params![
                item.workplan_item_id,
                produk_id,
                item.nama_tahapan,
                item.start_date.as_ref().map(format_date),
                item.end_date.as_ref().map(format_date),
                item.status,
                item.sort_order,
            ])?;
        }
        Ok(items.len())
    }

    pub fn list_workplan_tx(conn: &Connection, produk_id: &str) -> RepositoryResult<Vec<WorkplanItem>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT workplan_item_id, produk_id, nama_tahapan, start_date, end_date, status, sort_order
            FROM workplan_items
            WHERE produk_id = ?1
            ORDER BY sort_order, workplan_item_id
            "#,
        )?;
        let items = stmt
            .query_map(params![produk_id], |row| {
                Ok(WorkplanItem {
                    workplan_item_id: row.get(0)?,
                    produk_id: row.get(1)?,
                    nama_tahapan: row.get(2)?,
                    start_date: parse_opt_date(3, row.get(3)?)?,
                    end_date: parse_opt_date(4, row.get(4)?)?,
                    status: row.get(5)?,
                    sort_order: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    // ==========================================
    // Invoice
    // ==========================================

    pub fn insert_invoice_tx(conn: &Connection, invoice: &Invoice) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO invoices (
                invoice_id, item_pekerjaan_id, termin_step, amount, paid_at, payment_proof, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                invoice.invoice_id,
                invoice.item_pekerjaan_id,
                invoice.termin_step,
                invoice.amount,
                format_opt_ts(&invoice.paid_at),
                invoice.payment_proof,
                format_ts(&invoice.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_invoice_payment_tx(conn: &Connection, invoice: &Invoice) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE invoices SET paid_at = ?1, payment_proof = ?2 WHERE invoice_id = ?3",
            params![format_opt_ts(&invoice.paid_at), invoice.payment_proof, invoice.invoice_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Invoice".to_string(),
                id: invoice.invoice_id.clone(),
            });
        }
        Ok(())
    }

    pub fn list_invoices_tx(conn: &Connection, item_pekerjaan_id: &str) -> RepositoryResult<Vec<Invoice>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT invoice_id, item_pekerjaan_id, termin_step, amount, paid_at, payment_proof, created_at
            FROM invoices
            WHERE item_pekerjaan_id = ?1
            ORDER BY termin_step
            "#,
        )?;
        let invoices = stmt
            .query_map(params![item_pekerjaan_id], |row| {
                let created_at: String = row.get(6)?;
                Ok(Invoice {
                    invoice_id: row.get(0)?,
                    item_pekerjaan_id: row.get(1)?,
                    termin_step: row.get(2)?,
                    amount: row.get(3)?,
                    paid_at: parse_opt_ts(4, row.get(4)?)?,
                    payment_proof: row.get(5)?,
                    created_at: parse_ts(6, &created_at)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(invoices)
    }
}

fn map_item_row(row: &Row) -> rusqlite::Result<ItemPekerjaan> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(ItemPekerjaan {
        item_pekerjaan_id: row.get(0)?,
        moodboard_id: row.get(1)?,
        status: ItemPekerjaanStatus::parse(&status).ok_or_else(|| invalid_enum(2, &status))?,
        response: read_stage_response(row, 5)?,
        created_at: parse_ts(3, &created_at)?,
        updated_at: parse_ts(4, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::moodboard::Moodboard;
    use crate::repository::moodboard_repo::MoodboardRepository;
    use crate::repository::test_support::{date, seed_order, setup_test_db, ts};

    #[test]
    fn test_detail_loads_produks_workplan_and_invoices() {
        let conn = setup_test_db();
        let guard = conn.lock().unwrap();
        let order_id = seed_order(&guard);
        let mb = Moodboard::new(&order_id, ts(2024, 1, 1));
        MoodboardRepository::insert_tx(&guard, &mb).unwrap();

        let item = ItemPekerjaan::new(&mb.moodboard_id, ts(2024, 1, 2));
        ItemPekerjaanRepository::insert_tx(&guard, &item).unwrap();

        let sort_order = ItemPekerjaanRepository::next_produk_sort_order_tx(&guard, &item.item_pekerjaan_id).unwrap();
        assert_eq!(sort_order, 0);
        let produk = Produk {
            produk_id: "p1".to_string(),
            item_pekerjaan_id: item.item_pekerjaan_id.clone(),
            nama_produk: "Lemari".to_string(),
            nama_ruangan: "Kamar".to_string(),
            quantity: 2,
            panjang: Some(120.0),
            lebar: None,
            tinggi: None,
            sort_order,
            workplan_items: Vec::new(),
        };
        ItemPekerjaanRepository::insert_produk_tx(&guard, &produk).unwrap();
        let wp = WorkplanItem {
            workplan_item_id: "w1".to_string(),
            produk_id: "p1".to_string(),
            nama_tahapan: "Produksi".to_string(),
            start_date: Some(date(2024, 1, 3)),
            end_date: Some(date(2024, 1, 9)),
            status: "not_started".to_string(),
            sort_order: 0,
        };
        ItemPekerjaanRepository::replace_workplan_tx(&guard, "p1", &[wp.clone()]).unwrap();
        ItemPekerjaanRepository::insert_invoice_tx(
            &guard,
            &Invoice {
                invoice_id: "inv1".to_string(),
                item_pekerjaan_id: item.item_pekerjaan_id.clone(),
                termin_step: 1,
                amount: 5_000_000.0,
                paid_at: Some(ts(2024, 1, 4)),
                payment_proof: None,
                created_at: ts(2024, 1, 3),
            },
        )
        .unwrap();

        let detail = ItemPekerjaanRepository::find_detail_by_moodboard_tx(&guard, &mb.moodboard_id)
            .unwrap()
            .unwrap();
        assert_eq!(detail.produks.len(), 1);
        assert_eq!(detail.produks[0].workplan_items, vec![wp]);
        assert!(detail.has_paid_termin());
        assert_eq!(
            ItemPekerjaanRepository::next_produk_sort_order_tx(&guard, &item.item_pekerjaan_id).unwrap(),
            1
        );
    }
}
