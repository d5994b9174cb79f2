// ==========================================
// 室内设计订单流程系统 - RAB 数据仓储
// ==========================================
// 对齐: rab_internals / rab_internal_lines / rab_variants / rab_variant_rows 表
// 红线: 派生版本整组替换 (先删后插, 同一事务)
// ==========================================

use crate::db::{format_opt_ts, format_ts, parse_opt_ts, parse_ts};
use crate::domain::rab::{RabInternal, RabInternalLine, RabVariantRow, RabVariantSet};
use crate::domain::types::RabVariant;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, RAB_INTERNALS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct RabRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RabRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_variant(
        &self,
        item_pekerjaan_id: &str,
        variant: RabVariant,
    ) -> RepositoryResult<Option<RabVariantSet>> {
        let conn = self.get_conn()?;
        Self::find_variant_tx(&conn, item_pekerjaan_id, variant)
    }

    pub fn count_variant_rows(&self, item_pekerjaan_id: &str, variant: RabVariant) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM rab_variant_rows WHERE item_pekerjaan_id = ?1 AND variant = ?2",
            params![item_pekerjaan_id, variant.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // RabInternal
    // ==========================================

    pub fn insert_internal_tx(conn: &Connection, rab: &RabInternal) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO rab_internals (
                rab_internal_id, item_pekerjaan_id, is_submitted, submitted_at, submitted_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                rab.rab_internal_id,
                rab.item_pekerjaan_id,
                rab.is_submitted,
                format_opt_ts(&rab.submitted_at),
                rab.submitted_by,
                format_ts(&rab.created_at),
                format_ts(&rab.updated_at),
            ],
        )?;
        write_stage_response_tx(conn, RAB_INTERNALS, &rab.rab_internal_id, &rab.response)?;
        Ok(())
    }

    /// 更新头部字段 (行由 replace_lines_tx 维护)
    pub fn update_internal_tx(conn: &Connection, rab: &RabInternal) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE rab_internals
            SET is_submitted = ?1, submitted_at = ?2, submitted_by = ?3, updated_at = ?4
            WHERE rab_internal_id = ?5
            "#,
            params![
                rab.is_submitted,
                format_opt_ts(&rab.submitted_at),
                rab.submitted_by,
                format_ts(&rab.updated_at),
                rab.rab_internal_id,
            ],
        )?;
        write_stage_response_tx(conn, RAB_INTERNALS, &rab.rab_internal_id, &rab.response)?;
        Ok(())
    }

    pub fn replace_lines_tx(
        conn: &Connection,
        rab_internal_id: &str,
        lines: &[RabInternalLine],
    ) -> RepositoryResult<usize> {
        conn.execute(
            "DELETE FROM rab_internal_lines WHERE rab_internal_id = ?1",
            params![rab_internal_id],
        )?;
        let mut stmt = conn.prepare(
            r#"
            INSERT INTO rab_internal_lines (
                line_id, rab_internal_id, line_no, produk_id, nama_item, is_aksesoris,
                quantity, harga_dasar, markup_pct, diskon_pct, harga_jasa
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )?;
        for line in lines {
            stmt.execute(params![
                line.line_id,
                rab_internal_id,
                line.line_no,
                line.produk_id,
                line.nama_item,
                line.is_aksesoris,
                line.quantity,
                line.harga_dasar,
                line.markup_pct,
                line.diskon_pct,
                line.harga_jasa,
            ])?;
        }
        Ok(lines.len())
    }

    /// 按工作项读取 RAB Internal (含行)
    pub fn find_internal_tx(
        conn: &Connection,
        item_pekerjaan_id: &str,
    ) -> RepositoryResult<Option<RabInternal>> {
        let sql = format!(
            "SELECT rab_internal_id, item_pekerjaan_id, is_submitted, submitted_at, submitted_by, \
             created_at, updated_at, {} FROM rab_internals WHERE item_pekerjaan_id = ?1",
            STAGE_COLUMNS
        );
        let rab = conn
            .query_row(&sql, params![item_pekerjaan_id], map_internal_row)
            .optional()?;

        match rab {
            Some(mut rab) => {
                rab.lines = Self::list_lines_tx(conn, &rab.rab_internal_id)?;
                Ok(Some(rab))
            }
            None => Ok(None),
        }
    }

    fn list_lines_tx(conn: &Connection, rab_internal_id: &str) -> RepositoryResult<Vec<RabInternalLine>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT line_id, line_no, produk_id, nama_item, is_aksesoris,
                   quantity, harga_dasar, markup_pct, diskon_pct, harga_jasa
            FROM rab_internal_lines
            WHERE rab_internal_id = ?1
            ORDER BY line_no
            "#,
        )?;
        let lines = stmt
            .query_map(params![rab_internal_id], |row| {
                Ok(RabInternalLine {
                    line_id: row.get(0)?,
                    line_no: row.get(1)?,
                    produk_id: row.get(2)?,
                    nama_item: row.get(3)?,
                    is_aksesoris: row.get(4)?,
                    quantity: row.get(5)?,
                    harga_dasar: row.get(6)?,
                    markup_pct: row.get(7)?,
                    diskon_pct: row.get(8)?,
                    harga_jasa: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lines)
    }

    // ==========================================
    // 派生版本
    // ==========================================

    /// 整组替换: 先删头部与全部行, 再插入
    pub fn replace_variant_tx(conn: &Connection, set: &RabVariantSet) -> RepositoryResult<usize> {
        conn.execute(
            "DELETE FROM rab_variants WHERE item_pekerjaan_id = ?1 AND variant = ?2",
            params![set.item_pekerjaan_id, set.variant.as_str()],
        )?;
        conn.execute(
            "DELETE FROM rab_variant_rows WHERE item_pekerjaan_id = ?1 AND variant = ?2",
            params![set.item_pekerjaan_id, set.variant.as_str()],
        )?;

        conn.execute(
            r#"
            INSERT INTO rab_variants (item_pekerjaan_id, variant, rab_internal_id, generated_at, generated_by)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                set.item_pekerjaan_id,
                set.variant.as_str(),
                set.rab_internal_id,
                format_ts(&set.generated_at),
                set.generated_by,
            ],
        )?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO rab_variant_rows (
                row_id, item_pekerjaan_id, variant, line_no, nama_item, is_aksesoris,
                quantity, harga_satuan, diskon_pct, harga_total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )?;
        for row in &set.rows {
            stmt.execute(params![
                row.row_id,
                set.item_pekerjaan_id,
                set.variant.as_str(),
                row.line_no,
                row.nama_item,
                row.is_aksesoris,
                row.quantity,
                row.harga_satuan,
                row.diskon_pct,
                row.harga_total,
            ])?;
        }
        Ok(set.rows.len())
    }

    /// 删除该工作项的全部派生版本 (头部与行), 返回删除的版本数
    pub fn delete_variants_tx(conn: &Connection, item_pekerjaan_id: &str) -> RepositoryResult<usize> {
        conn.execute(
            "DELETE FROM rab_variant_rows WHERE item_pekerjaan_id = ?1",
            params![item_pekerjaan_id],
        )?;
        let removed = conn.execute(
            "DELETE FROM rab_variants WHERE item_pekerjaan_id = ?1",
            params![item_pekerjaan_id],
        )?;
        Ok(removed)
    }

    pub fn find_variant_tx(
        conn: &Connection,
        item_pekerjaan_id: &str,
        variant: RabVariant,
    ) -> RepositoryResult<Option<RabVariantSet>> {
        let header = conn
            .query_row(
                r#"
                SELECT rab_internal_id, generated_at, generated_by
                FROM rab_variants
                WHERE item_pekerjaan_id = ?1 AND variant = ?2
                "#,
                params![item_pekerjaan_id, variant.as_str()],
                |row| {
                    let generated_at: String = row.get(1)?;
                    Ok((row.get::<_, String>(0)?, parse_ts(1, &generated_at)?, row.get::<_, String>(2)?))
                },
            )
            .optional()?;

        let (rab_internal_id, generated_at, generated_by) = match header {
            Some(h) => h,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT row_id, line_no, nama_item, is_aksesoris, quantity, harga_satuan, diskon_pct, harga_total
            FROM rab_variant_rows
            WHERE item_pekerjaan_id = ?1 AND variant = ?2
            ORDER BY line_no
            "#,
        )?;
        let rows = stmt
            .query_map(params![item_pekerjaan_id, variant.as_str()], |row| {
                Ok(RabVariantRow {
                    row_id: row.get(0)?,
                    line_no: row.get(1)?,
                    nama_item: row.get(2)?,
                    is_aksesoris: row.get(3)?,
                    quantity: row.get(4)?,
                    harga_satuan: row.get(5)?,
                    diskon_pct: row.get(6)?,
                    harga_total: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(RabVariantSet {
            item_pekerjaan_id: item_pekerjaan_id.to_string(),
            variant,
            rab_internal_id,
            generated_at,
            generated_by,
            rows,
        }))
    }

    /// 读取已生成的全部版本 (按 Kontrak / Vendor / Jasa 顺序)
    pub fn list_variants_tx(conn: &Connection, item_pekerjaan_id: &str) -> RepositoryResult<Vec<RabVariantSet>> {
        let mut sets = Vec::new();
        for variant in RabVariant::ALL {
            if let Some(set) = Self::find_variant_tx(conn, item_pekerjaan_id, variant)? {
                sets.push(set);
            }
        }
        Ok(sets)
    }
}

fn map_internal_row(row: &Row) -> rusqlite::Result<RabInternal> {
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(RabInternal {
        rab_internal_id: row.get(0)?,
        item_pekerjaan_id: row.get(1)?,
        is_submitted: row.get(2)?,
        submitted_at: parse_opt_ts(3, row.get(3)?)?,
        submitted_by: row.get(4)?,
        response: read_stage_response(row, 7)?,
        lines: Vec::new(),
        created_at: parse_ts(5, &created_at)?,
        updated_at: parse_ts(6, &updated_at)?,
    })
}
