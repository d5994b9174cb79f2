// ==========================================
// 室内设计订单流程系统 - Kontrak 数据仓储
// ==========================================
// 对齐: kontraks 表 (item_pekerjaan_id UNIQUE)
// ==========================================

use crate::db::{format_ts, parse_ts};
use crate::domain::kontrak::Kontrak;
use crate::repository::error::RepositoryResult;
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, KONTRAKS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct KontrakRepository;

impl KontrakRepository {
    pub fn insert_tx(conn: &Connection, kontrak: &Kontrak) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO kontraks (
                kontrak_id, order_id, item_pekerjaan_id, durasi_kontrak, harga_kontrak,
                termin_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                kontrak.kontrak_id,
                kontrak.order_id,
                kontrak.item_pekerjaan_id,
                kontrak.durasi_kontrak,
                kontrak.harga_kontrak,
                kontrak.termin_count,
                format_ts(&kontrak.created_at),
            ],
        )?;
        write_stage_response_tx(conn, KONTRAKS, &kontrak.kontrak_id, &kontrak.response)?;
        Ok(())
    }

    pub fn find_by_item_pekerjaan_tx(
        conn: &Connection,
        item_pekerjaan_id: &str,
    ) -> RepositoryResult<Option<Kontrak>> {
        let sql = format!(
            "SELECT kontrak_id, order_id, item_pekerjaan_id, durasi_kontrak, harga_kontrak, \
             termin_count, created_at, {} FROM kontraks WHERE item_pekerjaan_id = ?1",
            STAGE_COLUMNS
        );
        let kontrak = conn
            .query_row(&sql, params![item_pekerjaan_id], map_kontrak_row)
            .optional()?;
        Ok(kontrak)
    }
}

fn map_kontrak_row(row: &Row) -> rusqlite::Result<Kontrak> {
    let created_at: String = row.get(6)?;
    Ok(Kontrak {
        kontrak_id: row.get(0)?,
        order_id: row.get(1)?,
        item_pekerjaan_id: row.get(2)?,
        durasi_kontrak: row.get(3)?,
        harga_kontrak: row.get(4)?,
        termin_count: row.get(5)?,
        response: read_stage_response(row, 7)?,
        created_at: parse_ts(6, &created_at)?,
    })
}
