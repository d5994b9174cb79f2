// ==========================================
// 室内设计订单流程系统 - Estimasi 数据仓储
// ==========================================
// 对齐: estimasis 表
// 唯一访问路径: moodboard_id (订单侧通过 Moodboard 推导)
// ==========================================

use crate::db::{format_ts, parse_ts};
use crate::domain::estimasi::Estimasi;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, ESTIMASIS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct EstimasiRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EstimasiRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 订单 -> Moodboard -> Estimasi
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Option<Estimasi>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT e.estimasi_id, e.moodboard_id, e.estimated_cost, e.created_at, {} \
             FROM estimasis e JOIN moodboards m ON m.moodboard_id = e.moodboard_id \
             WHERE m.order_id = ?1",
            prefixed_stage_columns("e")
        );
        let estimasi = conn
            .query_row(&sql, params![order_id], map_estimasi_row)
            .optional()?;
        Ok(estimasi)
    }

    pub fn insert_tx(conn: &Connection, estimasi: &Estimasi) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO estimasis (estimasi_id, moodboard_id, estimated_cost, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                estimasi.estimasi_id,
                estimasi.moodboard_id,
                estimasi.estimated_cost,
                format_ts(&estimasi.created_at),
            ],
        )?;
        write_stage_response_tx(conn, ESTIMASIS, &estimasi.estimasi_id, &estimasi.response)?;
        Ok(())
    }

    pub fn update_tx(conn: &Connection, estimasi: &Estimasi) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE estimasis SET estimated_cost = ?1 WHERE estimasi_id = ?2",
            params![estimasi.estimated_cost, estimasi.estimasi_id],
        )?;
        write_stage_response_tx(conn, ESTIMASIS, &estimasi.estimasi_id, &estimasi.response)?;
        Ok(())
    }

    pub fn find_by_moodboard_tx(
        conn: &Connection,
        moodboard_id: &str,
    ) -> RepositoryResult<Option<Estimasi>> {
        let sql = format!(
            "SELECT estimasi_id, moodboard_id, estimated_cost, created_at, {} \
             FROM estimasis WHERE moodboard_id = ?1",
            STAGE_COLUMNS
        );
        let estimasi = conn
            .query_row(&sql, params![moodboard_id], map_estimasi_row)
            .optional()?;
        Ok(estimasi)
    }
}

fn prefixed_stage_columns(alias: &str) -> String {
    STAGE_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn map_estimasi_row(row: &Row) -> rusqlite::Result<Estimasi> {
    let created_at: String = row.get(3)?;
    Ok(Estimasi {
        estimasi_id: row.get(0)?,
        moodboard_id: row.get(1)?,
        estimated_cost: row.get(2)?,
        response: read_stage_response(row, 4)?,
        created_at: parse_ts(3, &created_at)?,
    })
}
