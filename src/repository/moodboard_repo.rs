// ==========================================
// 室内设计订单流程系统 - Moodboard 数据仓储
// ==========================================
// 对齐: moodboards / moodboard_files 表
// ==========================================

use crate::db::{format_ts, invalid_enum, parse_ts};
use crate::domain::moodboard::{DesignFile, Moodboard};
use crate::domain::types::MoodboardStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, MOODBOARDS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

pub struct MoodboardRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MoodboardRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Option<Moodboard>> {
        let conn = self.get_conn()?;
        Self::find_by_order_tx(&conn, order_id)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn insert_tx(conn: &Connection, moodboard: &Moodboard) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO moodboards (
                moodboard_id, order_id, status, accepted, selected_file, notes,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                moodboard.moodboard_id,
                moodboard.order_id,
                moodboard.status.as_str(),
                moodboard.accepted,
                moodboard.selected_file,
                moodboard.notes,
                format_ts(&moodboard.created_at),
                format_ts(&moodboard.updated_at),
            ],
        )?;
        write_stage_response_tx(conn, MOODBOARDS, &moodboard.moodboard_id, &moodboard.response)?;
        Ok(())
    }

    /// 覆盖写入可变字段 (文件列表单独维护)
    pub fn update_tx(conn: &Connection, moodboard: &Moodboard) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"
            UPDATE moodboards
            SET status = ?1, accepted = ?2, selected_file = ?3, notes = ?4, updated_at = ?5
            WHERE moodboard_id = ?6
            "#,
            params![
                moodboard.status.as_str(),
                moodboard.accepted,
                moodboard.selected_file,
                moodboard.notes,
                format_ts(&moodboard.updated_at),
                moodboard.moodboard_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Moodboard".to_string(),
                id: moodboard.moodboard_id.clone(),
            });
        }
        write_stage_response_tx(conn, MOODBOARDS, &moodboard.moodboard_id, &moodboard.response)?;
        Ok(())
    }

    pub fn insert_file_tx(
        conn: &Connection,
        moodboard_id: &str,
        file: &DesignFile,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO moodboard_files (
                file_id, moodboard_id, file_path, original_name, uploaded_by, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                file.file_id,
                moodboard_id,
                file.file_path,
                file.original_name,
                file.uploaded_by,
                format_ts(&file.uploaded_at),
            ],
        )?;
        Ok(())
    }

    /// 按订单读取 (含文件列表)
    pub fn find_by_order_tx(conn: &Connection, order_id: &str) -> RepositoryResult<Option<Moodboard>> {
        let sql = format!(
            "SELECT moodboard_id, order_id, status, accepted, selected_file, notes, \
             created_at, updated_at, {} FROM moodboards WHERE order_id = ?1",
            STAGE_COLUMNS
        );
        let moodboard = conn
            .query_row(&sql, params![order_id], map_moodboard_row)
            .optional()?;

        match moodboard {
            Some(mut mb) => {
                mb.files = load_files_tx(conn, "moodboard_files", "moodboard_id", &mb.moodboard_id)?;
                Ok(Some(mb))
            }
            None => Ok(None),
        }
    }
}

fn map_moodboard_row(row: &Row) -> rusqlite::Result<Moodboard> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Moodboard {
        moodboard_id: row.get(0)?,
        order_id: row.get(1)?,
        status: MoodboardStatus::parse(&status).ok_or_else(|| invalid_enum(2, &status))?,
        accepted: row.get(3)?,
        selected_file: row.get(4)?,
        notes: row.get(5)?,
        response: read_stage_response(row, 8)?,
        files: Vec::new(),
        created_at: parse_ts(6, &created_at)?,
        updated_at: parse_ts(7, &updated_at)?,
    })
}

/// 读取附件列表 (Moodboard / Desain Final / Gambar Kerja 共用)
pub(crate) fn load_files_tx(
    conn: &Connection,
    table: &'static str,
    parent_column: &'static str,
    parent_id: &str,
) -> RepositoryResult<Vec<DesignFile>> {
    let sql = format!(
        "SELECT file_id, file_path, original_name, uploaded_by, uploaded_at \
         FROM {} WHERE {} = ?1 ORDER BY uploaded_at, rowid",
        table, parent_column
    );
    let mut stmt = conn.prepare(&sql)?;
    let files = stmt
        .query_map(params![parent_id], |row| {
            let uploaded_at: String = row.get(4)?;
            Ok(DesignFile {
                file_id: row.get(0)?,
                file_path: row.get(1)?,
                original_name: row.get(2)?,
                uploaded_by: row.get(3)?,
                uploaded_at: parse_ts(4, &uploaded_at)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(files)
}
