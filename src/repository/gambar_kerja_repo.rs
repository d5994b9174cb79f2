// ==========================================
// 室内设计订单流程系统 - Gambar Kerja 数据仓储
// ==========================================
// 对齐: gambar_kerjas / gambar_kerja_files 表
// ==========================================

use crate::db::{format_ts, invalid_enum, parse_ts};
use crate::domain::gambar_kerja::GambarKerja;
use crate::domain::moodboard::DesignFile;
use crate::domain::types::GambarKerjaStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::moodboard_repo::load_files_tx;
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, GAMBAR_KERJAS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct GambarKerjaRepository;

impl GambarKerjaRepository {
    pub fn insert_tx(conn: &Connection, gk: &GambarKerja) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO gambar_kerjas (gambar_kerja_id, order_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                gk.gambar_kerja_id,
                gk.order_id,
                gk.status.as_str(),
                format_ts(&gk.created_at),
                format_ts(&gk.updated_at),
            ],
        )?;
        write_stage_response_tx(conn, GAMBAR_KERJAS, &gk.gambar_kerja_id, &gk.response)?;
        Ok(())
    }

    pub fn update_tx(conn: &Connection, gk: &GambarKerja) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE gambar_kerjas SET status = ?1, updated_at = ?2 WHERE gambar_kerja_id = ?3",
            params![gk.status.as_str(), format_ts(&gk.updated_at), gk.gambar_kerja_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "GambarKerja".to_string(),
                id: gk.gambar_kerja_id.clone(),
            });
        }
        write_stage_response_tx(conn, GAMBAR_KERJAS, &gk.gambar_kerja_id, &gk.response)?;
        Ok(())
    }

    pub fn insert_file_tx(
        conn: &Connection,
        gambar_kerja_id: &str,
        file: &DesignFile,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO gambar_kerja_files (
                file_id, gambar_kerja_id, file_path, original_name, uploaded_by, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                file.file_id,
                gambar_kerja_id,
                file.file_path,
                file.original_name,
                file.uploaded_by,
                format_ts(&file.uploaded_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_order_tx(conn: &Connection, order_id: &str) -> RepositoryResult<Option<GambarKerja>> {
        let sql = format!(
            "SELECT gambar_kerja_id, order_id, status, created_at, updated_at, {} \
             FROM gambar_kerjas WHERE order_id = ?1",
            STAGE_COLUMNS
        );
        let gk = conn
            .query_row(&sql, params![order_id], map_gambar_kerja_row)
            .optional()?;

        match gk {
            Some(mut gk) => {
                gk.files = load_files_tx(conn, "gambar_kerja_files", "gambar_kerja_id", &gk.gambar_kerja_id)?;
                Ok(Some(gk))
            }
            None => Ok(None),
        }
    }
}

fn map_gambar_kerja_row(row: &Row) -> rusqlite::Result<GambarKerja> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(GambarKerja {
        gambar_kerja_id: row.get(0)?,
        order_id: row.get(1)?,
        status: GambarKerjaStatus::parse(&status).ok_or_else(|| invalid_enum(2, &status))?,
        response: read_stage_response(row, 5)?,
        files: Vec::new(),
        created_at: parse_ts(3, &created_at)?,
        updated_at: parse_ts(4, &updated_at)?,
    })
}
