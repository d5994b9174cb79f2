// ==========================================
// 室内设计订单流程系统 - Desain Final 数据仓储
// ==========================================
// 对齐: desain_finals / desain_final_files 表
// ==========================================

use crate::db::{format_ts, invalid_enum, parse_ts};
use crate::domain::desain_final::DesainFinal;
use crate::domain::moodboard::DesignFile;
use crate::domain::types::MoodboardStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::moodboard_repo::load_files_tx;
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, DESAIN_FINALS, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct DesainFinalRepository;

impl DesainFinalRepository {
    pub fn insert_tx(conn: &Connection, df: &DesainFinal) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO desain_finals (
                desain_final_id, moodboard_id, status, selected_file, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                df.desain_final_id,
                df.moodboard_id,
                df.status.as_str(),
                df.selected_file,
                df.notes,
                format_ts(&df.created_at),
                format_ts(&df.updated_at),
            ],
        )?;
        write_stage_response_tx(conn, DESAIN_FINALS, &df.desain_final_id, &df.response)?;
        Ok(())
    }

    pub fn update_tx(conn: &Connection, df: &DesainFinal) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"
            UPDATE desain_finals
            SET status = ?1, selected_file = ?2, notes = ?3, updated_at = ?4
            WHERE desain_final_id = ?5
            "#,
            params![
                df.status.as_str(),
                df.selected_file,
                df.notes,
                format_ts(&df.updated_at),
                df.desain_final_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "DesainFinal".to_string(),
                id: df.desain_final_id.clone(),
            });
        }
        write_stage_response_tx(conn, DESAIN_FINALS, &df.desain_final_id, &df.response)?;
        Ok(())
    }

    pub fn insert_file_tx(
        conn: &Connection,
        desain_final_id: &str,
        file: &DesignFile,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO desain_final_files (
                file_id, desain_final_id, file_path, original_name, uploaded_by, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                file.file_id,
                desain_final_id,
                file.file_path,
                file.original_name,
                file.uploaded_by,
                format_ts(&file.uploaded_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_moodboard_tx(
        conn: &Connection,
        moodboard_id: &str,
    ) -> RepositoryResult<Option<DesainFinal>> {
        let sql = format!(
            "SELECT desain_final_id, moodboard_id, status, selected_file, notes, \
             created_at, updated_at, {} FROM desain_finals WHERE moodboard_id = ?1",
            STAGE_COLUMNS
        );
        let found = conn
            .query_row(&sql, params![moodboard_id], map_desain_final_row)
            .optional()?;

        match found {
            Some(mut df) => {
                df.files = load_files_tx(conn, "desain_final_files", "desain_final_id", &df.desain_final_id)?;
                Ok(Some(df))
            }
            None => Ok(None),
        }
    }
}

fn map_desain_final_row(row: &Row) -> rusqlite::Result<DesainFinal> {
    let status: String = row.get(2)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(DesainFinal {
        desain_final_id: row.get(0)?,
        moodboard_id: row.get(1)?,
        status: MoodboardStatus::parse(&status).ok_or_else(|| invalid_enum(2, &status))?,
        selected_file: row.get(3)?,
        notes: row.get(4)?,
        response: read_stage_response(row, 7)?,
        files: Vec::new(),
        created_at: parse_ts(5, &created_at)?,
        updated_at: parse_ts(6, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::moodboard::Moodboard;
    use crate::domain::stage::Actor;
    use crate::domain::types::Tahap;
    use crate::repository::moodboard_repo::MoodboardRepository;
    use crate::repository::test_support::{seed_order, setup_test_db, ts};

    #[test]
    fn test_desain_final_round_trip_with_selection() {
        let conn = setup_test_db();
        let guard = conn.lock().unwrap();
        let order_id = seed_order(&guard);
        let mb = Moodboard::new(&order_id, ts(2024, 3, 1));
        MoodboardRepository::insert_tx(&guard, &mb).unwrap();

        let mut df = DesainFinal::new(&mb.moodboard_id, ts(2024, 3, 2));
        DesainFinalRepository::insert_tx(&guard, &df).unwrap();
        assert!(DesainFinalRepository::insert_tx(&guard, &DesainFinal::new(&mb.moodboard_id, ts(2024, 3, 2)))
            .is_err());

        let file = DesignFile::new("final/render.pdf", "render.pdf", "desainer", ts(2024, 3, 3));
        DesainFinalRepository::insert_file_tx(&guard, &df.desain_final_id, &file).unwrap();
        df.response
            .respond(Tahap::DesainFinal, &Actor::new("desainer"), ts(2024, 3, 2))
            .unwrap();
        df.response
            .approve(Tahap::DesainFinal, &Actor::new("klien"), ts(2024, 3, 4))
            .unwrap();
        df.status = MoodboardStatus::Approved;
        df.selected_file = Some(file.file_id.clone());
        DesainFinalRepository::update_tx(&guard, &df).unwrap();

        let found = DesainFinalRepository::find_by_moodboard_tx(&guard, &mb.moodboard_id)
            .unwrap()
            .unwrap();
        assert!(found.is_accepted());
        assert_eq!(found.selected_file.as_deref(), Some(file.file_id.as_str()));
        assert_eq!(found.response.approved_by.as_deref(), Some("klien"));
        assert_eq!(found.files, vec![file]);
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let conn = setup_test_db();
        let guard = conn.lock().unwrap();
        let err = DesainFinalRepository::update_tx(&guard, &DesainFinal::new("mb-x", ts(2024, 3, 1)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }
}
