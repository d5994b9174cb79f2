// ==========================================
// 室内设计订单流程系统 - Commitment Fee 数据仓储
// ==========================================
// 对齐: commitment_fees 表
// ==========================================

use crate::db::{format_ts, invalid_enum, parse_ts};
use crate::domain::commitment_fee::CommitmentFee;
use crate::domain::types::PaymentStatus;
use crate::repository::error::RepositoryResult;
use crate::repository::stage_columns::{
    read_stage_response, write_stage_response_tx, COMMITMENT_FEES, STAGE_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct CommitmentFeeRepository;

impl CommitmentFeeRepository {
    pub fn insert_tx(conn: &Connection, fee: &CommitmentFee) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO commitment_fees (
                commitment_fee_id, moodboard_id, total_fee, payment_status, payment_proof,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                fee.commitment_fee_id,
                fee.moodboard_id,
                fee.total_fee,
                fee.payment_status.as_str(),
                fee.payment_proof,
                format_ts(&fee.created_at),
                format_ts(&fee.updated_at),
            ],
        )?;
        write_stage_response_tx(conn, COMMITMENT_FEES, &fee.commitment_fee_id, &fee.response)?;
        Ok(())
    }

    pub fn update_tx(conn: &Connection, fee: &CommitmentFee) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE commitment_fees
            SET total_fee = ?1, payment_status = ?2, payment_proof = ?3, updated_at = ?4
            WHERE commitment_fee_id = ?5
            "#,
            params![
                fee.total_fee,
                fee.payment_status.as_str(),
                fee.payment_proof,
                format_ts(&fee.updated_at),
                fee.commitment_fee_id,
            ],
        )?;
        write_stage_response_tx(conn, COMMITMENT_FEES, &fee.commitment_fee_id, &fee.response)?;
        Ok(())
    }

    pub fn find_by_moodboard_tx(
        conn: &Connection,
        moodboard_id: &str,
    ) -> RepositoryResult<Option<CommitmentFee>> {
        let sql = format!(
            "SELECT commitment_fee_id, moodboard_id, total_fee, payment_status, payment_proof, \
             created_at, updated_at, {} FROM commitment_fees WHERE moodboard_id = ?1",
            STAGE_COLUMNS
        );
        let fee = conn
            .query_row(&sql, params![moodboard_id], map_fee_row)
            .optional()?;
        Ok(fee)
    }
}

fn map_fee_row(row: &Row) -> rusqlite::Result<CommitmentFee> {
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(CommitmentFee {
        commitment_fee_id: row.get(0)?,
        moodboard_id: row.get(1)?,
        total_fee: row.get(2)?,
        payment_status: PaymentStatus::parse(&status).ok_or_else(|| invalid_enum(3, &status))?,
        payment_proof: row.get(4)?,
        response: read_stage_response(row, 7)?,
        created_at: parse_ts(5, &created_at)?,
        updated_at: parse_ts(6, &updated_at)?,
    })
}
