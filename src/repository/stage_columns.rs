// ==========================================
// 室内设计订单流程系统 - 阶段响应列映射
// ==========================================
// 各阶段表共用的 7 个响应列, 读写顺序固定
// ==========================================

use crate::db::{format_opt_ts, parse_opt_ts};
use crate::domain::stage::StageResponse;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, Row};

/// SELECT 列表片段 (顺序与 read_stage_response 一致)
pub const STAGE_COLUMNS: &str = "response_time, response_by, approved_time, approved_by, \
     revisi_notes, pm_response_time, pm_response_by";

/// 阶段表 (表名与主键列来自常量, 不接受外部输入)
#[derive(Debug, Clone, Copy)]
pub struct StageTable {
    pub table: &'static str,
    pub id_column: &'static str,
}

pub const MOODBOARDS: StageTable = StageTable { table: "moodboards", id_column: "moodboard_id" };
pub const ESTIMASIS: StageTable = StageTable { table: "estimasis", id_column: "estimasi_id" };
pub const COMMITMENT_FEES: StageTable =
    StageTable { table: "commitment_fees", id_column: "commitment_fee_id" };
pub const DESAIN_FINALS: StageTable =
    StageTable { table: "desain_finals", id_column: "desain_final_id" };
pub const ITEM_PEKERJAANS: StageTable =
    StageTable { table: "item_pekerjaans", id_column: "item_pekerjaan_id" };
pub const RAB_INTERNALS: StageTable =
    StageTable { table: "rab_internals", id_column: "rab_internal_id" };
pub const KONTRAKS: StageTable = StageTable { table: "kontraks", id_column: "kontrak_id" };
pub const GAMBAR_KERJAS: StageTable =
    StageTable { table: "gambar_kerjas", id_column: "gambar_kerja_id" };

/// 从 offset 开始读取 7 个响应列
pub fn read_stage_response(row: &Row, offset: usize) -> rusqlite::Result<StageResponse> {
    Ok(StageResponse {
        response_time: parse_opt_ts(offset, row.get(offset)?)?,
        response_by: row.get(offset + 1)?,
        approved_time: parse_opt_ts(offset + 2, row.get(offset + 2)?)?,
        approved_by: row.get(offset + 3)?,
        revisi_notes: row.get(offset + 4)?,
        pm_response_time: parse_opt_ts(offset + 5, row.get(offset + 5)?)?,
        pm_response_by: row.get(offset + 6)?,
    })
}

/// 覆盖写入响应列
pub fn write_stage_response_tx(
    conn: &Connection,
    target: StageTable,
    id: &str,
    response: &StageResponse,
) -> RepositoryResult<usize> {
    let sql = format!(
        "UPDATE {} SET response_time = ?1, response_by = ?2, approved_time = ?3, approved_by = ?4, \
         revisi_notes = ?5, pm_response_time = ?6, pm_response_by = ?7 WHERE {} = ?8",
        target.table, target.id_column
    );
    let rows = conn.execute(
        &sql,
        params![
            format_opt_ts(&response.response_time),
            response.response_by,
            format_opt_ts(&response.approved_time),
            response.approved_by,
            response.revisi_notes,
            format_opt_ts(&response.pm_response_time),
            response.pm_response_by,
            id,
        ],
    )?;
    Ok(rows)
}
