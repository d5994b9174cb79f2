// ==========================================
// 室内设计订单流程系统 - 任务响应数据仓储
// ==========================================
// 对齐: task_responses 表
// 当前记录: 同一 (order_id, tahap) 按 created_at, seq 取最新
// ==========================================

use crate::db::{format_opt_ts, format_ts, invalid_enum, parse_opt_ts, parse_ts};
use crate::domain::task_response::TaskResponse;
use crate::domain::types::{Tahap, TaskStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const TASK_COLUMNS: &str = "task_id, order_id, tahap, user_id, start_time, response_time, \
     update_data_time, deadline, duration_days, extend_count, extend_reason, status, created_at";

pub struct TaskResponseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TaskResponseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn list_by_order(&self, order_id: &str) -> RepositoryResult<Vec<TaskResponse>> {
        let conn = self.get_conn()?;
        Self::list_by_order_tx(&conn, order_id)
    }

    pub fn find_current(&self, order_id: &str, tahap: Tahap) -> RepositoryResult<Option<TaskResponse>> {
        let conn = self.get_conn()?;
        Self::find_current_tx(&conn, order_id, tahap)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 插入 (seq 取全表递增, 用于同一时间戳下的排序)
    pub fn insert_tx(conn: &Connection, task: &TaskResponse) -> RepositoryResult<()> {
        let seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM task_responses",
            [],
            |row| row.get(0),
        )?;
        conn.execute(
            r#"
            INSERT INTO task_responses (
                task_id, seq, order_id, tahap, user_id, start_time, response_time,
                update_data_time, deadline, duration_days, extend_count, extend_reason,
                status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                task.task_id,
                seq,
                task.order_id,
                task.tahap.as_str(),
                task.user_id,
                format_ts(&task.start_time),
                format_opt_ts(&task.response_time),
                format_opt_ts(&task.update_data_time),
                format_ts(&task.deadline),
                task.duration_days,
                task.extend_count,
                task.extend_reason,
                task.status.as_str(),
                format_ts(&task.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn update_tx(conn: &Connection, task: &TaskResponse) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"
            UPDATE task_responses
            SET user_id = ?1, response_time = ?2, update_data_time = ?3, deadline = ?4,
                duration_days = ?5, extend_count = ?6, extend_reason = ?7, status = ?8
            WHERE task_id = ?9
            "#,
            params![
                task.user_id,
                format_opt_ts(&task.response_time),
                format_opt_ts(&task.update_data_time),
                format_ts(&task.deadline),
                task.duration_days,
                task.extend_count,
                task.extend_reason,
                task.status.as_str(),
                task.task_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "TaskResponse".to_string(),
                id: task.task_id.clone(),
            });
        }
        Ok(())
    }

    pub fn find_current_tx(
        conn: &Connection,
        order_id: &str,
        tahap: Tahap,
    ) -> RepositoryResult<Option<TaskResponse>> {
        let sql = format!(
            "SELECT {} FROM task_responses WHERE order_id = ?1 AND tahap = ?2 \
             ORDER BY created_at DESC, seq DESC LIMIT 1",
            TASK_COLUMNS
        );
        let task = conn
            .query_row(&sql, params![order_id, tahap.as_str()], map_task_row)
            .optional()?;
        Ok(task)
    }

    pub fn list_by_order_tx(conn: &Connection, order_id: &str) -> RepositoryResult<Vec<TaskResponse>> {
        let sql = format!(
            "SELECT {} FROM task_responses WHERE order_id = ?1 ORDER BY created_at, seq",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![order_id], map_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// 全部进行中的任务 (menunggu_response / menunggu_input)
    pub fn list_open_tx(conn: &Connection) -> RepositoryResult<Vec<TaskResponse>> {
        let sql = format!(
            "SELECT {} FROM task_responses WHERE status IN ('menunggu_response', 'menunggu_input') \
             ORDER BY deadline, seq",
            TASK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], map_task_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }
}

fn map_task_row(row: &Row) -> rusqlite::Result<TaskResponse> {
    let tahap: String = row.get(2)?;
    let start_time: String = row.get(4)?;
    let deadline: String = row.get(7)?;
    let status: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    Ok(TaskResponse {
        task_id: row.get(0)?,
        order_id: row.get(1)?,
        tahap: Tahap::parse(&tahap).ok_or_else(|| invalid_enum(2, &tahap))?,
        user_id: row.get(3)?,
        start_time: parse_ts(4, &start_time)?,
        response_time: parse_opt_ts(5, row.get(5)?)?,
        update_data_time: parse_opt_ts(6, row.get(6)?)?,
        deadline: parse_ts(7, &deadline)?,
        duration_days: row.get(8)?,
        extend_count: row.get(9)?,
        extend_reason: row.get(10)?,
        status: TaskStatus::parse(&status).ok_or_else(|| invalid_enum(11, &status))?,
        created_at: parse_ts(12, &created_at)?,
    })
}
