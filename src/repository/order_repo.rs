// ==========================================
// 室内设计订单流程系统 - 订单数据仓储
// ==========================================
// 对齐: orders 表
// 红线: Repository 不做业务逻辑, 只做数据映射
// ==========================================

use crate::db::{format_ts, invalid_enum, parse_ts};
use crate::domain::order::Order;
use crate::domain::types::WorkflowStage;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = "order_id, nama_project, company_name, customer_name, customer_phone, \
     tahapan, payment_status, created_at, updated_at";

pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, order_id)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM orders ORDER BY created_at, order_id", ORDER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map([], map_order_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(orders)
    }

    // ==========================================
    // 事务内操作 (由编排器在同一事务中调用)
    // ==========================================

    pub fn insert_tx(conn: &Connection, order: &Order) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO orders (
                order_id, nama_project, company_name, customer_name, customer_phone,
                tahapan, payment_status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                order.order_id,
                order.nama_project,
                order.company_name,
                order.customer_name,
                order.customer_phone,
                order.tahapan.as_str(),
                order.payment_status,
                format_ts(&order.created_at),
                format_ts(&order.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id_tx(conn: &Connection, order_id: &str) -> RepositoryResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE order_id = ?1", ORDER_COLUMNS);
        let order = conn
            .query_row(&sql, params![order_id], map_order_row)
            .optional()?;
        Ok(order)
    }

    /// 更新订单当前阶段
    pub fn update_stage_tx(
        conn: &Connection,
        order_id: &str,
        stage: WorkflowStage,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE orders SET tahapan = ?1, updated_at = ?2 WHERE order_id = ?3",
            params![stage.as_str(), format_ts(&now), order_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            });
        }
        Ok(())
    }

    /// 更新订单付款状态 (None 表示清空)
    pub fn update_payment_status_tx(
        conn: &Connection,
        order_id: &str,
        payment_status: Option<&str>,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE orders SET payment_status = ?1, updated_at = ?2 WHERE order_id = ?3",
            params![payment_status, format_ts(&now), order_id],
        )?;
        Ok(())
    }
}

fn map_order_row(row: &Row) -> rusqlite::Result<Order> {
    let tahapan: String = row.get(5)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Order {
        order_id: row.get(0)?,
        nama_project: row.get(1)?,
        company_name: row.get(2)?,
        customer_name: row.get(3)?,
        customer_phone: row.get(4)?,
        tahapan: WorkflowStage::parse(&tahapan).ok_or_else(|| invalid_enum(5, &tahapan))?,
        payment_status: row.get(6)?,
        created_at: parse_ts(7, &created_at)?,
        updated_at: parse_ts(8, &updated_at)?,
    })
}
