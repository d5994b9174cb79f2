// ==========================================
// 仓储层单元测试辅助
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema};
use crate::domain::item_pekerjaan::ItemPekerjaan;
use crate::domain::moodboard::Moodboard;
use crate::domain::order::Order;
use crate::repository::item_pekerjaan_repo::ItemPekerjaanRepository;
use crate::repository::moodboard_repo::MoodboardRepository;
use crate::repository::order_repo::OrderRepository;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    configure_sqlite_connection(&conn).unwrap();
    init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(9, 0, 0).unwrap()
}

pub fn seed_order(conn: &Connection) -> String {
    let order = Order::new(
        "Apartemen Sudirman".to_string(),
        "PT Interior".to_string(),
        "Sari".to_string(),
        Some("0812".to_string()),
        ts(2024, 1, 1),
    );
    OrderRepository::insert_tx(conn, &order).unwrap();
    order.order_id
}

/// 订单 + Moodboard + Item Pekerjaan, 返回 item_pekerjaan_id
pub fn seed_item_pekerjaan(conn: &Connection) -> String {
    let order_id = seed_order(conn);
    let mb = Moodboard::new(&order_id, ts(2024, 1, 1));
    MoodboardRepository::insert_tx(conn, &mb).unwrap();
    let item = ItemPekerjaan::new(&mb.moodboard_id, ts(2024, 1, 1));
    ItemPekerjaanRepository::insert_tx(conn, &item).unwrap();
    item.item_pekerjaan_id
}
