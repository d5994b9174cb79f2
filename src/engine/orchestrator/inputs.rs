// ==========================================
// 编排器输入结构
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub nama_project: String,
    pub company_name: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduk {
    pub nama_produk: String,
    pub nama_ruangan: String,
    pub quantity: i64,
    pub panjang: Option<f64>,
    pub lebar: Option<f64>,
    pub tinggi: Option<f64>,
}

/// RAB Internal 行输入 (line_no 按顺序自动编号)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabLineInput {
    pub produk_id: Option<String>,
    pub nama_item: String,
    pub is_aksesoris: bool,
    pub quantity: f64,
    pub harga_dasar: f64,
    pub markup_pct: f64,
    pub diskon_pct: f64,
    pub harga_jasa: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewKontrak {
    pub durasi_kontrak: i64,
    pub termin_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewInvoice {
    pub termin_step: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkplanEntry {
    pub nama_tahapan: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}
