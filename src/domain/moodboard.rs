// ==========================================
// 室内设计订单流程系统 - Moodboard 领域模型
// ==========================================
// 依据: moodboards / moodboard_files 表
// 终态: accepted = true
// ==========================================

use crate::domain::stage::StageResponse;
use crate::domain::types::MoodboardStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Moodboard - 设计概念稿
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moodboard {
    pub moodboard_id: String,
    pub order_id: String,
    pub status: MoodboardStatus,
    pub accepted: bool,
    pub selected_file: Option<String>, // 客户选定的设计文件引用
    pub notes: Option<String>,
    pub response: StageResponse,
    pub files: Vec<DesignFile>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Moodboard {
    pub fn new(order_id: &str, now: NaiveDateTime) -> Self {
        Self {
            moodboard_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            status: MoodboardStatus::Pending,
            accepted: false,
            selected_file: None,
            notes: None,
            response: StageResponse::default(),
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn find_file(&self, file_id: &str) -> Option<&DesignFile> {
        self.files.iter().find(|f| f.file_id == file_id)
    }
}

// ==========================================
// DesignFile - 附件引用
// ==========================================
// 只存引用, 文件本体由外部存储管理
// Moodboard / Desain Final / Gambar Kerja 共用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignFile {
    pub file_id: String,
    pub file_path: String,
    pub original_name: String,
    pub uploaded_by: String,
    pub uploaded_at: NaiveDateTime,
}

impl DesignFile {
    pub fn new(file_path: &str, original_name: &str, uploaded_by: &str, now: NaiveDateTime) -> Self {
        Self {
            file_id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            original_name: original_name.to_string(),
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: now,
        }
    }
}
