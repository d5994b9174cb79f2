// ==========================================
// 室内设计订单流程系统 - Desain Final 领域模型
// ==========================================
// 依据: desain_finals / desain_final_files 表
// 前置: Moodboard 已接受且 Commitment Fee 已付款
// 终态: status = approved (selected_file 为客户选定的最终设计)
// ==========================================

use crate::domain::moodboard::DesignFile;
use crate::domain::stage::StageResponse;
use crate::domain::types::MoodboardStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// DesainFinal - 最终设计
// ==========================================
// 状态取值与 Moodboard 相同 (pending / uploaded / revisi / approved)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesainFinal {
    pub desain_final_id: String,
    pub moodboard_id: String,
    pub status: MoodboardStatus,
    pub selected_file: Option<String>,
    pub notes: Option<String>,
    pub response: StageResponse,
    pub files: Vec<DesignFile>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DesainFinal {
    pub fn new(moodboard_id: &str, now: NaiveDateTime) -> Self {
        Self {
            desain_final_id: uuid::Uuid::new_v4().to_string(),
            moodboard_id: moodboard_id.to_string(),
            status: MoodboardStatus::Pending,
            selected_file: None,
            notes: None,
            response: StageResponse::default(),
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == MoodboardStatus::Approved
    }

    pub fn find_file(&self, file_id: &str) -> Option<&DesignFile> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    /// 最近上传的文件
    pub fn latest_file(&self) -> Option<&DesignFile> {
        self.files.iter().max_by_key(|f| f.uploaded_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_latest_file_picks_newest_upload() {
        let mut df = DesainFinal::new("mb1", at(1, 9));
        assert!(df.latest_file().is_none());
        assert!(!df.is_accepted());

        df.files.push(DesignFile::new("/final/a.pdf", "a.pdf", "desainer", at(2, 9)));
        df.files.push(DesignFile::new("/final/b.pdf", "b.pdf", "desainer", at(3, 9)));
        assert_eq!(df.latest_file().unwrap().original_name, "b.pdf");

        let first = df.files[0].file_id.clone();
        assert_eq!(df.find_file(&first).unwrap().original_name, "a.pdf");
        assert!(df.find_file("nope").is_none());
    }
}
