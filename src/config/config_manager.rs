// ==========================================
// 室内设计订单流程系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// WorkflowSettings - 流程期限配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// 进入阶段后等待响应的天数
    pub response_days: i64,
    /// 响应后录入数据的天数
    pub input_days: i64,
    /// Kontrak 阶段等待响应的天数
    pub kontrak_response_days: i64,
    /// 单次延期上限 (天)
    pub max_extension_days: i64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            response_days: 3,
            input_days: 6,
            kontrak_response_days: 3,
            max_extension_days: 30,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明: 对传入连接再次应用统一 PRAGMA (幂等)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 读取正整数配置; 缺失或格式错误时使用默认值
    fn get_positive_days(&self, key: &str, default: i64) -> Result<i64, Box<dyn Error>> {
        let value = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match value.trim().parse::<i64>() {
            Ok(days) if days >= 1 => Ok(days),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %value,
                    default = default,
                    "配置格式错误, 使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 加载流程期限配置
    pub fn load_workflow_settings(&self) -> Result<WorkflowSettings, Box<dyn Error>> {
        let defaults = WorkflowSettings::default();
        Ok(WorkflowSettings {
            response_days: self.get_positive_days(config_keys::RESPONSE_DAYS, defaults.response_days)?,
            input_days: self.get_positive_days(config_keys::INPUT_DAYS, defaults.input_days)?,
            kontrak_response_days: self
                .get_positive_days(config_keys::KONTRAK_RESPONSE_DAYS, defaults.kontrak_response_days)?,
            max_extension_days: self
                .get_positive_days(config_keys::MAX_EXTENSION_DAYS, defaults.max_extension_days)?,
        })
    }

    /// 获取所有配置的快照 (JSON格式)
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 会覆盖现有的 global 配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            let affected = tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
            count += affected;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const RESPONSE_DAYS: &str = "task_response_days";
    pub const INPUT_DAYS: &str = "task_input_days";
    pub const KONTRAK_RESPONSE_DAYS: &str = "task_kontrak_response_days";
    pub const MAX_EXTENSION_DAYS: &str = "task_max_extension_days";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let manager = setup();
        assert_eq!(manager.load_workflow_settings().unwrap(), WorkflowSettings::default());
    }

    #[test]
    fn test_override_and_bad_value_fallback() {
        let manager = setup();
        manager.set_global_config_value(config_keys::INPUT_DAYS, "10").unwrap();
        manager.set_global_config_value(config_keys::RESPONSE_DAYS, "abc").unwrap();
        manager.set_global_config_value(config_keys::MAX_EXTENSION_DAYS, "0").unwrap();

        let settings = manager.load_workflow_settings().unwrap();
        assert_eq!(settings.input_days, 10);
        assert_eq!(settings.response_days, 3);
        assert_eq!(settings.max_extension_days, 30);
    }

    #[test]
    fn test_snapshot_restore() {
        let manager = setup();
        manager.set_global_config_value(config_keys::RESPONSE_DAYS, "5").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();

        manager.set_global_config_value(config_keys::RESPONSE_DAYS, "9").unwrap();
        assert_eq!(manager.restore_config_from_snapshot(&snapshot).unwrap(), 1);
        assert_eq!(
            manager.get_global_config_value(config_keys::RESPONSE_DAYS).unwrap().as_deref(),
            Some("5")
        );
    }
}
