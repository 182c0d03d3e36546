// ==========================================
// 通讯录导入管道 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope，当前仅使用 global)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::MergeStrategy;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

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
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(|e| ImportError::ConfigReadError {
            key: "*".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let conn_guard = lock(&conn, "*")?;
            crate::db::configure_sqlite_connection(&conn_guard).map_err(|e| {
                ImportError::ConfigReadError {
                    key: "*".to_string(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = lock(&self.conn, key)?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ImportError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = lock(&self.conn, key)?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')
            "#,
            params![key, value],
        )
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ImportResult<BTreeMap<String, String>> {
        let conn = lock(&self.conn, "*")?;
        let to_err = |e: rusqlite::Error| ImportError::ConfigReadError {
            key: "*".to_string(),
            message: e.to_string(),
        };

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")
            .map_err(to_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(to_err)?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(to_err)?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 读取并解析配置；缺失时返回默认值，格式错误时报 ConfigValueError
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }

    /// 正整数配置（0 视为格式错误）
    fn get_positive_or_default(&self, key: &str, default: usize) -> ImportResult<usize> {
        let value = self.get_parsed_or_default::<usize>(key, default)?;
        if value == 0 {
            return Err(ImportError::ConfigValueError {
                key: key.to_string(),
                value: "0".to_string(),
                message: "必须为正整数".to_string(),
            });
        }
        Ok(value)
    }
}

fn lock<'a>(
    conn: &'a Arc<Mutex<Connection>>,
    key: &str,
) -> ImportResult<MutexGuard<'a, Connection>> {
    conn.lock().map_err(|e| ImportError::ConfigReadError {
        key: key.to_string(),
        message: format!("锁获取失败: {}", e),
    })
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ImportResult<usize> {
        self.get_positive_or_default(config_keys::BATCH_SIZE, defaults::BATCH_SIZE)
    }

    async fn get_batch_pause_ms(&self) -> ImportResult<u64> {
        self.get_parsed_or_default(config_keys::BATCH_PAUSE_MS, defaults::BATCH_PAUSE_MS)
    }

    async fn get_recognition_sample_size(&self) -> ImportResult<usize> {
        self.get_positive_or_default(
            config_keys::RECOGNITION_SAMPLE_SIZE,
            defaults::RECOGNITION_SAMPLE_SIZE,
        )
    }

    async fn get_pattern_sample_size(&self) -> ImportResult<usize> {
        self.get_positive_or_default(config_keys::PATTERN_SAMPLE_SIZE, defaults::PATTERN_SAMPLE_SIZE)
    }

    async fn get_default_merge_strategy(&self) -> ImportResult<MergeStrategy> {
        let key = config_keys::DEFAULT_MERGE_STRATEGY;
        match self.get_config_value(key)? {
            None => Ok(defaults::MERGE_STRATEGY),
            Some(raw) => MergeStrategy::from_str(raw.trim()).ok_or_else(|| {
                ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: "未知的合并策略".to_string(),
                }
            }),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批处理
    pub const BATCH_SIZE: &str = "import_batch_size";
    pub const BATCH_PAUSE_MS: &str = "import_batch_pause_ms";

    // 字段识别
    pub const RECOGNITION_SAMPLE_SIZE: &str = "recognition_sample_size";
    pub const PATTERN_SAMPLE_SIZE: &str = "pattern_sample_size";

    // 合并
    pub const DEFAULT_MERGE_STRATEGY: &str = "default_merge_strategy";
}

/// 配置默认值
pub mod defaults {
    use crate::domain::types::MergeStrategy;

    pub const BATCH_SIZE: usize = 50;
    pub const BATCH_PAUSE_MS: u64 = 0;
    pub const RECOGNITION_SAMPLE_SIZE: usize = 100;
    pub const PATTERN_SAMPLE_SIZE: usize = 10;
    pub const MERGE_STRATEGY: MergeStrategy = MergeStrategy::PreserveBest;
}
