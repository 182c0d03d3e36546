// ==========================================
// 通讯录导入管道 - 配置层
// ==========================================
// 职责: 引擎级配置读取与写入
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

use crate::domain::types::MergeStrategy;
use crate::importer::error::ImportResult;
use serde::{Deserialize, Serialize};

// 重导出核心配置管理器
pub use config_manager::{config_keys, defaults, ConfigManager};
pub use import_config_trait::ImportConfigReader;

// ==========================================
// ImportSettings - 引擎配置快照
// ==========================================
// 引擎创建时解析一次，单次导入内不再变化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    pub recognition_sample_size: usize,
    pub pattern_sample_size: usize,
    pub default_merge_strategy: MergeStrategy,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            batch_pause_ms: defaults::BATCH_PAUSE_MS,
            recognition_sample_size: defaults::RECOGNITION_SAMPLE_SIZE,
            pattern_sample_size: defaults::PATTERN_SAMPLE_SIZE,
            default_merge_strategy: defaults::MERGE_STRATEGY,
        }
    }
}

impl ImportSettings {
    /// 从配置读取器加载完整快照
    pub async fn load(reader: &dyn ImportConfigReader) -> ImportResult<Self> {
        let settings = Self {
            batch_size: reader.get_batch_size().await?,
            batch_pause_ms: reader.get_batch_pause_ms().await?,
            recognition_sample_size: reader.get_recognition_sample_size().await?,
            pattern_sample_size: reader.get_pattern_sample_size().await?,
            default_merge_strategy: reader.get_default_merge_strategy().await?,
        };
        tracing::debug!(?settings, "导入配置已加载");
        Ok(settings)
    }
}
