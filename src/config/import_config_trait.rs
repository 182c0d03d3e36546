// ==========================================
// 通讯录导入管道 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::MergeStrategy;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入引擎所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 批处理配置 =====

    /// 获取每批处理行数
    ///
    /// # 默认值
    /// - 50
    async fn get_batch_size(&self) -> ImportResult<usize>;

    /// 获取批次间暂停时长（毫秒）
    ///
    /// # 返回
    /// - 0: 仅让出调度（yield），不休眠
    ///
    /// # 默认值
    /// - 0
    async fn get_batch_pause_ms(&self) -> ImportResult<u64>;

    // ===== 识别配置 =====

    /// 获取列统计采样行数
    ///
    /// # 默认值
    /// - 100
    async fn get_recognition_sample_size(&self) -> ImportResult<usize>;

    /// 获取模式识别采样行数（字段识别器逐行匹配时使用）
    ///
    /// # 默认值
    /// - 10
    async fn get_pattern_sample_size(&self) -> ImportResult<usize>;

    // ===== 合并配置 =====

    /// 获取默认合并策略（ImportConfig 未指定时使用）
    ///
    /// # 默认值
    /// - PRESERVE_BEST
    async fn get_default_merge_strategy(&self) -> ImportResult<MergeStrategy>;
}
