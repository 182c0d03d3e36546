// ==========================================
// 通讯录导入管道 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite) + tokio
// 流程: 表格读取 → 字段识别 → 数据校验 → 重复检测 / 合并 → 分批导入
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 识别 / 校验 / 查重 / 合并
pub mod importer;

// 引擎层 - 导入编排
pub mod engine;

// 配置层 - 引擎配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    DuplicateResolution, FileFormat, ImportStep, ImportStrategy, MatchType, MergeStrategy,
};

// 领域实体
pub use domain::{
    Contact, ContactField, FieldMapping, ImportConfig, ImportProgress, ImportRecord, ImportReport,
    RowImportResult, ValidationRule,
};

// 导入组件
pub use importer::{DataValidator, DuplicateDetector, FieldRecognizer, ImportError, ImportResult};

// 引擎
pub use engine::{ImportEngine, ImportHandle};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "通讯录导入管道";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
