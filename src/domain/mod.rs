// ==========================================
// 通讯录导入管道 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod contact;
pub mod duplicate;
pub mod import;
pub mod sheet;
pub mod types;
pub mod validation;

// 重导出核心类型
pub use contact::{Contact, ContactField, MappedRecord};
pub use duplicate::{DuplicateCheckResult, DuplicateMatch};
pub use import::{
    FieldMapping, ImportConfig, ImportCounters, ImportProgress, ImportRecord, ImportReport,
    RowCategory, RowImportResult, RowOutcome,
};
pub use sheet::{ColumnStats, RawRow, SheetData};
pub use types::{
    DataType, DuplicateResolution, FileFormat, ImportStep, ImportStrategy, MatchType,
    MergeStrategy,
};
pub use validation::{
    default_contact_rules, CustomValidator, QualityReport, ScoreDistribution, ValidationResult,
    ValidationRule,
};
