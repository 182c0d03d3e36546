// ==========================================
// 通讯录导入管道 - 领域枚举类型
// ==========================================
// 职责: 导入步骤 / 导入策略 / 重复处理方式 / 匹配类型 / 合并策略
// 红线: 均为封闭集合，统一使用全大写字符串落库
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ImportStep - 导入状态机
// ==========================================
// 严格前进: INITIALIZING → PARSING_FILE → ANALYZING_DATA → RECOGNIZING_FIELDS
//          → VALIDATING_DATA → DETECTING_DUPLICATES → IMPORTING_DATA
//          → {COMPLETED | FAILED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStep {
    Initializing,
    ParsingFile,
    AnalyzingData,
    RecognizingFields,
    ValidatingData,
    DetectingDuplicates,
    ImportingData,
    Completed,
    Failed,
}

impl ImportStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStep::Initializing => "INITIALIZING",
            ImportStep::ParsingFile => "PARSING_FILE",
            ImportStep::AnalyzingData => "ANALYZING_DATA",
            ImportStep::RecognizingFields => "RECOGNIZING_FIELDS",
            ImportStep::ValidatingData => "VALIDATING_DATA",
            ImportStep::DetectingDuplicates => "DETECTING_DUPLICATES",
            ImportStep::ImportingData => "IMPORTING_DATA",
            ImportStep::Completed => "COMPLETED",
            ImportStep::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INITIALIZING" => Some(ImportStep::Initializing),
            "PARSING_FILE" => Some(ImportStep::ParsingFile),
            "ANALYZING_DATA" => Some(ImportStep::AnalyzingData),
            "RECOGNIZING_FIELDS" => Some(ImportStep::RecognizingFields),
            "VALIDATING_DATA" => Some(ImportStep::ValidatingData),
            "DETECTING_DUPLICATES" => Some(ImportStep::DetectingDuplicates),
            "IMPORTING_DATA" => Some(ImportStep::ImportingData),
            "COMPLETED" => Some(ImportStep::Completed),
            "FAILED" => Some(ImportStep::Failed),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStep::Completed | ImportStep::Failed)
    }

    /// 状态机是否允许 self → next
    ///
    /// 只允许前进，FAILED 可从任意非终态进入
    pub fn can_transition_to(&self, next: ImportStep) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == ImportStep::Failed {
            return true;
        }
        next > *self
    }

    /// 进入该步骤时的基准进度
    pub fn base_progress(&self) -> f64 {
        match self {
            ImportStep::Initializing => 0.0,
            ImportStep::ParsingFile => 0.05,
            ImportStep::AnalyzingData => 0.10,
            ImportStep::RecognizingFields => 0.15,
            ImportStep::ValidatingData => 0.20,
            ImportStep::DetectingDuplicates => 0.30,
            ImportStep::ImportingData => 0.35,
            ImportStep::Completed => 1.0,
            // FAILED 不推进进度，由上报器保持当前值
            ImportStep::Failed => 0.0,
        }
    }
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// ImportStrategy - 导入策略（遇到重复时的默认处理）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStrategy {
    SkipDuplicates,
    SmartMerge,
    ReplaceExisting,
    KeepBoth,
}

impl ImportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStrategy::SkipDuplicates => "SKIP_DUPLICATES",
            ImportStrategy::SmartMerge => "SMART_MERGE",
            ImportStrategy::ReplaceExisting => "REPLACE_EXISTING",
            ImportStrategy::KeepBoth => "KEEP_BOTH",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SKIP_DUPLICATES" => Some(ImportStrategy::SkipDuplicates),
            "SMART_MERGE" => Some(ImportStrategy::SmartMerge),
            "REPLACE_EXISTING" => Some(ImportStrategy::ReplaceExisting),
            "KEEP_BOTH" => Some(ImportStrategy::KeepBoth),
            _ => None,
        }
    }

    /// 策略对应的默认重复处理方式
    pub fn default_resolution(&self) -> DuplicateResolution {
        match self {
            ImportStrategy::SkipDuplicates => DuplicateResolution::Skip,
            ImportStrategy::SmartMerge => DuplicateResolution::Merge,
            ImportStrategy::ReplaceExisting => DuplicateResolution::Replace,
            ImportStrategy::KeepBoth => DuplicateResolution::KeepBoth,
        }
    }
}

// ==========================================
// DuplicateResolution - 单行重复处理方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateResolution {
    Skip,
    Merge,
    Replace,
    KeepBoth,
}

impl DuplicateResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateResolution::Skip => "SKIP",
            DuplicateResolution::Merge => "MERGE",
            DuplicateResolution::Replace => "REPLACE",
            DuplicateResolution::KeepBoth => "KEEP_BOTH",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SKIP" => Some(DuplicateResolution::Skip),
            "MERGE" => Some(DuplicateResolution::Merge),
            "REPLACE" => Some(DuplicateResolution::Replace),
            "KEEP_BOTH" => Some(DuplicateResolution::KeepBoth),
            _ => None,
        }
    }
}

// ==========================================
// MatchType - 重复匹配类型（按优先级排列）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    ExactPhone,
    ExactEmail,
    SimilarCompany,
    SimilarName,
    SimilarPhone,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::ExactPhone => "EXACT_PHONE",
            MatchType::ExactEmail => "EXACT_EMAIL",
            MatchType::SimilarCompany => "SIMILAR_COMPANY",
            MatchType::SimilarName => "SIMILAR_NAME",
            MatchType::SimilarPhone => "SIMILAR_PHONE",
        }
    }

    /// 合并评分中的类型权重
    pub fn merge_weight(&self) -> f64 {
        match self {
            MatchType::ExactPhone => 1.2,
            MatchType::ExactEmail => 1.1,
            MatchType::SimilarName => 0.9,
            MatchType::SimilarPhone => 0.8,
            MatchType::SimilarCompany => 0.7,
        }
    }
}

// ==========================================
// MergeStrategy - 记录合并策略
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStrategy {
    PreserveBest,
    PreserveTarget,
    PreserveSource,
    Manual,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::PreserveBest => "PRESERVE_BEST",
            MergeStrategy::PreserveTarget => "PRESERVE_TARGET",
            MergeStrategy::PreserveSource => "PRESERVE_SOURCE",
            MergeStrategy::Manual => "MANUAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PRESERVE_BEST" => Some(MergeStrategy::PreserveBest),
            "PRESERVE_TARGET" => Some(MergeStrategy::PreserveTarget),
            "PRESERVE_SOURCE" => Some(MergeStrategy::PreserveSource),
            "MANUAL" => Some(MergeStrategy::Manual),
            _ => None,
        }
    }
}

// ==========================================
// FileFormat - 源文件格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// 根据扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" => Some(FileFormat::Xlsx),
            "xls" => Some(FileFormat::Xls),
            _ => None,
        }
    }
}

// ==========================================
// DataType - 列数据类型推断
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Empty,
    Text,
    Number,
    Phone,
    Email,
    Date,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Empty => "empty",
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Phone => "phone",
            DataType::Email => "email",
            DataType::Date => "date",
        }
    }
}
