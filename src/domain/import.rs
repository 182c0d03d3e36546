// ==========================================
// 通讯录导入管道 - 导入批次领域模型
// ==========================================
// 职责: 导入配置 / 导入记录 / 行结果 / 进度快照 / 导入报告
// 对齐: import_record / import_detail 表
// ==========================================

use crate::domain::contact::ContactField;
use crate::domain::types::{
    DuplicateResolution, FileFormat, ImportStep, ImportStrategy, MergeStrategy,
};
use crate::domain::validation::{QualityReport, ValidationRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

// ==========================================
// FieldMapping - 列 → 系统字段映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub excel_column: String,
    pub system_field: ContactField,
    pub confidence: f64, // [0, 1]
}

impl FieldMapping {
    pub fn new(excel_column: impl Into<String>, system_field: ContactField, confidence: f64) -> Self {
        Self {
            excel_column: excel_column.into(),
            system_field,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

// ==========================================
// ImportConfig - 单次导入配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub file_path: PathBuf,
    pub format: FileFormat,
    pub sheet_index: usize,
    pub has_header: bool,
    pub strategy: ImportStrategy,
    /// MERGE 时使用的合并策略；None 使用引擎默认
    pub merge_strategy: Option<MergeStrategy>,
    /// 显式映射；None 触发自动识别
    pub field_mappings: Option<Vec<FieldMapping>>,
    /// 空列表使用默认规则集
    pub validation_rules: Vec<ValidationRule>,
    /// 已有联系人 ID → 指定处理方式
    pub resolution_overrides: HashMap<String, DuplicateResolution>,
    pub user_id: String,
}

impl ImportConfig {
    /// 按文件扩展名推断格式的默认配置
    pub fn for_file(file_path: impl Into<PathBuf>, strategy: ImportStrategy) -> Self {
        let file_path = file_path.into();
        let format = file_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FileFormat::from_extension)
            .unwrap_or(FileFormat::Csv);

        Self {
            file_path,
            format,
            sheet_index: 0,
            has_header: true,
            strategy,
            merge_strategy: None,
            field_mappings: None,
            validation_rules: Vec::new(),
            resolution_overrides: HashMap::new(),
            user_id: "system".to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

// ==========================================
// ImportCounters - 行计数（四类互斥）
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounters {
    pub total: usize,
    pub processed: usize,
    pub imported: usize,
    pub failed: usize,
    pub duplicate: usize,
    pub skipped: usize,
}

impl ImportCounters {
    pub fn record(&mut self, result: &RowImportResult) {
        self.processed += 1;
        match result.category() {
            RowCategory::Imported => self.imported += 1,
            RowCategory::Failed => self.failed += 1,
            RowCategory::Duplicate => self.duplicate += 1,
            RowCategory::Skipped => self.skipped += 1,
        }
    }
}

// ==========================================
// ImportRecord - 导入批次记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub import_id: String,
    pub file_name: String,
    pub status: ImportStep,
    pub strategy: ImportStrategy,
    pub counters: ImportCounters,
    pub field_mappings: Vec<FieldMapping>,
    pub user_id: String,
    pub cancelled: bool,
    pub error_message: Option<String>,
    pub error_trace: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportRecord {
    pub fn new(import_id: String, config: &ImportConfig) -> Self {
        Self {
            import_id,
            file_name: config.file_name(),
            status: ImportStep::Initializing,
            strategy: config.strategy,
            counters: ImportCounters::default(),
            field_mappings: Vec::new(),
            user_id: config.user_id.clone(),
            cancelled: false,
            error_message: None,
            error_trace: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

// ==========================================
// RowOutcome - 单行处理结果（判别联合）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowOutcome {
    /// 作为新联系人插入
    Imported { contact_id: String },
    /// 命中重复并按 resolution 处理
    Duplicate {
        resolution: DuplicateResolution,
        contact_id: Option<String>,
        /// 合并策略为 MANUAL 时等待人工处理
        pending_manual: bool,
    },
    /// 校验失败或落库失败
    Failed { error: String },
    /// 空行等非重复原因跳过
    Skipped { reason: String },
}

/// 行结果归类（用于计数，四类互斥）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCategory {
    Imported,
    Failed,
    Duplicate,
    Skipped,
}

// ==========================================
// RowImportResult - 行级审计明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowImportResult {
    pub import_id: String,
    pub row_index: usize,
    pub success: bool,
    pub contact_id: Option<String>,
    pub error: Option<String>,
    pub is_duplicate: bool,
    pub skipped: bool,
    pub resolution: Option<DuplicateResolution>,
    pub created_at: DateTime<Utc>,
}

impl RowImportResult {
    pub fn from_outcome(import_id: &str, row_index: usize, outcome: RowOutcome) -> Self {
        let base = Self {
            import_id: import_id.to_string(),
            row_index,
            success: false,
            contact_id: None,
            error: None,
            is_duplicate: false,
            skipped: false,
            resolution: None,
            created_at: Utc::now(),
        };

        match outcome {
            RowOutcome::Imported { contact_id } => Self {
                success: true,
                contact_id: Some(contact_id),
                ..base
            },
            RowOutcome::Duplicate {
                resolution,
                contact_id,
                pending_manual,
            } => Self {
                success: !pending_manual,
                contact_id,
                is_duplicate: true,
                skipped: resolution == DuplicateResolution::Skip || pending_manual,
                resolution: Some(resolution),
                ..base
            },
            RowOutcome::Failed { error } => Self {
                error: Some(error),
                ..base
            },
            RowOutcome::Skipped { reason } => {
                // 跳过原因不写入 error，否则会被计为失败
                tracing::debug!(row_index, reason = %reason, "行已跳过");
                Self {
                    success: true,
                    skipped: true,
                    ..base
                }
            }
        }
    }

    /// 计数归类: 失败 > 重复 > 跳过 > 导入
    pub fn category(&self) -> RowCategory {
        if self.error.is_some() {
            RowCategory::Failed
        } else if self.is_duplicate {
            RowCategory::Duplicate
        } else if self.skipped {
            RowCategory::Skipped
        } else {
            RowCategory::Imported
        }
    }
}

// ==========================================
// ImportProgress - 进度快照（仅保留最新）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub import_id: String,
    pub step: ImportStep,
    pub progress: f64, // [0, 1]，同一次运行内单调不减
    pub counters: ImportCounters,
    pub message: String,
}

impl ImportProgress {
    pub fn initial(import_id: impl Into<String>) -> Self {
        Self {
            import_id: import_id.into(),
            step: ImportStep::Initializing,
            progress: 0.0,
            counters: ImportCounters::default(),
            message: String::new(),
        }
    }
}

// ==========================================
// ImportReport - 最终导入报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub import_id: String,
    pub status: ImportStep,
    pub cancelled: bool,
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    pub duplicate: usize,
    pub skipped: usize,
    pub success_rate: f64,
    pub field_mappings: Vec<FieldMapping>,
    pub top_errors: Vec<(String, usize)>,
    pub resolution_histogram: BTreeMap<DuplicateResolution, usize>,
    pub quality: Option<QualityReport>,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}
