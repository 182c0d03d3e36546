// ==========================================
// 通讯录导入管道 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: ParseError（文件解析，导入前中止）/ 规则与配置错误 / 仓储错误 / 编排错误
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（ParseError） =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表不存在: 索引 {index}（共 {count} 个）")]
    SheetNotFound { index: usize, count: usize },

    #[error("文件无数据行")]
    EmptySheet,

    // ===== 规则与映射错误 =====
    #[error("校验规则无效 (字段 {field}): {message}")]
    InvalidValidationRule { field: String, message: String },

    #[error("字段映射无效: {0}")]
    InvalidFieldMapping(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 数据库错误 =====
    #[error("仓储操作失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 编排错误 =====
    #[error("非法状态转换: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("导入任务异常终止: {0}")]
    TaskAborted(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否属于文件解析类错误（导入在识别字段前中止）
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::SheetNotFound { .. }
                | ImportError::EmptySheet
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<tokio::task::JoinError>
impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::TaskAborted(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
