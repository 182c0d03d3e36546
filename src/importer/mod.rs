// ==========================================
// 通讯录导入管道 - 导入层
// ==========================================
// 职责: 表格读取、字段识别、清洗、校验、查重与合并
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod contact_importer_trait;
pub mod data_cleaner;
pub mod data_validator;
pub mod duplicate_detector;
pub mod error;
pub mod field_recognizer;
pub mod sheet_ingestor;
pub mod similarity;

// 重导出核心类型
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use data_validator::DataValidator;
pub use duplicate_detector::{merge_contacts, DuplicateDetector, MergeOutcome};
pub use error::{ImportError, ImportResult};
pub use field_recognizer::{FieldRecognizer, RecognitionResult};
pub use sheet_ingestor::{CsvSheetIngestor, ExcelSheetIngestor, UniversalSheetIngestor};
pub use similarity::{normalized_similarity, similarity};

// 重导出 Trait 接口
pub use contact_importer_trait::{DataCleaner, SheetIngestor};
