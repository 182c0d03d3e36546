// ==========================================
// 通讯录导入管道 - 导入组件 Trait
// ==========================================
// 职责: 定义外部协作者的接口（不包含实现）
// - SheetIngestor: 文件 → 表头 / 原始行 / 列统计
// - DataCleaner:   映射后记录的基础清洗
// ==========================================

use crate::domain::contact::MappedRecord;
use crate::domain::import::ImportConfig;
use crate::domain::sheet::SheetData;
use crate::importer::error::ImportResult;

// ==========================================
// SheetIngestor Trait
// ==========================================
// 用途: 表格读取（阶段 PARSING_FILE / ANALYZING_DATA）
// 实现者: CsvSheetIngestor, ExcelSheetIngestor, UniversalSheetIngestor
pub trait SheetIngestor: Send + Sync {
    /// 读取文件为表头 + 原始行 + 列统计
    ///
    /// # 参数
    /// - config: 导入配置（文件路径 / 格式 / 工作表索引 / 是否有表头）
    /// - sample_size: 计算列统计使用的样本行数
    ///
    /// # 返回
    /// - Ok(SheetData): 已跳过全空行
    /// - Err: 文件不存在、格式错误等（ParseError，导入中止）
    fn ingest(&self, config: &ImportConfig, sample_size: usize) -> ImportResult<SheetData>;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 字段映射之后、校验之前的清洗
// 实现者: DataCleanerImpl
pub trait DataCleaner: Send + Sync {
    /// TRIM
    fn clean_text(&self, value: &str) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 姓名: TRIM + 合并连续空白
    fn clean_name(&self, value: &str) -> String;

    /// 邮箱: TRIM + 小写
    fn clean_email(&self, value: &str) -> String;

    /// 电话: TRIM + 全角数字/符号转半角
    fn clean_phone(&self, value: &str) -> String;

    /// 生日: 可解析时统一为 YYYY-MM-DD，否则保留原文
    fn normalize_birthday(&self, value: &str) -> String;

    /// 按字段键清洗整条记录
    fn clean_record(&self, mut record: MappedRecord) -> MappedRecord {
        for (key, value) in record.values.iter_mut() {
            *value = match key.as_str() {
                "name" => self.clean_name(value),
                "email" => self.clean_email(value),
                "phone" => self.clean_phone(value),
                "birthday" => self.normalize_birthday(value),
                _ => self.clean_text(value),
            };
        }
        record
    }
}
