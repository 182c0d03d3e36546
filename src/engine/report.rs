// ==========================================
// 通讯录导入管道 - 导入报告
// ==========================================
// 职责: 由批次记录 + 行级明细汇总最终报告
// 说明: 运行结束时生成；也可由已持久化的审计数据重建（无质量报告）
// ==========================================

use crate::domain::import::{ImportRecord, ImportReport, RowImportResult};
use crate::domain::validation::QualityReport;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// 报告中保留的高频错误条数
pub const TOP_ERROR_LIMIT: usize = 5;
/// 一行多条校验错误的拼接分隔符
pub const ROW_ERROR_SEPARATOR: &str = "; ";

/// 汇总导入报告
///
/// # 参数
/// - record: 批次记录（计数 / 状态 / 映射）
/// - details: 行级明细
/// - quality: 校验阶段的质量报告（重建时为 None）
/// - duration: 运行耗时
pub fn build_report(
    record: &ImportRecord,
    details: &[RowImportResult],
    quality: Option<QualityReport>,
    duration: Duration,
) -> ImportReport {
    let c = &record.counters;
    let success_rate = if c.total == 0 {
        0.0
    } else {
        c.imported as f64 / c.total as f64
    };

    let mut resolution_histogram = BTreeMap::new();
    for resolution in details.iter().filter_map(|d| d.resolution) {
        *resolution_histogram.entry(resolution).or_insert(0usize) += 1;
    }

    ImportReport {
        import_id: record.import_id.clone(),
        status: record.status,
        cancelled: record.cancelled,
        total: c.total,
        imported: c.imported,
        failed: c.failed,
        duplicate: c.duplicate,
        skipped: c.skipped,
        success_rate,
        field_mappings: record.field_mappings.clone(),
        top_errors: top_errors(details),
        resolution_histogram,
        quality,
        error_message: record.error_message.clone(),
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    }
}

/// 单条错误按出现次数降序（同次数按文本升序）
///
/// 一行的多条错误拆开分别计数
fn top_errors(details: &[RowImportResult]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for error in details
        .iter()
        .filter_map(|d| d.error.as_deref())
        .flat_map(|e| e.split(ROW_ERROR_SEPARATOR))
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        *counts.entry(error).or_insert(0) += 1;
    }

    let mut sorted: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(e, n)| (e.to_string(), n))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(TOP_ERROR_LIMIT);
    sorted
}
