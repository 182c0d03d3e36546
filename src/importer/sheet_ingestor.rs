// ==========================================
// 通讯录导入管道 - 表格读取器实现
// ==========================================
// 阶段: PARSING_FILE（读文件）/ ANALYZING_DATA（列统计）
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::domain::import::ImportConfig;
use crate::domain::sheet::{ColumnStats, RawRow, SheetData};
use crate::domain::types::{DataType, FileFormat};
use crate::importer::contact_importer_trait::SheetIngestor;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

static PHONE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\s\-()]{6,19}$").expect("phone regex"));

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%Y年%m月%d日"];

/// 超过该比例的非空值同类型时采用该类型
const TYPE_DOMINANCE_RATIO: f64 = 0.8;

// ==========================================
// CSV Ingestor
// ==========================================
pub struct CsvSheetIngestor;

impl CsvSheetIngestor {
    fn read_grid(&self, path: &Path) -> ImportResult<Vec<Vec<String>>> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(|v| v.trim().to_string()).collect());
        }
        Ok(grid)
    }
}

impl SheetIngestor for CsvSheetIngestor {
    fn ingest(&self, config: &ImportConfig, sample_size: usize) -> ImportResult<SheetData> {
        let path = check_file(&config.file_path)?;
        if config.sheet_index != 0 {
            return Err(ImportError::SheetNotFound {
                index: config.sheet_index,
                count: 1,
            });
        }

        let grid = self.read_grid(path)?;
        build_sheet(grid, config.has_header, sample_size)
    }
}

// ==========================================
// Excel Ingestor
// ==========================================
pub struct ExcelSheetIngestor;

impl ExcelSheetIngestor {
    fn read_grid(&self, path: &Path, sheet_index: usize) -> ImportResult<Vec<Vec<String>>> {
        let mut workbook = open_workbook_auto(path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .get(sheet_index)
            .cloned()
            .ok_or(ImportError::SheetNotFound {
                index: sheet_index,
                count: sheet_names.len(),
            })?;

        let range = workbook.worksheet_range(&sheet_name)?;

        Ok(range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect()
            })
            .collect())
    }
}

impl SheetIngestor for ExcelSheetIngestor {
    fn ingest(&self, config: &ImportConfig, sample_size: usize) -> ImportResult<SheetData> {
        let path = check_file(&config.file_path)?;
        let grid = self.read_grid(path, config.sheet_index)?;
        build_sheet(grid, config.has_header, sample_size)
    }
}

// ==========================================
// 通用读取器（根据 FileFormat 自动选择）
// ==========================================
pub struct UniversalSheetIngestor;

impl SheetIngestor for UniversalSheetIngestor {
    fn ingest(&self, config: &ImportConfig, sample_size: usize) -> ImportResult<SheetData> {
        match config.format {
            FileFormat::Csv => CsvSheetIngestor.ingest(config, sample_size),
            FileFormat::Xlsx | FileFormat::Xls => ExcelSheetIngestor.ingest(config, sample_size),
        }
    }
}

fn check_file(path: &Path) -> ImportResult<&Path> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

/// 网格 → SheetData
///
/// - 有表头: 首行为列名；空列名替换为 `列N`，重名追加 `_2`、`_3`
/// - 无表头: 生成 `列1..列N`（N 为最宽行的列数）
/// - 全空行跳过，row_index 保留其在数据区中的原始位置
fn build_sheet(
    mut grid: Vec<Vec<String>>,
    has_header: bool,
    sample_size: usize,
) -> ImportResult<SheetData> {
    let header_row = if has_header {
        if grid.is_empty() {
            return Err(ImportError::EmptySheet);
        }
        Some(grid.remove(0))
    } else {
        None
    };

    let width = grid
        .iter()
        .map(Vec::len)
        .chain(header_row.iter().map(Vec::len))
        .max()
        .unwrap_or(0);

    let headers = make_headers(header_row.unwrap_or_default(), width);

    let rows: Vec<RawRow> = grid
        .into_iter()
        .enumerate()
        .map(|(row_index, values)| {
            let cells = headers
                .iter()
                .enumerate()
                .map(|(col, header)| (header.clone(), values.get(col).cloned().unwrap_or_default()))
                .collect();
            RawRow::new(row_index, cells)
        })
        .filter(|row| !row.is_blank())
        .collect();

    if rows.is_empty() {
        return Err(ImportError::EmptySheet);
    }

    let column_stats = compute_column_stats(&headers, &rows, sample_size);

    tracing::debug!(
        columns = headers.len(),
        rows = rows.len(),
        "表格读取完成"
    );

    Ok(SheetData {
        headers,
        rows,
        column_stats,
    })
}

fn make_headers(raw: Vec<String>, width: usize) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(width);
    for col in 0..width {
        let base = raw
            .get(col)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| format!("列{}", col + 1));

        let mut name = base.clone();
        let mut suffix = 2;
        while headers.contains(&name) {
            name = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        headers.push(name);
    }
    headers
}

// ==========================================
// 列统计
// ==========================================

/// 基于前 sample_size 行计算每列统计
pub fn compute_column_stats(
    headers: &[String],
    rows: &[RawRow],
    sample_size: usize,
) -> HashMap<String, ColumnStats> {
    let sample = &rows[..rows.len().min(sample_size)];

    headers
        .iter()
        .map(|header| {
            let values: Vec<&str> = sample
                .iter()
                .map(|row| row.get(header).unwrap_or("").trim())
                .collect();
            (header.clone(), stats_for(&values))
        })
        .collect()
}

fn stats_for(values: &[&str]) -> ColumnStats {
    let non_empty: Vec<&str> = values.iter().copied().filter(|v| !v.is_empty()).collect();

    // 频次统计，首次出现顺序用于平局
    let mut frequency: Vec<(&str, usize)> = Vec::new();
    for value in &non_empty {
        match frequency.iter_mut().find(|(v, _)| v == value) {
            Some(entry) => entry.1 += 1,
            None => frequency.push((value, 1)),
        }
    }
    let most_frequent_value = frequency
        .iter()
        .fold(None::<(&str, usize)>, |best, &(v, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((v, n)),
        })
        .map(|(v, _)| v.to_string());

    ColumnStats {
        total_count: values.len(),
        non_empty_count: non_empty.len(),
        unique_count: frequency.len(),
        most_frequent_value,
        data_pattern: dominant_shape(&non_empty),
        suggested_type: suggest_type(&non_empty),
    }
}

/// 单值类型推断
pub fn infer_data_type(value: &str) -> DataType {
    let value = value.trim();
    if value.is_empty() {
        return DataType::Empty;
    }
    if EMAIL_SHAPE.is_match(value) {
        return DataType::Email;
    }
    if DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
    {
        return DataType::Date;
    }
    if PHONE_SHAPE.is_match(value) {
        return DataType::Phone;
    }
    if value.parse::<f64>().is_ok() {
        return DataType::Number;
    }
    DataType::Text
}

fn suggest_type(non_empty: &[&str]) -> DataType {
    if non_empty.is_empty() {
        return DataType::Empty;
    }

    let mut counts: Vec<(DataType, usize)> = Vec::new();
    for value in non_empty {
        let data_type = infer_data_type(value);
        match counts.iter_mut().find(|(t, _)| *t == data_type) {
            Some(entry) => entry.1 += 1,
            None => counts.push((data_type, 1)),
        }
    }

    counts
        .into_iter()
        .filter(|(_, n)| *n as f64 / non_empty.len() as f64 >= TYPE_DOMINANCE_RATIO)
        .map(|(t, _)| t)
        .next()
        .unwrap_or(DataType::Text)
}

/// 值形状: 数字 → 9，ASCII 字母 → a，其他非 ASCII 字符 → 中，符号原样
fn shape_of(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                '9'
            } else if c.is_ascii_alphabetic() {
                'a'
            } else if !c.is_ascii() && c.is_alphanumeric() {
                '中'
            } else {
                c
            }
        })
        .collect()
}

fn dominant_shape(non_empty: &[&str]) -> String {
    let mut shapes: Vec<(String, usize)> = Vec::new();
    for value in non_empty {
        let shape = shape_of(value);
        match shapes.iter_mut().find(|(s, _)| *s == shape) {
            Some(entry) => entry.1 += 1,
            None => shapes.push((shape, 1)),
        }
    }
    shapes
        .into_iter()
        .fold(None::<(String, usize)>, |best, (s, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((s, n)),
        })
        .map(|(s, _)| s)
        .unwrap_or_default()
}
