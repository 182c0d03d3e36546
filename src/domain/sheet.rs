// ==========================================
// 通讯录导入管道 - 表格数据模型
// ==========================================
// 职责: Sheet Ingestor 的输出结构（原始行 / 列统计）
// 红线: RawRow 读入后不可变
// ==========================================

use crate::domain::types::DataType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// RawRow - 原始行（列名 → 字符串值，保持列顺序）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    row_index: usize,
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(row_index: usize, cells: Vec<(String, String)>) -> Self {
        Self { row_index, cells }
    }

    /// 从 (列名, 值) 列表构造（测试与内存数据源使用）
    pub fn from_pairs<K, V>(row_index: usize, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            row_index,
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 行号（数据行从 0 开始，不含表头）
    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }

    /// 所有单元格均为空白
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

// ==========================================
// ColumnStats - 列统计（基于样本计算一次）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub total_count: usize,
    pub non_empty_count: usize,
    pub unique_count: usize,
    pub most_frequent_value: Option<String>,
    pub data_pattern: String,
    pub suggested_type: DataType,
}

impl ColumnStats {
    /// 数据完整度（非空比例）
    pub fn completeness(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.non_empty_count as f64 / self.total_count as f64
    }

    /// 唯一度（唯一值 / 非空值）
    pub fn uniqueness(&self) -> f64 {
        if self.non_empty_count == 0 {
            return 0.0;
        }
        self.unique_count as f64 / self.non_empty_count as f64
    }
}

// ==========================================
// SheetData - 解析后的工作表
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub column_stats: HashMap<String, ColumnStats>,
}
