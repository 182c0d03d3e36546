// ==========================================
// 通讯录导入管道 - 重复检测结果
// ==========================================

use crate::domain::types::{DuplicateResolution, MatchType};
use serde::{Deserialize, Serialize};

/// 单个匹配器命中的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub existing_id: String,
    pub match_type: MatchType,
    pub confidence: f64,
    /// "<字段>: <目标值> -> <来源值>"
    pub differences: Vec<String>,
}

impl DuplicateMatch {
    /// 合并评分 = 置信度 × 类型权重 × max(0.5, 1 - 0.05 × 差异数)
    pub fn merge_score(&self) -> f64 {
        let penalty = (1.0 - 0.05 * self.differences.len() as f64).max(0.5);
        self.confidence * self.match_type.merge_weight() * penalty
    }
}

/// 单条候选记录的重复检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    /// 按所选策略决出的最佳匹配
    pub best_match: Option<DuplicateMatch>,
    /// 所有命中的匹配器（按匹配器优先级顺序）
    pub matches: Vec<DuplicateMatch>,
    pub suggested_resolution: Option<DuplicateResolution>,
}

impl DuplicateCheckResult {
    pub fn none() -> Self {
        Self {
            is_duplicate: false,
            best_match: None,
            matches: Vec::new(),
            suggested_resolution: None,
        }
    }
}
