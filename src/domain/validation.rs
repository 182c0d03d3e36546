// ==========================================
// 通讯录导入管道 - 校验规则与结果
// ==========================================
// 职责: 声明式校验规则 / 单行校验结果 / 批次质量报告
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ==========================================
// CustomValidator - 自定义校验回调
// ==========================================
// 返回 Some(错误描述) 表示不通过
#[derive(Clone)]
pub struct CustomValidator(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl CustomValidator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, value: &str) -> Option<String> {
        (self.0)(value)
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomValidator(..)")
    }
}

// ==========================================
// ValidationRule - 字段校验规则
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field_name: String,
    pub required: bool,
    pub pattern: Option<String>,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub allowed_values: Option<Vec<String>>,
    #[serde(skip)]
    pub custom_validator: Option<CustomValidator>,
    pub weight: f64,
}

impl ValidationRule {
    pub fn new(field_name: impl Into<String>, weight: f64) -> Self {
        Self {
            field_name: field_name.into(),
            required: false,
            pattern: None,
            min_len: None,
            max_len: None,
            allowed_values: None,
            custom_validator: None,
            weight,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_len = min;
        self.max_len = max;
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn custom<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.custom_validator = Some(CustomValidator::new(f));
        self
    }
}

/// 默认联系人校验规则集
pub fn default_contact_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new("name", 3.0)
            .required()
            .length(Some(1), Some(50)),
        ValidationRule::new("phone", 2.0)
            .pattern(r"^\+?[0-9][0-9\s\-()]{5,19}$")
            .length(Some(7), Some(20)),
        ValidationRule::new("email", 2.0)
            .pattern(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .length(None, Some(100)),
        ValidationRule::new("company", 1.0).length(None, Some(100)),
        ValidationRule::new("position", 1.0).length(None, Some(50)),
        ValidationRule::new("address", 0.5).length(None, Some(200)),
        ValidationRule::new("birthday", 0.5).pattern(r"^\d{4}-\d{2}-\d{2}$"),
        ValidationRule::new("notes", 0.5).length(None, Some(1000)),
    ]
}

// ==========================================
// ValidationResult - 单行校验结果
// ==========================================
// 不变量: is_valid == errors 为空；warnings 单独不会使 is_valid 为 false
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub score: f64, // 0-100
}

// ==========================================
// QualityReport - 批次数据质量报告
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub excellent: usize, // >= 90
    pub good: usize,      // 70-89
    pub fair: usize,      // 50-69
    pub poor: usize,      // < 50
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub average_score: f64,
    pub distribution: ScoreDistribution,
    /// (错误描述, 次数)，最多 5 条，按次数降序
    pub top_errors: Vec<(String, usize)>,
    /// 字段 → 缺失比例
    pub missing_rates: BTreeMap<String, f64>,
    pub recommendations: Vec<String>,
}
