// ==========================================
// 通讯录导入管道 - 数据校验器
// ==========================================
// 职责: 单行规则校验 / 软性警告 / 跨字段检查 / 批次质量报告
// 红线: 警告永远不影响 is_valid；单字段首个失败即停止
// ==========================================

use crate::domain::contact::MappedRecord;
use crate::domain::validation::{
    default_contact_rules, QualityReport, ScoreDistribution, ValidationResult, ValidationRule,
};
use crate::i18n::{t, t_with_args};
use crate::importer::error::{ImportError, ImportResult};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::instrument;

/// 缺失率超过该值的字段进入报告
const MISSING_RATE_THRESHOLD: f64 = 0.3;
/// 报告中保留的高频错误条数
const TOP_ERROR_LIMIT: usize = 5;
/// 平均分低于该值时给出清理建议
const LOW_AVERAGE_SCORE: f64 = 70.0;

/// 高级职位关键字（与公司名长度交叉检查）
const SENIOR_TITLES: [&str; 12] = [
    "总", "经理", "总监", "董事", "ceo", "cto", "cfo", "coo", "director", "president", "chief",
    "vp",
];

/// 已编译的规则
struct CompiledRule {
    rule: ValidationRule,
    regex: Option<Regex>,
}

/// 单字段检查结果
enum FieldOutcome {
    Passed,
    Warned(Vec<String>),
    Failed(String),
}

pub struct DataValidator {
    rules: Vec<CompiledRule>,
    total_weight: f64,
}

impl DataValidator {
    /// 创建校验器（空规则集使用默认联系人规则）
    ///
    /// # 错误
    /// - 正则无法编译或权重非正 → InvalidValidationRule
    pub fn new(rules: Vec<ValidationRule>) -> ImportResult<Self> {
        let rules = if rules.is_empty() {
            default_contact_rules()
        } else {
            rules
        };

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if !(rule.weight > 0.0) {
                return Err(ImportError::InvalidValidationRule {
                    field: rule.field_name.clone(),
                    message: format!("weight must be positive, got {}", rule.weight),
                });
            }
            let regex = match &rule.pattern {
                Some(p) => Some(Regex::new(p).map_err(|e| ImportError::InvalidValidationRule {
                    field: rule.field_name.clone(),
                    message: e.to_string(),
                })?),
                None => None,
            };
            compiled.push(CompiledRule { rule, regex });
        }

        let total_weight = compiled.iter().map(|c| c.rule.weight).sum();
        Ok(Self {
            rules: compiled,
            total_weight,
        })
    }

    /// 校验单行
    pub fn validate(&self, record: &MappedRecord) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut suggestions = Vec::new();
        let mut earned = 0.0;

        for compiled in &self.rules {
            let field = compiled.rule.field_name.as_str();
            match self.check_field(compiled, record.get(field)) {
                FieldOutcome::Passed => earned += compiled.rule.weight,
                FieldOutcome::Warned(field_warnings) => {
                    earned += compiled.rule.weight / 2.0;
                    warnings.extend(field_warnings);
                }
                FieldOutcome::Failed(error) => {
                    if compiled.regex.is_some() && record.get(field).is_some() {
                        suggestions.push(t_with_args("validator.suggest_fix_format", &[("field", field)]));
                    }
                    errors.push(error);
                }
            }
        }

        warnings.extend(cross_field_warnings(record));
        self.check_completeness(record, &mut errors, &mut warnings, &mut suggestions);

        let score = if self.total_weight > 0.0 {
            (earned / self.total_weight * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            suggestions,
            score,
        }
    }

    /// 批量校验（保持输入顺序）
    #[instrument(skip_all, fields(rows = records.len()))]
    pub fn validate_batch(&self, records: &[MappedRecord]) -> Vec<ValidationResult> {
        records.iter().map(|r| self.validate(r)).collect()
    }

    /// 顺序: 必填 → 正则 → 长度 → 允许值 → 自定义；通过后再看软性警告
    fn check_field(&self, compiled: &CompiledRule, value: Option<&str>) -> FieldOutcome {
        let rule = &compiled.rule;
        let field = rule.field_name.as_str();

        let Some(value) = value else {
            return if rule.required {
                FieldOutcome::Failed(t_with_args("validator.required", &[("field", field)]))
            } else {
                FieldOutcome::Passed
            };
        };

        if let Some(regex) = &compiled.regex {
            if !regex.is_match(value) {
                return FieldOutcome::Failed(t_with_args("validator.pattern", &[("field", field)]));
            }
        }

        let len = value.chars().count();
        if let Some(min) = rule.min_len {
            if len < min {
                return FieldOutcome::Failed(t_with_args(
                    "validator.too_short",
                    &[("field", field), ("min", min.to_string().as_str())],
                ));
            }
        }
        if let Some(max) = rule.max_len {
            if len > max {
                return FieldOutcome::Failed(t_with_args(
                    "validator.too_long",
                    &[("field", field), ("max", max.to_string().as_str())],
                ));
            }
        }

        if let Some(allowed) = &rule.allowed_values {
            if !allowed.iter().any(|a| a == value) {
                return FieldOutcome::Failed(t_with_args(
                    "validator.not_allowed",
                    &[("field", field)],
                ));
            }
        }

        if let Some(custom) = &rule.custom_validator {
            if let Some(message) = custom.check(value) {
                return FieldOutcome::Failed(t_with_args(
                    "validator.custom",
                    &[("field", field), ("message", message.as_str())],
                ));
            }
        }

        let field_warnings = soft_warnings(field, value);
        if field_warnings.is_empty() {
            FieldOutcome::Passed
        } else {
            FieldOutcome::Warned(field_warnings)
        }
    }

    fn check_completeness(
        &self,
        record: &MappedRecord,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
        suggestions: &mut Vec<String>,
    ) {
        // 规则集中已有必填姓名时不重复报错
        let name_rule_required = self
            .rules
            .iter()
            .any(|c| c.rule.field_name == "name" && c.rule.required);
        if record.get("name").is_none() && !name_rule_required {
            errors.push(t("validator.missing_name"));
        }

        if record.get("phone").is_none() && record.get("email").is_none() {
            warnings.push(t("validator.missing_contact"));
            suggestions.push(t("validator.suggest_contact"));
        }
    }

    /// 批次质量报告
    ///
    /// records 与 results 一一对应
    pub fn quality_report(
        &self,
        records: &[MappedRecord],
        results: &[ValidationResult],
    ) -> QualityReport {
        let total_rows = results.len();
        if total_rows == 0 {
            return QualityReport::default();
        }

        let mut distribution = ScoreDistribution::default();
        for result in results {
            match result.score {
                s if s >= 90.0 => distribution.excellent += 1,
                s if s >= 70.0 => distribution.good += 1,
                s if s >= 50.0 => distribution.fair += 1,
                _ => distribution.poor += 1,
            }
        }

        let average_score = results.iter().map(|r| r.score).sum::<f64>() / total_rows as f64;

        let mut error_counts: HashMap<&str, usize> = HashMap::new();
        for error in results.iter().flat_map(|r| r.errors.iter()) {
            *error_counts.entry(error.as_str()).or_default() += 1;
        }
        let mut top_errors: Vec<(String, usize)> = error_counts
            .into_iter()
            .map(|(e, n)| (e.to_string(), n))
            .collect();
        top_errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_errors.truncate(TOP_ERROR_LIMIT);

        let mut missing_rates = BTreeMap::new();
        if !records.is_empty() {
            for compiled in &self.rules {
                let field = compiled.rule.field_name.as_str();
                let missing = records.iter().filter(|r| r.get(field).is_none()).count();
                let rate = missing as f64 / records.len() as f64;
                if rate > MISSING_RATE_THRESHOLD {
                    missing_rates.insert(field.to_string(), rate);
                }
            }
        }

        let mut recommendations = Vec::new();
        for (field, rate) in &missing_rates {
            let percent = format!("{:.0}", rate * 100.0);
            recommendations.push(t_with_args(
                "validator.recommend_missing",
                &[("field", field.as_str()), ("rate", percent.as_str())],
            ));
        }
        if average_score < LOW_AVERAGE_SCORE {
            let score = format!("{:.1}", average_score);
            recommendations.push(t_with_args(
                "validator.recommend_low_score",
                &[("score", score.as_str())],
            ));
        }
        if let Some((error, count)) = top_errors.first() {
            let count = count.to_string();
            recommendations.push(t_with_args(
                "validator.recommend_top_error",
                &[("error", error.as_str()), ("count", count.as_str())],
            ));
        }

        QualityReport {
            total_rows,
            valid_rows: results.iter().filter(|r| r.is_valid).count(),
            average_score,
            distribution,
            top_errors,
            missing_rates,
            recommendations,
        }
    }
}

// ==========================================
// 软性警告（结构校验通过后）
// ==========================================
fn soft_warnings(field: &str, value: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    match field {
        "email" => {
            let lower = value.to_lowercase();
            if lower.contains("test") || lower.contains("example") {
                warnings.push(t_with_args(
                    "validator.warn_placeholder_email",
                    &[("value", value)],
                ));
            }
        }
        "phone" => {
            let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.starts_with("123") || digits.starts_with("000") {
                warnings.push(t_with_args("validator.warn_phone_prefix", &[("value", value)]));
            }
        }
        _ => {}
    }

    if value.chars().any(char::is_control) {
        warnings.push(t_with_args("validator.warn_control_chars", &[("field", field)]));
    }

    if has_repeated_run(value, 4) {
        warnings.push(t_with_args("validator.warn_repeated_chars", &[("field", field)]));
    }

    warnings
}

/// 是否存在长度 ≥ run 的相同字符连续段
fn has_repeated_run(value: &str, run: usize) -> bool {
    let chars: Vec<char> = value.chars().collect();
    chars.windows(run).any(|w| w.iter().all(|c| *c == w[0]))
}

// ==========================================
// 跨字段检查（只产生警告）
// ==========================================
fn cross_field_warnings(record: &MappedRecord) -> Vec<String> {
    let mut warnings = Vec::new();
    let name = record.get("name");
    let company = record.get("company");

    if let (Some(name), Some(company)) = (name, company) {
        if name.chars().count() >= 2 && company.contains(name) {
            warnings.push(t("validator.warn_name_in_company"));
        }
    }

    if let (Some(phone), Some(email)) = (record.get("phone"), record.get("email")) {
        let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= 4 {
            let last_four: String = digits[digits.len() - 4..].iter().collect();
            let local_part = email.split('@').next().unwrap_or_default();
            if local_part.contains(&last_four) {
                warnings.push(t("validator.warn_phone_in_email"));
            }
        }
    }

    if let (Some(position), Some(company)) = (record.get("position"), company) {
        let lower = position.to_lowercase();
        let senior = SENIOR_TITLES.iter().any(|title| lower.contains(title));
        if senior && company.chars().count() < 3 {
            warnings.push(t_with_args(
                "validator.warn_title_company",
                &[("position", position), ("company", company)],
            ));
        }
    }

    warnings
}
