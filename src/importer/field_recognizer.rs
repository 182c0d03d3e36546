// ==========================================
// 通讯录导入管道 - 字段识别器
// ==========================================
// 职责: 根据表头关键字 / 列数据类型 / 样本值模式推断 列 → 系统字段
// 策略顺序: 名称关键字 > 数据类型 > 样本模式（同分时靠前者胜出）
// 红线: 结果只依赖输入（表头顺序 / 列统计 / 样本行），完全确定
// ==========================================

use crate::domain::contact::ContactField;
use crate::domain::import::FieldMapping;
use crate::domain::sheet::{ColumnStats, RawRow};
use crate::domain::types::DataType;
use crate::i18n::t_with_args;
use crate::importer::data_cleaner::{digit_count, significant_phone_digits};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

// ===== 关键字匹配置信度 =====
const KEYWORD_EXACT: f64 = 0.95;
const KEYWORD_CONTAINS: f64 = 0.8;
const KEYWORD_PARTIAL: f64 = 0.6;
/// 纯 ASCII 表头参与反向包含的最少字符数
const REVERSE_CONTAINMENT_MIN_ASCII: usize = 3;

// ===== 类型推断置信度 =====
const TYPE_PHONE: f64 = 0.8;
const TYPE_EMAIL: f64 = 0.9;
const TYPE_DATE: f64 = 0.7;

// ===== 样本模式置信度 =====
const PATTERN_PHONE: f64 = 0.9;
const PATTERN_EMAIL: f64 = 0.95;
const PATTERN_NAME: f64 = 0.85;
/// 样本中命中模式的最低比例
const PATTERN_MIN_RATIO: f64 = 0.8;

/// 未识别列的自定义映射置信度
const CUSTOM_CONFIDENCE: f64 = 0.1;
/// 关键字段强制分配置信度
const FORCED_CONFIDENCE: f64 = 0.7;
/// 强制分配要求的最低样本一致率
const FORCED_MIN_RATIO: f64 = 0.5;

/// 关键字字典（字段顺序即平局时的优先顺序）
const FIELD_KEYWORDS: &[(ContactField, &[&str])] = &[
    (
        ContactField::Name,
        &["姓名", "名字", "联系人", "客户名称", "客户姓名", "name", "full name", "contact name"],
    ),
    (
        ContactField::Phone,
        &[
            "电话", "手机", "手机号", "手机号码", "电话号码", "联系电话", "移动电话", "公司电话",
            "办公电话", "phone", "mobile", "tel", "telephone", "cell", "work phone",
        ],
    ),
    (
        ContactField::Email,
        &[
            "邮箱", "邮件", "电子邮件", "电子邮箱", "邮件地址", "邮箱地址", "公司邮箱", "email",
            "e-mail", "mail", "email address",
        ],
    ),
    (
        ContactField::Company,
        &["公司", "单位", "公司名称", "企业", "工作单位", "company", "organization", "employer"],
    ),
    (
        ContactField::Position,
        &["职位", "职务", "岗位", "头衔", "title", "position", "job title", "role"],
    ),
    (
        ContactField::Address,
        &[
            "地址", "住址", "联系地址", "家庭住址", "公司地址", "单位地址", "address",
            "company address", "work address",
        ],
    ),
    (
        ContactField::Birthday,
        &["生日", "出生日期", "birthday", "birth date", "date of birth", "dob"],
    ),
    (
        ContactField::Notes,
        &["备注", "说明", "附注", "notes", "note", "remark", "remarks", "comment"],
    ),
    (
        ContactField::Tags,
        &["标签", "分组", "分类", "tags", "tag", "group", "label"],
    ),
];

/// 常见姓氏（姓名模式判断用）
const COMMON_SURNAMES: &str = "王李张刘陈杨黄赵吴周徐孙马朱胡郭何高林罗郑梁谢宋唐许韩冯邓曹彭曾肖田董袁潘于蒋蔡余杜叶程苏魏吕丁任沈姚卢姜崔钟谭陆汪范金石廖贾夏韦付方白邹孟熊秦邱江尹薛闫段雷侯龙史陶黎贺顾毛郝龚邵万钱严覃武戴莫孔向汤";

static CN_MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^1[3-9]\d{9}$").expect("mobile regex"));

static GENERAL_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9\s\-()]{6,19}$").expect("phone regex"));

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

// ==========================================
// RecognitionResult - 识别结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub field_mappings: Vec<FieldMapping>,
    pub overall_confidence: f64,
    pub suggestions: Vec<String>,
    pub unrecognized_columns: Vec<String>,
}

impl RecognitionResult {
    pub fn mapping_for(&self, field: &ContactField) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|m| &m.system_field == field)
    }
}

/// 单一策略给出的候选
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    field: ContactField,
    confidence: f64,
}

/// 关键字命中（用于同一策略内排序）
#[derive(Debug, Clone)]
struct KeywordHit {
    field: ContactField,
    score: f64,
    keyword_len: usize,
    order: usize,
}

// ==========================================
// FieldRecognizer
// ==========================================
pub struct FieldRecognizer {
    pattern_sample_size: usize,
}

impl Default for FieldRecognizer {
    fn default() -> Self {
        Self::new(10)
    }
}

impl FieldRecognizer {
    pub fn new(pattern_sample_size: usize) -> Self {
        Self {
            pattern_sample_size: pattern_sample_size.max(1),
        }
    }

    /// 识别全部列
    ///
    /// # 参数
    /// - headers: 有序表头
    /// - column_stats: 每列统计（缺失时不做置信度调整）
    /// - sample_rows: 样本行（通常为前 100 行）
    #[instrument(skip_all, fields(columns = headers.len(), samples = sample_rows.len()))]
    pub fn recognize(
        &self,
        headers: &[String],
        column_stats: &HashMap<String, ColumnStats>,
        sample_rows: &[RawRow],
    ) -> RecognitionResult {
        let mut field_mappings = Vec::with_capacity(headers.len());
        let mut unrecognized_columns = Vec::new();
        let mut suggestions = Vec::new();

        for header in headers {
            let stats = column_stats.get(header);
            let samples = self.sample_values(header, sample_rows);

            match self.best_candidate(header, stats, &samples) {
                Some(candidate) => {
                    let confidence = adjust_confidence(&candidate, stats);
                    debug!(
                        column = %header,
                        field = %candidate.field,
                        raw = candidate.confidence,
                        adjusted = confidence,
                        "列已识别"
                    );
                    field_mappings.push(FieldMapping::new(
                        header.clone(),
                        candidate.field,
                        confidence,
                    ));
                }
                None => {
                    debug!(column = %header, "列未识别");
                    unrecognized_columns.push(header.clone());
                    field_mappings.push(FieldMapping::new(
                        header.clone(),
                        ContactField::Custom(header.clone()),
                        CUSTOM_CONFIDENCE,
                    ));
                }
            }
        }

        self.assign_missing_critical(
            &mut field_mappings,
            &mut unrecognized_columns,
            &mut suggestions,
            sample_rows,
        );

        suggestions.extend(duplicate_target_warnings(&field_mappings));
        suggestions.extend(unrecognized_columns.iter().map(|column| {
            t_with_args("recognizer.unrecognized", &[("column", column.as_str())])
        }));

        let overall_confidence = if field_mappings.is_empty() {
            0.0
        } else {
            field_mappings.iter().map(|m| m.confidence).sum::<f64>() / field_mappings.len() as f64
        };

        RecognitionResult {
            field_mappings,
            overall_confidence,
            suggestions,
            unrecognized_columns,
        }
    }

    /// 三种策略取最高置信度；同分按 名称 > 类型 > 模式
    fn best_candidate(
        &self,
        header: &str,
        stats: Option<&ColumnStats>,
        samples: &[&str],
    ) -> Option<Candidate> {
        let candidates = [
            match_by_name(header),
            stats.and_then(match_by_type),
            match_by_pattern(samples),
        ];

        candidates
            .into_iter()
            .flatten()
            .fold(None, |best: Option<Candidate>, c| match best {
                Some(b) if b.confidence >= c.confidence => Some(b),
                _ => Some(c),
            })
    }

    fn sample_values<'a>(&self, header: &str, rows: &'a [RawRow]) -> Vec<&'a str> {
        rows.iter()
            .filter_map(|row| row.get(header))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .take(self.pattern_sample_size)
            .collect()
    }

    /// 关键字段（姓名/电话/邮箱）缺失时，从自定义列中选一致率最高者强制分配
    fn assign_missing_critical(
        &self,
        mappings: &mut [FieldMapping],
        unrecognized: &mut Vec<String>,
        suggestions: &mut Vec<String>,
        sample_rows: &[RawRow],
    ) {
        for field in ContactField::CRITICAL.iter() {
            if mappings.iter().any(|m| &m.system_field == field) {
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (idx, mapping) in mappings.iter().enumerate() {
                if !mapping.system_field.is_custom() {
                    continue;
                }
                let samples = self.sample_values(&mapping.excel_column, sample_rows);
                let ratio = consistency_ratio(field, &samples);
                if ratio >= FORCED_MIN_RATIO && best.map_or(true, |(_, r)| ratio > r) {
                    best = Some((idx, ratio));
                }
            }

            let field_key = field.key();
            match best {
                Some((idx, ratio)) => {
                    let column = mappings[idx].excel_column.clone();
                    debug!(field = %field, column = %column, ratio, "关键字段强制分配");
                    mappings[idx] = FieldMapping::new(column.clone(), field.clone(), FORCED_CONFIDENCE);
                    unrecognized.retain(|c| c != &column);
                    suggestions.push(t_with_args(
                        "recognizer.forced",
                        &[("field", field_key.as_str()), ("column", column.as_str())],
                    ));
                }
                None => suggestions.push(t_with_args(
                    "recognizer.missing_critical",
                    &[("field", field_key.as_str())],
                )),
            }
        }
    }
}

// ==========================================
// 策略 1: 名称关键字
// ==========================================

/// 只保留字母数字并小写（"E-mail" → "email"，"手机 号码" → "手机号码"）
fn normalize_header(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn match_by_name(header: &str) -> Option<Candidate> {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return None;
    }

    let mut best: Option<KeywordHit> = None;
    let mut order = 0usize;

    for (field, keywords) in FIELD_KEYWORDS {
        for keyword in keywords.iter() {
            let normalized_keyword = normalize_header(keyword);
            let score = keyword_score(header, &normalized, keyword, &normalized_keyword);

            if let Some(score) = score {
                let hit = KeywordHit {
                    field: field.clone(),
                    score,
                    keyword_len: normalized_keyword.chars().count(),
                    order,
                };
                if best.as_ref().map_or(true, |b| hit_beats(&hit, b)) {
                    best = Some(hit);
                }
            }
            order += 1;
        }
    }

    best.map(|hit| Candidate {
        field: hit.field,
        confidence: hit.score,
    })
}

fn keyword_score(
    header: &str,
    normalized: &str,
    keyword: &str,
    normalized_keyword: &str,
) -> Option<f64> {
    if normalized == normalized_keyword {
        return Some(KEYWORD_EXACT);
    }

    if normalized.contains(normalized_keyword)
        || (reverse_containment_allowed(normalized) && normalized_keyword.contains(normalized))
    {
        return Some(KEYWORD_CONTAINS);
    }

    if shares_cjk_pair(normalized, normalized_keyword) || shares_ascii_token(header, keyword) {
        return Some(KEYWORD_PARTIAL);
    }

    None
}

/// 表头被关键字包含（如 "手机" ⊂ "手机号码"）: 中文表头至少 2 字，纯 ASCII 表头至少 3 字符
///
/// "No" 之类的短缩写不应命中 "notes"
fn reverse_containment_allowed(normalized: &str) -> bool {
    let len = normalized.chars().count();
    if normalized.is_ascii() {
        len >= REVERSE_CONTAINMENT_MIN_ASCII
    } else {
        len >= 2
    }
}

/// 同一策略内的排序: 分数 > 非姓名字段 > 关键字更长 > 字典顺序
///
/// 姓名类关键字（"联系人"、"name"）常作修饰语出现，如 "联系人电话"、"company name"
fn hit_beats(hit: &KeywordHit, current: &KeywordHit) -> bool {
    if hit.score != current.score {
        return hit.score > current.score;
    }
    let hit_name = hit.field == ContactField::Name;
    let current_name = current.field == ContactField::Name;
    if hit_name != current_name {
        return current_name;
    }
    if hit.keyword_len != current.keyword_len {
        return hit.keyword_len > current.keyword_len;
    }
    hit.order < current.order
}

/// 共享连续两个非 ASCII 字符（如 "联系号码" 与 "手机号码" 共享 "号码"）
fn shares_cjk_pair(a: &str, b: &str) -> bool {
    let pairs = |s: &str| -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars
            .windows(2)
            .filter(|w| !w[0].is_ascii() && !w[1].is_ascii())
            .map(|w| (w[0], w[1]))
            .collect()
    };
    let pairs_b = pairs(b);
    pairs(a).iter().any(|p| pairs_b.contains(p))
}

/// 共享长度 ≥3 的 ASCII 单词
fn shares_ascii_token(a: &str, b: &str) -> bool {
    let tokens = |s: &str| -> Vec<String> {
        s.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| t.len() >= 3)
            .map(str::to_lowercase)
            .collect()
    };
    let tokens_b = tokens(b);
    tokens(a).iter().any(|t| tokens_b.contains(t))
}

// ==========================================
// 策略 2: 数据类型
// ==========================================
fn match_by_type(stats: &ColumnStats) -> Option<Candidate> {
    let (field, confidence) = match stats.suggested_type {
        DataType::Phone => (ContactField::Phone, TYPE_PHONE),
        DataType::Email => (ContactField::Email, TYPE_EMAIL),
        DataType::Date => (ContactField::Birthday, TYPE_DATE),
        _ => return None,
    };
    Some(Candidate { field, confidence })
}

// ==========================================
// 策略 3: 样本模式
// ==========================================
fn match_by_pattern(samples: &[&str]) -> Option<Candidate> {
    if samples.is_empty() {
        return None;
    }

    [
        (ContactField::Email, PATTERN_EMAIL),
        (ContactField::Phone, PATTERN_PHONE),
        (ContactField::Name, PATTERN_NAME),
    ]
    .into_iter()
    .find(|(field, _)| consistency_ratio(field, samples) >= PATTERN_MIN_RATIO)
    .map(|(field, confidence)| Candidate { field, confidence })
}

/// 样本中符合字段模式的比例
fn consistency_ratio(field: &ContactField, samples: &[&str]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let matcher: fn(&str) -> bool = match field {
        ContactField::Name => looks_like_person_name,
        ContactField::Phone => looks_like_phone,
        ContactField::Email => looks_like_email,
        _ => return 0.0,
    };
    let hits = samples.iter().filter(|v| matcher(v)).count();
    hits as f64 / samples.len() as f64
}

pub fn looks_like_phone(value: &str) -> bool {
    let value = value.trim();
    if CN_MOBILE.is_match(&significant_phone_digits(value)) {
        return true;
    }
    GENERAL_PHONE.is_match(value) && (7..=15).contains(&digit_count(value))
}

pub fn looks_like_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

/// 人名特征: 2-4 个字母，或含空格的字母串，或以常见姓氏开头；不含数字与 @
pub fn looks_like_person_name(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() || value.chars().any(|c| c.is_ascii_digit() || c == '@') {
        return false;
    }

    let len = value.chars().count();
    let letters_only = value.chars().all(|c| c.is_alphabetic() || c == '·');
    if letters_only && (2..=4).contains(&len) {
        return true;
    }

    if value.contains(' ')
        && len <= 30
        && value
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '.' || c == '-')
    {
        return true;
    }

    value
        .chars()
        .next()
        .map_or(false, |first| COMMON_SURNAMES.contains(first) && len <= 5)
}

// ==========================================
// 置信度调整
// ==========================================

/// × 非空比例；电话/邮箱再 × (0.5 + 0.5 × 唯一度)
fn adjust_confidence(candidate: &Candidate, stats: Option<&ColumnStats>) -> f64 {
    let Some(stats) = stats else {
        return candidate.confidence;
    };

    let mut confidence = candidate.confidence * stats.completeness();
    if matches!(candidate.field, ContactField::Phone | ContactField::Email) {
        confidence *= 0.5 + 0.5 * stats.uniqueness();
    }
    confidence
}

/// 多列映射到同一标准字段时给出提示（映射本身保留）
fn duplicate_target_warnings(mappings: &[FieldMapping]) -> Vec<String> {
    let mut by_field: BTreeMap<ContactField, Vec<&str>> = BTreeMap::new();
    for mapping in mappings.iter().filter(|m| !m.system_field.is_custom()) {
        by_field
            .entry(mapping.system_field.clone())
            .or_default()
            .push(&mapping.excel_column);
    }

    by_field
        .into_iter()
        .filter(|(_, columns)| columns.len() > 1)
        .map(|(field, columns)| {
            t_with_args(
                "recognizer.duplicate_target",
                &[
                    ("field", field.key().as_str()),
                    ("columns", columns.join(", ").as_str()),
                ],
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::sheet_ingestor::compute_column_stats;

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> (Vec<String>, HashMap<String, ColumnStats>, Vec<RawRow>) {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows: Vec<RawRow> = rows
            .iter()
            .enumerate()
            .map(|(i, values)| {
                RawRow::from_pairs(i, headers.iter().cloned().zip(values.iter().map(|v| v.to_string())))
            })
            .collect();
        let stats = compute_column_stats(&headers, &rows, 100);
        (headers, stats, rows)
    }

    #[test]
    fn test_mobile_header_with_cn_samples() {
        let (headers, stats, rows) = sheet(
            &["手机号码"],
            &[&["13800138000"], &["13900139000"], &["15012345678"], &["18600001111"]],
        );

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);
        let mapping = &result.field_mappings[0];

        assert_eq!(mapping.system_field, ContactField::Phone);
        assert!(mapping.confidence >= 0.85);
    }

    #[test]
    fn test_exact_keyword_confidence() {
        for (header, field) in [
            ("姓名", ContactField::Name),
            ("Email", ContactField::Email),
            ("公司名称", ContactField::Company),
            ("备注", ContactField::Notes),
        ] {
            let hit = match_by_name(header).unwrap();
            assert_eq!(hit.field, field, "header {}", header);
            assert!(hit.confidence >= 0.95);
        }
    }

    #[test]
    fn test_name_keyword_yields_to_other_fields() {
        assert_eq!(match_by_name("联系人电话").unwrap().field, ContactField::Phone);
        assert_eq!(match_by_name("Company Name").unwrap().field, ContactField::Company);
        assert_eq!(match_by_name("联系人电话").unwrap().confidence, KEYWORD_CONTAINS);
    }

    #[test]
    fn test_partial_keyword() {
        let hit = match_by_name("联系号码").unwrap();
        assert_eq!(hit.field, ContactField::Phone);
        assert_eq!(hit.confidence, KEYWORD_PARTIAL);
        assert!(match_by_name("xyz").is_none());
    }

    #[test]
    fn test_short_ascii_header_is_not_reverse_contained() {
        assert!(match_by_name("No").is_none());
        assert!(match_by_name("No.").is_none());
        // 中文两字表头、三字符以上的英文表头仍可被更长关键字包含
        let hit = match_by_name("号码").unwrap();
        assert_eq!(hit.field, ContactField::Phone);
        assert_eq!(hit.confidence, KEYWORD_CONTAINS);
        let hit = match_by_name("Mob").unwrap();
        assert_eq!(hit.field, ContactField::Phone);
        assert_eq!(hit.confidence, KEYWORD_CONTAINS);
    }

    #[test]
    fn test_short_ascii_header_falls_back_to_custom() {
        let (headers, stats, rows) = sheet(&["姓名", "No"], &[&["张三", "1"], &["李四", "2"]]);

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);

        assert_eq!(result.field_mappings[1].system_field, ContactField::Custom("No".to_string()));
        assert!(result.mapping_for(&ContactField::Notes).is_none());
    }

    #[test]
    fn test_unrecognized_column_becomes_custom() {
        let (headers, stats, rows) = sheet(
            &["姓名", "微信号"],
            &[&["张三", "wx_001"], &["李四", "wx_002"]],
        );

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);

        assert_eq!(result.unrecognized_columns, vec!["微信号".to_string()]);
        let custom = &result.field_mappings[1];
        assert_eq!(custom.system_field, ContactField::Custom("微信号".to_string()));
        assert_eq!(custom.confidence, CUSTOM_CONFIDENCE);
    }

    #[test]
    fn test_completeness_and_uniqueness_adjustment() {
        // 一半为空，且非空值全部相同
        let (headers, stats, rows) = sheet(
            &["邮箱"],
            &[&["a@b.com"], &[""], &["a@b.com"], &[""]],
        );

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);
        let mapping = &result.field_mappings[0];

        // 0.95 × 0.5 × (0.5 + 0.5 × 0.5)
        assert_eq!(mapping.system_field, ContactField::Email);
        assert!((mapping.confidence - 0.95 * 0.5 * 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_recognizes_headerless_columns() {
        let (headers, stats, rows) = sheet(
            &["列1", "列2"],
            &[
                &["张三", "zhangsan@qq.com"],
                &["李四", "lisi@163.com"],
                &["王小明", "wxm@example.org"],
            ],
        );

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);

        assert_eq!(result.field_mappings[0].system_field, ContactField::Name);
        assert!((result.field_mappings[0].confidence - PATTERN_NAME).abs() < 1e-9);
        // 邮箱: 类型 0.9 与模式 0.95 取高
        assert_eq!(result.field_mappings[1].system_field, ContactField::Email);
        assert!(result.unrecognized_columns.is_empty());
    }

    #[test]
    fn test_missing_critical_field_is_forced() {
        // "编码" 列中 2/3 为手机号，达不到模式阈值，但足以强制分配
        let (headers, stats, rows) = sheet(
            &["姓名", "编码"],
            &[
                &["张三", "13800138000"],
                &["李四", "N/A"],
                &["王五", "13900139000"],
            ],
        );

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);
        let phone = result.mapping_for(&ContactField::Phone).unwrap();

        assert_eq!(phone.excel_column, "编码");
        assert_eq!(phone.confidence, FORCED_CONFIDENCE);
        assert!(result.unrecognized_columns.is_empty());
    }

    #[test]
    fn test_duplicate_target_is_kept_and_flagged() {
        let (headers, stats, rows) = sheet(
            &["手机", "电话"],
            &[&["13800138000", "13900139000"]],
        );

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);

        let phones = result
            .field_mappings
            .iter()
            .filter(|m| m.system_field == ContactField::Phone)
            .count();
        assert_eq!(phones, 2);
        assert!(result.suggestions.iter().any(|s| s.contains("手机, 电话")));
    }

    #[test]
    fn test_recognition_is_deterministic() {
        let (headers, stats, rows) = sheet(
            &["姓名", "联系方式", "单位", "Remark", "其他"],
            &[
                &["张三", "13800138000", "某某科技", "老客户", "x"],
                &["李四", "lisi@qq.com", "某某贸易", "", "y"],
            ],
        );

        let recognizer = FieldRecognizer::default();
        let first = recognizer.recognize(&headers, &stats, &rows);
        for _ in 0..5 {
            assert_eq!(recognizer.recognize(&headers, &stats, &rows), first);
        }
    }

    #[test]
    fn test_overall_confidence_is_mean() {
        let (headers, stats, rows) = sheet(&["姓名", "微信号"], &[&["张三", "wx_01"]]);

        let result = FieldRecognizer::default().recognize(&headers, &stats, &rows);
        let expected = (0.95 + CUSTOM_CONFIDENCE) / 2.0;
        assert!((result.overall_confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_person_name_heuristic() {
        assert!(looks_like_person_name("张三"));
        assert!(looks_like_person_name("Zhang San"));
        assert!(looks_like_person_name("欧阳明日"));
        assert!(!looks_like_person_name("13800138000"));
        assert!(!looks_like_person_name("a@b.com"));
        assert!(!looks_like_person_name("北京市海淀区中关村大街"));
    }
}
