// ==========================================
// 通讯录导入管道 - 重复检测与合并
// ==========================================
// 职责: 基于快照的重复检测 / 最佳匹配选择 / 记录合并
// 匹配器顺序: 精确电话 > 精确邮箱 > 相似姓名 > 相似电话 > 公司+姓名组合
// 红线: 快照在检测开始时读取一次，检测过程中不读 Store
// ==========================================

use crate::domain::contact::{Contact, ContactField};
use crate::domain::duplicate::{DuplicateCheckResult, DuplicateMatch};
use crate::domain::types::{DuplicateResolution, MatchType, MergeStrategy};
use crate::importer::data_cleaner::{
    digit_count, normalize_email, normalize_phone, significant_phone_digits,
};
use crate::importer::similarity::normalized_similarity;
use std::collections::BTreeMap;
use tracing::debug;

// ===== 置信度 =====
const EXACT_PHONE_CONFIDENCE: f64 = 0.95;
const EXACT_EMAIL_CONFIDENCE: f64 = 0.90;
const SIMILAR_NAME_THRESHOLD: f64 = 0.85;
const SIMILAR_NAME_FACTOR: f64 = 0.8;
const SIMILAR_PHONE_CONFIDENCE: f64 = 0.75;
const SIMILAR_PHONE_MIN_DIGITS: usize = 7;
const COMBO_COMPANY_THRESHOLD: f64 = 0.9;
const COMBO_NAME_THRESHOLD: f64 = 0.7;
const COMBO_FACTOR: f64 = 0.7;

/// 备注合并分隔符
const NOTES_SEPARATOR: &str = "\n---\n";
/// 完整手机号位数
const FULL_PHONE_DIGITS: usize = 11;

/// 参与差异比较的字段
const DIFF_FIELDS: [ContactField; 4] = [
    ContactField::Name,
    ContactField::Phone,
    ContactField::Email,
    ContactField::Company,
];

// ==========================================
// 快照条目（预先计算匹配键）
// ==========================================
#[derive(Debug, Clone)]
struct SnapshotEntry {
    id: String,
    contact: Contact,
    phone_key: Option<String>,
    email_key: Option<String>,
    significant_phone: Option<String>,
}

impl SnapshotEntry {
    fn new(id: String, contact: Contact) -> Self {
        let phone_key = contact
            .phone
            .as_deref()
            .map(normalize_phone)
            .filter(|p| !p.is_empty());
        let email_key = contact
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());
        let significant_phone = contact
            .phone
            .as_deref()
            .map(significant_phone_digits)
            .filter(|p| p.len() >= SIMILAR_PHONE_MIN_DIGITS);

        Self {
            id,
            contact,
            phone_key,
            email_key,
            significant_phone,
        }
    }
}

/// 匹配器（闭合集合，按检测顺序排列）
#[derive(Debug, Clone, Copy)]
enum Matcher {
    ExactPhone,
    ExactEmail,
    SimilarName,
    SimilarPhone,
    CompanyName,
}

impl Matcher {
    const ORDER: [Matcher; 5] = [
        Matcher::ExactPhone,
        Matcher::ExactEmail,
        Matcher::SimilarName,
        Matcher::SimilarPhone,
        Matcher::CompanyName,
    ];

    fn match_type(self) -> MatchType {
        match self {
            Matcher::ExactPhone => MatchType::ExactPhone,
            Matcher::ExactEmail => MatchType::ExactEmail,
            Matcher::SimilarName => MatchType::SimilarName,
            Matcher::SimilarPhone => MatchType::SimilarPhone,
            Matcher::CompanyName => MatchType::SimilarCompany,
        }
    }

    /// 候选与快照条目的匹配置信度；None 表示未命中
    fn score(self, candidate: &SnapshotEntry, entry: &SnapshotEntry) -> Option<f64> {
        match self {
            Matcher::ExactPhone => match (&candidate.phone_key, &entry.phone_key) {
                (Some(a), Some(b)) if a == b => Some(EXACT_PHONE_CONFIDENCE),
                _ => None,
            },
            Matcher::ExactEmail => match (&candidate.email_key, &entry.email_key) {
                (Some(a), Some(b)) if a == b => Some(EXACT_EMAIL_CONFIDENCE),
                _ => None,
            },
            Matcher::SimilarName => {
                let (a, b) = (candidate.contact.name.trim(), entry.contact.name.trim());
                if a.is_empty() || b.is_empty() {
                    return None;
                }
                let sim = normalized_similarity(a, b);
                (sim >= SIMILAR_NAME_THRESHOLD).then(|| sim * SIMILAR_NAME_FACTOR)
            }
            Matcher::SimilarPhone => match (&candidate.significant_phone, &entry.significant_phone) {
                (Some(a), Some(b)) => {
                    // 区号已剥离；较短号码整体作为公共尾号，至少 7 位
                    let tail = a.len().min(b.len());
                    (tail >= SIMILAR_PHONE_MIN_DIGITS && a[a.len() - tail..] == b[b.len() - tail..])
                        .then_some(SIMILAR_PHONE_CONFIDENCE)
                }
                _ => None,
            },
            Matcher::CompanyName => {
                let company_a = candidate.contact.company.as_deref().map(str::trim).unwrap_or("");
                let company_b = entry.contact.company.as_deref().map(str::trim).unwrap_or("");
                if company_a.is_empty() || company_b.is_empty() {
                    return None;
                }
                let company_sim = normalized_similarity(company_a, company_b);
                let name_sim = normalized_similarity(&candidate.contact.name, &entry.contact.name);
                (company_sim >= COMBO_COMPANY_THRESHOLD && name_sim >= COMBO_NAME_THRESHOLD)
                    .then(|| (0.6 * company_sim + 0.4 * name_sim) * COMBO_FACTOR)
            }
        }
    }
}

// ==========================================
// DuplicateDetector
// ==========================================
pub struct DuplicateDetector {
    snapshot: Vec<SnapshotEntry>,
}

impl DuplicateDetector {
    /// 以 Store 快照创建（无 ID 的联系人忽略）
    pub fn new(existing: Vec<Contact>) -> Self {
        let snapshot = existing
            .into_iter()
            .filter_map(|c| c.id.clone().map(|id| SnapshotEntry::new(id, c)))
            .collect();
        Self { snapshot }
    }

    /// 追加候选（同一文件中先出现的有效行）
    pub fn add_candidate(&mut self, id: impl Into<String>, contact: Contact) {
        self.snapshot.push(SnapshotEntry::new(id.into(), contact));
    }

    pub fn snapshot_len(&self) -> usize {
        self.snapshot.len()
    }

    /// 检测候选联系人是否重复
    ///
    /// # 参数
    /// - contact: 待导入的联系人
    /// - resolution: 预期处理方式；MERGE 按合并评分选最佳匹配，其余按置信度
    pub fn detect(&self, contact: &Contact, resolution: DuplicateResolution) -> DuplicateCheckResult {
        let candidate = SnapshotEntry::new(String::new(), contact.clone());

        let matches: Vec<DuplicateMatch> = Matcher::ORDER
            .iter()
            .filter_map(|matcher| self.run_matcher(*matcher, &candidate))
            .collect();

        if matches.is_empty() {
            return DuplicateCheckResult::none();
        }

        let best_match = select_best(&matches, resolution).cloned();
        if let Some(best) = &best_match {
            debug!(
                target_id = %best.existing_id,
                match_type = best.match_type.as_str(),
                confidence = best.confidence,
                matches = matches.len(),
                "命中重复"
            );
        }

        DuplicateCheckResult {
            is_duplicate: true,
            best_match,
            matches,
            suggested_resolution: Some(resolution),
        }
    }

    /// 单个匹配器扫描整个快照，取最高置信度（同分取快照中靠前者）
    fn run_matcher(&self, matcher: Matcher, candidate: &SnapshotEntry) -> Option<DuplicateMatch> {
        let mut best: Option<(&SnapshotEntry, f64)> = None;
        for entry in &self.snapshot {
            if let Some(score) = matcher.score(candidate, entry) {
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((entry, score));
                }
            }
        }

        best.map(|(entry, confidence)| DuplicateMatch {
            existing_id: entry.id.clone(),
            match_type: matcher.match_type(),
            confidence,
            differences: differences(&entry.contact, &candidate.contact),
        })
    }
}

/// 选择最佳匹配（同分取靠前的匹配器）
fn select_best(matches: &[DuplicateMatch], resolution: DuplicateResolution) -> Option<&DuplicateMatch> {
    let key = |m: &DuplicateMatch| match resolution {
        DuplicateResolution::Merge => m.merge_score(),
        _ => m.confidence,
    };

    matches.iter().fold(None, |best: Option<&DuplicateMatch>, m| match best {
        Some(b) if key(b) >= key(m) => Some(b),
        _ => Some(m),
    })
}

/// 差异列表 "<字段>: <目标值> -> <来源值>"
pub fn differences(target: &Contact, source: &Contact) -> Vec<String> {
    DIFF_FIELDS
        .iter()
        .filter_map(|field| {
            let t = target.field_value(field).unwrap_or("").trim();
            let s = source.field_value(field).unwrap_or("").trim();
            (t != s).then(|| format!("{}: {} -> {}", field.key(), t, s))
        })
        .collect()
}

// ==========================================
// 记录合并
// ==========================================

/// 合并结果
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub contact: Contact,
    /// MANUAL 策略: 目标保持不变，等待人工处理
    pub requires_manual: bool,
}

/// 将 source 合并进 target（返回新值，不修改入参）
///
/// 结果始终保留 target 的 id 与 created_at
pub fn merge_contacts(target: &Contact, source: &Contact, strategy: MergeStrategy) -> MergeOutcome {
    let contact = match strategy {
        MergeStrategy::PreserveBest => preserve_best(target, source),
        MergeStrategy::PreserveTarget => preserve_target(target, source),
        MergeStrategy::PreserveSource => Contact {
            id: target.id.clone(),
            created_at: target.created_at,
            updated_at: target.updated_at,
            ..source.clone()
        },
        MergeStrategy::Manual => {
            return MergeOutcome {
                contact: target.clone(),
                requires_manual: true,
            }
        }
    };

    MergeOutcome {
        contact,
        requires_manual: false,
    }
}

fn preserve_best(target: &Contact, source: &Contact) -> Contact {
    Contact {
        id: target.id.clone(),
        name: pick_longer_str(&target.name, &source.name),
        phone: pick_phone(&target.phone, &source.phone),
        email: pick_email(&target.email, &source.email),
        company: pick_longer(&target.company, &source.company),
        position: pick_longer(&target.position, &source.position),
        address: pick_longer(&target.address, &source.address),
        birthday: pick_longer(&target.birthday, &source.birthday),
        notes: merge_notes(&target.notes, &source.notes),
        tags: union_tags(&target.tags, &source.tags),
        custom_fields: union_custom(&target.custom_fields, &source.custom_fields),
        created_at: target.created_at,
        updated_at: target.updated_at,
    }
}

fn preserve_target(target: &Contact, source: &Contact) -> Contact {
    let fill = |t: &Option<String>, s: &Option<String>| non_blank(t).or_else(|| non_blank(s));

    Contact {
        id: target.id.clone(),
        name: if target.name.trim().is_empty() {
            source.name.clone()
        } else {
            target.name.clone()
        },
        phone: fill(&target.phone, &source.phone),
        email: fill(&target.email, &source.email),
        company: fill(&target.company, &source.company),
        position: fill(&target.position, &source.position),
        address: fill(&target.address, &source.address),
        birthday: fill(&target.birthday, &source.birthday),
        notes: fill(&target.notes, &source.notes),
        tags: union_tags(&target.tags, &source.tags),
        custom_fields: union_custom(&target.custom_fields, &source.custom_fields),
        created_at: target.created_at,
        updated_at: target.updated_at,
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// 非空且更长者；等长取 target
fn pick_longer(target: &Option<String>, source: &Option<String>) -> Option<String> {
    match (non_blank(target), non_blank(source)) {
        (Some(t), Some(s)) => Some(pick_longer_str(&t, &s)),
        (t, s) => t.or(s),
    }
}

fn pick_longer_str(target: &str, source: &str) -> String {
    let t_len = target.trim().chars().count();
    let s_len = source.trim().chars().count();
    if s_len > t_len {
        source.to_string()
    } else {
        target.to_string()
    }
}

/// 电话优先取 ≥11 位数字的号码
fn pick_phone(target: &Option<String>, source: &Option<String>) -> Option<String> {
    match (non_blank(target), non_blank(source)) {
        (Some(t), Some(s)) => {
            let t_full = digit_count(&t) >= FULL_PHONE_DIGITS;
            let s_full = digit_count(&s) >= FULL_PHONE_DIGITS;
            match (t_full, s_full) {
                (true, false) => Some(t),
                (false, true) => Some(s),
                _ => Some(pick_longer_str(&t, &s)),
            }
        }
        (t, s) => t.or(s),
    }
}

/// 邮箱优先取含 "@" 的值（target 优先）
fn pick_email(target: &Option<String>, source: &Option<String>) -> Option<String> {
    match (non_blank(target), non_blank(source)) {
        (Some(t), Some(s)) => match (t.contains('@'), s.contains('@')) {
            (true, _) => Some(t),
            (false, true) => Some(s),
            (false, false) => Some(pick_longer_str(&t, &s)),
        },
        (t, s) => t.or(s),
    }
}

/// 备注拼接（target 在前，相同内容不重复）
fn merge_notes(target: &Option<String>, source: &Option<String>) -> Option<String> {
    match (non_blank(target), non_blank(source)) {
        (Some(t), Some(s)) if t.trim() == s.trim() || t.contains(s.trim()) => Some(t),
        (Some(t), Some(s)) => Some(format!("{}{}{}", t, NOTES_SEPARATOR, s)),
        (t, s) => t.or(s),
    }
}

fn union_tags(target: &[String], source: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(target.len() + source.len());
    for tag in target.iter().chain(source.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

/// 自定义字段并集，键冲突时 target 优先
fn union_custom(
    target: &BTreeMap<String, String>,
    source: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = source.clone();
    merged.extend(target.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
