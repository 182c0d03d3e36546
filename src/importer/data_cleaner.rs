// ==========================================
// 通讯录导入管道 - 数据清洗器实现
// ==========================================
// 职责: TRIM / NULL 标准化 / 姓名空白 / 邮箱小写 / 生日格式 / 电话号码归一
// ==========================================

use crate::importer::contact_importer_trait::DataCleaner as DataCleanerTrait;
use chrono::NaiveDate;

/// 生日可接受的输入格式
const BIRTHDAY_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%Y年%m月%d日",
    "%m/%d/%Y",
];

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.trim().to_string()
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn clean_name(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn clean_email(&self, value: &str) -> String {
        normalize_email(value)
    }

    fn clean_phone(&self, value: &str) -> String {
        value
            .trim()
            .chars()
            .map(to_half_width)
            .collect::<String>()
    }

    fn normalize_birthday(&self, value: &str) -> String {
        let trimmed = value.trim();
        BIRTHDAY_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| trimmed.to_string())
    }
}

/// 全角数字与常见符号转半角
fn to_half_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        '＋' => '+',
        '－' | '—' => '-',
        '（' => '(',
        '）' => ')',
        '　' => ' ',
        _ => c,
    }
}

/// 邮箱归一: TRIM + 小写
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// 电话归一: 去除空白与标点，只保留字母数字
pub fn normalize_phone(value: &str) -> String {
    value
        .chars()
        .map(to_half_width)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// 固话本地号码最少位数
const LOCAL_NUMBER_MIN_DIGITS: usize = 7;

/// 电话有效号码: 只保留数字，并去掉国家码 / 长途区号前缀
///
/// - 0086 / +86 / 86 开头的 13 位 → 去掉 86
/// - 手机号（含拨号前缀 0）→ 11 位手机号
/// - 固话: 前导 0 + 区号（010 / 02x 为两位，其余三位）→ 本地号码
pub fn significant_phone_digits(value: &str) -> String {
    let digits: String = value
        .chars()
        .map(to_half_width)
        .filter(|c| c.is_ascii_digit())
        .collect();

    let without_country = if let Some(rest) = digits.strip_prefix("0086") {
        rest.to_string()
    } else if digits.len() == 13 && digits.starts_with("86") {
        digits[2..].to_string()
    } else {
        digits
    };

    let trimmed = without_country.trim_start_matches('0');
    if is_cn_mobile(trimmed) {
        return trimmed.to_string();
    }

    if let Some(rest) = without_country.strip_prefix('0') {
        let area_len = if rest.starts_with('1') || rest.starts_with('2') { 2 } else { 3 };
        if rest.len() >= area_len + LOCAL_NUMBER_MIN_DIGITS {
            return rest[area_len..].to_string();
        }
    }

    trimmed.to_string()
}

/// 11 位中国大陆手机号（1[3-9] 开头）
fn is_cn_mobile(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    bytes.len() == 11 && bytes[0] == b'1' && (b'3'..=b'9').contains(&bytes[1])
}

/// 数字个数
pub fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

/// 标签拆分（, ; ， ； | 分隔），去空白、去重并保持顺序
pub fn split_tags(value: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in value.split([',', ';', '，', '；', '|']) {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contact::MappedRecord;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_text("  hello  "), "hello");
        assert_eq!(cleaner.clean_name("  张   三 "), "张 三");
        assert_eq!(cleaner.clean_email(" ZhangSan@Example.COM "), "zhangsan@example.com");
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ".to_string())), None);
        assert_eq!(cleaner.normalize_null(Some("".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_normalize_birthday() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.normalize_birthday("1990/1/5"), "1990-01-05");
        assert_eq!(cleaner.normalize_birthday("19900105"), "1990-01-05");
        assert_eq!(cleaner.normalize_birthday("1990年1月5日"), "1990-01-05");
        assert_eq!(cleaner.normalize_birthday("五月"), "五月");
    }

    #[test]
    fn test_clean_phone_full_width() {
        let cleaner = DataCleaner;
        assert_eq!(cleaner.clean_phone(" １３８００１３８０００ "), "13800138000");
    }

    #[test]
    fn test_phone_normalization() {
        assert_eq!(normalize_phone("138-0013 8000"), "13800138000");
        assert_eq!(normalize_phone("(010) 1234-5678"), "01012345678");
        assert_eq!(significant_phone_digits("+86 138 0013 8000"), "13800138000");
        assert_eq!(significant_phone_digits("0086-13800138000"), "13800138000");
        assert_eq!(significant_phone_digits("010-12345678"), "12345678");
        assert_eq!(significant_phone_digits("021-88001234"), "88001234");
        assert_eq!(significant_phone_digits("(0755) 8800123"), "8800123");
        assert_eq!(significant_phone_digits("013800138000"), "13800138000");
        assert_eq!(significant_phone_digits("88001234"), "88001234");
        assert_eq!(digit_count("+86 138"), 5);
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(
            split_tags("客户，VIP; 客户 |同事"),
            vec!["客户".to_string(), "VIP".to_string(), "同事".to_string()]
        );
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn test_clean_record_by_field() {
        let cleaner = DataCleaner;
        let mut record = MappedRecord::new(0);
        record.set("name", " 李  四 ");
        record.set("email", " LiSi@QQ.com");
        record.set("birthday", "1988.12.01");
        record.set("微信号", " lisi ");

        let cleaned = cleaner.clean_record(record);

        assert_eq!(cleaned.get("name"), Some("李 四"));
        assert_eq!(cleaned.get("email"), Some("lisi@qq.com"));
        assert_eq!(cleaned.get("birthday"), Some("1988-12-01"));
        assert_eq!(cleaned.get("微信号"), Some("lisi"));
    }
}
