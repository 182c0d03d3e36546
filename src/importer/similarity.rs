// ==========================================
// 通讯录导入管道 - 字符串相似度
// ==========================================
// 规则: similarity(a, b) = 1 - levenshtein(a, b) / max(len(a), len(b))
// 长度按字符（char）计，中文一个字计 1
// ==========================================

/// 编辑距离相似度 [0, 1]
///
/// 相等字符串直接返回 1.0；对称
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = strsim::levenshtein(a, b);
    1.0 - distance as f64 / max_len as f64
}

/// 比较前先做 trim + 小写 + 去除内部空白
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    similarity(&normalize_for_compare(a), &normalize_for_compare(b))
}

fn normalize_for_compare(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
