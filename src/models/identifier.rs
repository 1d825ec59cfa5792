//! USN 范围展开
//!
//! 把 `"1-3,5"` 这样的紧凑范围表达式展开成完整的 USN 列表。
//! 展开是宽松的：坏段会被记录并跳过，不会中断整个展开。

use std::fmt::{self, Display};

use tracing::warn;

use crate::error::InputError;

/// USN 数字后缀的固定宽度
///
/// 大于等于 1000 的数字不会被截断，也不会再校验宽度。
pub const SUFFIX_WIDTH: usize = 3;

/// 单个学生 USN（前缀 + 补零后的三位数字后缀）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// 由前缀和数字后缀构造
    pub fn new(prefix: &str, number: u32) -> Self {
        Self(format!("{}{:0width$}", prefix, number, width = SUFFIX_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 解析后的范围段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSegment {
    /// 单个数字
    Single(u32),
    /// 闭区间 `start-end`
    Interval { start: u32, end: u32 },
}

impl RangeSegment {
    /// 本段展开后的 USN 数量，起始值大于结束值的区间为 0
    pub fn count(&self) -> usize {
        match *self {
            RangeSegment::Single(_) => 1,
            RangeSegment::Interval { start, end } => {
                end.checked_sub(start).map_or(0, |span| span as usize + 1)
            }
        }
    }

    /// 按升序输出本段包含的数字
    pub fn numbers(&self) -> impl Iterator<Item = u32> {
        let (start, end) = match *self {
            RangeSegment::Single(n) => (n, n),
            RangeSegment::Interval { start, end } => (start, end),
        };
        start..=end
    }
}

/// 被跳过的范围段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeWarning {
    pub segment: String,
    pub reason: String,
}

/// 范围展开结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub identifiers: Vec<Identifier>,
    pub warnings: Vec<RangeWarning>,
}

/// 解析单个范围段（严格）
///
/// 空段、非数字、`start > end` 以及多于一个 `-` 的段都视为错误。
pub fn parse_segment(segment: &str) -> Result<RangeSegment, InputError> {
    let trimmed = segment.trim();
    let invalid = |reason: &str| InputError::InvalidRange {
        segment: segment.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("空段"));
    }

    if trimmed.contains('-') {
        let parts: Vec<&str> = trimmed.split('-').collect();
        if parts.len() != 2 {
            return Err(invalid("区间必须是 start-end 形式"));
        }
        let start = parse_number(parts[0]).ok_or_else(|| invalid("起始值不是非负整数"))?;
        let end = parse_number(parts[1]).ok_or_else(|| invalid("结束值不是非负整数"))?;
        if start > end {
            return Err(invalid("起始值大于结束值"));
        }
        Ok(RangeSegment::Interval { start, end })
    } else {
        parse_number(trimmed)
            .map(RangeSegment::Single)
            .ok_or_else(|| invalid("不是非负整数"))
    }
}

fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// 展开范围表达式，同时返回被跳过的段
///
/// 输出保持输入顺序，不做去重。连续逗号产生的空段直接忽略，不计入警告。
pub fn expand_with_warnings(prefix: &str, range_spec: &str) -> Expansion {
    let mut expansion = Expansion::default();

    for segment in range_spec.split(',') {
        if segment.trim().is_empty() {
            continue;
        }
        match parse_segment(segment) {
            Ok(parsed) => expansion
                .identifiers
                .extend(parsed.numbers().map(|n| Identifier::new(prefix, n))),
            Err(InputError::InvalidRange { segment, reason }) => {
                warn!("⚠️ 跳过无效范围段 '{}': {}", segment, reason);
                expansion.warnings.push(RangeWarning { segment, reason });
            }
            Err(other) => {
                warn!("⚠️ 跳过无效范围段 '{}': {}", segment, other);
                expansion.warnings.push(RangeWarning {
                    segment: segment.to_string(),
                    reason: other.to_string(),
                });
            }
        }
    }

    expansion
}

/// 展开范围表达式
pub fn expand(prefix: &str, range_spec: &str) -> Vec<Identifier> {
    expand_with_warnings(prefix, range_spec).identifiers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(ids: &[Identifier]) -> Vec<&str> {
        ids.iter().map(Identifier::as_str).collect()
    }

    #[test]
    fn expands_intervals_and_singles_in_order() {
        let ids = expand("1AB", "1-3,5");
        assert_eq!(strs(&ids), vec!["1AB001", "1AB002", "1AB003", "1AB005"]);
    }

    #[test]
    fn skips_invalid_segments_without_failing() {
        let expansion = expand_with_warnings("X", "2-1,abc,4");
        assert_eq!(strs(&expansion.identifiers), vec!["X004"]);
        assert_eq!(expansion.warnings.len(), 2);
        assert_eq!(expansion.warnings[0].segment, "2-1");
        assert_eq!(expansion.warnings[1].segment, "abc");
    }

    #[test]
    fn single_element_interval_emits_one_identifier() {
        assert_eq!(strs(&expand("P", "7-7")), vec!["P007"]);
    }

    #[test]
    fn empty_segments_are_ignored() {
        let expansion = expand_with_warnings("P", "1,,2,");
        assert_eq!(strs(&expansion.identifiers), vec!["P001", "P002"]);
        assert!(expansion.warnings.is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(strs(&expand("P", "1-2,2")), vec!["P001", "P002", "P002"]);
    }

    #[test]
    fn large_suffixes_are_not_truncated() {
        assert_eq!(strs(&expand("P", "1000")), vec!["P1000"]);
    }

    #[test]
    fn inverted_interval_is_empty() {
        let segment = RangeSegment::Interval { start: 5, end: 1 };
        assert_eq!(segment.count(), 0);
        assert_eq!(segment.numbers().count(), 0);
    }

    #[test]
    fn output_length_matches_segment_cardinality() {
        let spec = "1-20,45,50-60";
        let total: usize = spec
            .split(',')
            .map(|s| parse_segment(s).map(|seg| seg.count()).unwrap_or(0))
            .sum();
        assert_eq!(expand("1AB21CS", spec).len(), total);
        assert_eq!(total, 32);
    }

    #[test]
    fn malformed_intervals_are_rejected_strictly() {
        assert!(parse_segment("1-2-3").is_err());
        assert!(parse_segment("-5").is_err());
        assert!(parse_segment("").is_err());
        assert_eq!(parse_segment(" 8 "), Ok(RangeSegment::Single(8)));
    }
}
