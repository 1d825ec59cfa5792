//! 抓取请求及其边界校验

use std::sync::LazyLock;

use regex::Regex;

use crate::error::InputError;
use crate::models::branch;
use crate::models::identifier::{self, Identifier};

/// 复查（revaluation）结果页 URL 中的标记
pub const REVAL_MARKER: &str = "RV";

/// USN 前缀：3 位字母数字 + 2 位年份 + 2 位专业字母
static PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{3}[0-9]{2}[A-Z]{2}$").expect("USN 前缀正则无效"));

/// 一次抓取请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// USN 前缀，如 `1AB21CS`（已转大写）
    pub prefix: String,
    /// 范围表达式，如 `1-20,45`
    pub range: String,
    /// 结果查询页 URL
    pub url: String,
    /// 学期（可选，仅用于持久化）
    pub semester: Option<u8>,
}

impl ScrapeRequest {
    pub fn new(prefix: &str, range: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            prefix: prefix.trim().to_uppercase(),
            range: range.into(),
            url: url.into(),
            semester: None,
        }
    }

    pub fn with_semester(mut self, semester: u8) -> Self {
        self.semester = Some(semester);
        self
    }

    /// 校验前缀、范围、URL 与学期
    pub fn validate(&self) -> Result<(), InputError> {
        self.validate_prefix()?;
        self.validate_range()?;

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(InputError::InvalidUrl {
                url: self.url.clone(),
            });
        }

        if let Some(semester) = self.semester {
            if !(1..=8).contains(&semester) {
                return Err(InputError::InvalidSemester { semester });
            }
        }

        Ok(())
    }

    /// 前缀必须是 7 位：3 位字母数字 + 2 位年份 + 2 位专业字母
    pub fn validate_prefix(&self) -> Result<(), InputError> {
        if PREFIX_PATTERN.is_match(&self.prefix) {
            Ok(())
        } else {
            Err(InputError::InvalidPrefix {
                prefix: self.prefix.clone(),
            })
        }
    }

    /// 严格校验范围表达式，任何坏段都报错
    pub fn validate_range(&self) -> Result<(), InputError> {
        for segment in self.range.split(',') {
            identifier::parse_segment(segment)?;
        }
        Ok(())
    }

    /// 入学年份，如 `1AB21CS` -> `2021`
    pub fn batch_year(&self) -> Option<String> {
        self.prefix.get(3..5).map(|yy| format!("20{}", yy))
    }

    /// 专业代码，如 `1AB21CS` -> `CS`
    pub fn branch_code(&self) -> Option<&str> {
        self.prefix.get(5..7)
    }

    pub fn branch_name(&self) -> Option<&'static str> {
        self.branch_code().and_then(branch::branch_name)
    }

    /// URL 中含有复查标记时视为复查结果
    pub fn is_reval(&self) -> bool {
        self.url.to_uppercase().contains(REVAL_MARKER)
    }

    /// 宽松展开出本次要查询的 USN 列表
    pub fn identifiers(&self) -> Vec<Identifier> {
        identifier::expand(&self.prefix, &self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prefix: &str, range: &str) -> ScrapeRequest {
        ScrapeRequest::new(prefix, range, "https://results.example.ac.in/JJEcbcs25/index.php")
    }

    #[test]
    fn valid_request_passes_and_derives_batch_and_branch() {
        let req = request("1ab21cs", "1-20,45");
        assert_eq!(req.validate(), Ok(()));
        assert_eq!(req.prefix, "1AB21CS");
        assert_eq!(req.batch_year().as_deref(), Some("2021"));
        assert_eq!(req.branch_code(), Some("CS"));
        assert_eq!(req.branch_name(), Some("Computer Science & Engineering"));
        assert!(!req.is_reval());
    }

    #[test]
    fn malformed_prefix_is_rejected() {
        for prefix in ["1AB21C", "1AB2XCS", "1AB21C5", "1AB21CSE"] {
            assert!(matches!(
                request(prefix, "1").validate(),
                Err(InputError::InvalidPrefix { .. })
            ));
        }
    }

    #[test]
    fn prefix_pattern_accepts_every_well_formed_prefix() {
        assert!(PREFIX_PATTERN.is_match("1AB21CS"));
        for prefix in ["1ab21cs", "4XY19EC", "2GI20ME"] {
            assert_eq!(request(prefix, "1").validate_prefix(), Ok(()));
        }
    }

    #[test]
    fn strict_range_validation_reports_the_bad_segment() {
        let err = request("1AB21CS", "1-5,9-3").validate().unwrap_err();
        assert_eq!(
            err,
            InputError::InvalidRange {
                segment: "9-3".into(),
                reason: "起始值大于结束值".into()
            }
        );
        assert!(request("1AB21CS", "1,x").validate().is_err());
    }

    #[test]
    fn reval_flag_comes_from_the_url() {
        let req = ScrapeRequest::new("1AB21CS", "1", "https://results.example.ac.in/DJRVcbcs25/");
        assert!(req.is_reval());
    }

    #[test]
    fn semester_must_be_in_range() {
        assert!(request("1AB21CS", "1").with_semester(9).validate().is_err());
        assert!(request("1AB21CS", "1").with_semester(5).validate().is_ok());
    }
}
