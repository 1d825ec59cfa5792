//! 弹窗文本分类
//!
//! 门户用 alert 报告两类失败："USN 不存在" 和 "验证码错误"。
//! 前者不再重试，后者消耗一次重试。

use std::fmt;
use std::sync::Arc;

/// 门户对不存在的 USN 弹出的提示
pub const DEFAULT_NOT_FOUND_ALERT: &str = "University Seat Number is not available or Invalid";

/// 弹窗类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// USN 不存在或无效
    NotFound,
    /// 其他弹窗，按验证码被拒处理
    Rejected,
}

/// 判断弹窗是否表示"USN 不存在"
#[derive(Clone)]
pub struct AlertClassifier {
    not_found: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl AlertClassifier {
    /// 使用自定义判断函数
    pub fn new(not_found: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            not_found: Arc::new(not_found),
        }
    }

    /// 弹窗文本包含任意一个片段（忽略大小写）即视为不存在
    pub fn from_needles<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let needles: Vec<String> = needles
            .into_iter()
            .map(|n| n.as_ref().trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect();
        Self::new(move |text| {
            let text = text.to_lowercase();
            needles.iter().any(|n| text.contains(n.as_str()))
        })
    }

    pub fn classify(&self, text: &str) -> AlertKind {
        if (self.not_found)(text) {
            AlertKind::NotFound
        } else {
            AlertKind::Rejected
        }
    }
}

impl Default for AlertClassifier {
    fn default() -> Self {
        Self::from_needles([DEFAULT_NOT_FOUND_ALERT])
    }
}

impl fmt::Debug for AlertClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertClassifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_the_portal_wording() {
        let classifier = AlertClassifier::default();
        assert_eq!(
            classifier.classify("University Seat Number is not available or Invalid..!"),
            AlertKind::NotFound
        );
        assert_eq!(classifier.classify("Invalid captcha code !!!"), AlertKind::Rejected);
    }

    #[test]
    fn needles_are_case_insensitive() {
        let classifier = AlertClassifier::from_needles(["not available"]);
        assert_eq!(classifier.classify("USN NOT AVAILABLE"), AlertKind::NotFound);
    }

    #[test]
    fn custom_predicate() {
        let classifier = AlertClassifier::new(|text| text.starts_with("E404"));
        assert_eq!(classifier.classify("E404: no such student"), AlertKind::NotFound);
        assert_eq!(classifier.classify("captcha mismatch"), AlertKind::Rejected);
    }
}
