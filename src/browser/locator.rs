//! 页面元素定位
//!
//! 把"表单字段在哪"从状态机里抽出来，换一个门户布局只需要换一组定位器。

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// 单个元素定位器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// CSS 选择器
    Css(String),
    /// XPath 表达式
    #[serde(rename = "xpath")]
    XPath(String),
    /// `name` 属性
    Name(String),
    /// `id` 属性
    Id(String),
}

impl Locator {
    /// 转成 CSS 选择器；XPath 无法转换时返回 None
    pub fn css_selector(&self) -> Option<String> {
        match self {
            Locator::Css(css) => Some(css.clone()),
            Locator::Name(name) => Some(format!("[name={}]", quote(name))),
            Locator::Id(id) => Some(format!("[id={}]", quote(id))),
            Locator::XPath(_) => None,
        }
    }

    /// 生成一段返回该元素（或 null）的 JS 表达式
    pub fn js_expression(&self) -> String {
        match self {
            Locator::XPath(xpath) => format!(
                "document.evaluate({}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue",
                quote(xpath)
            ),
            other => {
                let css = other.css_selector().unwrap_or_default();
                format!("document.querySelector({})", quote(&css))
            }
        }
    }
}

/// 转成 JS / CSS 都能接受的双引号字符串字面量
fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

impl Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::Id(v) => write!(f, "id={}", v),
        }
    }
}

/// 查询表单所需的一组定位器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSet {
    /// USN 输入框
    pub identifier_field: Locator,
    /// 验证码输入框
    pub captcha_field: Locator,
    /// 验证码图片
    pub captcha_image: Locator,
    /// 提交按钮
    pub submit_button: Locator,
}

impl Default for LocatorSet {
    fn default() -> Self {
        Self {
            identifier_field: Locator::Name("lns".to_string()),
            captcha_field: Locator::Name("captchacode".to_string()),
            captcha_image: Locator::XPath(r#"//*[@id="raj"]/div[2]/div[2]/img"#.to_string()),
            submit_button: Locator::Id("submit".to_string()),
        }
    }
}
