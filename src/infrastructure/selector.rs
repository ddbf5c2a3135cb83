//! 元素选择器
//!
//! 支持标准 CSS 选择器，以及 `button:text('OK')` 这种按按钮文本定位的写法。

use std::fmt::{self, Display};
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// 标准 CSS 选择器
    Css(String),
    /// 按钮文本（去除首尾空白后完全匹配）
    ButtonText(String),
}

fn button_text_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"^\s*button:text\(\s*(?:'([^']*)'|"([^"]*)")\s*\)\s*$"#).ok())
        .as_ref()
}

impl Selector {
    /// 解析选择器字符串，非 `button:text(...)` 的一律视为 CSS
    pub fn parse(raw: &str) -> Self {
        match button_text_pattern().and_then(|re| re.captures(raw)) {
            Some(caps) => {
                let text = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default();
                Selector::ButtonText(text)
            }
            None => Selector::Css(raw.trim().to_string()),
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Selector::Css(selector.into())
    }

    pub fn button(text: impl Into<String>) -> Self {
        Selector::ButtonText(text.into())
    }

    /// 生成定位元素的 JS 表达式，找不到时结果为 `null`
    pub fn to_js_locator(&self) -> String {
        match self {
            Selector::Css(css) => format!("document.querySelector({})", js_string(css)),
            Selector::ButtonText(text) => format!(
                "(Array.from(document.querySelectorAll('button')).find(b => b.textContent.trim() === {}) || null)",
                js_string(text)
            ),
        }
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(css) => write!(f, "{}", css),
            Selector::ButtonText(text) => write!(f, "button:text('{}')", text),
        }
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Selector::parse(raw)
    }
}

/// 转成 JS 字符串字面量
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
