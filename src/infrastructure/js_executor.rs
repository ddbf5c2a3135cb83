//! JS 执行器 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS"和"在某个元素上执行 JS"的能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::error::AppResult;
use crate::infrastructure::selector::Selector;

/// 元素脚本的返回值
///
/// `found == false` 表示当前页面还没有该元素；`error` 为脚本主动报告的问题（例如下拉框没有对应选项）。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementReply {
    pub found: bool,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / eval_on() 能力
/// - 不认识订单 / 回执
/// - 不处理等待与重试
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（导航、截图等非 JS 操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let js_code = js_code.into();
        trace!("执行脚本: {}", js_code);
        let result = self.page.evaluate(js_code).await?;
        Ok(result.into_value()?)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        Ok(serde_json::from_value(json_value)?)
    }

    /// 定位元素后执行 `body`
    ///
    /// `body` 中可以使用变量 `el`，需要 `return` 一个 [`ElementReply`] 形状的对象。
    /// 元素不存在时直接返回 `found: false`，不会执行 `body`。
    pub async fn eval_on(&self, selector: &Selector, body: &str) -> AppResult<ElementReply> {
        self.eval_as(element_script(selector, body)).await
    }
}

fn element_script(selector: &Selector, body: &str) -> String {
    format!(
        r#"
        (() => {{
            const el = {};
            if (!el) {{
                return {{ found: false }};
            }}
            {}
        }})()
        "#,
        selector.to_js_locator(),
        body
    )
}
