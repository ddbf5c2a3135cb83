//! 页面驱动 - 基础设施层
//!
//! `PageDriver` 是流程层唯一能接触到的页面能力。所有操作在隐式等待时间内轮询目标元素，
//! 超时返回 `BrowserError::SelectorNotFound`，这正是回执采集重试的触发条件。

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, BrowserError};
use crate::infrastructure::js_executor::{ElementReply, JsExecutor};
use crate::infrastructure::selector::{js_string, Selector};

/// 页面操作能力
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 打开页面并等待加载完成
    async fn navigate(&self, url: &str) -> AppResult<()>;

    /// 在 `timeout` 内等待元素出现，超时返回 `Ok(false)`
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> AppResult<bool>;

    async fn click(&self, selector: &Selector) -> AppResult<()>;

    async fn fill(&self, selector: &Selector, value: &str) -> AppResult<()>;

    /// 按 value 或显示文本选择下拉框选项
    async fn select(&self, selector: &Selector, value: &str) -> AppResult<()>;

    /// 读取元素的 innerHTML
    async fn read_html(&self, selector: &Selector) -> AppResult<String>;

    /// 当前视口截图，写出 PNG
    async fn screenshot(&self, path: &Path) -> AppResult<()>;
}

const CLICK_JS: &str = r#"
    el.scrollIntoView({ block: 'center' });
    el.click();
    return { found: true };
"#;

// React 受控组件需要走原型上的原生 setter，否则状态不会更新
const FILL_JS: &str = r#"
    const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype
        : HTMLInputElement.prototype;
    const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
    el.focus();
    setter.call(el, __VALUE__);
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { found: true };
"#;

const SELECT_JS: &str = r#"
    const wanted = __VALUE__;
    const option = Array.from(el.options || [])
        .find(o => o.value === wanted || o.textContent.trim() === wanted);
    if (!option) {
        return { found: true, error: 'option not found' };
    }
    const setter = Object.getOwnPropertyDescriptor(HTMLSelectElement.prototype, 'value').set;
    setter.call(el, option.value);
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return { found: true };
"#;

const READ_HTML_JS: &str = r#"
    return { found: true, value: el.innerHTML };
"#;

const PRESENT_JS: &str = r#"
    return { found: true };
"#;

/// 基于 chromiumoxide 的页面驱动
pub struct ChromePage {
    executor: JsExecutor,
    element_timeout: Duration,
    poll_interval: Duration,
}

impl ChromePage {
    pub fn new(executor: JsExecutor, element_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            executor,
            element_timeout,
            poll_interval,
        }
    }

    /// 轮询直到元素出现并执行脚本，或超时
    async fn perform(
        &self,
        selector: &Selector,
        body: &str,
        timeout: Duration,
    ) -> AppResult<Option<ElementReply>> {
        let executor = &self.executor;
        poll_until(timeout, self.poll_interval, move || async move {
            let reply = executor.eval_on(selector, body).await?;
            Ok(reply.found.then_some(reply))
        })
        .await
    }

    /// 与 `perform` 相同，但超时视为错误
    async fn perform_required(&self, selector: &Selector, body: &str) -> AppResult<ElementReply> {
        let found = self.perform(selector, body, self.element_timeout).await?;
        require_found(found, selector, self.element_timeout)
    }
}

/// 每隔 `interval` 调用一次 `probe`，直到返回 `Some` 或超过 `timeout`
///
/// 第一次调用立即进行。脚本错误（例如页面跳转时执行上下文被销毁）视为暂时未找到，
/// 继续轮询；到期时如果最后一次仍是脚本错误，返回该错误。其他错误立即返回。
async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> AppResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let last_err = match probe().await {
            Ok(Some(value)) => return Ok(Some(value)),
            Ok(None) => None,
            Err(AppError::Browser(e @ BrowserError::Script { .. })) => {
                debug!("脚本执行失败，继续等待: {}", e);
                Some(AppError::Browser(e))
            }
            Err(e) => return Err(e),
        };

        if Instant::now() >= deadline {
            return match last_err {
                Some(e) => Err(e),
                None => Ok(None),
            };
        }
        sleep(interval).await;
    }
}

/// 轮询结果为空时转换为 `SelectorNotFound`
fn require_found<T>(found: Option<T>, selector: &Selector, timeout: Duration) -> AppResult<T> {
    found.ok_or_else(|| {
        AppError::selector_not_found(selector.to_string(), timeout.as_millis() as u64)
    })
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn navigate(&self, url: &str) -> AppResult<()> {
        let page = self.executor.page();
        page.goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        info!("已打开页面: {}", url);
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> AppResult<bool> {
        Ok(self.perform(selector, PRESENT_JS, timeout).await?.is_some())
    }

    async fn click(&self, selector: &Selector) -> AppResult<()> {
        debug!("点击 {}", selector);
        self.perform_required(selector, CLICK_JS).await?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> AppResult<()> {
        debug!("填写 {} = {}", selector, value);
        let body = FILL_JS.replace("__VALUE__", &js_string(value));
        self.perform_required(selector, &body).await?;
        Ok(())
    }

    async fn select(&self, selector: &Selector, value: &str) -> AppResult<()> {
        debug!("选择 {} = {}", selector, value);
        let body = SELECT_JS.replace("__VALUE__", &js_string(value));
        let reply = self.perform_required(selector, &body).await?;
        if reply.error.is_some() {
            return Err(BrowserError::OptionNotFound {
                selector: selector.to_string(),
                value: value.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn read_html(&self, selector: &Selector) -> AppResult<String> {
        let reply = self.perform_required(selector, READ_HTML_JS).await?;
        Ok(reply.value.unwrap_or_default())
    }

    async fn screenshot(&self, path: &Path) -> AppResult<()> {
        let screenshot_err = |source: crate::error::BoxError| BrowserError::Screenshot {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| screenshot_err(Box::new(e)))?;
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        self.executor
            .page()
            .save_screenshot(params, path)
            .await
            .map_err(|e| screenshot_err(Box::new(e)))?;

        debug!("截图已保存: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TIMEOUT: Duration = Duration::from_millis(1000);
    const INTERVAL: Duration = Duration::from_millis(200);

    fn script_error() -> AppError {
        AppError::Browser(BrowserError::Script {
            source: "Execution context was destroyed".into(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_on_first_hit_without_waiting() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        let found = poll_until(TIMEOUT, INTERVAL, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some("el"))
        })
        .await
        .unwrap();

        assert_eq!(found, Some("el"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_finds_element_after_several_intervals() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let start = Instant::now();

        let found = poll_until(TIMEOUT, INTERVAL, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n == 3).then_some(n))
        })
        .await
        .unwrap();

        assert_eq!(found, Some(3));
        assert!(start.elapsed() >= INTERVAL * 2);
        assert!(start.elapsed() < INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_selector_not_found() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let selector = Selector::css("#receipt");

        let found = poll_until(TIMEOUT, INTERVAL, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None::<()>)
        })
        .await
        .unwrap();
        let err = require_found(found, &selector, TIMEOUT).unwrap_err();

        // 0, 200, ..., 1000 ms 各探测一次
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        match err {
            AppError::Browser(BrowserError::SelectorNotFound {
                selector,
                timeout_ms,
            }) => {
                assert_eq!(selector, "#receipt");
                assert_eq!(timeout_ms, 1000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(AppError::selector_not_found("#receipt", 1000).is_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_error_keeps_polling_until_found() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let found = poll_until(TIMEOUT, INTERVAL, move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(script_error()),
                n => Ok(Some(n)),
            }
        })
        .await
        .unwrap();

        assert_eq!(found, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_script_error_is_returned_at_deadline() {
        let start = Instant::now();

        let err = poll_until(TIMEOUT, INTERVAL, || async { Err::<Option<()>, _>(script_error()) })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Browser(BrowserError::Script { .. })));
        assert!(start.elapsed() >= TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_polling_immediately() {
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = poll_until(TIMEOUT, INTERVAL, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Option<()>, _>(AppError::navigation_failed(
                "https://example.com",
                std::io::Error::new(std::io::ErrorKind::Other, "reset"),
            ))
        })
        .await
        .unwrap_err();

        assert!(!err.is_recoverable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
