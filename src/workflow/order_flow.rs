//! 下单流程 - 流程层
//!
//! 核心职责：定义"一条订单"的完整处理流程
//!
//! 流程顺序：
//! 1. 关闭 cookie 弹窗（没有弹窗时跳过）
//! 2. 填写表单
//! 3. 预览 → 下单
//! 4. 采集回执 → 再下一单；采集失败则重新点击下单，按重试策略重试

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppResult, SubmitError};
use crate::infrastructure::{PageDriver, Selector};
use crate::models::{OrderRecord, ReceiptArtifact};
use crate::services::ReceiptBuilder;
use crate::workflow::order_ctx::OrderCtx;
use crate::workflow::retry::RetryPolicy;

/// 下单页面上用到的选择器
#[derive(Debug, Clone)]
pub struct OrderFormSelectors {
    pub modal_ok: Selector,
    pub head: Selector,
    /// 身体型号单选框，`{}` 替换为型号
    pub body_pattern: String,
    pub legs: Selector,
    pub address: Selector,
    pub preview: Selector,
    pub submit: Selector,
    pub receipt: Selector,
    pub order_another: Selector,
}

impl Default for OrderFormSelectors {
    fn default() -> Self {
        Self {
            modal_ok: Selector::parse("button:text('OK')"),
            head: Selector::css("#head"),
            body_pattern: "#id-body-{}".to_string(),
            legs: Selector::css("input[placeholder='Enter the part number for the legs']"),
            address: Selector::css("#address"),
            preview: Selector::parse("button:text('Preview')"),
            submit: Selector::parse("button:text('Order')"),
            receipt: Selector::css("#receipt"),
            order_another: Selector::parse("button:text('Order another robot')"),
        }
    }
}

impl OrderFormSelectors {
    pub fn body(&self, body: &str) -> Selector {
        Selector::css(self.body_pattern.replace("{}", body))
    }
}

/// 一条订单的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub order_number: String,
    pub receipt: ReceiptArtifact,
    /// 采集回执用了几次
    pub attempts: u32,
}

/// 下单流程
///
/// - 编排单条订单的完整处理流程
/// - 不持有任何资源（page），页面通过参数传入
/// - 决定哪些错误可以重试、重试几次
pub struct OrderFlow {
    selectors: OrderFormSelectors,
    retry: RetryPolicy,
    modal_probe: Duration,
}

impl OrderFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            selectors: OrderFormSelectors::default(),
            retry: config.retry_policy(),
            modal_probe: config.modal_probe(),
        }
    }

    pub fn with_parts(
        selectors: OrderFormSelectors,
        retry: RetryPolicy,
        modal_probe: Duration,
    ) -> Self {
        Self {
            selectors,
            retry,
            modal_probe,
        }
    }

    pub async fn run(
        &self,
        driver: &dyn PageDriver,
        receipts: &ReceiptBuilder,
        order: &OrderRecord,
        ctx: &OrderCtx,
    ) -> AppResult<SubmitOutcome> {
        self.dismiss_modal(driver, ctx).await?;
        self.fill_form(driver, order).await?;

        driver.click(&self.selectors.preview).await?;
        driver.click(&self.selectors.submit).await?;
        info!("{} 📤 已提交订单", ctx);

        self.confirm(driver, receipts, order, ctx).await
    }

    /// 关闭 cookie 弹窗，弹窗不存在时什么也不做
    async fn dismiss_modal(&self, driver: &dyn PageDriver, ctx: &OrderCtx) -> AppResult<()> {
        if driver.wait_for(&self.selectors.modal_ok, self.modal_probe).await? {
            driver.click(&self.selectors.modal_ok).await?;
            info!("{} 已关闭弹窗", ctx);
        }
        Ok(())
    }

    async fn fill_form(&self, driver: &dyn PageDriver, order: &OrderRecord) -> AppResult<()> {
        driver.select(&self.selectors.head, &order.head).await?;
        driver.click(&self.selectors.body(&order.body)).await?;
        driver.fill(&self.selectors.legs, &order.legs).await?;
        driver.fill(&self.selectors.address, &order.address).await?;
        Ok(())
    }

    /// 采集回执，失败时重新下单后重试
    async fn confirm(
        &self,
        driver: &dyn PageDriver,
        receipts: &ReceiptBuilder,
        order: &OrderRecord,
        ctx: &OrderCtx,
    ) -> AppResult<SubmitOutcome> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let err = match self.capture_receipt(driver, receipts, order).await {
                Ok(receipt) => {
                    return Ok(SubmitOutcome {
                        order_number: order.order_number.clone(),
                        receipt,
                        attempts,
                    });
                }
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => e,
            };

            warn!(
                "{} ⚠️ 回执采集失败 (尝试 {}/{}): {}",
                ctx, attempts, self.retry.max_attempts, err
            );

            if !self.retry.has_attempts_left(attempts) {
                error!("{} ❌ 已达到最大尝试次数", ctx);
                return Err(SubmitError::RetriesExhausted {
                    order_number: order.order_number.clone(),
                    attempts,
                    last_error: Box::new(err),
                }
                .into());
            }

            sleep(self.retry.delay_for(attempts)).await;

            // 回执可能已经显示出来而下单按钮消失，此时点击失败不影响下一次采集
            if let Err(click_err) = driver.click(&self.selectors.submit).await {
                if !click_err.is_recoverable() {
                    return Err(click_err);
                }
                warn!("{} 重新下单失败: {}", ctx, click_err);
            }
        }
    }

    async fn capture_receipt(
        &self,
        driver: &dyn PageDriver,
        receipts: &ReceiptBuilder,
        order: &OrderRecord,
    ) -> AppResult<ReceiptArtifact> {
        let paths = receipts.paths(&order.order_number);

        let html = driver.read_html(&self.selectors.receipt).await?;
        let pdf = receipts.build(&order.order_number, &html).await?;
        driver.screenshot(&paths.screenshot).await?;
        let pages = receipts.attach_screenshot(&order.order_number, &paths.screenshot)?;
        driver.click(&self.selectors.order_another).await?;

        Ok(ReceiptArtifact {
            pdf,
            pages,
        })
    }
}
