//! 订单处理器 - 编排层
//!
//! ## 职责
//!
//! 按 CSV 顺序逐条处理订单，是订单级别的编排器。
//!
//! 1. **遍历订单**：循环处理 `&[OrderRecord]`，严格顺序，不并发
//! 2. **流程调度**：复用同一个 `OrderFlow`
//! 3. **运行日志**：每条订单的结果追加到日志文件
//! 4. **统计输出**：记录成功数、重试数和生成的回执
//!
//! 任何一条订单失败（包括重试耗尽）都会终止整批处理。

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::infrastructure::PageDriver;
use crate::models::OrderRecord;
use crate::services::ReceiptBuilder;
use crate::utils::logging;
use crate::workflow::{OrderCtx, OrderFlow, SubmitOutcome};

/// 订单处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub submitted: usize,
    /// 需要重试才成功的订单数
    pub retried: usize,
    /// 生成的回执（按路径去重）
    pub receipts: BTreeSet<PathBuf>,
}

/// 逐条处理订单
///
/// # 参数
/// - `driver`: 页面驱动（整个运行期间唯一的页面）
/// - `receipts`: 回执生成服务
/// - `flow`: 下单流程
/// - `orders`: 订单列表，处理顺序与列表顺序一致
/// - `log_file`: 运行日志文件（可选）
pub async fn process_orders(
    driver: &dyn PageDriver,
    receipts: &ReceiptBuilder,
    flow: &OrderFlow,
    orders: &[OrderRecord],
    log_file: Option<&Path>,
) -> Result<RunStats> {
    let mut stats = RunStats {
        total: orders.len(),
        ..Default::default()
    };

    for (index, order) in orders.iter().enumerate() {
        let ctx = OrderCtx::new(&order.order_number, index + 1, orders.len());
        logging::log_order_start(
            ctx.order_index,
            ctx.total_orders,
            &order.order_number,
            &order.address,
        );

        let outcome = flow
            .run(driver, receipts, order, &ctx)
            .await
            .with_context(|| format!("订单 #{} 处理失败", order.order_number))?;

        record_outcome(&mut stats, &outcome);
        log_order_complete(&ctx, &outcome);

        if let Some(path) = log_file {
            let line = format!(
                "{} 完成，尝试 {} 次，{} 页 | {}",
                ctx,
                outcome.attempts,
                outcome.receipt.pages,
                serde_json::to_string(order)?
            );
            if let Err(e) = logging::append_log_line(path, &line) {
                warn!("写入运行日志失败: {}", e);
            }
        }
    }

    Ok(stats)
}

fn record_outcome(stats: &mut RunStats, outcome: &SubmitOutcome) {
    stats.submitted += 1;
    if outcome.attempts > 1 {
        stats.retried += 1;
    }
    stats.receipts.insert(outcome.receipt.pdf.clone());
}

fn log_order_complete(ctx: &OrderCtx, outcome: &SubmitOutcome) {
    info!(
        "{} ✅ 回执已保存: {} ({} 页, 尝试 {} 次)",
        ctx,
        outcome.receipt.pdf.display(),
        outcome.receipt.pages,
        outcome.attempts
    );
}
