/// 日志工具模块
///
/// 提供 tracing 初始化、运行日志文件以及日志格式化的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing
///
/// 优先使用 `RUST_LOG`，否则为 `info`（`verbose` 时为 `debug`）。重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件（覆盖旧文件）
pub fn init_log_file(log_file_path: &Path) -> Result<()> {
    if let Some(parent) = log_file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("无法创建日志目录: {}", parent.display()))?;
    }
    let log_header = format!(
        "{}\n机器人订单日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path.display()))?;
    Ok(())
}

/// 向运行日志文件追加一行
pub fn append_log_line(log_file_path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path.display()))?;
    writeln!(
        file,
        "[{}] {}",
        chrono::Local::now().format("%H:%M:%S"),
        line
    )?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(order_page_url: &str, max_attempts: u32) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 机器人下单");
    info!("🌐 下单页面: {}", order_page_url);
    info!("🔁 单个订单最多尝试: {} 次", max_attempts);
    info!("{}", "=".repeat(60));
}

/// 记录订单加载信息
pub fn log_orders_loaded(total: usize) {
    info!("✓ 找到 {} 条待处理的订单", total);
    info!("💡 订单按 CSV 顺序逐条处理\n");
}

/// 记录订单开始信息
pub fn log_order_start(index: usize, total: usize, order_number: &str, address: &str) {
    info!("\n{}", "─".repeat(30));
    info!(
        "处理第 {}/{} 条订单: #{} ({})",
        index,
        total,
        order_number,
        truncate_text(address, 30)
    );
}

/// 打印最终统计信息
pub fn print_final_stats(
    submitted: usize,
    total: usize,
    retried: usize,
    archive: &Path,
    log_file_path: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", submitted, total);
    info!("🔁 经过重试的订单: {}", retried);
    info!("📦 压缩包: {}", archive.display());
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path.display());
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
