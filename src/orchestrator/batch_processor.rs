//! 运行编排器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次完整运行和资源管理。
//!
//! 1. **应用初始化**：写日志头、启动/连接浏览器、创建页面驱动和 PDF 渲染器
//! 2. **线性流程**：打开页面 → 下载 CSV → 解析订单 → 逐条下单 → 打包回执
//! 3. **资源管理**：持有 Browser，确保页面和渲染器在运行期间有效
//! 4. **全局统计**：汇总本次运行的结果
//!
//! 网络、下载和归档失败都是致命错误，直接终止运行。

use std::fs;

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use tracing::{info, warn};

use crate::browser;
use crate::config::{BrowserMode, Config};
use crate::infrastructure::{ChromePage, JsExecutor, PageDriver};
use crate::orchestrator::order_processor::{self, RunStats};
use crate::services::{
    ArchiveSummary, Archiver, ChromePdfRenderer, FileFetcher, ReceiptBuilder, TableReader,
};
use crate::utils::logging;
use crate::workflow::OrderFlow;

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stats: RunStats,
    pub archive: ArchiveSummary,
}

/// 一次运行需要的全部能力，全部以引用传入
pub struct Pipeline<'a> {
    pub driver: &'a dyn PageDriver,
    pub receipts: &'a ReceiptBuilder,
    pub fetcher: &'a FileFetcher,
    pub archiver: &'a Archiver,
    pub flow: &'a OrderFlow,
}

impl Pipeline<'_> {
    /// 打开页面 → 下载 CSV → 解析订单 → 逐条下单 → 打包回执
    pub async fn run(&self, config: &Config) -> Result<RunReport> {
        self.driver
            .navigate(&config.order_page_url)
            .await
            .context("打开下单页面失败")?;

        let csv_path = self
            .fetcher
            .download(&config.orders_csv_url, &config.orders_csv_path, true)
            .await
            .context("下载订单文件失败")?;

        let orders = TableReader::read_orders(&csv_path)
            .with_context(|| format!("读取订单文件失败: {}", csv_path.display()))?;
        if orders.is_empty() {
            warn!("⚠️ 订单文件中没有订单");
        }
        logging::log_orders_loaded(orders.len());

        let receipts_dir = self.receipts.receipts_dir();
        fs::create_dir_all(&receipts_dir)
            .with_context(|| format!("无法创建回执目录: {}", receipts_dir.display()))?;

        let stats = order_processor::process_orders(
            self.driver,
            self.receipts,
            self.flow,
            &orders,
            Some(config.output_log_file.as_path()),
        )
        .await?;

        info!("\n📁 正在打包回执...");
        let archive = self
            .archiver
            .archive(&receipts_dir, &config.archive_path, true)
            .context("打包回执失败")?;

        Ok(RunReport { stats, archive })
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    driver: ChromePage,
    receipts: ReceiptBuilder,
    fetcher: FileFetcher,
    archiver: Archiver,
    flow: OrderFlow,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config.order_page_url, config.max_submit_attempts);

        let (browser, page) = match config.browser_mode {
            BrowserMode::Headless => {
                browser::launch_headless_browser(config.chrome_executable.as_deref()).await?
            }
            BrowserMode::Connect => {
                browser::connect_to_browser_and_page(config.browser_debug_port).await?
            }
        };

        let driver = ChromePage::new(
            JsExecutor::new(page),
            config.element_timeout(),
            config.poll_interval(),
        );
        let renderer = ChromePdfRenderer::new(&browser).await?;
        let receipts = ReceiptBuilder::new(Box::new(renderer), config.output_dir.clone());
        let flow = OrderFlow::new(&config);

        Ok(Self {
            config,
            _browser: browser,
            driver,
            receipts,
            fetcher: FileFetcher::new(),
            archiver: Archiver::new(),
            flow,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunReport> {
        let pipeline = Pipeline {
            driver: &self.driver,
            receipts: &self.receipts,
            fetcher: &self.fetcher,
            archiver: &self.archiver,
            flow: &self.flow,
        };

        let report = pipeline.run(&self.config).await?;

        logging::print_final_stats(
            report.stats.submitted,
            report.stats.total,
            report.stats.retried,
            &report.archive.path,
            &self.config.output_log_file,
        );
        logging::append_log_line(
            &self.config.output_log_file,
            &format!(
                "运行结束: 成功 {}/{}，压缩包 {} 含 {} 个文件",
                report.stats.submitted,
                report.stats.total,
                report.archive.path.display(),
                report.archive.entries.len()
            ),
        )?;

        Ok(report)
    }
}
