//! # Robot Order
//!
//! 自动化机器人下单：下载订单 CSV，逐条在网页上下单，为每个订单生成 PDF 回执，最后打包成 ZIP
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `PageDriver` - 点击 / 填写 / 选择 / 读取 / 截图，带隐式等待
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `FileFetcher` - 下载文件
//! - `TableReader` - 读取 CSV
//! - `ReceiptBuilder` - HTML 转 PDF，追加截图页
//! - `Archiver` - 打包 ZIP
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条订单"的完整处理流程
//! - `OrderCtx` - 上下文封装（订单号 + 序号）
//! - `OrderFlow` - 流程编排（弹窗 → 填表 → 预览 → 下单 → 回执，失败重试）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 一次运行，管理浏览器资源
//! - `orchestrator/order_processor` - 顺序遍历订单列表
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, launch_headless_browser};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{JsExecutor, PageDriver, Selector};
pub use models::{OrderRecord, ReceiptArtifact};
pub use orchestrator::{process_orders, App, Pipeline, RunReport, RunStats};
pub use services::{Archiver, FileFetcher, ReceiptBuilder, TableReader};
pub use workflow::{OrderCtx, OrderFlow, RetryPolicy, SubmitOutcome};
