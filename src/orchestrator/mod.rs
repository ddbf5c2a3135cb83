//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (一次运行：页面 → CSV → 订单 → 压缩包)
//!     ↓
//! order_processor (处理 Vec<OrderRecord>)
//!     ↓
//! workflow::OrderFlow (处理单条订单)
//!     ↓
//! services (能力层：下载 / 表格 / 回执 / 归档)
//!     ↓
//! infrastructure (基础设施：PageDriver / JsExecutor)
//! ```
//!
//! 只有编排层持有 Browser；下层只拿到 `&dyn PageDriver`。

pub mod batch_processor;
pub mod order_processor;

pub use batch_processor::{App, Pipeline, RunReport};
pub use order_processor::{process_orders, RunStats};
