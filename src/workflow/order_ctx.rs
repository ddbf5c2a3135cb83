//! 订单处理上下文
//!
//! 封装"我正在处理第几条订单"这一信息，只用于日志

use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct OrderCtx {
    /// 订单号
    pub order_number: String,
    /// 在本次运行中的序号（从 1 开始）
    pub order_index: usize,
    /// 本次运行的订单总数
    pub total_orders: usize,
}

impl OrderCtx {
    pub fn new(order_number: impl Into<String>, order_index: usize, total_orders: usize) -> Self {
        Self {
            order_number: order_number.into(),
            order_index,
            total_orders,
        }
    }
}

impl Display for OrderCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[订单 #{} {}/{}]",
            self.order_number, self.order_index, self.total_orders
        )
    }
}
