use serde::Serialize;

use crate::error::TableError;
use crate::services::table_reader::TableRow;

/// 订单 CSV 的列名（顺序即无表头时的列位置）
pub const ORDER_COLUMNS: [&str; 5] = ["Order number", "Head", "Body", "Legs", "Address"];

/// 一条订单：一行 CSV，描述机器人配置和收货地址
///
/// 读入后不可变，每条只被提交一次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRecord {
    #[serde(rename = "Order number")]
    pub order_number: String,
    #[serde(rename = "Head")]
    pub head: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "Legs")]
    pub legs: String,
    #[serde(rename = "Address")]
    pub address: String,
}

impl TryFrom<&TableRow> for OrderRecord {
    type Error = TableError;

    fn try_from(row: &TableRow) -> Result<Self, Self::Error> {
        let cell = |column: &str| {
            row.get(column)
                .map(str::to_string)
                .ok_or_else(|| TableError::MissingColumn {
                    column: column.to_string(),
                })
        };

        Ok(Self {
            order_number: cell(ORDER_COLUMNS[0])?,
            head: cell(ORDER_COLUMNS[1])?,
            body: cell(ORDER_COLUMNS[2])?,
            legs: cell(ORDER_COLUMNS[3])?,
            address: cell(ORDER_COLUMNS[4])?,
        })
    }
}
