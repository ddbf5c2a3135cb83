//! 表格读取服务 - 业务能力层
//!
//! 只负责把 CSV 解析成有序的行，不关心订单如何提交

use std::path::Path;

use tracing::debug;

use crate::error::{AppResult, TableError};
use crate::models::{OrderRecord, ORDER_COLUMNS};

/// 一行数据：期望列名到单元格的映射，保持期望列的顺序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    cells: Vec<(String, String)>,
}

impl TableRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }
}

/// 表格读取服务
pub struct TableReader;

impl TableReader {
    /// 读取 CSV
    ///
    /// # 参数
    /// - `path`: CSV 文件路径
    /// - `expected_columns`: 需要的列；有表头时按列名取值，无表头时按位置取值
    /// - `has_header`: 第一行是否为表头
    ///
    /// # 返回
    /// 按文件顺序返回所有行
    pub fn read(
        path: &Path,
        expected_columns: &[&str],
        has_header: bool,
    ) -> AppResult<Vec<TableRow>> {
        if !path.exists() {
            return Err(TableError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let parse_err = |source| TableError::Parse {
            path: path.display().to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(parse_err)?;

        // 每个期望列在记录中的位置
        let positions: Vec<usize> = if has_header {
            let headers = reader.headers().map_err(parse_err)?.clone();
            expected_columns
                .iter()
                .map(|column| {
                    headers
                        .iter()
                        .position(|h| h == *column)
                        .ok_or_else(|| TableError::MissingColumn {
                            column: column.to_string(),
                        })
                })
                .collect::<Result<_, _>>()?
        } else {
            (0..expected_columns.len()).collect()
        };

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(parse_err)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            // 空行直接跳过
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            let cells = expected_columns
                .iter()
                .zip(&positions)
                .map(|(column, &idx)| {
                    record
                        .get(idx)
                        .map(|value| (column.to_string(), value.to_string()))
                        .ok_or(TableError::Malformed { line })
                })
                .collect::<Result<Vec<_>, _>>()?;

            rows.push(TableRow { cells });
        }

        debug!("从 {} 读取到 {} 行", path.display(), rows.len());
        Ok(rows)
    }

    /// 读取订单 CSV（固定列，带表头）
    pub fn read_orders(path: &Path) -> AppResult<Vec<OrderRecord>> {
        let rows = Self::read(path, &ORDER_COLUMNS, true)?;
        rows.iter()
            .map(|row| OrderRecord::try_from(row).map_err(Into::into))
            .collect()
    }
}
