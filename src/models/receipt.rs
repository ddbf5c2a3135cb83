use std::path::{Path, PathBuf};

/// 一条订单产生的文件路径，全部由订单号确定
///
/// 重试时路径不变，新文件直接覆盖旧文件，所以一个订单号最多只有一份回执。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptPaths {
    /// `<output>/receipts/receipt<N>.pdf`
    pub pdf: PathBuf,
    /// `<output>/order_summary<N>.png`
    pub screenshot: PathBuf,
}

impl ReceiptPaths {
    pub fn new(output_dir: &Path, order_number: &str) -> Self {
        Self {
            pdf: output_dir
                .join("receipts")
                .join(format!("receipt{}.pdf", order_number)),
            screenshot: output_dir.join(format!("order_summary{}.png", order_number)),
        }
    }
}

/// 一次成功采集的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptArtifact {
    pub pdf: PathBuf,
    /// 追加截图后的页数
    pub pages: usize,
}
