use thiserror::Error;

/// 第三方错误的统一装箱类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 下载订单文件错误
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),
    /// CSV 表格错误
    #[error("表格错误: {0}")]
    Table(#[from] TableError),
    /// 回执 PDF 错误
    #[error("回执错误: {0}")]
    Receipt(#[from] ReceiptError),
    /// 归档错误
    #[error("归档错误: {0}")]
    Archive(#[from] ArchiveError),
    /// 下单流程错误
    #[error("下单错误: {0}")]
    Submit(#[from] SubmitError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// 是否属于可以通过重新下单恢复的错误
    ///
    /// 只有页面渲染抖动一类的错误可恢复；网络、归档、配置错误一律视为致命。
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Browser(e) => e.is_recoverable(),
            AppError::Receipt(_) => true,
            AppError::Download(_)
            | AppError::Table(_)
            | AppError::Archive(_)
            | AppError::Submit(_)
            | AppError::Config(_) => false,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 在隐式等待时间内没有找到元素
    #[error("元素未找到: {selector} (等待 {timeout_ms} ms)")]
    SelectorNotFound { selector: String, timeout_ms: u64 },
    /// 操作超时
    #[error("操作超时: {action} (等待 {timeout_ms} ms)")]
    Timeout { action: String, timeout_ms: u64 },
    /// 下拉框中不存在指定选项
    #[error("下拉框 {selector} 中没有选项 '{value}'")]
    OptionNotFound { selector: String, value: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BoxError,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    Script {
        #[source]
        source: BoxError,
    },
    /// 启动或连接浏览器失败
    #[error("启动浏览器失败: {source}")]
    Launch {
        #[source]
        source: BoxError,
    },
    /// 截图失败
    #[error("截图失败 ({path}): {source}")]
    Screenshot {
        path: String,
        #[source]
        source: BoxError,
    },
    /// HTML 转 PDF 失败
    #[error("HTML 转 PDF 失败: {source}")]
    PdfRender {
        #[source]
        source: BoxError,
    },
}

impl BrowserError {
    pub fn is_recoverable(&self) -> bool {
        match self {
            BrowserError::SelectorNotFound { .. }
            | BrowserError::Timeout { .. }
            | BrowserError::OptionNotFound { .. }
            | BrowserError::Script { .. }
            | BrowserError::Screenshot { .. }
            | BrowserError::PdfRender { .. } => true,
            BrowserError::Navigation { .. } | BrowserError::Launch { .. } => false,
        }
    }
}

/// 下载错误
#[derive(Debug, Error)]
pub enum DownloadError {
    /// 网络请求失败
    #[error("请求 {url} 失败: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端返回非 2xx
    #[error("请求 {url} 返回状态码 {status}")]
    BadStatus { url: String, status: u16 },
    /// 目标文件已存在且不允许覆盖
    #[error("文件已存在: {path}")]
    AlreadyExists { path: String },
    /// 写入本地文件失败
    #[error("写入文件失败 ({path}): {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// CSV 表格错误
#[derive(Debug, Error)]
pub enum TableError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("缺少列: {column}")]
    MissingColumn { column: String },
    #[error("第 {line} 行数据不完整")]
    Malformed { line: u64 },
    #[error("CSV 解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// 回执 PDF 错误
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("PDF 处理失败 ({path}): {source}")]
    Pdf {
        path: String,
        #[source]
        source: lopdf::Error,
    },
    #[error("图片解码失败 ({path}): {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("图片尺寸为空: {path}")]
    EmptyImage { path: String },
    #[error("文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 归档错误
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("源目录不存在: {path}")]
    SourceNotFound { path: String },
    #[error("扁平化后文件名重复: {name}")]
    DuplicateEntry { name: String },
    #[error("遍历目录失败: {source}")]
    Walk {
        #[source]
        source: walkdir::Error,
    },
    #[error("写入压缩包失败: {source}")]
    Zip {
        #[source]
        source: zip::result::ZipError,
    },
    #[error("文件读写失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 下单流程错误
#[derive(Debug, Error)]
pub enum SubmitError {
    /// 重试次数耗尽
    #[error("订单 {order_number} 在 {attempts} 次尝试后仍未成功: {last_error}")]
    RetriesExhausted {
        order_number: String,
        attempts: u32,
        #[source]
        last_error: Box<AppError>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid { field: String, reason: String },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("解析配置文件失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Script {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Browser(BrowserError::Script {
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建元素未找到错误
    pub fn selector_not_found(selector: impl Into<String>, timeout_ms: u64) -> Self {
        AppError::Browser(BrowserError::SelectorNotFound {
            selector: selector.into(),
            timeout_ms,
        })
    }

    /// 创建浏览器启动错误
    pub fn browser_launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::Browser(BrowserError::Launch {
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::Navigation {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建配置值不合法错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
