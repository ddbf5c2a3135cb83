use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};
use crate::workflow::retry::{Backoff, RetryPolicy};

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "ROBOT_ORDER_CONFIG";
/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "robot_order.toml";

/// 浏览器获取方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserMode {
    /// 启动无头浏览器（打印 PDF 需要）
    Headless,
    /// 连接已开启调试端口的浏览器
    Connect,
}

impl FromStr for BrowserMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headless" => Ok(BrowserMode::Headless),
            "connect" => Ok(BrowserMode::Connect),
            other => Err(format!("未知的浏览器模式: {}", other)),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 下单页面
    pub order_page_url: String,
    /// 订单 CSV 地址
    pub orders_csv_url: String,
    /// CSV 本地保存位置
    pub orders_csv_path: PathBuf,
    /// 输出目录（回执与截图）
    pub output_dir: PathBuf,
    /// 最终压缩包
    pub archive_path: PathBuf,
    pub browser_mode: BrowserMode,
    /// 浏览器调试端口（connect 模式）
    pub browser_debug_port: u16,
    /// 浏览器可执行文件，不设置时由 chromiumoxide 自动查找
    pub chrome_executable: Option<PathBuf>,
    /// 元素隐式等待时间
    pub element_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// 探测 cookie 弹窗的等待时间
    pub modal_probe_ms: u64,
    // --- 重试配置 ---
    pub max_submit_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_backoff: Backoff,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order_page_url: "https://robotsparebinindustries.com/#/robot-order".to_string(),
            orders_csv_url: "https://robotsparebinindustries.com/orders.csv".to_string(),
            orders_csv_path: PathBuf::from("orders.csv"),
            output_dir: PathBuf::from("output"),
            archive_path: PathBuf::from("orders.zip"),
            browser_mode: BrowserMode::Headless,
            browser_debug_port: 9222,
            chrome_executable: None,
            element_timeout_ms: 10_000,
            poll_interval_ms: 200,
            modal_probe_ms: 2_000,
            max_submit_attempts: 5,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5_000,
            retry_backoff: Backoff::Exponential,
            verbose_logging: false,
            output_log_file: PathBuf::from("output/run_log.txt"),
        }
    }
}

impl Config {
    /// 只从环境变量读取（未设置的项取默认值）
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// 读取配置文件（如果存在），再用环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let base = if path.exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };

        let config = base.with_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载，缺少的字段取默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| {
            AppError::Config(ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用外部键值覆盖配置，无法解析的值保持原样
    pub fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;
        let path = |name: &str| lookup(name).map(PathBuf::from);

        Self {
            order_page_url: lookup("ORDER_PAGE_URL").unwrap_or(self.order_page_url),
            orders_csv_url: lookup("ORDERS_CSV_URL").unwrap_or(self.orders_csv_url),
            orders_csv_path: path("ORDERS_CSV_PATH").unwrap_or(self.orders_csv_path),
            output_dir: path("OUTPUT_DIR").unwrap_or(self.output_dir),
            archive_path: path("ARCHIVE_PATH").unwrap_or(self.archive_path),
            browser_mode: parse_var(lookup, "BROWSER_MODE").unwrap_or(self.browser_mode),
            browser_debug_port: parse_var(lookup, "BROWSER_DEBUG_PORT")
                .unwrap_or(self.browser_debug_port),
            chrome_executable: path("CHROME_EXECUTABLE").or(self.chrome_executable),
            element_timeout_ms: parse_var(lookup, "ELEMENT_TIMEOUT_MS")
                .unwrap_or(self.element_timeout_ms),
            poll_interval_ms: parse_var(lookup, "POLL_INTERVAL_MS")
                .unwrap_or(self.poll_interval_ms),
            modal_probe_ms: parse_var(lookup, "MODAL_PROBE_MS").unwrap_or(self.modal_probe_ms),
            max_submit_attempts: parse_var(lookup, "MAX_SUBMIT_ATTEMPTS")
                .unwrap_or(self.max_submit_attempts),
            retry_base_delay_ms: parse_var(lookup, "RETRY_BASE_DELAY_MS")
                .unwrap_or(self.retry_base_delay_ms),
            retry_max_delay_ms: parse_var(lookup, "RETRY_MAX_DELAY_MS")
                .unwrap_or(self.retry_max_delay_ms),
            retry_backoff: parse_var(lookup, "RETRY_BACKOFF").unwrap_or(self.retry_backoff),
            verbose_logging: parse_var(lookup, "VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: path("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.order_page_url.trim().is_empty() {
            return Err(AppError::invalid_config("order_page_url", "不能为空"));
        }
        if self.orders_csv_url.trim().is_empty() {
            return Err(AppError::invalid_config("orders_csv_url", "不能为空"));
        }
        if self.max_submit_attempts == 0 {
            return Err(AppError::invalid_config("max_submit_attempts", "至少为 1"));
        }
        if self.element_timeout_ms == 0 {
            return Err(AppError::invalid_config("element_timeout_ms", "不能为 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::invalid_config("poll_interval_ms", "不能为 0"));
        }
        Ok(())
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn modal_probe(&self) -> Duration {
        Duration::from_millis(self.modal_probe_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_submit_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            backoff: self.retry_backoff,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.archive_path, PathBuf::from("orders.zip"));
    }

    #[test]
    fn test_overrides_replace_only_parsable_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MAX_SUBMIT_ATTEMPTS", "8"),
            ("BROWSER_MODE", "connect"),
            ("RETRY_BACKOFF", "fixed"),
            ("ELEMENT_TIMEOUT_MS", "not-a-number"),
            ("OUTPUT_DIR", "/tmp/robots"),
        ]);

        let config = Config::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.max_submit_attempts, 8);
        assert_eq!(config.browser_mode, BrowserMode::Connect);
        assert_eq!(config.retry_backoff, Backoff::Fixed);
        assert_eq!(config.element_timeout_ms, 10_000);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/robots"));
    }

    #[test]
    fn test_toml_fills_missing_fields_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            orders_csv_url = "http://localhost:8080/orders.csv"
            max_submit_attempts = 2
            retry_backoff = "fixed"
            "#,
        )
        .unwrap();

        assert_eq!(config.orders_csv_url, "http://localhost:8080/orders.csv");
        assert_eq!(config.max_submit_attempts, 2);
        assert_eq!(config.retry_backoff, Backoff::Fixed);
        assert_eq!(config.browser_mode, BrowserMode::Headless);
        assert_eq!(config.poll_interval_ms, 200);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = Config {
            max_submit_attempts: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_submit_attempts"));
    }
}
