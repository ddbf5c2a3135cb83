//! 文件下载服务 - 业务能力层
//!
//! 只负责"把远程文件保存到本地"，失败直接向上传播，不重试

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppResult, DownloadError};

/// 文件下载服务
pub struct FileFetcher {
    client: reqwest::Client,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// 下载文件
    ///
    /// # 参数
    /// - `url`: 远程地址
    /// - `destination`: 本地保存路径
    /// - `overwrite`: 目标已存在时是否覆盖
    ///
    /// # 返回
    /// 返回保存后的路径
    pub async fn download(
        &self,
        url: &str,
        destination: &Path,
        overwrite: bool,
    ) -> AppResult<PathBuf> {
        if !overwrite && destination.exists() {
            return Err(DownloadError::AlreadyExists {
                path: destination.display().to_string(),
            }
            .into());
        }

        debug!("下载 {} -> {}", url, destination.display());

        let request_err = |source| DownloadError::Request {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let bytes = response.bytes().await.map_err(request_err)?;

        let write_err = |source| DownloadError::Write {
            path: destination.display().to_string(),
            source,
        };

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        // 先写临时文件再改名，中途失败不会留下半截文件
        let partial = partial_path(destination);
        fs::write(&partial, &bytes).await.map_err(write_err)?;
        if let Err(e) = fs::rename(&partial, destination).await {
            let _ = fs::remove_file(&partial).await;
            return Err(write_err(e).into());
        }

        info!("✓ 已下载 {} ({} 字节)", destination.display(), bytes.len());
        Ok(destination.to_path_buf())
    }
}

impl Default for FileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("download"));
    name.push(".part");
    destination.with_file_name(name)
}
