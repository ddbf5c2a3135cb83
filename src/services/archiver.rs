//! 归档服务 - 业务能力层
//!
//! 把回执目录打包成一个 ZIP。条目全部放在压缩包根目录，接收方不支持子目录。

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{AppResult, ArchiveError};

/// 归档结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// 压缩包中的条目名（已排序）
    pub entries: Vec<String>,
}

/// 归档服务
pub struct Archiver {
    extension: String,
}

impl Archiver {
    /// 只收集 PDF
    pub fn new() -> Self {
        Self::with_extension("pdf")
    }

    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// 打包目录
    ///
    /// # 参数
    /// - `source_dir`: 源目录
    /// - `target_path`: 压缩包路径
    /// - `recursive`: 是否遍历子目录（子目录中的文件同样放到根目录）
    pub fn archive(
        &self,
        source_dir: &Path,
        target_path: &Path,
        recursive: bool,
    ) -> AppResult<ArchiveSummary> {
        if !source_dir.is_dir() {
            return Err(ArchiveError::SourceNotFound {
                path: source_dir.display().to_string(),
            }
            .into());
        }

        let files = self.collect_files(source_dir, recursive)?;
        debug!("待归档文件 {} 个: {:?}", files.len(), files.keys());

        let partial = target_path.with_extension("zip.part");
        if let Err(e) = write_zip(&partial, &files) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, target_path).map_err(|source| ArchiveError::Io {
            path: target_path.display().to_string(),
            source,
        })?;

        let entries: Vec<String> = files.into_keys().collect();
        info!("📦 已生成压缩包 {} ({} 个文件)", target_path.display(), entries.len());

        Ok(ArchiveSummary {
            path: target_path.to_path_buf(),
            entries,
        })
    }

    /// 收集匹配后缀的文件，键为扁平化后的条目名
    fn collect_files(
        &self,
        source_dir: &Path,
        recursive: bool,
    ) -> AppResult<BTreeMap<String, PathBuf>> {
        let mut walker = WalkDir::new(source_dir).min_depth(1);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = BTreeMap::new();
        for entry in walker {
            let entry = entry.map_err(|source| ArchiveError::Walk { source })?;
            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if files.insert(name.clone(), entry.into_path()).is_some() {
                return Err(ArchiveError::DuplicateEntry { name }.into());
            }
        }
        Ok(files)
    }

    fn matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(&self.extension))
            .unwrap_or(false)
    }
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new()
    }
}

fn write_zip(path: &Path, files: &BTreeMap<String, PathBuf>) -> AppResult<()> {
    let io_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| ArchiveError::Io { path, source }
    };
    let zip_err = |source| ArchiveError::Zip { source };

    let file = File::create(path).map_err(io_err(path))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, source_path) in files {
        writer.start_file(name.as_str(), options).map_err(zip_err)?;
        let mut input = File::open(source_path).map_err(io_err(source_path.as_path()))?;
        io::copy(&mut input, &mut writer).map_err(io_err(source_path.as_path()))?;
    }

    writer.finish().map_err(zip_err)?;
    Ok(())
}
