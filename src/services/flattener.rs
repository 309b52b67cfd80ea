//! 目录扁平化服务 - 业务能力层
//!
//! 把学生目录下任意层级的目标文件移动到学生根目录（重名自动加 `_n` 后缀），
//! 然后删除所有子目录以及根目录下残留的非目标文件。

use crate::config::Config;
use crate::utils::fs_walk::{collect_files_with_ext, has_extension, list_dir_lenient};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 扁平化统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlattenReport {
    /// 移动到根目录的文件数
    pub moved: usize,
    /// 因重名而改名的文件数
    pub renamed: usize,
    /// 移动失败的文件数
    pub failed: usize,
    /// 删除的子目录数
    pub removed_dirs: usize,
}

/// 目录扁平化服务
pub struct Flattener {
    target_ext: String,
}

impl Flattener {
    pub fn new(config: &Config) -> Self {
        Self {
            target_ext: config.target_ext.clone(),
        }
    }

    /// 扁平化学生目录
    pub async fn flatten(&self, root: &Path) -> FlattenReport {
        let mut report = FlattenReport::default();

        // 1. 收集所有层级的目标文件
        let documents = collect_files_with_ext(root, &self.target_ext).await;

        // 2. 移动到根目录
        for document in documents {
            if document.parent() == Some(root) {
                continue;
            }
            let Some(file_name) = document.file_name().map(|n| n.to_string_lossy().to_string())
            else {
                continue;
            };
            let target = unique_destination(root, &file_name).await;
            match fs::rename(&document, &target).await {
                Ok(()) => {
                    report.moved += 1;
                    if target != root.join(&file_name) {
                        report.renamed += 1;
                    }
                    debug!("移动 {} → {}", document.display(), target.display());
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "⚠️  移动文件失败 {} → {}：{}",
                        document.display(),
                        target.display(),
                        e
                    );
                }
            }
        }

        // 3. 删除所有子目录（包括非空目录）
        report.removed_dirs = remove_subdirs(root).await;

        // 4. 根目录只保留目标文件
        for file in list_dir_lenient(root).await.files {
            if !has_extension(&file, &self.target_ext) {
                if let Err(e) = fs::remove_file(&file).await {
                    warn!("⚠️  删除非目标文件失败 {}：{}", file.display(), e);
                }
            }
        }

        info!("📐 学生目录已扁平化：{}", root.display());
        report
    }
}

/// 在 `dir` 中为 `file_name` 找一个不冲突的路径：`name.ext`、`name_1.ext`、`name_2.ext`...
pub async fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let mut candidate = dir.join(file_name);
    let original = Path::new(file_name);
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut suffix = 1;
    while fs::try_exists(&candidate).await.unwrap_or(false) {
        candidate = dir.join(format!("{}_{}{}", stem, suffix, ext));
        suffix += 1;
    }
    candidate
}

/// 自底向上删除 `dir` 下的所有子目录（连同其中的文件），返回删除的目录数
async fn remove_subdirs(dir: &Path) -> usize {
    let root = dir.to_path_buf();
    tokio::task::spawn_blocking(move || remove_subdirs_blocking(&root))
        .await
        .unwrap_or_else(|e| {
            warn!("⚠️  删除子目录任务异常 {}：{}", dir.display(), e);
            0
        })
}

fn remove_subdirs_blocking(root: &Path) -> usize {
    let mut removed = 0;
    let entries = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|entry| entry.ok());
    for entry in entries {
        let path = entry.path();
        if entry.file_type().is_dir() {
            match std::fs::remove_dir(path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("⚠️  删除目录失败 {}：{}", path.display(), e),
            }
        } else if entry.depth() > 1 {
            // 根目录下的文件留给后续步骤按后缀处理
            if let Err(e) = std::fs::remove_file(path) {
                debug!("删除子目录中的文件失败 {}：{}", path.display(), e);
            }
        }
    }
    removed
}
