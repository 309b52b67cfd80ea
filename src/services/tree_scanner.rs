//! 目录扫描服务 - 业务能力层
//!
//! 递归扫描目录：
//! 1. 子目录先深度优先扫描
//! 2. 未处理的压缩包原地解压，再扫描解压出的内容，最后删除压缩包和标记
//! 3. 既不是压缩包也不是保留类型的文件直接删除

use crate::config::Config;
use crate::infrastructure::ExtractBackend;
use crate::services::archive_extractor::{ArchiveExtractor, ExtractOutcome, ProcessedArchives};
use crate::utils::fs_walk::{extension_lower, list_dir_lenient};
use futures::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// 单个学生的一次扫描会话
///
/// 持有该学生专属的已处理集合，并记录每个压缩包的结果
#[derive(Debug, Default)]
pub struct ScanSession {
    pub processed: ProcessedArchives,
    pub outcomes: Vec<(PathBuf, ExtractOutcome)>,
    pub removed_files: usize,
    /// 删除失败的非目标文件数（文件已不存在的不算）
    pub failed_removals: usize,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解压失败（任意非成功结果）的压缩包数量
    pub fn failed_archives(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome != ExtractOutcome::Success)
            .count()
    }
}

/// 目录扫描服务
pub struct TreeScanner<B> {
    extractor: ArchiveExtractor<B>,
    /// 扫描时保留的文件后缀（目标文件 + 次要源文件）
    retained_exts: Vec<String>,
}

impl<B: ExtractBackend> TreeScanner<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            extractor: ArchiveExtractor::new(backend, config),
            retained_exts: vec![
                config.target_ext.to_lowercase(),
                config.secondary_ext.to_lowercase(),
            ],
        }
    }

    fn is_retained(&self, path: &Path) -> bool {
        self.retained_exts.contains(&extension_lower(path))
    }

    /// 递归扫描目录
    pub fn scan<'a>(&'a self, dir: &'a Path, session: &'a mut ScanSession) -> BoxFuture<'a, ()> {
        async move {
            let listing = list_dir_lenient(dir).await;

            for sub in &listing.dirs {
                self.scan(sub, session).await;
            }

            for file in &listing.files {
                if self.extractor.is_marker(file) {
                    continue;
                }
                if self.extractor.is_archive(file) {
                    // 已处理的压缩包由处理它的那一层负责清理
                    if !session.processed.contains(file) {
                        self.process_archive(file, session).await;
                    }
                    continue;
                }
                if self.is_retained(file) {
                    continue;
                }
                match fs::remove_file(file).await {
                    Ok(()) => {
                        debug!("删除非目标文件: {}", file.display());
                        session.removed_files += 1;
                    }
                    // 平铺解压后的重扫描可能已经删掉了这个文件
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!("⚠️  删除非目标文件失败 {}：{}", file.display(), e);
                        session.failed_removals += 1;
                    }
                }
            }
        }
        .boxed()
    }

    /// 解压一个压缩包，递归处理解压出的内容，然后清理压缩包和标记
    ///
    /// # 返回
    /// 压缩包被跳过时返回 None
    pub fn process_archive<'a>(
        &'a self,
        archive: &'a Path,
        session: &'a mut ScanSession,
    ) -> BoxFuture<'a, Option<ExtractOutcome>> {
        async move {
            let Some(outcome) = self
                .extractor
                .extract(archive, &mut session.processed)
                .await
            else {
                return None;
            };

            let archive_dir = archive.parent().unwrap_or_else(|| Path::new("."));
            let rescan_dir = match archive.file_stem() {
                Some(stem) => {
                    let candidate = archive_dir.join(stem);
                    if fs::metadata(&candidate).await.is_ok_and(|m| m.is_dir()) {
                        candidate
                    } else {
                        archive_dir.to_path_buf()
                    }
                }
                None => archive_dir.to_path_buf(),
            };
            self.scan(&rescan_dir, session).await;

            self.extractor.cleanup(archive).await;
            session
                .outcomes
                .push((archive.to_path_buf(), outcome.clone()));
            Some(outcome)
        }
        .boxed()
    }
}
