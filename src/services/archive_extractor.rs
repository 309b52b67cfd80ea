//! 压缩包解压服务 - 业务能力层
//!
//! 只负责"解压一个压缩包并判定结果"：
//! - 已处理过（集合中或已有标记文件）或后缀不支持时直接跳过
//! - 解压成功后在压缩包旁写入标记文件
//! - 所有失败都只记录日志，不向上抛出

use crate::config::Config;
use crate::infrastructure::{ExtractBackend, ToolRun};
use crate::utils::fs_walk::extension_lower;
use crate::utils::truncate_text;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// 标记文件内容
const MARKER_CONTENT: &str = "已解压";
/// 日志中诊断信息的最大长度
const DIAGNOSTIC_PREVIEW_LEN: usize = 50;

/// 解压结果分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Success,
    /// 需要密码
    Encrypted,
    /// 压缩包损坏
    Corrupted,
    /// 超时，按"已完成但无效果"处理
    TimedOut,
    /// 其他失败
    Failed { message: String },
}

/// 诊断文本匹配规则（与解压程序的语言环境相关）
#[derive(Debug, Clone)]
pub struct DiagnosticPatterns {
    pub password: Vec<String>,
    pub corrupt: Vec<String>,
}

impl DiagnosticPatterns {
    pub fn from_config(config: &Config) -> Self {
        Self {
            password: config.password_patterns.clone(),
            corrupt: config.corrupt_patterns.clone(),
        }
    }
}

/// 根据程序退出状态和输出判定解压结果
///
/// 同时检查 stdout 和 stderr；密码规则优先于损坏规则
pub fn classify(run: &ToolRun, patterns: &DiagnosticPatterns) -> ExtractOutcome {
    match run {
        ToolRun::TimedOut => ExtractOutcome::TimedOut,
        ToolRun::Finished { success: true, .. } => ExtractOutcome::Success,
        ToolRun::Finished { stdout, stderr, .. } => {
            let mentions = |needles: &[String]| {
                needles
                    .iter()
                    .any(|needle| stdout.contains(needle.as_str()) || stderr.contains(needle.as_str()))
            };
            if mentions(&patterns.password) {
                ExtractOutcome::Encrypted
            } else if mentions(&patterns.corrupt) {
                ExtractOutcome::Corrupted
            } else {
                let diagnostic = if stderr.trim().is_empty() { stdout } else { stderr };
                ExtractOutcome::Failed {
                    message: diagnostic.trim().to_string(),
                }
            }
        }
    }
}

/// 单个学生递归解压过程中已处理的压缩包
///
/// 每个学生使用独立的实例，不跨学生共享
#[derive(Debug, Default)]
pub struct ProcessedArchives {
    paths: HashSet<PathBuf>,
}

impl ProcessedArchives {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个压缩包，已存在时返回 false
    pub fn insert(&mut self, path: &Path) -> bool {
        self.paths.insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// 压缩包解压服务
pub struct ArchiveExtractor<B> {
    backend: B,
    archive_exts: Vec<String>,
    marker_suffix: String,
    patterns: DiagnosticPatterns,
}

impl<B: ExtractBackend> ArchiveExtractor<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        Self {
            backend,
            archive_exts: config
                .archive_exts
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            marker_suffix: config.marker_suffix.clone(),
            patterns: DiagnosticPatterns::from_config(config),
        }
    }

    /// 是否为支持的压缩包格式
    pub fn is_archive(&self, path: &Path) -> bool {
        self.archive_exts.contains(&extension_lower(path))
    }

    /// 是否为解压标记文件
    pub fn is_marker(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(&self.marker_suffix))
    }

    /// 压缩包对应的标记文件路径（同目录，文件名 + 标记后缀）
    pub fn marker_path(&self, archive: &Path) -> PathBuf {
        let mut name = archive
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(&self.marker_suffix);
        archive.with_file_name(name)
    }

    /// 原地解压单个压缩包
    ///
    /// # 返回
    /// 被跳过时返回 None，否则返回本次解压的结果分类
    pub async fn extract(
        &self,
        archive: &Path,
        processed: &mut ProcessedArchives,
    ) -> Option<ExtractOutcome> {
        if !self.is_archive(archive) || processed.contains(archive) {
            return None;
        }
        processed.insert(archive);

        if fs::try_exists(self.marker_path(archive)).await.unwrap_or(false) {
            debug!("已有解压标记，跳过: {}", archive.display());
            return None;
        }

        let display_name = file_display_name(archive);
        let outcome = match self.backend.run(archive).await {
            Ok(run) => classify(&run, &self.patterns),
            Err(e) => ExtractOutcome::Failed {
                message: e.to_string(),
            },
        };

        match &outcome {
            ExtractOutcome::Success => {
                info!("✅ 解压成功：{}", display_name);
                if let Err(e) = fs::write(self.marker_path(archive), MARKER_CONTENT).await {
                    warn!("⚠️  写入解压标记失败 {}：{}", display_name, e);
                }
            }
            ExtractOutcome::Encrypted => warn!("⚠️  {} 已加密，跳过", display_name),
            ExtractOutcome::Corrupted => warn!("⚠️  {} 损坏，跳过", display_name),
            ExtractOutcome::TimedOut => warn!("⏱️  {} 解压超时，跳过", display_name),
            ExtractOutcome::Failed { message } => error!(
                "❌ 解压失败 {}：{}",
                display_name,
                truncate_text(message, DIAGNOSTIC_PREVIEW_LEN)
            ),
        }

        Some(outcome)
    }

    /// 删除压缩包及其标记文件（不存在时忽略）
    pub async fn cleanup(&self, archive: &Path) {
        for path in [archive.to_path_buf(), self.marker_path(archive)] {
            if let Err(e) = fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("⚠️  清理失败 {}：{}", path.display(), e);
                }
            }
        }
    }
}

fn file_display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
