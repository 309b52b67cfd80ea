//! 单个学生处理器 - 编排层
//!
//! ## 职责
//!
//! 按固定顺序调用能力层，处理一个学生的提交：
//!
//! - **解压整理**（`normalize`）：复制压缩包 → 递归解压 → 统计 → 扁平化
//! - **统计批阅**（`analyze`）：扫描清理 → 统计 → 汇总 → 可选的 LLM 批阅
//!
//! 本模块不捕获错误，出错时直接返回，由 `batch_processor` 记录到该学生的结果中。

use crate::config::Config;
use crate::infrastructure::ExtractBackend;
use crate::models::{StudentInfo, SubmissionResult, SubmissionSummary};
use crate::services::aggregator::summarize;
use crate::services::flattener::Flattener;
use crate::services::grading::GradingService;
use crate::services::notebook_stats::extract_record;
use crate::services::tree_scanner::{ScanSession, TreeScanner};
use crate::utils::fs_walk::collect_files_with_ext;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// 单个学生的统计结果以及参与统计的 notebook 文件
#[derive(Debug)]
pub struct CollectedStatistics {
    pub summary: SubmissionSummary,
    pub notebooks: Vec<PathBuf>,
}

/// 单个学生处理器
pub struct SubmissionProcessor<B> {
    scanner: TreeScanner<B>,
    flattener: Flattener,
    grading: Option<GradingService>,
    target_ext: String,
    secondary_ext: String,
}

impl<B: ExtractBackend> SubmissionProcessor<B> {
    pub fn new(backend: B, config: &Config) -> Self {
        let grading = if config.grading_active() {
            Some(GradingService::new(config))
        } else {
            if config.grading_enabled {
                warn!("⚠️  已开启批阅但未配置 LLM_API_KEY，跳过 LLM 批阅");
            }
            None
        };

        Self {
            scanner: TreeScanner::new(backend, config),
            flattener: Flattener::new(config),
            grading,
            target_ext: config.target_ext.clone(),
            secondary_ext: config.secondary_ext.clone(),
        }
    }

    /// 解压整理一个学生的压缩包
    ///
    /// 在 `student_dir` 中放入压缩包副本并原地解压，最终目录中只保留扁平化后的 notebook
    pub async fn normalize(
        &self,
        student: StudentInfo,
        source_archive: &Path,
        student_dir: &Path,
    ) -> Result<SubmissionResult> {
        fs::create_dir_all(student_dir)
            .await
            .with_context(|| format!("创建学生目录失败: {}", student_dir.display()))?;

        let file_name = source_archive
            .file_name()
            .with_context(|| format!("无效的压缩包路径: {}", source_archive.display()))?;
        let working_copy = student_dir.join(file_name);
        fs::copy(source_archive, &working_copy)
            .await
            .with_context(|| format!("复制压缩包失败: {}", source_archive.display()))?;

        // 每个学生使用独立的已处理集合
        let mut session = ScanSession::new();
        self.scanner
            .process_archive(&working_copy, &mut session)
            .await;
        debug!(
            "{} 清理非目标文件 {} 个，删除失败 {} 个",
            student, session.removed_files, session.failed_removals
        );
        if session.failed_archives() > 0 {
            warn!(
                "⚠️  {} 有 {} 个压缩包未能解压",
                student,
                session.failed_archives()
            );
        }

        let statistics = self.collect_statistics(student_dir).await;
        let report = self.flattener.flatten(student_dir).await;
        info!(
            "✅ {} 解压整理完成：保留 {} 个 notebook（重命名 {} 个）",
            student, statistics.summary.total_notebooks, report.renamed
        );

        Ok(SubmissionResult::succeeded(student, statistics.summary))
    }

    /// 统计（并可选批阅）一个已整理的学生目录
    pub async fn analyze(&self, student: StudentInfo, student_dir: &Path) -> Result<SubmissionResult> {
        fs::metadata(student_dir)
            .await
            .with_context(|| format!("无法访问学生目录: {}", student_dir.display()))?;

        let mut session = ScanSession::new();
        self.scanner.scan(student_dir, &mut session).await;

        let statistics = self.collect_statistics(student_dir).await;
        let result = SubmissionResult::succeeded(student, statistics.summary);

        match &self.grading {
            Some(grading) => {
                let graded = grading
                    .grade(&result.student, &result.summary, &statistics.notebooks)
                    .await;
                Ok(result.with_grading(graded))
            }
            None => Ok(result),
        }
    }

    /// 递归统计目录下的 notebook 和次要源文件
    pub async fn collect_statistics(&self, dir: &Path) -> CollectedStatistics {
        let notebooks = collect_files_with_ext(dir, &self.target_ext).await;
        let mut records = Vec::with_capacity(notebooks.len());
        for path in &notebooks {
            records.push(extract_record(path).await);
        }
        let secondary_count = collect_files_with_ext(dir, &self.secondary_ext).await.len();

        CollectedStatistics {
            summary: summarize(&records, secondary_count),
            notebooks,
        }
    }
}
