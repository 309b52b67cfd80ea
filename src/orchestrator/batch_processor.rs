//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量提交的调度和统计。
//!
//! ## 核心功能
//!
//! 1. **加载**：扫描源目录，筛选符合 `学号-姓名` 约定的条目
//! 2. **隔离**：每个学生在独立的 tokio 任务中处理，错误或 panic 只影响该学生
//! 3. **顺序执行**：学生之间按目录顺序逐个处理
//! 4. **统计输出**：写报表，打印每个学生的汇总和全局统计
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个学生的细节，委托给 `SubmissionProcessor`
//! - **致命错误**：只有源目录无法读取、输出目录无法准备时整批失败

use crate::config::Config;
use crate::error::{AppError, FileError};
use crate::infrastructure::{CommandBackend, ExtractBackend};
use crate::models::{StudentInfo, SubmissionResult};
use crate::orchestrator::submission_processor::SubmissionProcessor;
use crate::orchestrator::Mode;
use crate::services::report_writer::ReportWriter;
use crate::utils::fs_walk::{has_extension, list_dir, DirListing};
use crate::utils::logging::{self, truncate_text, yes_no};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, warn};

/// 一个待处理的学生条目
#[derive(Debug, Clone)]
struct PendingSubmission {
    student: StudentInfo,
    path: PathBuf,
}

/// 应用主结构
pub struct App<B> {
    config: Config,
    processor: Arc<SubmissionProcessor<B>>,
    report: ReportWriter,
}

impl App<CommandBackend> {
    /// 使用配置中的解压程序创建应用
    pub fn from_config(config: Config) -> Self {
        let backend = CommandBackend::from_config(&config);
        Self::new(backend, config)
    }
}

impl<B: ExtractBackend + 'static> App<B> {
    pub fn new(backend: B, config: Config) -> Self {
        let processor = Arc::new(SubmissionProcessor::new(backend, &config));
        let report = ReportWriter::new(config.report_path.clone());
        Self {
            config,
            processor,
            report,
        }
    }

    /// 按模式运行
    pub async fn run(&self, mode: Mode) -> Result<Vec<SubmissionResult>> {
        match mode {
            Mode::Extract => self.run_extraction().await,
            Mode::Analyze => self.run_analysis().await,
        }
    }

    /// 解压整理：源目录中的每个压缩包 → 输出目录中的一个扁平学生目录
    pub async fn run_extraction(&self) -> Result<Vec<SubmissionResult>> {
        self.config.validate_for_extraction()?;
        logging::log_startup(Mode::Extract.as_str(), &self.config.source_dir);

        prepare_output_dir(&self.config.output_dir).await?;

        let listing = read_source(&self.config.source_dir).await?;
        let pending: Vec<PendingSubmission> = listing
            .files
            .into_iter()
            .filter(|path| is_conventional(path) && self.is_archive(path))
            .map(|path| PendingSubmission {
                student: StudentInfo::parse(&file_stem(&path)),
                path,
            })
            .collect();

        if pending.is_empty() {
            warn!("⚠️  源目录中没有符合 学号-姓名 格式的压缩包，程序结束");
            return Ok(Vec::new());
        }

        info!("📦 共 {} 个学生压缩包待处理", pending.len());

        let output_dir = self.config.output_dir.clone();
        let results = self
            .process_all(pending, move |processor, submission| {
                let student_dir = output_dir.join(file_stem(&submission.path));
                async move {
                    processor
                        .normalize(submission.student, &submission.path, &student_dir)
                        .await
                }
            })
            .await;

        self.finish(Mode::Extract, &results).await?;
        Ok(results)
    }

    /// 统计批阅：输出目录中的每个学生目录 → 一条汇总（可选批阅）
    pub async fn run_analysis(&self) -> Result<Vec<SubmissionResult>> {
        logging::log_startup(Mode::Analyze.as_str(), &self.config.output_dir);

        let listing = read_source(&self.config.output_dir).await?;
        let pending: Vec<PendingSubmission> = listing
            .dirs
            .into_iter()
            .filter(|path| is_conventional(path))
            .map(|path| PendingSubmission {
                student: StudentInfo::parse(&file_name(&path)),
                path,
            })
            .collect();

        if pending.is_empty() {
            warn!("⚠️  没有找到符合 学号-姓名 格式的学生目录，程序结束");
            return Ok(Vec::new());
        }
        info!("📁 共 {} 个学生目录待统计", pending.len());

        let results = self
            .process_all(pending, |processor, submission| async move {
                processor.analyze(submission.student, &submission.path).await
            })
            .await;

        self.finish(Mode::Analyze, &results).await?;
        Ok(results)
    }

    fn is_archive(&self, path: &Path) -> bool {
        self.config
            .archive_exts
            .iter()
            .any(|ext| has_extension(path, ext))
    }

    /// 逐个处理学生，每个学生在独立任务中运行
    async fn process_all<F, Fut>(
        &self,
        pending: Vec<PendingSubmission>,
        job: F,
    ) -> Vec<SubmissionResult>
    where
        F: Fn(Arc<SubmissionProcessor<B>>, PendingSubmission) -> Fut,
        Fut: Future<Output = Result<SubmissionResult>> + Send + 'static,
    {
        let total = pending.len();
        let mut results = Vec::with_capacity(total);

        for (index, submission) in pending.into_iter().enumerate() {
            let student = submission.student.clone();
            logging::log_submission_start(index + 1, total, &student.to_string());

            let handle = tokio::spawn(job(self.processor.clone(), submission));
            let result = match handle.await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!("❌ 处理失败 {}：{:#}", student, e);
                    SubmissionResult::failed(student, format!("{:#}", e))
                }
                Err(e) => {
                    error!("❌ 处理任务异常终止 {}：{}", student, e);
                    SubmissionResult::failed(student, format!("处理任务异常终止: {}", e))
                }
            };
            results.push(result);
        }
        results
    }

    /// 写报表并输出统计
    async fn finish(&self, mode: Mode, results: &[SubmissionResult]) -> Result<()> {
        self.report
            .write(mode.as_str(), results)
            .await
            .context("写入报表失败")?;

        log_results_table(results);

        let success = results.iter().filter(|r| r.is_success()).count();
        logging::print_final_stats(success, results.len() - success, self.report.path());
        Ok(())
    }
}

/// 读取源目录，失败时整批终止
async fn read_source(dir: &Path) -> Result<DirListing, AppError> {
    if !fs::try_exists(dir).await.unwrap_or(false) {
        return Err(FileError::DirectoryNotFound {
            path: dir.to_path_buf(),
        }
        .into());
    }
    list_dir(dir)
        .await
        .map_err(|e| AppError::read_dir_failed(dir, e))
}

/// 清空并重新创建输出目录
async fn prepare_output_dir(dir: &Path) -> Result<()> {
    if fs::try_exists(dir).await.unwrap_or(false) {
        fs::remove_dir_all(dir)
            .await
            .with_context(|| format!("清空输出目录失败: {}", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("创建输出目录失败: {}", dir.display()))?;
    info!("🧹 已清空输出目录：{}", dir.display());
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_conventional(path: &Path) -> bool {
    StudentInfo::matches_convention(&file_name(path))
}

/// 打印每个学生的汇总
fn log_results_table(results: &[SubmissionResult]) {
    info!("\n📋 学生汇总");
    for result in results {
        if !result.is_success() {
            info!(
                "  {} | ❌ {}",
                result.student,
                truncate_text(&result.error, 50)
            );
            continue;
        }
        let summary = &result.summary;
        let grading = result
            .grading
            .as_ref()
            .map(|g| format!(" | 分数 {} | {}", g.score, truncate_text(&g.comment, 30)))
            .unwrap_or_default();
        info!(
            "  {} | notebook {} | 代码块 {} | 全部有输出 {} | 报错 {} | 图片 {} | py {}{}",
            result.student,
            summary.total_notebooks,
            summary.total_code_blocks,
            yes_no(summary.all_blocks_have_output),
            yes_no(summary.has_error),
            yes_no(summary.has_image),
            summary.secondary_file_count,
            grading
        );
    }
}
