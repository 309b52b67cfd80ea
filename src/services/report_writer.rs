//! 报表写入服务 - 业务能力层
//!
//! 只负责"把一批学生结果写成 JSON 报表"，不关心流程

use crate::error::{AppError, AppResult, FileError};
use crate::models::SubmissionResult;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// 报表内容
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport<'a> {
    pub generated_at: String,
    pub mode: &'a str,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub submissions: &'a [SubmissionResult],
}

impl<'a> BatchReport<'a> {
    pub fn new(mode: &'a str, submissions: &'a [SubmissionResult]) -> Self {
        let success = submissions.iter().filter(|s| s.is_success()).count();
        Self {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            mode,
            total: submissions.len(),
            success,
            failed: submissions.len() - success,
            submissions,
        }
    }
}

/// 报表写入服务
pub struct ReportWriter {
    report_path: PathBuf,
}

impl ReportWriter {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.report_path
    }

    /// 写入报表（覆盖已有文件，自动创建父目录）
    pub async fn write(&self, mode: &str, submissions: &[SubmissionResult]) -> AppResult<()> {
        let report = BatchReport::new(mode, submissions);
        let json = serde_json::to_string_pretty(&report).map_err(|source| {
            AppError::File(FileError::SerializeFailed {
                path: self.report_path.clone(),
                source,
            })
        })?;

        if let Some(parent) = self.report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::write_failed(parent, e))?;
            }
        }
        fs::write(&self.report_path, json)
            .await
            .map_err(|e| AppError::write_failed(&self.report_path, e))?;

        debug!(
            "报表已写入 {}（{} 条记录）",
            self.report_path.display(),
            report.total
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StudentInfo, SubmissionSummary};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_report() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/report.json");
        let submissions = vec![
            SubmissionResult::succeeded(StudentInfo::parse("2023001-张三"), SubmissionSummary::empty()),
            SubmissionResult::failed(StudentInfo::parse("2023002-李四"), "无法读取"),
        ];

        let writer = ReportWriter::new(&path);
        writer.write("extract", &submissions).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mode"], "extract");
        assert_eq!(value["total"], 2);
        assert_eq!(value["success"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["submissions"][0]["studentId"], "2023001");
        assert_eq!(value["submissions"][1]["error"], "无法读取");
        assert!(value["submissions"][0].get("grading").is_none());
    }

    #[tokio::test]
    async fn test_write_to_unwritable_path() {
        let tmp = TempDir::new().unwrap();
        // 父路径是文件，无法创建目录
        std::fs::write(tmp.path().join("blocker"), "").unwrap();
        let writer = ReportWriter::new(tmp.path().join("blocker/report.json"));

        let err = writer.write("analyze", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::File(FileError::WriteFailed { .. })));
    }
}
