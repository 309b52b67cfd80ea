use crate::models::student::StudentInfo;
use serde::{Deserialize, Serialize};

/// 单个 ipynb 文件的统计结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotebookRecord {
    pub file_name: String,
    /// 代码块总数
    pub total_code_blocks: usize,
    /// 是否所有代码块都有运行结果（没有代码块时为 false）
    pub all_blocks_have_output: bool,
    /// 运行结果中是否有报错
    pub has_error: bool,
    /// 运行结果中是否有图片
    pub has_image: bool,
    /// 解析失败原因，成功时为空
    pub parse_error: String,
}

impl NotebookRecord {
    /// 解析失败时的记录：计数归零，布尔值全部为 false
    pub fn failed(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            total_code_blocks: 0,
            all_blocks_have_output: false,
            has_error: false,
            has_image: false,
            parse_error: reason.into(),
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.parse_error.is_empty()
    }
}

/// 单个文件在汇总中的明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub file_name: String,
    pub code_blocks: usize,
    pub error: String,
}

/// 单个学生的汇总统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub total_notebooks: usize,
    pub total_code_blocks: usize,
    /// 所有文件的 AND（没有文件时为 true）
    pub all_blocks_have_output: bool,
    pub has_error: bool,
    pub has_image: bool,
    pub secondary_file_count: usize,
    pub per_file_details: Vec<FileDetail>,
}

impl SubmissionSummary {
    /// 处理失败时使用的空汇总
    pub fn empty() -> Self {
        Self {
            total_notebooks: 0,
            total_code_blocks: 0,
            all_blocks_have_output: false,
            has_error: false,
            has_image: false,
            secondary_file_count: 0,
            per_file_details: Vec::new(),
        }
    }
}

/// LLM 批阅结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub score: u32,
    pub comment: String,
    /// LLM 原始输出（便于排查）
    pub raw_output: String,
}

/// 单个学生的最终处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    #[serde(flatten)]
    pub student: StudentInfo,
    pub summary: SubmissionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grading: Option<GradingResult>,
    /// 处理失败原因，成功时为空
    pub error: String,
}

impl SubmissionResult {
    pub fn succeeded(student: StudentInfo, summary: SubmissionSummary) -> Self {
        Self {
            student,
            summary,
            grading: None,
            error: String::new(),
        }
    }

    pub fn failed(student: StudentInfo, error: impl Into<String>) -> Self {
        Self {
            student,
            summary: SubmissionSummary::empty(),
            grading: None,
            error: error.into(),
        }
    }

    pub fn with_grading(mut self, grading: GradingResult) -> Self {
        self.grading = Some(grading);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}
