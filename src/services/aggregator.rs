//! 学生汇总 - 业务能力层
//!
//! 纯函数：把一个学生的所有 ipynb 记录合并成一条汇总

use crate::models::{FileDetail, NotebookRecord, SubmissionSummary};

/// 汇总单个学生的统计结果
///
/// `all_blocks_have_output` 对所有记录取 AND，没有记录时为 true；
/// `has_error` / `has_image` 取 OR
pub fn summarize(records: &[NotebookRecord], secondary_file_count: usize) -> SubmissionSummary {
    SubmissionSummary {
        total_notebooks: records.len(),
        total_code_blocks: records.iter().map(|r| r.total_code_blocks).sum(),
        all_blocks_have_output: records.iter().all(|r| r.all_blocks_have_output),
        has_error: records.iter().any(|r| r.has_error),
        has_image: records.iter().any(|r| r.has_image),
        secondary_file_count,
        per_file_details: records
            .iter()
            .map(|r| FileDetail {
                file_name: r.file_name.clone(),
                code_blocks: r.total_code_blocks,
                error: r.parse_error.clone(),
            })
            .collect(),
    }
}
