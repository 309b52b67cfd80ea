//! Notebook 统计服务 - 业务能力层
//!
//! 只负责"把一个 ipynb 文件变成一条统计记录"。
//! 解析失败不会向上抛出，而是体现在记录的 `parse_error` 字段中。

use crate::error::NotebookError;
use crate::models::{Notebook, NotebookRecord};
use std::path::Path;
use tracing::error;

/// 宽松解析 notebook 内容（允许尾逗号、注释、无引号键名）
///
/// 这是唯一的解析入口，任何解析错误都会转换为 `NotebookError`
pub fn parse_notebook(content: &str) -> Result<Notebook, NotebookError> {
    // 去掉 UTF-8 BOM，部分编辑器保存时会带上
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    json5::from_str(content).map_err(|e| NotebookError::Malformed {
        message: e.to_string(),
    })
}

/// 读取并解析 notebook 文件
pub async fn read_notebook(path: &Path) -> Result<Notebook, NotebookError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| NotebookError::Unreadable { source })?;
    parse_notebook(&String::from_utf8_lossy(&bytes))
}

/// 根据解析结果计算统计记录
pub fn compute_record(file_name: &str, notebook: &Notebook) -> NotebookRecord {
    let mut total_code_blocks = 0;
    let mut all_have_output = true;
    let mut has_error = false;
    let mut has_image = false;

    for cell in notebook.code_cells() {
        total_code_blocks += 1;
        let outputs = cell.outputs();
        if outputs.is_empty() {
            all_have_output = false;
        }
        for output in outputs {
            has_error |= output.is_error();
            has_image |= output.has_image();
        }
    }

    NotebookRecord {
        file_name: file_name.to_string(),
        total_code_blocks,
        // 没有代码块时不算"全部有输出"
        all_blocks_have_output: total_code_blocks > 0 && all_have_output,
        has_error,
        has_image,
        parse_error: String::new(),
    }
}

/// 从文本内容得到统计记录
pub fn analyze_content(file_name: &str, content: &str) -> NotebookRecord {
    match parse_notebook(content) {
        Ok(notebook) => compute_record(file_name, &notebook),
        Err(e) => NotebookRecord::failed(file_name, e.to_string()),
    }
}

/// 解析单个 ipynb 文件，失败时返回带错误描述的记录
pub async fn extract_record(path: &Path) -> NotebookRecord {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    match read_notebook(path).await {
        Ok(notebook) => compute_record(&file_name, &notebook),
        Err(e) => {
            error!("❌ 解析ipynb失败 {}：{}", path.display(), e);
            NotebookRecord::failed(file_name, e.to_string())
        }
    }
}
