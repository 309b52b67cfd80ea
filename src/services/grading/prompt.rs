//! 批阅提示词构建
//!
//! 模板中的 `{xxx}` 为占位符，由 `render_*` 函数替换

use crate::models::{Notebook, StudentInfo, SubmissionSummary};
use crate::services::notebook_stats::read_notebook;
use crate::utils::logging::yes_no;
use std::path::Path;

/// 多个 notebook 文本之间的分隔线
pub const NOTEBOOK_SEPARATOR: &str = "\n\n-------------------------\n\n";

const SYSTEM_TEMPLATE: &str = r#"你是专业的Python编程作业批改老师，具备丰富的编程教学经验，严格按照以下要求批阅作业：
【输出格式要求（严格遵守，不可更改）】
1. 第一行仅输出分数，格式为：分数：XX（XX为0-100的整数）；
2. 第二行开始为评语，评语可包含：评分依据、优点、问题、改进建议等，语言简洁专业，字数在100字以内；
3. 禁止在分数行添加任何额外内容，禁止在评语中换行符以外的特殊格式。

【核心准则】
1. 批阅结果需严格、公正、客观，完全遵循给定的作业要求和评判标准；
2. 有图（运行结果）的作业给到90分以上，有运行结果确其中无错误但是没图的作业，给80-90之间的分数，无运行结果给80以下

【作业要求】
{homework_requirements}

【评判标准（总分100分）】
{grading_criteria}"#;

const USER_TEMPLATE: &str = r#"请批阅以下学生的编程作业，严格按照要求输出结果：

【学生信息】
学号：{student_id}
姓名：{name}

【作业统计数据】
- IPynb文件数：{notebook_count}
- 代码块总数：{code_block_count}
- 所有代码块均有运行结果：{all_have_output}
- 运行结果包含报错：{has_error}
- 运行结果包含图片：{has_image}
- Py文件数量：{secondary_count}

【IPynb文件内容】
{notebook_contents}

【批阅输出要求】
1. 第一行仅输出分数，格式为：分数：XX（XX为0-100的整数）；
2. 第二行开始为评语，评语可包含：评分依据、优点、问题、改进建议等，语言简洁专业，字数在100字以内；
3. 禁止在分数行添加任何额外内容，禁止在评语中换行符以外的特殊格式。"#;

/// 系统提示词
pub fn render_system_prompt(homework_requirements: &str, grading_criteria: &str) -> String {
    SYSTEM_TEMPLATE
        .replace("{homework_requirements}", homework_requirements.trim())
        .replace("{grading_criteria}", grading_criteria.trim())
}

/// 用户提示词
pub fn render_user_prompt(
    student: &StudentInfo,
    summary: &SubmissionSummary,
    notebook_texts: &[String],
) -> String {
    USER_TEMPLATE
        .replace("{student_id}", &student.student_id)
        .replace("{name}", &student.name)
        .replace("{notebook_count}", &summary.total_notebooks.to_string())
        .replace("{code_block_count}", &summary.total_code_blocks.to_string())
        .replace("{all_have_output}", yes_no(summary.all_blocks_have_output))
        .replace("{has_error}", yes_no(summary.has_error))
        .replace("{has_image}", yes_no(summary.has_image))
        .replace("{secondary_count}", &summary.secondary_file_count.to_string())
        // 最后替换内容，避免学生代码中的占位符文本被误替换
        .replace("{notebook_contents}", &notebook_texts.join(NOTEBOOK_SEPARATOR))
}

/// 把 notebook 转换为便于 LLM 阅读的文本
pub fn render_notebook(file_name: &str, notebook: &Notebook) -> String {
    let mut text = format!("【文件名称】：{}\n", file_name);
    text.push_str(&format!("【总代码块数】：{}\n", notebook.code_cells().count()));
    text.push_str("【代码内容】：\n");

    for (index, cell) in notebook.cells.iter().flatten().enumerate() {
        if !cell.is_code() {
            continue;
        }
        text.push_str(&format!("\n===== 代码块 {} =====\n", index + 1));
        let source = if cell.source.is_empty() { "无代码" } else { &cell.source };
        text.push_str(&format!("代码：\n{}\n", source));
        text.push_str("输出：\n");

        let outputs = cell.outputs();
        if outputs.is_empty() {
            text.push_str("❌ 无输出\n");
            continue;
        }
        for output in outputs {
            if output.is_error() {
                let detail = match &output.traceback {
                    Some(lines) if !lines.is_empty() => lines.join("\n"),
                    _ if !output.text.is_empty() => output.text.clone(),
                    _ => "未知错误".to_string(),
                };
                text.push_str(&format!("⚠️  报错：{}\n", detail));
            } else if output.is_data_output() {
                let detail = output
                    .plain_text()
                    .or_else(|| (!output.text.is_empty()).then(|| output.text.clone()))
                    .unwrap_or_else(|| "无文本输出".to_string());
                text.push_str(&format!("✅ 正常输出：{}\n", detail));
            } else if output.text.is_empty() {
                text.push_str("无输出\n");
            } else {
                text.push_str(&format!("{}\n", output.text));
            }
        }
    }
    text
}

/// 读取 notebook 文件并转换为批阅文本，失败时返回失败说明
pub async fn read_notebook_text(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    match read_notebook(path).await {
        Ok(notebook) => render_notebook(&file_name, &notebook),
        Err(e) => format!("【读取失败】：{}", e),
    }
}
