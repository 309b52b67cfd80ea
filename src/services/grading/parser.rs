//! 解析 LLM 批阅输出
//!
//! 期望格式：第一行 `分数：XX`，其余为评语

use crate::models::GradingResult;
use regex::Regex;
use std::sync::OnceLock;

/// 分数上限
pub const MAX_SCORE: u32 = 100;

/// 没有评语时使用的默认文本
pub const DEFAULT_COMMENT: &str = "未获取到有效批阅结果";

/// 分数行前缀
const SCORE_PREFIXES: [&str; 2] = ["分数：", "分数:"];

const SCORE_PATTERN: &str = r"^分数[：:]\s*(\d+)";

fn score_regex() -> Option<&'static Regex> {
    static SCORE_RE: OnceLock<Option<Regex>> = OnceLock::new();
    SCORE_RE.get_or_init(|| Regex::new(SCORE_PATTERN).ok()).as_ref()
}

fn is_score_line(line: &str) -> bool {
    SCORE_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// 解析批阅输出，得到分数和评语
///
/// 只有以 `分数：` / `分数:` 开头的行才是分数行，取第一个带数字的分数行；
/// 没有分数时为 0，超过上限时截断为 100。
/// 评语为其余非空行拼接后的文本，连续空白折叠为单个空格。
pub fn parse_grading_output(raw: &str) -> GradingResult {
    let raw = raw.trim();
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let score = lines
        .iter()
        .filter(|line| is_score_line(line))
        .find_map(|line| {
            score_regex()?
                .captures(line)?
                .get(1)?
                .as_str()
                .parse::<u32>()
                .ok()
        })
        .map(|s| s.min(MAX_SCORE))
        .unwrap_or(0);

    let comment = lines
        .iter()
        .filter(|line| !is_score_line(line))
        .flat_map(|line| line.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    GradingResult {
        score,
        comment: if comment.is_empty() {
            DEFAULT_COMMENT.to_string()
        } else {
            comment
        },
        raw_output: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_output() {
        let result = parse_grading_output("分数：92\n代码完整，图表清晰。\n建议补充注释。");
        assert_eq!(result.score, 92);
        assert_eq!(result.comment, "代码完整，图表清晰。 建议补充注释。");
        assert!(result.raw_output.starts_with("分数：92"));
    }

    #[test]
    fn test_ascii_colon_and_spaces() {
        let result = parse_grading_output("  分数:  85 \n  结果正确  ");
        assert_eq!(result.score, 85);
        assert_eq!(result.comment, "结果正确");
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(parse_grading_output("分数：150\n很好").score, 100);
    }

    #[test]
    fn test_missing_score() {
        let result = parse_grading_output("无法批阅该作业");
        assert_eq!(result.score, 0);
        assert_eq!(result.comment, "无法批阅该作业");
    }

    #[test]
    fn test_score_must_start_a_line() {
        let result = parse_grading_output("本次作业的分数：90 分以上是合理的\n分数：75\n缺少图表");
        assert_eq!(result.score, 75);
        assert_eq!(result.comment, "本次作业的分数：90 分以上是合理的 缺少图表");
    }

    #[test]
    fn test_whole_score_line_is_dropped() {
        let result = parse_grading_output("分数：88 分\n\n\n  结构清晰，\t输出完整  \n");
        assert_eq!(result.score, 88);
        assert_eq!(result.comment, "结构清晰， 输出完整");

        let result = parse_grading_output("分数：待定\n分数：60\n需要补充运行结果");
        assert_eq!(result.score, 60);
        assert_eq!(result.comment, "需要补充运行结果");
    }

    #[test]
    fn test_empty_output() {
        let result = parse_grading_output("   ");
        assert_eq!(result.score, 0);
        assert_eq!(result.comment, DEFAULT_COMMENT);
        assert_eq!(result.raw_output, "");
    }
}
