use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 学号缺失时的占位值
pub const UNKNOWN_STUDENT_ID: &str = "未知学号";
/// 姓名缺失时的占位值
pub const UNKNOWN_NAME: &str = "未知姓名";
/// 学号与姓名之间的分隔符
pub const STUDENT_INFO_SEPARATOR: char = '-';

/// 学生信息（学号-姓名）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub student_id: String,
    pub name: String,
}

impl StudentInfo {
    /// 从目录名或压缩包名（不含后缀）解析学生信息
    ///
    /// 只取前两段；缺失或去空白后为空时使用占位值；结果中不含任何空白字符
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(STUDENT_INFO_SEPARATOR);
        Self {
            student_id: normalize_segment(parts.next(), UNKNOWN_STUDENT_ID),
            name: normalize_segment(parts.next(), UNKNOWN_NAME),
        }
    }

    /// 名称是否符合 学号-姓名 约定
    pub fn matches_convention(raw: &str) -> bool {
        raw.contains(STUDENT_INFO_SEPARATOR)
    }
}

fn normalize_segment(segment: Option<&str>, fallback: &str) -> String {
    let trimmed = segment.map(str::trim).unwrap_or_default();
    let value = if trimmed.is_empty() { fallback } else { trimmed };
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

impl Display for StudentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.student_id, self.name)
    }
}
