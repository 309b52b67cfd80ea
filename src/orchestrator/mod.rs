//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 扫描源目录，筛选学生条目
//! - 准备输出目录
//! - 为每个学生建立隔离边界（一个学生失败不影响其他学生）
//! - 写报表，输出全局统计信息
//!
//! ### `submission_processor` - 单个学生处理器
//! - 解压整理：复制 → 递归解压 → 统计 → 扁平化
//! - 统计批阅：扫描清理 → 统计 → 汇总 → 可选批阅
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<学生>)
//!     ↓
//! submission_processor (处理单个学生)
//!     ↓
//! services (能力层：tree_scanner / flattener / notebook_stats / aggregator / grading)
//!     ↓
//! infrastructure (基础设施：解压程序)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管批量，submission_processor 管单个
//! 2. **状态隔离**：已处理压缩包集合只存在于单个学生的处理过程中
//! 3. **向下依赖**：编排层 → services → infrastructure

pub mod batch_processor;
pub mod submission_processor;

use crate::error::ConfigError;
use std::fmt::Display;
use std::str::FromStr;

pub use batch_processor::App;
pub use submission_processor::{CollectedStatistics, SubmissionProcessor};

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// 解压整理源目录中的压缩包
    #[default]
    Extract,
    /// 统计（并可选批阅）整理好的学生目录
    Analyze,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Extract => "extract",
            Mode::Analyze => "analyze",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extract" | "unzip" => Ok(Mode::Extract),
            "analyze" | "judge" => Ok(Mode::Analyze),
            _ => Err(ConfigError::UnknownMode {
                mode: s.to_string(),
            }),
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!("extract".parse::<Mode>().unwrap(), Mode::Extract);
        assert_eq!(" Analyze ".parse::<Mode>().unwrap(), Mode::Analyze);
        assert_eq!("judge".parse::<Mode>().unwrap(), Mode::Analyze);
        assert_eq!(Mode::default(), Mode::Extract);
        assert!(matches!(
            "zip".parse::<Mode>(),
            Err(ConfigError::UnknownMode { .. })
        ));
    }
}
