//! # Homework Grader
//!
//! 批量整理并统计学生 Jupyter 作业的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用三层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 外部解压程序，只暴露"运行一次并收集输出"的能力
//! - `ExtractBackend` - 解压后端 trait，测试中可替换
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个压缩包 / 目录 / 文件
//! - `ArchiveExtractor` - 幂等解压 + 结果分类
//! - `TreeScanner` - 递归扫描，嵌套解压，清理无关文件
//! - `Flattener` - 目录扁平化
//! - `notebook_stats` / `aggregator` - 统计与汇总
//! - `GradingService` - LLM 批阅（可选）
//! - `ReportWriter` - JSON 报表
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，逐个学生调度并隔离错误
//! - `orchestrator/submission_processor` - 单个学生处理器
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CommandBackend, ExtractBackend, ToolRun};
pub use models::{StudentInfo, SubmissionResult, SubmissionSummary};
pub use orchestrator::{App, Mode};
