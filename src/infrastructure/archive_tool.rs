//! 外部解压程序 - 基础设施层
//!
//! 只负责"运行一次解压程序并收集输出"，不判断结果含义

use crate::config::Config;
use crate::error::{AppResult, ArchiveError};
use futures::future::{BoxFuture, FutureExt};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// 参数模板中的压缩包文件名占位符
pub const ARCHIVE_PLACEHOLDER: &str = "{archive}";

/// 一次解压程序运行的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRun {
    /// 程序已退出
    Finished {
        success: bool,
        stdout: String,
        stderr: String,
    },
    /// 超过时限，进程已被终止
    TimedOut,
}

impl ToolRun {
    pub fn finished(success: bool, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        ToolRun::Finished {
            success,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// 解压后端
///
/// 在压缩包所在目录原地解压（覆盖已有文件，不交互）
pub trait ExtractBackend: Send + Sync {
    fn run<'a>(&'a self, archive: &'a Path) -> BoxFuture<'a, AppResult<ToolRun>>;
}

/// 调用命令行解压程序的后端
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.extract_program.clone(),
            config.extract_args.clone(),
            config.extract_timeout(),
        )
    }

    /// 把参数模板中的占位符替换为压缩包文件名
    fn render_args(&self, archive_name: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(ARCHIVE_PLACEHOLDER, archive_name))
            .collect()
    }

    async fn run_command(&self, archive: &Path) -> AppResult<ToolRun> {
        let archive_name = archive
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| ArchiveError::InvalidPath {
                path: archive.to_path_buf(),
            })?;
        let work_dir = archive.parent().unwrap_or_else(|| Path::new("."));
        let args = self.render_args(&archive_name);

        debug!(
            "执行解压命令: {} {} (目录: {})",
            self.program,
            args.join(" "),
            work_dir.display()
        );

        let child = Command::new(&self.program)
            .args(&args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ArchiveError::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        // 超时后 future 被丢弃，kill_on_drop 负责终止子进程
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ToolRun::finished(
                output.status.success(),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            )),
            Ok(Err(e)) => Ok(ToolRun::finished(false, "", e.to_string())),
            Err(_) => Ok(ToolRun::TimedOut),
        }
    }
}

impl ExtractBackend for CommandBackend {
    fn run<'a>(&'a self, archive: &'a Path) -> BoxFuture<'a, AppResult<ToolRun>> {
        self.run_command(archive).boxed()
    }
}
