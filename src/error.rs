use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 压缩包处理错误
    #[error("压缩包错误: {0}")]
    Archive(#[from] ArchiveError),
    /// Notebook 解析错误
    #[error("Notebook错误: {0}")]
    Notebook(#[from] NotebookError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {}", path.display())]
    DirectoryNotFound { path: PathBuf },
    /// 读取目录失败
    #[error("读取目录失败 ({}): {source}", path.display())]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 报表序列化失败
    #[error("报表序列化失败 ({}): {source}", path.display())]
    SerializeFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 压缩包处理错误
///
/// 解压失败本身不是错误（见 `ExtractOutcome`），这里只覆盖解压工具无法启动的情况
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 解压程序启动失败
    #[error("无法启动解压程序 {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// 压缩包路径没有文件名
    #[error("无效的压缩包路径: {}", path.display())]
    InvalidPath { path: PathBuf },
}

/// Notebook 解析错误
#[derive(Debug, Error)]
pub enum NotebookError {
    /// 读取失败
    #[error("读取失败: {source}")]
    Unreadable {
        #[source]
        source: std::io::Error,
    },
    /// 内容不是合法的（宽松）JSON
    #[error("格式错误: {message}")]
    Malformed { message: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 请求超时
    #[error("LLM请求超时 ({secs}秒)")]
    Timeout { secs: u64 },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
    /// 重试耗尽
    #[error("重试{attempts}次后仍失败: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// TOML 配置解析失败
    #[error("TOML解析失败 ({}): {source}", path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 源目录与输出目录相同（输出目录会被清空）
    #[error("输出目录不能与源目录相同或互相包含: {}", path.display())]
    OutputOverlapsSource { path: PathBuf },
    /// 未知的运行模式
    #[error("未知的运行模式: {mode}（可选: extract / analyze）")]
    UnknownMode { mode: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建目录读取错误
    pub fn read_dir_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadDirFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建 LLM API 调用错误
    pub fn llm_api_failed(model: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            message: message.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_error_display() {
        let err = AppError::from(NotebookError::Malformed {
            message: "unexpected end".to_string(),
        });
        assert_eq!(err.to_string(), "Notebook错误: 格式错误: unexpected end");
    }

    #[test]
    fn test_config_error_display() {
        let err = AppError::from(ConfigError::UnknownMode {
            mode: "zip".to_string(),
        });
        assert!(err.to_string().contains("zip"));
    }
}
