use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件路径（可通过 GRADER_CONFIG 覆盖）
pub const DEFAULT_CONFIG_FILE: &str = "grader.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 学生压缩包所在目录
    pub source_dir: PathBuf,
    /// 解压结果目录（每次运行前清空），同时也是统计阶段的输入目录
    pub output_dir: PathBuf,
    /// 统计报表（JSON）输出路径
    pub report_path: PathBuf,

    // --- 解压配置 ---
    /// 支持的压缩包后缀（小写，带点）
    pub archive_exts: Vec<String>,
    /// 目标文件后缀
    pub target_ext: String,
    /// 次要源文件后缀（只计数，不解析）
    pub secondary_ext: String,
    /// 解压标记后缀
    pub marker_suffix: String,
    /// 解压程序
    pub extract_program: String,
    /// 解压参数，`{archive}` 会被替换为压缩包文件名
    pub extract_args: Vec<String>,
    /// 单个压缩包解压超时（秒）
    pub extract_timeout_secs: u64,
    /// 判定"已加密"的诊断文本
    pub password_patterns: Vec<String>,
    /// 判定"已损坏"的诊断文本
    pub corrupt_patterns: Vec<String>,

    // --- 批阅配置 ---
    /// 是否调用 LLM 批阅
    pub grading_enabled: bool,
    /// 每个学生最多送审的 ipynb 数量
    pub max_review_notebooks: usize,
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub llm_retry_times: u32,
    /// 作业要求（写入系统提示词）
    pub homework_requirements: String,
    /// 评判标准（写入系统提示词）
    pub grading_criteria: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("submissions"),
            output_dir: PathBuf::from("extracted"),
            report_path: PathBuf::from("grading_report.json"),
            archive_exts: [".zip", ".7z", ".rar", ".tar", ".gz"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            target_ext: ".ipynb".to_string(),
            secondary_ext: ".py".to_string(),
            marker_suffix: ".unzipped".to_string(),
            extract_program: "bz".to_string(),
            extract_args: ["x", "-aoa", "-y", "-target:name", "{archive}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extract_timeout_secs: 60,
            password_patterns: vec!["password".to_string(), "密码".to_string()],
            corrupt_patterns: vec!["corrupt".to_string(), "损坏".to_string()],
            grading_enabled: false,
            max_review_notebooks: 4,
            llm_api_key: String::new(),
            llm_api_base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            llm_model_name: "qwen3-max".to_string(),
            llm_temperature: 0.3,
            llm_max_tokens: 1500,
            llm_timeout_secs: 30,
            llm_retry_times: 2,
            homework_requirements: String::new(),
            grading_criteria: "按照核心准则和你自己的感觉。".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（存在时）→ 环境变量
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("GRADER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = Self::from_toml_file(Path::new(&path))?.unwrap_or_default();
        base.with_env_overrides()
    }

    /// 只读取环境变量（在默认值之上）
    pub fn from_env() -> AppResult<Self> {
        Self::default().with_env_overrides()
    }

    /// 读取 TOML 配置文件，文件不存在时返回 None
    pub fn from_toml_file(path: &Path) -> AppResult<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(crate::error::FileError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
                .into())
            }
        };
        Self::from_toml_str(&content, path).map(Some)
    }

    fn from_toml_str(content: &str, path: &Path) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    fn with_env_overrides(self) -> AppResult<Self> {
        Ok(Self {
            source_dir: env_or("SOURCE_DIR", self.source_dir, |v| Some(PathBuf::from(v))),
            output_dir: env_or("OUTPUT_DIR", self.output_dir, |v| Some(PathBuf::from(v))),
            report_path: env_or("REPORT_PATH", self.report_path, |v| Some(PathBuf::from(v))),
            extract_program: std::env::var("EXTRACT_PROGRAM").unwrap_or(self.extract_program),
            extract_timeout_secs: env_parse("EXTRACT_TIMEOUT_SECS", self.extract_timeout_secs)?,
            grading_enabled: env_parse("GRADING_ENABLED", self.grading_enabled)?,
            max_review_notebooks: env_parse("MAX_REVIEW_NOTEBOOKS", self.max_review_notebooks)?,
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", self.llm_timeout_secs)?,
            llm_retry_times: env_parse("LLM_RETRY_TIMES", self.llm_retry_times)?,
            ..self
        })
    }

    /// 解压超时
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    /// 是否需要调用 LLM
    pub fn grading_active(&self) -> bool {
        self.grading_enabled && !self.llm_api_key.trim().is_empty()
    }

    /// 解压阶段会清空输出目录，两者不能相同，也不能互相包含
    pub fn validate_for_extraction(&self) -> AppResult<()> {
        let source = resolve_path(&self.source_dir);
        let output = resolve_path(&self.output_dir);
        if source.starts_with(&output) || output.starts_with(&source) {
            return Err(ConfigError::OutputOverlapsSource {
                path: self.output_dir.clone(),
            }
            .into());
        }
        Ok(())
    }
}

// 尽量解析为真实绝对路径；目录尚不存在时退回到父目录 + 文件名
fn resolve_path(path: &Path) -> PathBuf {
    if let Ok(real) = std::fs::canonicalize(path) {
        return real;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let resolved = match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => std::fs::canonicalize(parent)
            .ok()
            .map(|parent| parent.join(name)),
        _ => None,
    };
    resolved.unwrap_or(absolute)
}

fn env_or<T>(var_name: &str, default: T, parse: impl Fn(String) -> Option<T>) -> T {
    std::env::var(var_name).ok().and_then(parse).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }
            .into()
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_archive_exts() {
        let config = Config::default();
        assert_eq!(config.archive_exts.len(), 5);
        assert!(config.archive_exts.contains(&".7z".to_string()));
        assert_eq!(config.extract_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_toml_partial_override() {
        let content = r#"
            source_dir = "in"
            extract_timeout_secs = 5
            password_patterns = ["wrong password"]
        "#;
        let config = Config::from_toml_str(content, Path::new("grader.toml")).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("in"));
        assert_eq!(config.extract_timeout_secs, 5);
        assert_eq!(config.password_patterns, vec!["wrong password".to_string()]);
        // 未写的字段保持默认值
        assert_eq!(config.target_ext, ".ipynb");
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml_str("source_dir = [", Path::new("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_toml_file() {
        let result = Config::from_toml_file(Path::new("/nonexistent/grader.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_output_must_differ_from_source() {
        let config = Config {
            source_dir: PathBuf::from("same"),
            output_dir: PathBuf::from("same"),
            ..Config::default()
        };
        assert!(config.validate_for_extraction().is_err());
        assert!(Config::default().validate_for_extraction().is_ok());
    }

    #[test]
    fn test_output_must_not_contain_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let work = tmp.path().join("work");
        let submissions = work.join("submissions");
        std::fs::create_dir_all(&submissions).unwrap();

        // 输出目录是源目录的父目录
        let config = Config {
            source_dir: submissions.clone(),
            output_dir: work.clone(),
            ..Config::default()
        };
        assert!(config.validate_for_extraction().is_err());

        // 输出目录位于源目录内部（尚未创建）
        let config = Config {
            source_dir: submissions.clone(),
            output_dir: submissions.join("out"),
            ..Config::default()
        };
        assert!(config.validate_for_extraction().is_err());

        // 相对路径与绝对路径指向同一目录
        let config = Config {
            source_dir: submissions.join("..").join("submissions"),
            output_dir: submissions.clone(),
            ..Config::default()
        };
        assert!(config.validate_for_extraction().is_err());

        // 名称前缀相同的兄弟目录不算包含
        let config = Config {
            source_dir: submissions.clone(),
            output_dir: work.join("submissions_out"),
            ..Config::default()
        };
        assert!(config.validate_for_extraction().is_ok());
    }

    #[test]
    fn test_grading_requires_api_key() {
        let config = Config {
            grading_enabled: true,
            ..Config::default()
        };
        assert!(!config.grading_active());
    }
}
