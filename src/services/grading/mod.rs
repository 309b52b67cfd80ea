//! LLM 批阅服务 - 业务能力层
//!
//! 只负责"给一个学生的作业打分写评语"，不关心目录处理流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（默认阿里云百炼）

pub mod parser;
pub mod prompt;

pub use parser::parse_grading_output;

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{GradingResult, StudentInfo, SubmissionSummary};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// LLM 批阅服务
///
/// 职责：
/// - 构建批阅提示词
/// - 调用 LLM API（带超时和重试）
/// - 解析分数和评语
/// - 调用失败时给出 0 分和失败原因，不向上抛错
pub struct GradingService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    retry_times: u32,
    max_review_notebooks: usize,
    system_prompt: String,
}

impl GradingService {
    /// 创建新的批阅服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            timeout: Duration::from_secs(config.llm_timeout_secs),
            retry_times: config.llm_retry_times.max(1),
            max_review_notebooks: config.max_review_notebooks,
            system_prompt: prompt::render_system_prompt(
                &config.homework_requirements,
                &config.grading_criteria,
            ),
        }
    }

    fn api_error(&self, e: impl std::fmt::Display) -> AppError {
        AppError::llm_api_failed(&self.model_name, e.to_string())
    }

    /// 单次 LLM 调用（带超时）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();
        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(|e| self.api_error(e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|e| self.api_error(e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| self.api_error(e))?;

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                self.api_error(e)
            })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }

    /// 带重试的 LLM 调用，第 n 次失败后等待 n 秒
    pub async fn send_with_retry(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> AppResult<String> {
        let mut attempt = 0;
        loop {
            match self.send_to_llm(user_message, system_message).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.retry_times {
                        return Err(LlmError::RetriesExhausted {
                            attempts: self.retry_times,
                            last: e.to_string(),
                        }
                        .into());
                    }
                    warn!("⚠️  请求失败，第{}次重试... ({})", attempt, e);
                    tokio::time::sleep(Duration::from_secs(u64::from(attempt))).await;
                }
            }
        }
    }

    /// 批阅一个学生的作业
    ///
    /// `notebooks` 中只有前 `max_review_notebooks` 个文件会被发送给 LLM
    pub async fn grade(
        &self,
        student: &StudentInfo,
        summary: &SubmissionSummary,
        notebooks: &[PathBuf],
    ) -> GradingResult {
        let mut texts = Vec::new();
        for path in notebooks.iter().take(self.max_review_notebooks) {
            texts.push(prompt::read_notebook_text(path).await);
        }
        let user_prompt = prompt::render_user_prompt(student, summary, &texts);

        info!("🤖 调用LLM批阅 {} 的作业...", student);
        let raw = match self
            .send_with_retry(&user_prompt, Some(&self.system_prompt))
            .await
        {
            Ok(output) => {
                info!("✅ LLM批阅完成 {}", student);
                output
            }
            Err(e) => {
                error!("❌ 调用LLM批阅失败 {}：{}", student, e);
                describe_failure(&e.to_string(), self.timeout.as_secs())
            }
        };
        parse_grading_output(&raw)
    }
}

/// 把调用失败转换为写进评语的说明
pub fn describe_failure(message: &str, timeout_secs: u64) -> String {
    if message.contains("401") {
        "批阅失败：API Key无效，请检查配置".to_string()
    } else if message.contains("429") {
        "批阅失败：API请求频率超限，请稍后重试".to_string()
    } else if message.contains("超时") || message.to_lowercase().contains("timeout") {
        format!("批阅失败：请求超时（{}秒）", timeout_secs)
    } else {
        format!("批阅失败：{}", message)
    }
}
