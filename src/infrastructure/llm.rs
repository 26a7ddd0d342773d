//! LLM 客户端
//!
//! 使用 async-openai 提供与 OpenAI API 的交互能力

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::errors::{BotError, Result};

/// 默认模型
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// 默认 API 地址
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// 一次补全调用的结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    /// 回复正文，上游未返回时为 None
    pub content: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// 补全后端
///
/// 每次调用都是单轮请求，不携带历史上下文
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion>;
}

/// OpenAI 客户端
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    /// 创建新的 OpenAI 客户端
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, DEFAULT_BASE_URL.to_string())
    }

    /// 使用自定义 API 地址创建客户端
    pub fn new_with_base_url(api_key: String, model: String, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);

        let client = Client::with_config(config);

        Self { client, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for OpenAIClient {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map(ChatCompletionRequestMessage::User)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message])
            .build()?;

        let response = self.client.chat().create(request).await?;

        let (prompt_tokens, completion_tokens) = response
            .usage
            .as_ref()
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BotError::upstream("no choices in completion response"))?;

        Ok(Completion {
            content: choice.message.content,
            prompt_tokens,
            completion_tokens,
        })
    }
}
