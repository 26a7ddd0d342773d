//! 消息通信层
//!
//! 平台无关的入站消息模型和回复通道

use async_trait::async_trait;

use crate::errors::Result;

/// 入站聊天消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// 消息正文
    pub content: String,
    /// 作者 ID，无法解析时为 None
    pub author_id: Option<u64>,
    /// 作者显示名，仅用于日志
    pub author_name: String,
    /// 消息中提及的用户 ID
    pub mentions: Vec<u64>,
}

impl InboundMessage {
    pub fn new(author_id: u64, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author_id: Some(author_id),
            author_name: author_id.to_string(),
            mentions: Vec::new(),
        }
    }

    /// 添加提及的用户
    pub fn with_mention(mut self, user_id: u64) -> Self {
        self.mentions.push(user_id);
        self
    }

    /// 设置作者显示名
    pub fn with_author_name(mut self, name: impl Into<String>) -> Self {
        self.author_name = name.into();
        self
    }

    /// 不带作者身份的消息
    pub fn anonymous(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            author_id: None,
            author_name: "unknown".to_string(),
            mentions: Vec::new(),
        }
    }

    pub fn mentions_user(&self, user_id: u64) -> bool {
        self.mentions.contains(&user_id)
    }
}

/// 回复通道
///
/// 每次调用回复原消息一次，并提及原作者
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, content: &str) -> Result<()>;
}
