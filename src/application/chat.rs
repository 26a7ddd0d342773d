//! AI 聊天服务
//!
//! 在补全后端之外加上固定提示前缀和单槽位限流

use std::sync::Arc;

use tracing::{info, warn};

use crate::core::clock::Clock;
use crate::core::rate_limit::RateLimiter;
use crate::errors::{BotError, Result};
use crate::infrastructure::llm::CompletionBackend;
use crate::infrastructure::logger::Timer;

/// 发给模型的固定提示前缀
pub const BRIEF_ANSWER_PREFIX: &str = "brief answer:";

/// AI 聊天服务
pub struct ChatService {
    backend: Arc<dyn CompletionBackend>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            limiter,
            clock,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// 发送一条单轮消息并返回回复
    ///
    /// 冷却期内返回 [`BotError::RateLimited`]；上游失败不修改限流时间戳。
    /// 返回的 future 在完成前被丢弃时，准入凭证随之释放。
    pub async fn chat(&self, message: &str, requester_id: u64) -> Result<String> {
        let prompt = format!("{}{}", BRIEF_ANSWER_PREFIX, message);

        let Some(admission) = self.limiter.admit(self.clock.now_millis()) else {
            info!(requester_id, "chat request rejected by rate limiter");
            return Err(BotError::RateLimited);
        };

        info!(
            requester_id,
            "initiating completion request, content:\n{}", prompt
        );

        let completion = {
            let _timer = Timer::new("chat_completion");
            self.backend.complete(&prompt).await
        };

        let completion = match completion {
            Ok(completion) => completion,
            Err(e) => {
                warn!(requester_id, "completion request failed: {}", e);
                return Err(e);
            }
        };

        info!(
            prompt_tokens = completion.prompt_tokens,
            completion_tokens = completion.completion_tokens,
            "completion request complete"
        );

        match completion.content {
            Some(content) => {
                admission.commit(self.clock.now_millis());
                Ok(content)
            }
            None => Err(BotError::upstream("empty response")),
        }
    }
}
