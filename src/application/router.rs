//! 消息路由器
//!
//! 检查入站消息，选择后端，把结果交给分发器发送：
//! - 机器人自己的消息一律忽略
//! - 无法识别作者的消息记录日志后丢弃
//! - 聊天路由走 AI 服务，受限流保护
//! - 卡片查询路由直接调用查询客户端，不限流

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Instrument};

use crate::application::chat::ChatService;
use crate::core::card::CardFormatter;
use crate::core::dispatch::ReplyDispatcher;
use crate::core::messaging::{InboundMessage, ReplySink};
use crate::core::trigger::{Route, TriggerMatcher};
use crate::errors::{BotError, Result};
use crate::infrastructure::card_search::CardSearch;
use crate::infrastructure::logger::{RequestContext, Timer};

/// 限流时的固定回复
pub const RATE_LIMITED_REPLY: &str =
    "T.T Jirachi gets too many questions and needs some time to rest...";

/// 空查询回复
pub const EMPTY_QUERY_REPLY: &str = "Empty Query Received.";

/// 查询无结果回复
pub const NO_RESULT_REPLY: &str = "No result found.";

/// `Notify` 策略下上游失败的回复
pub const UPSTREAM_FAILURE_REPLY: &str = "Sorry, Jirachi could not answer that right now.";

/// 上游失败时对用户的表现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReplyPolicy {
    /// 只记录日志，不回复
    #[default]
    Silent,
    /// 回复一条固定的失败提示
    Notify,
}

impl std::str::FromStr for FailureReplyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" => Ok(FailureReplyPolicy::Silent),
            "notify" => Ok(FailureReplyPolicy::Notify),
            _ => Err(format!("Unknown failure reply policy: {}", s)),
        }
    }
}

/// 查询完成后的汇总消息
pub fn summary_reply(count: usize) -> String {
    if count == 0 {
        NO_RESULT_REPLY.to_string()
    } else {
        format!("Query complete. Total results found: {}", count)
    }
}

/// 消息路由器
pub struct MessageRouter {
    bot_id: OnceLock<u64>,
    matcher: TriggerMatcher,
    chat: ChatService,
    cards: Arc<dyn CardSearch>,
    formatter: CardFormatter,
    dispatcher: ReplyDispatcher,
    failure_policy: FailureReplyPolicy,
}

impl MessageRouter {
    pub fn new(
        matcher: TriggerMatcher,
        chat: ChatService,
        cards: Arc<dyn CardSearch>,
        formatter: CardFormatter,
        dispatcher: ReplyDispatcher,
        failure_policy: FailureReplyPolicy,
    ) -> Self {
        Self {
            bot_id: OnceLock::new(),
            matcher,
            chat,
            cards,
            formatter,
            dispatcher,
            failure_policy,
        }
    }

    /// 登录完成后记录机器人自己的 ID
    pub fn set_bot_id(&self, bot_id: u64) {
        if self.bot_id.set(bot_id).is_err() && self.bot_id.get() != Some(&bot_id) {
            warn!(bot_id, "bot identity already set, ignoring new value");
        }
    }

    pub fn bot_id(&self) -> Option<u64> {
        self.bot_id.get().copied()
    }

    pub fn chat_service(&self) -> &ChatService {
        &self.chat
    }

    /// 处理一条入站消息
    ///
    /// 所有单条消息内的错误都在这里消化，不会向上传播
    pub async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) {
        let ctx = RequestContext::new();
        async {
            if let Err(e) = self.route(message, sink).await {
                match e {
                    BotError::UnknownAuthor(_) => warn!("dropping message: {}", e),
                    _ => warn!("failed to handle message: {}", e),
                }
            }
            debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "message handled");
        }
        .instrument(ctx.span())
        .await
    }

    async fn route(&self, message: &InboundMessage, sink: &dyn ReplySink) -> Result<()> {
        let author_id = message
            .author_id
            .ok_or_else(|| BotError::UnknownAuthor(message.author_name.clone()))?;

        let Some(bot_id) = self.bot_id() else {
            warn!("bot identity unknown yet, dropping message");
            return Ok(());
        };

        if author_id == bot_id {
            return Ok(());
        }

        match self.matcher.route(message, bot_id) {
            Some(Route::Chat { prompt }) => self.process_chat(&prompt, author_id, sink).await,
            Some(Route::CardSearch { query }) => self.process_card_search(&query, sink).await,
            None => Ok(()),
        }
    }

    async fn process_chat(&self, prompt: &str, author_id: u64, sink: &dyn ReplySink) -> Result<()> {
        if prompt.is_empty() {
            warn!(author_id, "chat trigger without any content");
            return Ok(());
        }

        match self.chat.chat(prompt, author_id).await {
            Ok(answer) => {
                self.dispatcher.emit(&answer, sink).await?;
                Ok(())
            }
            Err(BotError::RateLimited) => sink.reply(RATE_LIMITED_REPLY).await,
            Err(e) => self.report_failure(e, sink).await,
        }
    }

    async fn process_card_search(&self, query: &str, sink: &dyn ReplySink) -> Result<()> {
        if query.is_empty() {
            return sink.reply(EMPTY_QUERY_REPLY).await;
        }

        let hits = {
            let _timer = Timer::new("card_search");
            self.cards.search(query).await
        };
        let hits = match hits {
            Ok(hits) => hits,
            Err(e) => return self.report_failure(e, sink).await,
        };

        let mut count = 0;
        for card in hits {
            self.dispatcher.emit(&self.formatter.render(&card), sink).await?;
            count += 1;
        }

        info!(query, count, "card search replies sent");
        sink.reply(&summary_reply(count)).await
    }

    async fn report_failure(&self, error: BotError, sink: &dyn ReplySink) -> Result<()> {
        warn!("upstream request failed: {}", error);
        match self.failure_policy {
            FailureReplyPolicy::Silent => Ok(()),
            FailureReplyPolicy::Notify => sink.reply(UPSTREAM_FAILURE_REPLY).await,
        }
    }
}
