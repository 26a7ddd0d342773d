//! 启动装配
//!
//! 根据凭据和设置组装路由器及其依赖，然后连接聊天平台

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::application::chat::ChatService;
use crate::application::router::MessageRouter;
use crate::config::{BotSettings, Credentials};
use crate::core::card::CardFormatter;
use crate::core::clock::SystemClock;
use crate::core::dispatch::ReplyDispatcher;
use crate::core::rate_limit::RateLimiter;
use crate::core::trigger::TriggerMatcher;
use crate::infrastructure::card_search::YgoCardClient;
use crate::infrastructure::discord;
use crate::infrastructure::llm::OpenAIClient;
use crate::infrastructure::logger::Sanitizer;

/// 组装消息路由器
pub fn build_router(credentials: &Credentials, settings: &BotSettings) -> MessageRouter {
    let backend = OpenAIClient::new_with_base_url(
        credentials.openai_key.clone(),
        settings.openai_model.clone(),
        settings.openai_base_url.clone(),
    );
    let limiter = RateLimiter::new(settings.min_request_period_ms, settings.admission);
    let chat = ChatService::new(Arc::new(backend), Arc::new(limiter), Arc::new(SystemClock));

    MessageRouter::new(
        TriggerMatcher::new(settings.chat_trigger(), settings.command_table()),
        chat,
        Arc::new(YgoCardClient::new(settings.card_search_endpoint.clone())),
        CardFormatter::new(settings.card_image_base.clone()),
        ReplyDispatcher::new(settings.max_segment_chars),
        settings.failure_reply,
    )
}

/// 启动机器人，阻塞直到平台连接结束
pub async fn launch(credentials: Credentials, settings: BotSettings) -> Result<()> {
    info!(
        model = %settings.openai_model,
        openai_key = %Sanitizer::api_key(&credentials.openai_key),
        discord_key = %Sanitizer::token(&credentials.discord_key),
        admission = ?settings.admission,
        failure_reply = ?settings.failure_reply,
        "starting wishing star"
    );

    let router = Arc::new(build_router(&credentials, &settings));
    discord::run(&credentials.discord_key, router)
        .await
        .context("discord client terminated")?;

    info!("wishing star stopped");
    Ok(())
}
