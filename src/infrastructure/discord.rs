//! Discord 平台适配
//!
//! 把 serenity 的网关事件转换成 [`InboundMessage`]，并为每条消息提供回复通道。
//! 路由器通过组合持有平台能力，不继承平台客户端。

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
use serenity::Client;
use tracing::{error, info};

use crate::application::router::MessageRouter;
use crate::core::messaging::{InboundMessage, ReplySink};
use crate::errors::{BotError, Result};

/// 机器人需要的网关权限
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// 把 serenity 消息转换为平台无关的入站消息
pub fn to_inbound(message: &Message) -> InboundMessage {
    InboundMessage {
        content: message.content.clone(),
        author_id: Some(message.author.id.get()),
        author_name: message.author.name.clone(),
        mentions: message.mentions.iter().map(|user| user.id.get()).collect(),
    }
}

/// 回复原消息并提及作者
pub struct DiscordReply<'a> {
    ctx: &'a Context,
    message: &'a Message,
}

impl<'a> DiscordReply<'a> {
    pub fn new(ctx: &'a Context, message: &'a Message) -> Self {
        Self { ctx, message }
    }
}

#[async_trait]
impl<'a> ReplySink for DiscordReply<'a> {
    async fn reply(&self, content: &str) -> Result<()> {
        self.message.reply_ping(self.ctx, content).await?;
        Ok(())
    }
}

/// serenity 事件处理器
pub struct DiscordHandler {
    router: Arc<MessageRouter>,
}

impl DiscordHandler {
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as <{}> ID: <{}>", ready.user.name, ready.user.id);
        self.router.set_bot_id(ready.user.id.get());
    }

    async fn message(&self, ctx: Context, message: Message) {
        let inbound = to_inbound(&message);
        let sink = DiscordReply::new(&ctx, &message);
        self.router.handle(&inbound, &sink).await;
    }
}

/// 连接 Discord 网关并持续处理事件，直到连接结束
pub async fn run(token: &str, router: Arc<MessageRouter>) -> Result<()> {
    let mut client = Client::builder(token, intents())
        .event_handler(DiscordHandler::new(router))
        .await?;

    if let Err(e) = client.start().await {
        error!("discord client stopped: {}", e);
        return Err(BotError::from(e));
    }
    Ok(())
}
