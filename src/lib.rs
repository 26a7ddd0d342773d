//! Wishing Star 聊天机器人
//!
//! 把聊天消息转发给两个外部服务，并把格式化后的回复发回聊天频道：
//! - AI 补全（OpenAI），受单槽位限流保护
//! - 游戏王卡片查询（ygocdb）
//!
//! # 架构分层
//!
//! - `core`: 核心层，限流、分段发送、卡片格式化、触发匹配
//! - `infrastructure`: 基础设施层，外部系统交互
//! - `application`: 应用层，聊天服务和消息路由

// 核心层
pub mod core;

// 基础设施层
pub mod infrastructure;

// 应用层
pub mod application;

pub mod bootstrap;
pub mod config;
pub mod errors;

pub use crate::application::chat::ChatService;
pub use crate::application::router::{FailureReplyPolicy, MessageRouter};
pub use crate::config::{AppConfig, BotSettings, Credentials};
pub use crate::core::card::{CardFormatter, CardHits, CardRecord};
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::dispatch::{chunk_reply, ReplyDispatcher};
pub use crate::core::messaging::{InboundMessage, ReplySink};
pub use crate::core::rate_limit::{Admission, AdmissionPolicy, RateLimitState, RateLimiter};
pub use crate::core::trigger::{ChatTrigger, CommandTable, Route, RouteKind, TriggerMatcher};
pub use crate::errors::{BotError, Result};
pub use crate::infrastructure::card_search::{CardSearch, YgoCardClient};
pub use crate::infrastructure::llm::{Completion, CompletionBackend, OpenAIClient};
pub use crate::infrastructure::logger;

/// 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
