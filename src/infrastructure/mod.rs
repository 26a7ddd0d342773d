//! 基础设施层：外部系统交互
//!
//! 提供与外部系统（OpenAI、卡片查询接口、Discord、日志）的交互能力

pub mod card_search;
pub mod discord;
pub mod llm;
pub mod logger;
