//! 触发匹配
//!
//! 决定一条入站消息走哪个后端：
//! - 聊天触发：提及机器人，或以关键字开头
//! - 命令表：固定前缀 + 命令名，例如 `?ygo 黑魔导`

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::messaging::InboundMessage;

/// 默认命令前缀
pub const DEFAULT_COMMAND_PREFIX: &str = "?";

/// 路由结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// 转发给 AI 补全服务
    Chat { prompt: String },
    /// 卡片查询
    CardSearch { query: String },
}

/// 命令对应的路由类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Chat,
    CardSearch,
}

/// 聊天触发方式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatTrigger {
    /// 消息提及了机器人
    #[default]
    Mention,
    /// 消息以关键字开头（不区分大小写）
    Keyword(String),
}

/// 命令表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTable {
    pub prefix: String,
    pub commands: BTreeMap<String, RouteKind>,
}

impl CommandTable {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: BTreeMap::new(),
        }
    }

    pub fn with_command(mut self, name: impl Into<String>, kind: RouteKind) -> Self {
        self.commands.insert(name.into(), kind);
        self
    }

    /// 解析 `{prefix}{name} {argument}`，命令名后必须是空白或结尾
    fn lookup<'a>(&self, content: &'a str) -> Option<(RouteKind, &'a str)> {
        if self.prefix.is_empty() {
            return None;
        }
        let body = content.trim_start().strip_prefix(self.prefix.as_str())?;
        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let (name, argument) = body.split_at(name_end);
        let kind = self.commands.get(name)?;
        Some((*kind, argument.trim()))
    }
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_PREFIX).with_command("ygo", RouteKind::CardSearch)
    }
}

/// 触发匹配器
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    chat: ChatTrigger,
    commands: CommandTable,
    mention_token: Regex,
}

impl TriggerMatcher {
    pub fn new(chat: ChatTrigger, commands: CommandTable) -> Self {
        Self {
            chat,
            commands,
            mention_token: Regex::new(r"<@!?(\d+)>").expect("static mention regex"),
        }
    }

    /// 计算路由，聊天触发优先于命令表
    pub fn route(&self, message: &InboundMessage, bot_id: u64) -> Option<Route> {
        if let Some(prompt) = self.chat_prompt(message, bot_id) {
            return Some(Route::Chat { prompt });
        }

        let (kind, argument) = self.commands.lookup(&message.content)?;
        let argument = argument.to_string();
        Some(match kind {
            RouteKind::Chat => Route::Chat { prompt: argument },
            RouteKind::CardSearch => Route::CardSearch { query: argument },
        })
    }

    fn chat_prompt(&self, message: &InboundMessage, bot_id: u64) -> Option<String> {
        match &self.chat {
            ChatTrigger::Mention => {
                if !message.mentions_user(bot_id) {
                    return None;
                }
                let stripped =
                    self.mention_token
                        .replace_all(&message.content, |caps: &regex::Captures| {
                            if caps[1].parse::<u64>().ok() == Some(bot_id) {
                                String::new()
                            } else {
                                caps[0].to_string()
                            }
                        });
                Some(stripped.trim().to_string())
            }
            ChatTrigger::Keyword(keyword) => {
                if keyword.is_empty() {
                    return None;
                }
                let content = message.content.trim_start();
                let head = content.get(..keyword.len())?;
                if head.to_lowercase() != keyword.to_lowercase() {
                    return None;
                }
                let rest = &content[keyword.len()..];
                Some(
                    rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == ':')
                        .trim_end()
                        .to_string(),
                )
            }
        }
    }
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new(ChatTrigger::default(), CommandTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT: u64 = 1000;

    #[test]
    fn test_mention_routes_to_chat() {
        let matcher = TriggerMatcher::default();
        let msg = InboundMessage::new(1, "<@1000> what is a synchro summon?").with_mention(BOT);

        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::Chat {
                prompt: "what is a synchro summon?".to_string()
            })
        );
    }

    #[test]
    fn test_nickname_mention_and_other_mentions_kept() {
        let matcher = TriggerMatcher::default();
        let msg = InboundMessage::new(1, "<@!1000> say hi to <@2000>")
            .with_mention(BOT)
            .with_mention(2000);

        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::Chat {
                prompt: "say hi to <@2000>".to_string()
            })
        );
    }

    #[test]
    fn test_mention_of_someone_else_is_ignored() {
        let matcher = TriggerMatcher::default();
        let msg = InboundMessage::new(1, "<@2000> hello").with_mention(2000);
        assert_eq!(matcher.route(&msg, BOT), None);
    }

    #[test]
    fn test_keyword_trigger() {
        let matcher = TriggerMatcher::new(
            ChatTrigger::Keyword("Jirachi".to_string()),
            CommandTable::default(),
        );

        let msg = InboundMessage::new(1, "jirachi, tell me a joke");
        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::Chat {
                prompt: "tell me a joke".to_string()
            })
        );

        let msg = InboundMessage::new(1, "hello jirachi");
        assert_eq!(matcher.route(&msg, BOT), None);
    }

    #[test]
    fn test_card_command() {
        let matcher = TriggerMatcher::default();
        let msg = InboundMessage::new(1, "?ygo dark magician");
        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::CardSearch {
                query: "dark magician".to_string()
            })
        );
    }

    #[test]
    fn test_card_command_without_argument() {
        let matcher = TriggerMatcher::default();
        let msg = InboundMessage::new(1, "?ygo");
        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::CardSearch {
                query: String::new()
            })
        );
    }

    #[test]
    fn test_command_name_must_be_whole_word() {
        let matcher = TriggerMatcher::default();
        assert_eq!(matcher.route(&InboundMessage::new(1, "?ygoxyz"), BOT), None);
        assert_eq!(matcher.route(&InboundMessage::new(1, "?help"), BOT), None);
        assert_eq!(matcher.route(&InboundMessage::new(1, "ygo magician"), BOT), None);
    }

    #[test]
    fn test_chat_command() {
        let matcher = TriggerMatcher::new(
            ChatTrigger::Mention,
            CommandTable::new("!").with_command("ask", RouteKind::Chat),
        );
        let msg = InboundMessage::new(1, "!ask why?");
        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::Chat {
                prompt: "why?".to_string()
            })
        );
    }

    #[test]
    fn test_chat_trigger_wins_over_command() {
        let matcher = TriggerMatcher::default();
        let msg = InboundMessage::new(1, "?ygo <@1000>").with_mention(BOT);
        assert_eq!(
            matcher.route(&msg, BOT),
            Some(Route::Chat {
                prompt: "?ygo".to_string()
            })
        );
    }
}
