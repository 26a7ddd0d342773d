//! 配置管理
//!
//! - 命令行：凭据文件路径（必需）和用户设置文件路径（可选）
//! - 凭据文件（YAML）：Discord 登录令牌和 OpenAI 密钥
//! - 设置文件（YAML）：所有字段都有默认值

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::application::router::FailureReplyPolicy;
use crate::core::card::DEFAULT_IMAGE_BASE;
use crate::core::dispatch::MAX_SEGMENT_CHARS;
use crate::core::rate_limit::{AdmissionPolicy, DEFAULT_MINIMUM_PERIOD_MILLIS};
use crate::core::trigger::{ChatTrigger, CommandTable, RouteKind, DEFAULT_COMMAND_PREFIX};
use crate::errors::{BotError, Result};
use crate::infrastructure::card_search::DEFAULT_SEARCH_ENDPOINT;
use crate::infrastructure::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::infrastructure::logger::{LogConfig, LogFormat};

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Discord bot relaying chat to OpenAI and Yu-Gi-Oh! card lookups"
)]
pub struct AppConfig {
    /// 凭据文件路径（YAML，包含 discord_key 和 openai_key）
    #[arg(long, env = "WISHING_STAR_KEY")]
    pub key: PathBuf,

    /// 用户设置文件路径（YAML）
    #[arg(long, env = "WISHING_STAR_SETTINGS")]
    pub settings: Option<PathBuf>,
}

/// 登录凭据
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub discord_key: String,
    pub openai_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("discord_key", &"***")
            .field("openai_key", &"***")
            .finish()
    }
}

impl Credentials {
    /// 从 YAML 文件加载凭据
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotError::ConfigError(format!(
                "failed to read credential file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let credentials: Credentials = serde_yaml::from_str(content)?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// 验证凭据的有效性
    pub fn validate(&self) -> Result<()> {
        if self.discord_key.trim().is_empty() {
            return Err(BotError::ConfigError("discord_key is empty".to_string()));
        }
        if self.openai_key.trim().is_empty() {
            return Err(BotError::ConfigError("openai_key is empty".to_string()));
        }
        Ok(())
    }
}

/// 聊天触发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatTriggerMode {
    #[default]
    Mention,
    Keyword,
}

/// 用户设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// 日志目录，未设置时输出到标准输出
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,

    pub openai_model: String,
    pub openai_base_url: String,

    /// AI 请求最小间隔（毫秒）
    pub min_request_period_ms: i64,
    pub admission: AdmissionPolicy,
    pub failure_reply: FailureReplyPolicy,

    pub chat_trigger: ChatTriggerMode,
    /// `keyword` 触发方式使用的关键字
    pub chat_keyword: String,
    pub command_prefix: String,
    pub commands: BTreeMap<String, RouteKind>,

    pub card_search_endpoint: String,
    pub card_image_base: String,
    pub max_segment_chars: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_format: LogFormat::default(),
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            min_request_period_ms: DEFAULT_MINIMUM_PERIOD_MILLIS,
            admission: AdmissionPolicy::default(),
            failure_reply: FailureReplyPolicy::default(),
            chat_trigger: ChatTriggerMode::default(),
            chat_keyword: "Jirachi".to_string(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            commands: CommandTable::default().commands,
            card_search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            card_image_base: DEFAULT_IMAGE_BASE.to_string(),
            max_segment_chars: MAX_SEGMENT_CHARS,
        }
    }
}

impl BotSettings {
    /// 从 YAML 文件加载设置
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BotError::ConfigError(format!(
                "failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// 解析设置；空文档得到默认设置
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: BotSettings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 加载可选的设置文件
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_request_period_ms < 0 {
            return Err(BotError::ConfigError(
                "min_request_period_ms must not be negative".to_string(),
            ));
        }
        if self.max_segment_chars == 0 {
            return Err(BotError::ConfigError(
                "max_segment_chars must be positive".to_string(),
            ));
        }
        if self.chat_trigger == ChatTriggerMode::Keyword && self.chat_keyword.trim().is_empty() {
            return Err(BotError::ConfigError(
                "chat_keyword is required for keyword trigger".to_string(),
            ));
        }
        Ok(())
    }

    pub fn chat_trigger(&self) -> ChatTrigger {
        match self.chat_trigger {
            ChatTriggerMode::Mention => ChatTrigger::Mention,
            ChatTriggerMode::Keyword => ChatTrigger::Keyword(self.chat_keyword.clone()),
        }
    }

    pub fn command_table(&self) -> CommandTable {
        CommandTable {
            prefix: self.command_prefix.clone(),
            commands: self.commands.clone(),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            format: self.log_format,
            log_dir: self.log_dir.clone(),
            ..LogConfig::default()
        }
    }
}
