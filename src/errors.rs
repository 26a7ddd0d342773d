//! 标准化错误处理
//!
//! 定义机器人专用的错误类型

use thiserror::Error;

/// 机器人主要错误类型
#[derive(Error, Debug)]
pub enum BotError {
    /// AI 请求过于频繁，处于冷却期
    #[error("Rate limited: requests are too frequent")]
    RateLimited,

    /// 上游服务（AI 或卡片查询）失败
    #[error("Upstream error{}: {message}", status_suffix(.status))]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// 配置错误（凭据文件缺失或格式错误）
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 消息作者无法识别
    #[error("Unknown author: {0}")]
    UnknownAuthor(String),

    /// 聊天平台错误
    #[error("Platform error: {0}")]
    PlatformError(String),
}

impl BotError {
    /// 不带状态码的上游错误
    pub fn upstream(message: impl Into<String>) -> Self {
        BotError::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// 带 HTTP 状态码的上游错误
    pub fn upstream_status(status: u16, message: impl Into<String>) -> Self {
        BotError::Upstream {
            status: Some(status),
            message: message.into(),
        }
    }

    /// 上游错误携带的状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            BotError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        BotError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<async_openai::error::OpenAIError> for BotError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        BotError::upstream(err.to_string())
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::upstream(format!("malformed response body: {}", err))
    }
}

impl From<serde_yaml::Error> for BotError {
    fn from(err: serde_yaml::Error) -> Self {
        BotError::ConfigError(err.to_string())
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::PlatformError(err.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status {})", code))
        .unwrap_or_default()
}

/// 机器人结果类型别名
pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_display() {
        let err = BotError::upstream_status(503, "card search failed");
        assert_eq!(err.status(), Some(503));
        assert_eq!(
            err.to_string(),
            "Upstream error (status 503): card search failed"
        );
    }

    #[test]
    fn test_upstream_without_status() {
        let err = BotError::upstream("empty response");
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Upstream error: empty response");
    }

    #[test]
    fn test_non_upstream_has_no_status() {
        assert_eq!(BotError::RateLimited.status(), None);
        assert_eq!(BotError::ConfigError("x".into()).status(), None);
    }

    #[test]
    fn test_yaml_error_is_config_error() {
        let err: BotError = serde_yaml::from_str::<Vec<u32>>("{ not: [a list")
            .unwrap_err()
            .into();
        assert!(matches!(err, BotError::ConfigError(_)));
    }
}
