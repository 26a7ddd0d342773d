//! 游戏王卡片查询客户端
//!
//! `GET {endpoint}?search={query}`，200 时解析 `{"result": [...]}`

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::info;

use crate::core::card::{CardHits, CardRecord};
use crate::errors::{BotError, Result};

/// 默认查询接口
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://ygocdb.com/api/v0";

/// 卡片查询
#[async_trait]
pub trait CardSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<CardHits>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<CardEntry>,
}

#[derive(Debug, Deserialize)]
struct CardEntry {
    #[serde(default)]
    cn_name: Option<String>,
    #[serde(default)]
    jp_name: Option<String>,
    #[serde(default)]
    en_name: Option<String>,
    id: u64,
    #[serde(default)]
    text: Option<CardText>,
}

#[derive(Debug, Deserialize)]
struct CardText {
    #[serde(default)]
    types: Option<String>,
    #[serde(default)]
    desc: Option<String>,
}

impl From<CardEntry> for CardRecord {
    fn from(entry: CardEntry) -> Self {
        let (types, desc) = entry
            .text
            .map(|t| (t.types, t.desc))
            .unwrap_or_default();

        CardRecord {
            chinese_name: entry.cn_name.unwrap_or_default(),
            japanese_name: entry.jp_name.unwrap_or_default(),
            english_name: entry.en_name.unwrap_or_default(),
            id: entry.id,
            type_label: types.unwrap_or_default(),
            description: desc.unwrap_or_default(),
        }
    }
}

/// 解析查询接口的响应
///
/// 非 200 状态返回携带状态码的上游错误
pub fn parse_search_response(status: u16, body: &str) -> Result<Vec<CardRecord>> {
    if status != StatusCode::OK.as_u16() {
        return Err(BotError::upstream_status(
            status,
            "card search returned non-success status",
        ));
    }

    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.result.into_iter().map(CardRecord::from).collect())
}

/// ygocdb 查询客户端
#[derive(Debug, Clone)]
pub struct YgoCardClient {
    endpoint: String,
    http: reqwest::Client,
}

impl YgoCardClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for YgoCardClient {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_ENDPOINT)
    }
}

#[async_trait]
impl CardSearch for YgoCardClient {
    async fn search(&self, query: &str) -> Result<CardHits> {
        info!("YGO search query: {:?}", query);

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[("search", query)])
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(with_query(
                query,
                BotError::upstream_status(
                    status.as_u16(),
                    "card search returned non-success status",
                ),
            ));
        }

        let body = res.text().await?;
        let records =
            parse_search_response(status.as_u16(), &body).map_err(|e| with_query(query, e))?;

        info!("YGO search query {:?}: {} results found", query, records.len());
        Ok(CardHits::new(records))
    }
}

/// 在上游错误消息前附加查询内容
fn with_query(query: &str, error: BotError) -> BotError {
    match error {
        BotError::Upstream { status, message } => BotError::Upstream {
            status,
            message: format!("YGO search query {:?} failed: {}", query, message),
        },
        other => other,
    }
}
