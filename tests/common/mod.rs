//! 测试通用工具
//!
//! 提供测试日志初始化和后端、回复通道的内存替身

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use wishing_star::{
    AdmissionPolicy, BotError, CardFormatter, CardHits, CardRecord, CardSearch, ChatService,
    ChatTrigger, CommandTable, Completion, CompletionBackend, FailureReplyPolicy, InboundMessage,
    ManualClock, MessageRouter, RateLimiter, ReplyDispatcher, ReplySink, Result, TriggerMatcher,
};

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

pub const BOT_ID: u64 = 1000;
pub const USER_ID: u64 = 42;
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// 记录所有回复的通道
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<String>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 发送成功 `n` 条之后开始失败
    pub fn failing_after(n: usize) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            fail_after: Some(n),
        }
    }

    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, content: &str) -> Result<()> {
        let mut replies = self.replies.lock().unwrap();
        if let Some(limit) = self.fail_after {
            if replies.len() >= limit {
                return Err(BotError::PlatformError("send failed".to_string()));
            }
        }
        replies.push(content.to_string());
        Ok(())
    }
}

/// 按顺序返回预设结果的补全后端
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<Completion>>>,
    prompts: Mutex<Vec<String>>,
    clock: Option<Arc<ManualClock>>,
    latency_millis: i64,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedBackend {
    pub fn new(responses: Vec<Result<Completion>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
            clock: None,
            latency_millis: 0,
            gate: None,
        }
    }

    /// 每次调用把时钟推进 `latency_millis`，模拟请求耗时
    pub fn with_latency(mut self, clock: Arc<ManualClock>, latency_millis: i64) -> Self {
        self.clock = Some(clock);
        self.latency_millis = latency_millis;
        self
    }

    /// 每次调用先等待 `gate` 的一个许可；许可永不发放时调用一直挂起
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| BotError::upstream("gate closed"))?
                .forget();
        }
        if let Some(clock) = &self.clock {
            clock.advance(self.latency_millis);
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BotError::upstream("no scripted response")))
    }
}

pub fn answer(text: &str) -> Result<Completion> {
    Ok(Completion {
        content: Some(text.to_string()),
        prompt_tokens: 10,
        completion_tokens: 5,
    })
}

pub fn empty_answer() -> Result<Completion> {
    Ok(Completion {
        content: None,
        prompt_tokens: 10,
        completion_tokens: 0,
    })
}

/// 返回预设结果的卡片查询
pub struct FakeCardSearch {
    outcome: Mutex<Option<Result<Vec<CardRecord>>>>,
    queries: Mutex<Vec<String>>,
}

impl FakeCardSearch {
    pub fn returning(records: Vec<CardRecord>) -> Self {
        Self {
            outcome: Mutex::new(Some(Ok(records))),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: BotError) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(error))),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl CardSearch for FakeCardSearch {
    async fn search(&self, query: &str) -> Result<CardHits> {
        self.queries.lock().unwrap().push(query.to_string());
        let outcome = self
            .outcome
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()));
        outcome.map(CardHits::new)
    }
}

pub fn card(id: u64, english_name: &str) -> CardRecord {
    CardRecord {
        chinese_name: format!("卡片{}", id),
        japanese_name: format!("カード{}", id),
        english_name: english_name.to_string(),
        id,
        type_label: "[怪兽|通常]".to_string(),
        description: "A test card.".to_string(),
    }
}

/// 组装好的测试路由器
pub struct Harness {
    pub router: MessageRouter,
    pub backend: Arc<ScriptedBackend>,
    pub cards: Arc<FakeCardSearch>,
    pub clock: Arc<ManualClock>,
}

pub struct HarnessBuilder {
    responses: Vec<Result<Completion>>,
    cards: FakeCardSearch,
    policy: FailureReplyPolicy,
    admission: AdmissionPolicy,
    trigger: ChatTrigger,
    max_segment_chars: usize,
    gate: Option<Arc<Semaphore>>,
    bind_bot_id: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            cards: FakeCardSearch::returning(Vec::new()),
            policy: FailureReplyPolicy::Silent,
            admission: AdmissionPolicy::Reserve,
            trigger: ChatTrigger::Mention,
            max_segment_chars: 1800,
            gate: None,
            bind_bot_id: true,
        }
    }

    pub fn admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    /// 后端调用等待 `gate` 放行
    pub fn gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// 不设置机器人身份，模拟网关就绪之前的状态
    pub fn before_ready(mut self) -> Self {
        self.bind_bot_id = false;
        self
    }

    pub fn responses(mut self, responses: Vec<Result<Completion>>) -> Self {
        self.responses = responses;
        self
    }

    pub fn cards(mut self, cards: FakeCardSearch) -> Self {
        self.cards = cards;
        self
    }

    pub fn failure_policy(mut self, policy: FailureReplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn trigger(mut self, trigger: ChatTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn max_segment_chars(mut self, max: usize) -> Self {
        self.max_segment_chars = max;
        self
    }

    pub fn build(self) -> Harness {
        setup();
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let mut backend = ScriptedBackend::new(self.responses);
        if let Some(gate) = self.gate {
            backend = backend.with_gate(gate);
        }
        let backend = Arc::new(backend);
        let cards = Arc::new(self.cards);
        let chat = ChatService::new(
            backend.clone(),
            Arc::new(RateLimiter::new(15_000, self.admission)),
            clock.clone(),
        );
        let router = MessageRouter::new(
            TriggerMatcher::new(self.trigger, CommandTable::default()),
            chat,
            cards.clone(),
            CardFormatter::default(),
            ReplyDispatcher::new(self.max_segment_chars),
            self.policy,
        );
        if self.bind_bot_id {
            router.set_bot_id(BOT_ID);
        }

        Harness {
            router,
            backend,
            cards,
            clock,
        }
    }
}

/// 用户提及机器人的消息
pub fn mention(content: &str) -> InboundMessage {
    InboundMessage::new(USER_ID, format!("<@{}> {}", BOT_ID, content)).with_mention(BOT_ID)
}
