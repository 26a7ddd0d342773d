//! AI 请求限流器
//!
//! 单槽位限流：记录最近一次成功请求的时间戳，
//! 距离上次成功超过最小间隔才放行新请求。
//!
//! 时间戳只在上游调用成功后更新，失败的调用既不延长也不提前结束冷却期。

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// 默认最小请求间隔（15 秒）
pub const DEFAULT_MINIMUM_PERIOD_MILLIS: i64 = 15 * 1000;

/// 准入策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// 放行时预留槽位，同一时刻最多一个在途请求
    #[default]
    Reserve,
    /// 先检查后执行；并发请求可能在任何一个成功前同时被放行
    CheckThenAct,
}

impl std::str::FromStr for AdmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reserve" => Ok(AdmissionPolicy::Reserve),
            "check_then_act" | "check-then-act" => Ok(AdmissionPolicy::CheckThenAct),
            _ => Err(format!("Unknown admission policy: {}", s)),
        }
    }
}

/// 限流状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitState {
    /// 最近一次成功的完成时间，从未成功过时为 None
    pub last_success_millis: Option<i64>,
    pub in_flight: bool,
}

/// 单槽位限流器
#[derive(Debug)]
pub struct RateLimiter {
    minimum_period_millis: i64,
    policy: AdmissionPolicy,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    pub fn new(minimum_period_millis: i64, policy: AdmissionPolicy) -> Self {
        Self {
            minimum_period_millis,
            policy,
            state: Mutex::new(RateLimitState::default()),
        }
    }

    pub fn minimum_period_millis(&self) -> i64 {
        self.minimum_period_millis
    }

    pub fn policy(&self) -> AdmissionPolicy {
        self.policy
    }

    /// 尝试放行一个请求
    ///
    /// 从未成功过时总是放行，否则仅当 `now - last_success > minimum_period` 时返回 true。
    /// 不修改成功时间戳；`Reserve` 策略下会占用在途槽位，调用方必须随后
    /// 调用 [`record_success`](Self::record_success) 或 [`release`](Self::release)。
    pub fn try_admit(&self, now_millis: i64) -> bool {
        let mut state = self.lock();

        if let Some(last_success) = state.last_success_millis {
            let elapsed = now_millis.saturating_sub(last_success);
            if elapsed <= self.minimum_period_millis {
                debug!(elapsed_ms = elapsed, "request rejected: cooling down");
                return false;
            }
        }

        match self.policy {
            AdmissionPolicy::CheckThenAct => true,
            AdmissionPolicy::Reserve => {
                if state.in_flight {
                    debug!("request rejected: another request is in flight");
                    return false;
                }
                state.in_flight = true;
                true
            }
        }
    }

    /// 放行一个请求并返回准入凭证
    ///
    /// 凭证未经 [`Admission::commit`] 就被丢弃时（上游失败、超时、任务取消或 panic）
    /// 自动释放预留槽位。
    pub fn admit(&self, now_millis: i64) -> Option<Admission<'_>> {
        self.try_admit(now_millis).then(|| Admission {
            limiter: self,
            committed: false,
        })
    }

    /// 记录一次成功的上游调用
    pub fn record_success(&self, now_millis: i64) {
        let mut state = self.lock();
        state.last_success_millis = Some(now_millis);
        state.in_flight = false;
    }

    /// 上游调用失败后释放预留槽位，时间戳保持不变
    pub fn release(&self) {
        self.lock().in_flight = false;
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> RateLimitState {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RateLimitState> {
        // 临界区内没有可能 panic 的代码，中毒时直接沿用内部状态
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_PERIOD_MILLIS, AdmissionPolicy::default())
    }
}

/// 准入凭证
///
/// 持有期间占用在途槽位；提交时记录成功，否则在析构时释放。
#[must_use = "dropping an admission releases it immediately"]
#[derive(Debug)]
pub struct Admission<'a> {
    limiter: &'a RateLimiter,
    committed: bool,
}

impl Admission<'_> {
    /// 上游调用成功，以完成时间更新成功时间戳
    pub fn commit(mut self, now_millis: i64) {
        self.committed = true;
        self.limiter.record_success(now_millis);
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.committed {
            debug!("admission dropped without success, releasing slot");
            self.limiter.release();
        }
    }
}
