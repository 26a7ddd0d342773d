//! 核心层：领域模型和通用能力

pub mod card;
pub mod clock;
pub mod dispatch;
pub mod messaging;
pub mod rate_limit;
pub mod trigger;
