//! 应用层：业务编排

pub mod chat;
pub mod router;
