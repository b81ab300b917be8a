//! Provider implementations for the supported messaging platforms.

pub mod dingtalk;
pub mod feishu;
